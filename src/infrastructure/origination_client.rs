//! HTTP client for the internal origination endpoint

use crate::domain::intent::{IntentCallRequest, OriginationClient};
use crate::domain::shared::{DomainError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub struct HttpOriginationClient {
    http: Client,
    url: String,
}

impl HttpOriginationClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Configuration(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl OriginationClient for HttpOriginationClient {
    async fn request_call(&self, request: &IntentCallRequest) -> Result<u16> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| DomainError::Provider(format!("origination endpoint unreachable: {}", e)))?;

        let status = response.status().as_u16();
        debug!(url = %self.url, status, "Origination endpoint answered");
        Ok(status)
    }
}
