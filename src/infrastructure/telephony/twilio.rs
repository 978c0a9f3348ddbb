//! Twilio REST client
//!
//! Covers the two Calls API operations the service needs: creating an
//! outbound call and completing an in-progress one.

use crate::domain::shared::{CallSid, DomainError, PhoneNumber, Result};
use crate::domain::telephony::TelephonyProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error};

const API_VERSION: &str = "2010-04-01";

#[derive(Clone)]
pub struct TwilioSettings {
    pub api_base: String,
    pub account_sid: String,
    pub auth_token: String,
    /// Caller id for outbound calls
    pub from_number: String,
    pub timeout: Duration,
}

impl fmt::Debug for TwilioSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioSettings")
            .field("api_base", &self.api_base)
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"****")
            .field("from_number", &self.from_number)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Call resource as returned by the Calls API
#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    to: Option<String>,
    status: Option<String>,
}

/// Twilio error body, e.g. `{"code": 21220, "message": "Call is not in-progress"}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

pub struct TwilioClient {
    http: Client,
    settings: TwilioSettings,
}

impl TwilioClient {
    pub fn new(settings: TwilioSettings) -> Result<Self> {
        if settings.account_sid.is_empty() || settings.auth_token.is_empty() {
            return Err(DomainError::Configuration(
                "twilio account sid and auth token are required".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| DomainError::Configuration(format!("http client: {}", e)))?;

        Ok(Self { http, settings })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/{}/Accounts/{}/Calls.json",
            self.settings.api_base.trim_end_matches('/'),
            API_VERSION,
            self.settings.account_sid
        )
    }

    fn call_url(&self, call_id: &CallSid) -> String {
        format!(
            "{}/{}/Accounts/{}/Calls/{}.json",
            self.settings.api_base.trim_end_matches('/'),
            API_VERSION,
            self.settings.account_sid,
            call_id
        )
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<CallResource> {
        let response = self
            .http
            .post(url)
            .basic_auth(&self.settings.account_sid, Some(&self.settings.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| {
                error!(url, error = %e, "Twilio request failed");
                DomainError::Provider(format!("twilio request failed: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DomainError::Provider(format!("twilio response unreadable: {}", e)))?;

        if !status.is_success() {
            return Err(DomainError::Provider(describe_error(status.as_u16(), &body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| DomainError::Provider(format!("unexpected twilio response: {}", e)))
    }
}

fn describe_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            code: Some(code),
            message: Some(message),
        }) => format!("twilio {} ({}): {}", status, code, message),
        Ok(ErrorBody {
            message: Some(message),
            ..
        }) => format!("twilio {}: {}", status, message),
        _ => format!("twilio {}", status),
    }
}

#[async_trait]
impl TelephonyProvider for TwilioClient {
    async fn place_call(&self, to: &PhoneNumber, callback_url: &str) -> Result<CallSid> {
        let form = [
            ("To", to.as_str()),
            ("From", self.settings.from_number.as_str()),
            ("Url", callback_url),
            ("Method", "POST"),
        ];

        let call = self.post_form(&self.calls_url(), &form).await?;
        debug!(call_id = %call.sid, status = ?call.status, "Twilio call created");
        CallSid::parse(call.sid)
    }

    async fn hangup(&self, call_id: &CallSid) -> Result<String> {
        let call = self
            .post_form(&self.call_url(call_id), &[("Status", "completed")])
            .await?;
        debug!(call_id = %call.sid, status = ?call.status, "Twilio call updated");

        Ok(call.to.unwrap_or_default())
    }
}
