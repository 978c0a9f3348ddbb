//! Agent intent to call origination bridge

use crate::domain::intent::{FulfillmentResponse, IntentCallRequest, OriginationClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// The two fixed replies sent back to the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentReplies {
    pub success_text: String,
    pub failure_text: String,
}

impl Default for IntentReplies {
    fn default() -> Self {
        Self {
            success_text: "Sure, I am placing the call now.".to_string(),
            failure_text: "Sorry, I could not place the call right now.".to_string(),
        }
    }
}

pub struct IntentBridge {
    client: Arc<dyn OriginationClient>,
    replies: IntentReplies,
}

impl IntentBridge {
    pub fn new(client: Arc<dyn OriginationClient>, replies: IntentReplies) -> Self {
        Self { client, replies }
    }

    /// Forward the payload's call request once and answer in the agent's
    /// reply shape. Never fails: every problem maps to the failure text.
    pub async fn handle_intent(&self, payload: &Value) -> FulfillmentResponse {
        let request = IntentCallRequest::from_payload(payload);
        info!(
            intent = ?request.intent,
            has_name = request.has_name(),
            has_phone_number = request.has_phone_number(),
            "Agent intent received"
        );

        if let Err(e) = request.require_phone_number() {
            warn!(error = %e, "Rejecting intent without destination");
            return FulfillmentResponse::new(&self.replies.failure_text);
        }

        match self.client.request_call(&request).await {
            Ok(status) if (200..300).contains(&status) => {
                info!(status, "Origination accepted");
                FulfillmentResponse::new(&self.replies.success_text)
            }
            Ok(status) => {
                warn!(status, "Origination refused");
                FulfillmentResponse::new(&self.replies.failure_text)
            }
            Err(e) => {
                warn!(error = %e, "Origination request failed");
                FulfillmentResponse::new(&self.replies.failure_text)
            }
        }
    }
}
