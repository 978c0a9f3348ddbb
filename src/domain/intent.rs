//! Conversational-agent intent payloads
//!
//! Agent platforms send loosely typed JSON. Every field we care about is
//! optional here; only the origination step decides what is required.

use super::shared::{DomainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const NAME_KEYS: &[&str] = &["name", "person", "given-name", "given_name"];
const PHONE_KEYS: &[&str] = &["phone-number", "phone_number", "phoneNumber", "phone"];

/// Call request extracted from an agent payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentCallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing)]
    pub intent: Option<String>,
}

impl IntentCallRequest {
    /// Pull name, phone number and intent out of a Dialogflow ES
    /// (`queryResult.parameters`) or CX (`sessionInfo.parameters`) payload
    pub fn from_payload(payload: &Value) -> Self {
        let params = payload
            .pointer("/queryResult/parameters")
            .or_else(|| payload.pointer("/sessionInfo/parameters"))
            .unwrap_or(&Value::Null);

        let intent = payload
            .pointer("/queryResult/intent/displayName")
            .or_else(|| payload.pointer("/intentInfo/displayName"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            name: first_text(params, NAME_KEYS),
            phone_number: first_text(params, PHONE_KEYS),
            intent,
        }
    }

    pub fn has_name(&self) -> bool {
        self.name.is_some()
    }

    pub fn has_phone_number(&self) -> bool {
        self.phone_number.is_some()
    }

    /// The destination number, which origination cannot do without
    pub fn require_phone_number(&self) -> Result<&str> {
        self.phone_number
            .as_deref()
            .ok_or_else(|| DomainError::MalformedInput("phone number missing from payload".to_string()))
    }
}

fn first_text(params: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| params.get(*key).and_then(as_text))
}

/// Non-empty text from a string, a number, or an object with a `name` field
/// (the shape of Dialogflow's `@sys.person` entity)
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_u64() {
                Some(i.to_string())
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| format!("{:.0}", f))
            }
        }
        Value::Object(map) => map.get("name").and_then(as_text),
        _ => None,
    }
}

/// Reply shape expected by the agent platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentResponse {
    pub fulfillment_text: String,
}

impl FulfillmentResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            fulfillment_text: text.into(),
        }
    }
}

/// Forwards a call request to the origination endpoint
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait OriginationClient: Send + Sync {
    /// Returns the HTTP status the origination endpoint answered with
    async fn request_call(&self, request: &IntentCallRequest) -> Result<u16>;
}
