//! Conversational agent webhooks

use super::state::AppState;
use crate::domain::intent::FulfillmentResponse;
use axum::{body::Bytes, extract::State, Json};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Agent fulfillment. The body is parsed as JSON whatever the content type;
/// an unreadable body is handled like an empty payload.
pub async fn agent_webhook(State(state): State<AppState>, body: Bytes) -> Json<FulfillmentResponse> {
    let payload = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            warn!(error = %e, "Webhook payload is not JSON");
            Value::Null
        })
    };
    debug!(payload = %payload, "Webhook payload");

    Json(state.intent_bridge.handle_intent(&payload).await)
}

/// Provider intent detection hook, acknowledged only
pub async fn intent_detection() -> &'static str {
    info!("Intent detection callback");
    "200"
}
