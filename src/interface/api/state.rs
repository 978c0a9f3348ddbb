//! Shared handler state

use crate::application::{CallDispatcher, IntentBridge};
use crate::domain::voice_flow::VoiceFlowEngine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<VoiceFlowEngine>,
    pub dispatcher: Arc<CallDispatcher>,
    pub intent_bridge: Arc<IntentBridge>,
    /// Applied to bare national numbers on `/call`
    pub default_country_code: String,
}
