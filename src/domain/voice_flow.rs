//! Voice flow state machine
//!
//! Decides, for each provider callback, which voice document to return next.
//!
//! ```text
//!   answer ──► AwaitingDigit ──gather──► "1" RoutedSales    (terminal)
//!     ▲                             ├──► "2" RoutedSupport  (terminal)
//!     │                             ├──► "3" Terminating    (terminal)
//!     │                             ├──► other Unrecognized ─┐
//!     └──────── redirect ◄──────────┴──► none Greeting ──────┘
//! ```
//!
//! Digit "3" only speaks the closing line. Hanging up is a separate, explicit
//! request handled by the call dispatcher.

use super::call_record::{CallRecord, CallRecordStore};
use super::session::CallSessionTracker;
use super::shared::{CallSid, DomainError, Result, SessionKey};
use super::voice_document::{CallbackMethod, Gather, Say, VoiceDocument};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Placeholder replaced by the callee's name in the greeting
pub const NAME_PLACEHOLDER: &str = "{name}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceFlowState {
    Greeting,
    AwaitingDigit,
    RoutedSales,
    RoutedSupport,
    Terminating,
    Unrecognized,
}

impl VoiceFlowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceFlowState::Greeting => "greeting",
            VoiceFlowState::AwaitingDigit => "awaiting_digit",
            VoiceFlowState::RoutedSales => "routed_sales",
            VoiceFlowState::RoutedSupport => "routed_support",
            VoiceFlowState::Terminating => "terminating",
            VoiceFlowState::Unrecognized => "unrecognized",
        }
    }

    /// State after a gather callback.
    ///
    /// Exact string match only: `" 1"`, `"01"` and `"12"` are unrecognized.
    /// An empty string counts as no input.
    pub fn after_gather(digits: Option<&str>) -> Self {
        match digits {
            None | Some("") => VoiceFlowState::Greeting,
            Some("1") => VoiceFlowState::RoutedSales,
            Some("2") => VoiceFlowState::RoutedSupport,
            Some("3") => VoiceFlowState::Terminating,
            Some(_) => VoiceFlowState::Unrecognized,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VoiceFlowState::RoutedSales | VoiceFlowState::RoutedSupport | VoiceFlowState::Terminating
        )
    }

    /// States whose document loops back to the answer callback
    pub fn redirects_to_answer(&self) -> bool {
        matches!(self, VoiceFlowState::Greeting | VoiceFlowState::Unrecognized)
    }
}

/// Sentences and voice used by the flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowScript {
    pub voice: Option<String>,
    pub default_name: String,
    /// Greeting template, `{name}` is replaced with the callee's name
    pub greeting: String,
    pub menu_prompt: String,
    pub sales_text: String,
    pub support_text: String,
    pub goodbye_text: String,
    pub unrecognized_text: String,
    pub gather_timeout_secs: u32,
}

impl Default for FlowScript {
    fn default() -> Self {
        Self {
            voice: Some("alice".to_string()),
            default_name: "Jaya Prakash".to_string(),
            greeting: "Hello {name}, thank you for taking our call.".to_string(),
            menu_prompt: "For sales, press 1. For support, press 2. To end this call, press 3."
                .to_string(),
            sales_text: "You selected sales. Good for you!".to_string(),
            support_text: "You need support. We will help!".to_string(),
            goodbye_text: "Thank you for your time. Goodbye!".to_string(),
            unrecognized_text: "Sorry, I don't understand that choice.".to_string(),
            gather_timeout_secs: 5,
        }
    }
}

impl FlowScript {
    pub fn greeting_for(&self, name: &str) -> String {
        self.greeting.replace(NAME_PLACEHOLDER, name)
    }
}

/// Callback URLs the provider is pointed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRoutes {
    pub answer: String,
    pub gather: String,
}

impl FlowRoutes {
    /// Routes below `base`, e.g. `https://ivr.example.com` or `""` for
    /// relative paths
    pub fn under(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            answer: format!("{}/answer", base),
            gather: format!("{}/gather", base),
        }
    }

    /// Answer URL carrying the session key, used as the origination callback
    pub fn answer_for(&self, session: Option<&SessionKey>) -> String {
        with_session(&self.answer, session)
    }

    pub fn gather_for(&self, session: Option<&SessionKey>) -> String {
        with_session(&self.gather, session)
    }
}

fn with_session(url: &str, session: Option<&SessionKey>) -> String {
    match session {
        Some(key) => {
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{}{}session={}", url, sep, key)
        }
        None => url.to_string(),
    }
}

/// What we know about the call a callback belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    pub call_sid: Option<CallSid>,
    pub session_key: Option<SessionKey>,
}

/// Result of one callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStep {
    pub state: VoiceFlowState,
    pub document: VoiceDocument,
}

pub struct VoiceFlowEngine {
    script: FlowScript,
    routes: FlowRoutes,
    records: Arc<dyn CallRecordStore>,
    sessions: Arc<CallSessionTracker>,
}

impl VoiceFlowEngine {
    pub fn new(
        script: FlowScript,
        routes: FlowRoutes,
        records: Arc<dyn CallRecordStore>,
        sessions: Arc<CallSessionTracker>,
    ) -> Self {
        Self {
            script,
            routes,
            records,
            sessions,
        }
    }

    pub fn routes(&self) -> &FlowRoutes {
        &self.routes
    }

    pub fn script(&self) -> &FlowScript {
        &self.script
    }

    /// Greeting plus a single-digit menu, looping back here on silence
    pub async fn on_answer(&self, ctx: &CallContext) -> FlowStep {
        let name = self.resolve_caller_name(ctx).await;
        let voice = self.script.voice.as_deref();
        let session = ctx.session_key.as_ref();

        let document = VoiceDocument::new()
            .say(self.script.greeting_for(&name), voice)
            .gather(Gather {
                num_digits: 1,
                action: self.routes.gather_for(session),
                method: CallbackMethod::Post,
                timeout_secs: self.script.gather_timeout_secs,
                prompts: vec![Say {
                    text: self.script.menu_prompt.clone(),
                    voice: self.script.voice.clone(),
                }],
            })
            .redirect(self.routes.answer_for(session), CallbackMethod::Post);

        info!(
            call_sid = ?ctx.call_sid.as_ref().map(CallSid::as_str),
            caller = %name,
            "Answered call, awaiting digit"
        );

        FlowStep {
            state: VoiceFlowState::AwaitingDigit,
            document,
        }
    }

    /// Branch on the gathered digit
    pub async fn on_gather(&self, ctx: &CallContext, digits: Option<&str>) -> FlowStep {
        let state = VoiceFlowState::after_gather(digits);
        let voice = self.script.voice.as_deref();
        let answer = self.routes.answer_for(ctx.session_key.as_ref());

        let document = match state {
            VoiceFlowState::RoutedSales => VoiceDocument::new().say(&self.script.sales_text, voice),
            VoiceFlowState::RoutedSupport => {
                VoiceDocument::new().say(&self.script.support_text, voice)
            }
            VoiceFlowState::Terminating => {
                VoiceDocument::new().say(&self.script.goodbye_text, voice)
            }
            VoiceFlowState::Unrecognized => VoiceDocument::new()
                .say(&self.script.unrecognized_text, voice)
                .redirect(answer, CallbackMethod::Post),
            VoiceFlowState::Greeting | VoiceFlowState::AwaitingDigit => {
                VoiceDocument::new().redirect(answer, CallbackMethod::Post)
            }
        };

        info!(
            call_sid = ?ctx.call_sid.as_ref().map(CallSid::as_str),
            digits = ?digits,
            state = state.as_str(),
            "Gather handled"
        );

        FlowStep { state, document }
    }

    /// Callee name for the greeting; lookup failures fall back to the default
    async fn resolve_caller_name(&self, ctx: &CallContext) -> String {
        match self.lookup_record(ctx).await {
            Ok(Some(record)) => record.name,
            Ok(None) => {
                debug!("No call record found, using default name");
                self.script.default_name.clone()
            }
            Err(e) => {
                warn!(error = %e, "Call record lookup failed, using default name");
                self.script.default_name.clone()
            }
        }
    }

    /// Record for this callback's call id, then the session binding, then
    /// the most recent record
    async fn lookup_record(&self, ctx: &CallContext) -> Result<Option<CallRecord>> {
        if let Some(call_sid) = &ctx.call_sid {
            if let Some(record) = self.records.find_by_call_id(call_sid).await? {
                return Ok(Some(record));
            }
        }

        if let Some(key) = &ctx.session_key {
            match self.sessions.resolve(key).await {
                Ok(bound) => {
                    if let Some(record) = self.records.find_by_call_id(&bound).await? {
                        return Ok(Some(record));
                    }
                }
                Err(DomainError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        self.records.most_recent().await
    }
}
