//! Provider voice callbacks
//!
//! Twilio sends its parameters as a form body on POST and in the query
//! string on GET. The session key always travels in the query string since
//! it is part of the callback URL we handed out.

use super::metrics_handler::record_flow_transition;
use super::state::AppState;
use crate::domain::shared::{CallSid, SessionKey};
use crate::domain::voice_flow::{CallContext, FlowStep};
use crate::infrastructure::twiml;
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, Deserialize)]
pub struct VoiceCallback {
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
    #[serde(rename = "Digits")]
    pub digits: Option<String>,
    pub session: Option<String>,
}

impl VoiceCallback {
    fn merge(self, form: Option<VoiceCallback>) -> VoiceCallback {
        match form {
            Some(form) => VoiceCallback {
                call_sid: form.call_sid.or(self.call_sid),
                from: form.from.or(self.from),
                to: form.to.or(self.to),
                digits: form.digits.or(self.digits),
                session: form.session.or(self.session),
            },
            None => self,
        }
    }

    fn context(&self) -> CallContext {
        let call_sid = self
            .call_sid
            .as_deref()
            .and_then(|sid| CallSid::parse(sid).ok());

        let session_key = self.session.as_deref().and_then(|raw| {
            SessionKey::parse(raw)
                .map_err(|e| warn!(session = raw, error = %e, "Ignoring invalid session key"))
                .ok()
        });

        CallContext {
            call_sid,
            session_key,
        }
    }

    /// An empty `Digits` is what a timed out gather sends
    fn digits(&self) -> Option<&str> {
        self.digits.as_deref().filter(|d| !d.is_empty())
    }
}

fn voice_response(step: FlowStep) -> Response {
    record_flow_transition(step.state);
    (
        [(header::CONTENT_TYPE, twiml::CONTENT_TYPE)],
        twiml::render(&step.document),
    )
        .into_response()
}

/// Call answered: greet and offer the menu
pub async fn answer(
    State(state): State<AppState>,
    Query(query): Query<VoiceCallback>,
    form: Option<Form<VoiceCallback>>,
) -> Response {
    let callback = query.merge(form.map(|Form(f)| f));
    info!(
        call_sid = ?callback.call_sid,
        from = ?callback.from,
        to = ?callback.to,
        session = ?callback.session,
        "Answer callback"
    );

    let step = state.engine.on_answer(&callback.context()).await;
    debug!(state = step.state.as_str(), "Answer document ready");
    voice_response(step)
}

/// Digit gathered (or gather timed out)
pub async fn gather(
    State(state): State<AppState>,
    Query(query): Query<VoiceCallback>,
    form: Option<Form<VoiceCallback>>,
) -> Response {
    let callback = query.merge(form.map(|Form(f)| f));
    info!(
        call_sid = ?callback.call_sid,
        digits = ?callback.digits,
        session = ?callback.session,
        "Gather callback"
    );

    let step = state
        .engine
        .on_gather(&callback.context(), callback.digits())
        .await;
    debug!(state = step.state.as_str(), "Gather document ready");
    voice_response(step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_form_fields() {
        let query = VoiceCallback {
            session: Some("desk-1".to_string()),
            digits: Some("9".to_string()),
            ..Default::default()
        };
        let form = VoiceCallback {
            call_sid: Some("CAabc".to_string()),
            digits: Some("1".to_string()),
            ..Default::default()
        };

        let merged = query.merge(Some(form));
        assert_eq!(merged.call_sid.as_deref(), Some("CAabc"));
        assert_eq!(merged.digits.as_deref(), Some("1"));
        assert_eq!(merged.session.as_deref(), Some("desk-1"));
    }

    #[test]
    fn test_context_drops_invalid_values() {
        let callback = VoiceCallback {
            call_sid: Some(" ".to_string()),
            session: Some("bad key".to_string()),
            ..Default::default()
        };
        assert_eq!(callback.context(), CallContext::default());
    }

    #[test]
    fn test_empty_digits_count_as_absent() {
        let callback = VoiceCallback {
            digits: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(callback.digits(), None);
    }
}
