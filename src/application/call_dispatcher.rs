//! Call dispatch use cases
//!
//! Originate: place the call, append a call record, bind the session key.
//! Terminate: resolve the target call, hang it up, release the binding.
//!
//! The record write happens after the provider already placed the call, so a
//! failed write is logged and swallowed: the callee's phone is ringing either
//! way and the caller must still get the call id back.

use super::call_originator::CallOriginator;
use crate::domain::call_record::{CallRecord, CallRecordStore, NewCallRecord};
use crate::domain::session::CallSessionTracker;
use crate::domain::shared::{CallSid, PhoneNumber, Result, SessionKey};
use crate::domain::voice_flow::FlowRoutes;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Record name used when the request carries none
    pub default_record_name: String,
    pub default_session_key: SessionKey,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            default_record_name: "TESTUSER".to_string(),
            default_session_key: SessionKey::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OriginateRequest {
    pub name: Option<String>,
    pub phone_number: PhoneNumber,
    pub session_key: Option<SessionKey>,
}

/// Which call to end. Resolution order: explicit call id, session binding,
/// most recent record.
#[derive(Debug, Clone, Default)]
pub struct TerminateTarget {
    pub call_id: Option<CallSid>,
    pub session_key: Option<SessionKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminatedCall {
    pub call_id: CallSid,
    pub destination: String,
}

pub struct CallDispatcher {
    originator: CallOriginator,
    records: Arc<dyn CallRecordStore>,
    sessions: Arc<CallSessionTracker>,
    routes: FlowRoutes,
    settings: DispatchSettings,
}

impl CallDispatcher {
    pub fn new(
        originator: CallOriginator,
        records: Arc<dyn CallRecordStore>,
        sessions: Arc<CallSessionTracker>,
        routes: FlowRoutes,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            originator,
            records,
            sessions,
            routes,
            settings,
        }
    }

    /// Place a call and remember it. Only provider failures are returned.
    pub async fn dispatch(&self, request: OriginateRequest) -> Result<CallSid> {
        let key = request
            .session_key
            .unwrap_or_else(|| self.settings.default_session_key.clone());
        let callback = self.routes.answer_for(Some(&key));

        let call_id = self
            .originator
            .originate(&request.phone_number, &callback)
            .await?;

        let name = request
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.settings.default_record_name.clone());
        let record = NewCallRecord::new(
            name,
            call_id.clone(),
            Some(request.phone_number.as_str().to_string()),
        );

        match self.records.append(record).await {
            Ok(stored) => debug!(id = stored.id, call_id = %call_id, "Call record stored"),
            Err(e) => {
                counter!("ivr_record_write_failures_total").increment(1);
                warn!(call_id = %call_id, error = %e, "Failed to store call record, continuing");
            }
        }

        self.sessions.bind(key, call_id.clone()).await;
        Ok(call_id)
    }

    /// Resolve and hang up a call
    pub async fn terminate(&self, target: TerminateTarget) -> Result<TerminatedCall> {
        let key = target
            .session_key
            .unwrap_or_else(|| self.settings.default_session_key.clone());

        let call_id = match target.call_id {
            Some(call_id) => call_id,
            None => self.sessions.resolve_or_latest(&key).await?,
        };

        let destination = self.originator.terminate(&call_id).await?;
        self.sessions.release(&key, &call_id).await;

        info!(call_id = %call_id, session = %key, "Call ended on request");
        Ok(TerminatedCall {
            call_id,
            destination,
        })
    }

    pub async fn latest_record(&self) -> Result<Option<CallRecord>> {
        self.records.most_recent().await
    }

    pub async fn find_record(&self, call_id: &CallSid) -> Result<Option<CallRecord>> {
        self.records.find_by_call_id(call_id).await
    }

    /// Newest records first, with the total number stored
    pub async fn recent_records(&self, limit: i64) -> Result<(Vec<CallRecord>, i64)> {
        let records = self.records.list_recent(limit).await?;
        let total = self.records.count().await?;
        Ok((records, total))
    }

    pub async fn active_bindings(&self) -> Vec<(SessionKey, CallSid)> {
        self.sessions.active_bindings().await
    }
}
