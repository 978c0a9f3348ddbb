//! Active call session tracking
//!
//! Binds a session key to the call that is currently "active" for it, so a
//! later hangup or lookup can find the call without the requester knowing the
//! call id. Each key holds a single slot: a second bind replaces the first
//! (last writer wins). History lives in the [`CallRecordStore`] only.
//!
//! When nothing is bound, [`CallSessionTracker::resolve_latest`] falls back to
//! the most recent call record. This relaxation is kept on purpose for
//! deployments that only ever run one call at a time.

use super::call_record::CallRecordStore;
use super::shared::{CallSid, DomainError, Result, SessionKey};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub struct CallSessionTracker {
    bindings: RwLock<HashMap<SessionKey, CallSid>>,
    records: Arc<dyn CallRecordStore>,
}

impl CallSessionTracker {
    pub fn new(records: Arc<dyn CallRecordStore>) -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            records,
        }
    }

    /// Bind `key` to `call_id`, returning the call it replaced
    pub async fn bind(&self, key: SessionKey, call_id: CallSid) -> Option<CallSid> {
        let mut bindings = self.bindings.write().await;
        let previous = bindings.insert(key.clone(), call_id.clone());

        match &previous {
            Some(old) if old != &call_id => {
                info!(session = %key, call_id = %call_id, replaced = %old, "Session rebound")
            }
            _ => info!(session = %key, call_id = %call_id, "Session bound"),
        }

        previous
    }

    /// Call currently bound to `key`
    pub async fn resolve(&self, key: &SessionKey) -> Result<CallSid> {
        let bindings = self.bindings.read().await;
        bindings
            .get(key)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("no call bound to session {}", key)))
    }

    /// Call id of the most recent call record
    pub async fn resolve_latest(&self) -> Result<CallSid> {
        match self.records.most_recent().await? {
            Some(record) => {
                debug!(call_id = %record.call_id, "Resolved latest call from records");
                Ok(record.call_id)
            }
            None => Err(DomainError::NotFound("no call records".to_string())),
        }
    }

    /// Two-tier lookup: the session binding first, then the latest record
    pub async fn resolve_or_latest(&self, key: &SessionKey) -> Result<CallSid> {
        match self.resolve(key).await {
            Ok(call_id) => Ok(call_id),
            Err(DomainError::NotFound(_)) => {
                debug!(session = %key, "No session binding, falling back to latest record");
                self.resolve_latest().await
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the binding for `key` if it still points at `call_id`
    pub async fn release(&self, key: &SessionKey, call_id: &CallSid) -> bool {
        let mut bindings = self.bindings.write().await;
        if bindings.get(key) == Some(call_id) {
            bindings.remove(key);
            info!(session = %key, call_id = %call_id, "Session released");
            true
        } else {
            false
        }
    }

    /// Snapshot of every live binding
    pub async fn active_bindings(&self) -> Vec<(SessionKey, CallSid)> {
        let bindings = self.bindings.read().await;
        let mut all: Vec<_> = bindings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        all.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        all
    }
}
