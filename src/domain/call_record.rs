//! Call record domain model
//!
//! A call record maps the person we dialed to the provider-assigned call id.
//! Records form an append-only log: they are written once when a call is
//! originated and never updated or deleted afterwards.

use super::shared::{CallSid, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted call record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Surrogate id, monotonically assigned by the store
    pub id: i64,

    /// Display name of the callee
    pub name: String,

    /// Provider call id, unique across all records
    pub call_id: CallSid,

    /// Destination number, absent for flows that did not supply one
    pub phone_number: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Input for [`CallRecordStore::append`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCallRecord {
    pub name: String,
    pub call_id: CallSid,
    pub phone_number: Option<String>,
}

impl NewCallRecord {
    /// Width of the `name` column; longer names are truncated
    pub const MAX_NAME_CHARS: usize = 80;

    pub fn new(name: impl Into<String>, call_id: CallSid, phone_number: Option<String>) -> Self {
        let mut name = name.into();
        if let Some((cut, _)) = name.char_indices().nth(Self::MAX_NAME_CHARS) {
            name.truncate(cut);
        }

        Self {
            name,
            call_id,
            phone_number,
        }
    }
}

/// Call record store
///
/// `append` must reject a duplicate `call_id` with
/// [`DomainError::Persistence`](super::shared::DomainError::Persistence).
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CallRecordStore: Send + Sync {
    /// Append a new record
    async fn append(&self, record: NewCallRecord) -> Result<CallRecord>;

    /// The most recently appended record
    async fn most_recent(&self) -> Result<Option<CallRecord>>;

    /// Look a record up by provider call id
    async fn find_by_call_id(&self, call_id: &CallSid) -> Result<Option<CallRecord>>;

    /// Newest records first
    async fn list_recent(&self, limit: i64) -> Result<Vec<CallRecord>>;

    /// Total number of records
    async fn count(&self) -> Result<i64>;
}
