//! In-memory call record store
//!
//! Used when no database is configured and in tests. Appends are serialized
//! by a mutex, which is what guarantees call id uniqueness.

use crate::domain::call_record::{CallRecord, CallRecordStore, NewCallRecord};
use crate::domain::shared::{CallSid, DomainError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Default)]
struct MemoryState {
    records: Vec<CallRecord>,
    next_id: i64,
}

#[derive(Default)]
pub struct MemoryCallRecordStore {
    state: Mutex<MemoryState>,
}

impl MemoryCallRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| DomainError::Persistence("call record store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CallRecordStore for MemoryCallRecordStore {
    async fn append(&self, record: NewCallRecord) -> Result<CallRecord> {
        let mut state = self.lock()?;

        if state.records.iter().any(|r| r.call_id == record.call_id) {
            return Err(DomainError::Persistence(format!(
                "duplicate call id: {}",
                record.call_id
            )));
        }

        state.next_id += 1;
        let stored = CallRecord {
            id: state.next_id,
            name: record.name,
            call_id: record.call_id,
            phone_number: record.phone_number,
            created_at: Utc::now(),
        };
        state.records.push(stored.clone());

        debug!(id = stored.id, call_id = %stored.call_id, "Call record appended");
        Ok(stored)
    }

    async fn most_recent(&self) -> Result<Option<CallRecord>> {
        Ok(self.lock()?.records.last().cloned())
    }

    async fn find_by_call_id(&self, call_id: &CallSid) -> Result<Option<CallRecord>> {
        Ok(self
            .lock()?
            .records
            .iter()
            .find(|r| &r.call_id == call_id)
            .cloned())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<CallRecord>> {
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(self
            .lock()?
            .records
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.lock()?.records.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(name: &str, call_id: &str) -> NewCallRecord {
        NewCallRecord::new(name, CallSid::parse(call_id).unwrap(), None)
    }

    #[tokio::test]
    async fn test_append_assigns_monotonic_ids() {
        let store = MemoryCallRecordStore::new();
        let first = store.append(new_record("Ada", "CA1")).await.unwrap();
        let second = store.append(new_record("Grace", "CA2")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_call_id_rejected() {
        let store = MemoryCallRecordStore::new();
        store.append(new_record("Ada", "CA1")).await.unwrap();

        let result = store.append(new_record("Other", "CA1")).await;
        assert!(matches!(result, Err(DomainError::Persistence(_))));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_same_call_id() {
        let store = std::sync::Arc::new(MemoryCallRecordStore::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .append(new_record(&format!("Caller {}", i), "CAshared"))
                        .await
                })
            })
            .collect();

        let mut stored = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => stored += 1,
                Err(e) => assert!(matches!(e, DomainError::Persistence(_))),
            }
        }

        assert_eq!(stored, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_distinct_ids() {
        let store = std::sync::Arc::new(MemoryCallRecordStore::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.append(new_record("Ada", &format!("CA{}", i))).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=16).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_most_recent_and_find() {
        let store = MemoryCallRecordStore::new();
        assert!(store.most_recent().await.unwrap().is_none());

        store.append(new_record("Ada", "CA1")).await.unwrap();
        store.append(new_record("Grace", "CA2")).await.unwrap();

        assert_eq!(store.most_recent().await.unwrap().unwrap().name, "Grace");
        let found = store
            .find_by_call_id(&CallSid::parse("CA1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "Ada");
        assert!(store
            .find_by_call_id(&CallSid::parse("CA9").unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let store = MemoryCallRecordStore::new();
        for i in 1..=3 {
            store
                .append(new_record("TESTUSER", &format!("CA{}", i)))
                .await
                .unwrap();
        }

        let recent = store.list_recent(2).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["CA3", "CA2"]);
        assert!(store.list_recent(-1).await.unwrap().is_empty());
    }
}
