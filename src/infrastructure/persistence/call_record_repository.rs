//! PostgreSQL implementation of the call record store

use crate::domain::call_record::{CallRecord, CallRecordStore, NewCallRecord};
use crate::domain::shared::{CallSid, DomainError, Result};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::{debug, error};

#[derive(FromRow)]
struct CallRecordRow {
    id: i64,
    name: String,
    call_id: String,
    phone_number: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<CallRecordRow> for CallRecord {
    type Error = DomainError;

    fn try_from(r: CallRecordRow) -> Result<Self> {
        Ok(CallRecord {
            id: r.id,
            name: r.name,
            call_id: CallSid::parse(r.call_id)?,
            phone_number: r.phone_number,
            created_at: r.created_at,
        })
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return DomainError::Persistence(format!("{}: duplicate call id", context));
        }
    }
    error!("{}: {}", context, e);
    DomainError::Persistence(format!("{}: {}", context, e))
}

pub struct PgCallRecordRepository {
    pool: PgPool,
}

impl PgCallRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallRecordStore for PgCallRecordRepository {
    async fn append(&self, record: NewCallRecord) -> Result<CallRecord> {
        debug!("Appending call record for call_id: {}", record.call_id);

        let row = sqlx::query_as::<_, CallRecordRow>(
            r#"
            INSERT INTO call_records (name, call_id, phone_number)
            VALUES ($1, $2, $3)
            RETURNING id, name, call_id, phone_number, created_at
            "#,
        )
        .bind(&record.name)
        .bind(record.call_id.as_str())
        .bind(&record.phone_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to append call record", e))?;

        debug!("Call record appended: {}", row.id);
        CallRecord::try_from(row)
    }

    async fn most_recent(&self) -> Result<Option<CallRecord>> {
        let row = sqlx::query_as::<_, CallRecordRow>(
            r#"
            SELECT id, name, call_id, phone_number, created_at
            FROM call_records
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get most recent call record", e))?;

        row.map(CallRecord::try_from).transpose()
    }

    async fn find_by_call_id(&self, call_id: &CallSid) -> Result<Option<CallRecord>> {
        debug!("Getting call record by call_id: {}", call_id);

        let row = sqlx::query_as::<_, CallRecordRow>(
            r#"
            SELECT id, name, call_id, phone_number, created_at
            FROM call_records
            WHERE call_id = $1
            "#,
        )
        .bind(call_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get call record by call_id", e))?;

        row.map(CallRecord::try_from).transpose()
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<CallRecord>> {
        let rows = sqlx::query_as::<_, CallRecordRow>(
            r#"
            SELECT id, name, call_id, phone_number, created_at
            FROM call_records
            ORDER BY id DESC
            LIMIT $1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list call records", e))?;

        rows.into_iter().map(CallRecord::try_from).collect()
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM call_records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count call records", e))
    }
}
