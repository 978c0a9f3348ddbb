//! Call API DTOs

use crate::domain::call_record::CallRecord;
use crate::domain::shared::{CallSid, SessionKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Call record response
#[derive(Debug, Serialize, Deserialize)]
pub struct CallRecordResponse {
    pub id: i64,
    pub name: String,
    pub call_id: String,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CallRecord> for CallRecordResponse {
    fn from(record: CallRecord) -> Self {
        CallRecordResponse {
            id: record.id,
            name: record.name,
            call_id: record.call_id.to_string(),
            phone_number: record.phone_number,
            created_at: record.created_at,
        }
    }
}

/// Call record list response
#[derive(Debug, Serialize, Deserialize)]
pub struct CallRecordListResponse {
    pub calls: Vec<CallRecordResponse>,
    pub total: i64,
    pub limit: i64,
}

/// Query parameters for listing call records
#[derive(Debug, Deserialize)]
pub struct ListCallsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// Session slot currently pointing at a call
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionBindingResponse {
    pub session: String,
    pub call_id: String,
}

impl From<(SessionKey, CallSid)> for SessionBindingResponse {
    fn from((session, call_id): (SessionKey, CallSid)) -> Self {
        SessionBindingResponse {
            session: session.to_string(),
            call_id: call_id.to_string(),
        }
    }
}

/// Parameters of `/call`, accepted in the query string and/or a JSON body
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallParams {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub session: Option<String>,
}

impl CallParams {
    /// Body fields win over query fields
    pub fn merge(self, body: Option<CallParams>) -> CallParams {
        match body {
            Some(body) => CallParams {
                name: body.name.or(self.name),
                phone_number: body.phone_number.or(self.phone_number),
                session: body.session.or(self.session),
            },
            None => self,
        }
    }
}

/// Parameters of `/hangup`
#[derive(Debug, Default, Deserialize)]
pub struct HangupParams {
    pub call_sid: Option<String>,
    pub session: Option<String>,
}

/// Generic API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}
