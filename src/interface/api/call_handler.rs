//! Call control API handlers

use super::call_dto::{
    ApiResponse, CallParams, CallRecordListResponse, CallRecordResponse, HangupParams,
    ListCallsQuery, SessionBindingResponse,
};
use super::metrics_handler::{record_call_failed, record_call_originated, record_call_terminated};
use super::state::AppState;
use crate::application::{OriginateRequest, TerminateTarget};
use crate::domain::shared::{CallSid, DomainError, PhoneNumber, SessionKey};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, warn};

const MAX_LIST_LIMIT: i64 = 1000;

/// HTTP status for a failed call control request
fn status_for(e: &DomainError) -> StatusCode {
    match e {
        DomainError::MalformedInput(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Provider(_) => StatusCode::BAD_GATEWAY,
        DomainError::Persistence(_) | DomainError::Configuration(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn failure(e: &DomainError) -> Response {
    (status_for(e), e.to_string()).into_response()
}

fn session_key(raw: Option<&str>) -> Result<Option<SessionKey>, DomainError> {
    raw.filter(|s| !s.is_empty()).map(SessionKey::parse).transpose()
}

fn originate_request(params: CallParams, country_code: &str) -> Result<OriginateRequest, DomainError> {
    let raw = params
        .phone_number
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| DomainError::MalformedInput("phone_number is required".to_string()))?;

    Ok(OriginateRequest {
        phone_number: PhoneNumber::parse(raw, country_code)?,
        session_key: session_key(params.session.as_deref())?,
        name: params.name,
    })
}

fn hangup_target(params: &HangupParams) -> Result<TerminateTarget, DomainError> {
    let call_id = params
        .call_sid
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(CallSid::parse)
        .transpose()?;

    Ok(TerminateTarget {
        call_id,
        session_key: session_key(params.session.as_deref())?,
    })
}

/// Place an outbound call, answering with the provider call id
pub async fn originate_call(
    State(state): State<AppState>,
    Query(query): Query<CallParams>,
    body: Option<Json<CallParams>>,
) -> Response {
    let params = query.merge(body.map(|Json(b)| b));
    info!(name = ?params.name, session = ?params.session, "API: Originating call");

    let request = match originate_request(params, &state.default_country_code) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "API: Rejected call request");
            record_call_failed("originate");
            return failure(&e);
        }
    };

    match state.dispatcher.dispatch(request).await {
        Ok(call_id) => {
            record_call_originated();
            info!(call_id = %call_id, "API: Call started");
            (StatusCode::OK, call_id.to_string()).into_response()
        }
        Err(e) => {
            error!(error = %e, "API: Failed to originate call");
            record_call_failed("originate");
            failure(&e)
        }
    }
}

/// End a call by explicit id, session binding or most recent record
pub async fn hangup_call(
    State(state): State<AppState>,
    Query(params): Query<HangupParams>,
) -> Response {
    info!(call_sid = ?params.call_sid, session = ?params.session, "API: Hanging up call");

    let result = match hangup_target(&params) {
        Ok(target) => state.dispatcher.terminate(target).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(ended) => {
            record_call_terminated();
            (
                StatusCode::OK,
                format!("Call {} to {} ended", ended.call_id, ended.destination),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "API: Failed to hang up call");
            record_call_failed("terminate");
            failure(&e)
        }
    }
}

/// Most recently stored call record
pub async fn get_latest_call(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<CallRecordResponse>>) {
    info!("API: Getting latest call record");

    match state.dispatcher.latest_record().await {
        Ok(Some(record)) => (StatusCode::OK, Json(ApiResponse::success(record.into()))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("No calls recorded".to_string())),
        ),
        Err(e) => {
            error!("API: Failed to get latest call record: {}", e);
            (status_for(&e), Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// Call record by provider call id
pub async fn get_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> (StatusCode, Json<ApiResponse<CallRecordResponse>>) {
    info!("API: Getting call record for call_id: {}", call_id);

    let call_id = match CallSid::parse(call_id) {
        Ok(call_id) => call_id,
        Err(e) => return (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    };

    match state.dispatcher.find_record(&call_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(ApiResponse::success(record.into()))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Call {} not found", call_id))),
        ),
        Err(e) => {
            error!("API: Failed to get call record: {}", e);
            (status_for(&e), Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// List call records, newest first
pub async fn list_calls(
    State(state): State<AppState>,
    Query(query): Query<ListCallsQuery>,
) -> (StatusCode, Json<ApiResponse<CallRecordListResponse>>) {
    info!("API: Listing call records (limit: {})", query.limit);

    if !(1..=MAX_LIST_LIMIT).contains(&query.limit) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!(
                "limit must be between 1 and {}",
                MAX_LIST_LIMIT
            ))),
        );
    }

    match state.dispatcher.recent_records(query.limit).await {
        Ok((records, total)) => {
            let response = CallRecordListResponse {
                calls: records.into_iter().map(|r| r.into()).collect(),
                total,
                limit: query.limit,
            };
            (StatusCode::OK, Json(ApiResponse::success(response)))
        }
        Err(e) => {
            error!("API: Failed to list call records: {}", e);
            (status_for(&e), Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// Session slots and the calls they point at
pub async fn get_active_sessions(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<SessionBindingResponse>>> {
    let bindings = state
        .dispatcher
        .active_bindings()
        .await
        .into_iter()
        .map(SessionBindingResponse::from)
        .collect();

    Json(ApiResponse::success(bindings))
}
