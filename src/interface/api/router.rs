//! API Router configuration

use super::call_dto::ApiResponse;
use super::call_handler::{
    get_active_sessions, get_call, get_latest_call, hangup_call, list_calls, originate_call,
};
use super::metrics_handler::{metrics_handler, track_http_requests};
use super::state::AppState;
use super::voice_handler::{answer, gather};
use super::webhook_handler::{agent_webhook, intent_detection};
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Health check
pub async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("OK"))
}

/// Build the API router
pub fn build_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    let health_routes = Router::new().route("/health", get(health_check));

    // Provider callbacks
    let voice_routes = Router::new()
        .route("/answer", get(answer).post(answer))
        .route("/gather", get(gather).post(gather));

    // Call control
    let call_routes = Router::new()
        .route("/call", get(originate_call).post(originate_call))
        .route("/hangup", post(hangup_call))
        .route("/calls", get(list_calls))
        .route("/calls/latest", get(get_latest_call))
        .route("/calls/sessions", get(get_active_sessions))
        .route("/calls/:call_id", get(get_call));

    let webhook_routes = Router::new()
        .route("/webhook", get(agent_webhook).post(agent_webhook))
        .route("/intent_detection_twilio", post(intent_detection));

    // Metrics route (separate state)
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    Router::new()
        .merge(health_routes)
        .merge(voice_routes)
        .merge(call_routes)
        .merge(webhook_routes)
        .with_state(state)
        .merge(metrics_routes)
        .layer(middleware::from_fn(track_http_requests))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
