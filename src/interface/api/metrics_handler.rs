//! Prometheus metrics handler

use crate::domain::voice_flow::VoiceFlowState;
use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install_recorder()?;

    describe_counter!(
        "http_requests_total",
        "Total number of HTTP requests received"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "ivr_calls_originated_total",
        "Outbound calls accepted by the telephony provider"
    );
    describe_counter!(
        "ivr_calls_failed_total",
        "Call control requests that failed, by stage"
    );
    describe_counter!(
        "ivr_calls_terminated_total",
        "Calls ended through the hangup endpoint"
    );
    describe_counter!(
        "ivr_record_write_failures_total",
        "Call records that could not be stored after origination"
    );
    describe_counter!(
        "ivr_flow_transitions_total",
        "Voice documents served, by resulting flow state"
    );

    Ok(handle)
}

/// HTTP metrics handler
pub async fn metrics_handler(State(prometheus_handle): State<PrometheusHandle>) -> Response {
    let metrics = prometheus_handle.render();
    (StatusCode::OK, metrics).into_response()
}

/// Middleware counting every request by matched route
pub async fn track_http_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}

/// Record HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: std::time::Duration) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_call_originated() {
    counter!("ivr_calls_originated_total").increment(1);
}

/// `stage` is `originate` or `terminate`
pub fn record_call_failed(stage: &'static str) {
    counter!("ivr_calls_failed_total", "stage" => stage).increment(1);
}

pub fn record_call_terminated() {
    counter!("ivr_calls_terminated_total").increment(1);
}

pub fn record_flow_transition(state: VoiceFlowState) {
    counter!("ivr_flow_transitions_total", "state" => state.as_str()).increment(1);
}
