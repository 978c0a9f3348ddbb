//! Voice flow and call control API integration tests
//!
//! Runs the full router against the in-memory store and the dry-run
//! provider, so no database or Twilio account is needed.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use callflow::application::{CallDispatcher, CallOriginator, DispatchSettings, IntentBridge, IntentReplies};
use callflow::domain::call_record::CallRecordStore;
use callflow::domain::intent::{IntentCallRequest, OriginationClient};
use callflow::domain::session::CallSessionTracker;
use callflow::domain::voice_flow::{FlowRoutes, FlowScript, VoiceFlowEngine};
use callflow::infrastructure::persistence::MemoryCallRecordStore;
use callflow::infrastructure::telephony::DryRunProvider;
use callflow::interface::api::{build_router, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt; // For `oneshot`

const BASE_URL: &str = "https://ivr.example.com";

/// Origination endpoint stand-in answering with a fixed status
struct StubOriginationClient {
    status: u16,
    requests: Mutex<Vec<IntentCallRequest>>,
}

#[async_trait]
impl OriginationClient for StubOriginationClient {
    async fn request_call(&self, request: &IntentCallRequest) -> callflow::Result<u16> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.status)
    }
}

struct TestApp {
    router: Router,
    records: Arc<MemoryCallRecordStore>,
    origination: Arc<StubOriginationClient>,
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn get(&self, uri: &str) -> (StatusCode, String) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn post(&self, uri: &str) -> (StatusCode, String) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn post_form(&self, uri: &str, form: &str) -> (StatusCode, String) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, String) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

fn setup_api_test(origination_status: u16) -> TestApp {
    let records = Arc::new(MemoryCallRecordStore::new());
    let store: Arc<dyn CallRecordStore> = records.clone();
    let sessions = Arc::new(CallSessionTracker::new(store.clone()));
    let routes = FlowRoutes::under(BASE_URL);

    let engine = Arc::new(VoiceFlowEngine::new(
        FlowScript::default(),
        routes.clone(),
        store.clone(),
        sessions.clone(),
    ));
    let dispatcher = Arc::new(CallDispatcher::new(
        CallOriginator::new(Arc::new(DryRunProvider::new())),
        store,
        sessions,
        routes,
        DispatchSettings::default(),
    ));

    let origination = Arc::new(StubOriginationClient {
        status: origination_status,
        requests: Mutex::new(Vec::new()),
    });
    let intent_bridge = Arc::new(IntentBridge::new(
        origination.clone(),
        IntentReplies::default(),
    ));

    let state = AppState {
        engine,
        dispatcher,
        intent_bridge,
        default_country_code: "+1".to_string(),
    };

    // Local recorder handle, nothing installed globally
    let prometheus_handle = PrometheusBuilder::new().build_recorder().handle();

    TestApp {
        router: build_router(state, prometheus_handle),
        records,
        origination,
    }
}

#[tokio::test]
async fn test_originate_answer_gather_hangup() {
    let app = setup_api_test(200);

    let (status, call_id) = app.post("/call?phone_number=%2B15551234567").await;
    assert_eq!(status, StatusCode::OK);
    assert!(call_id.starts_with("CA"));

    // Record stored with the default name
    let (status, body) = app.get("/calls/latest").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["name"], "TESTUSER");
    assert_eq!(json["data"]["call_id"], call_id.as_str());
    assert_eq!(json["data"]["phone_number"], "+15551234567");

    // Provider answers on the callback URL we handed out
    let (status, xml) = app
        .post_form(
            "/answer?session=active",
            &format!("CallSid={}&From=%2B12707177822&To=%2B15551234567", call_id),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#));
    assert!(xml.contains("Hello TESTUSER, thank you for taking our call."));
    assert!(xml.contains(r#"action="https://ivr.example.com/gather?session=active""#));
    assert!(xml.contains("For sales, press 1."));

    let (status, xml) = app
        .post_form(
            "/gather?session=active",
            &format!("CallSid={}&Digits=2", call_id),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains("You need support. We will help!"));
    assert!(!xml.contains("<Redirect"));

    let (status, body) = app.post("/hangup").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&call_id));

    // The call is already over
    let (status, _) = app.post(&format!("/hangup?call_sid={}", call_id)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_answer_with_empty_store_uses_default_name() {
    let app = setup_api_test(200);

    let (status, xml) = app.get("/answer").await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains(r#"<Say voice="alice">Hello Jaya Prakash, thank you for taking our call.</Say>"#));
    assert!(xml.contains(
        r#"<Gather numDigits="1" action="https://ivr.example.com/gather" method="POST" timeout="5">"#
    ));
    assert!(xml.ends_with(
        r#"<Redirect method="POST">https://ivr.example.com/answer</Redirect></Response>"#
    ));
}

#[tokio::test]
async fn test_answer_is_served_as_xml() {
    let app = setup_api_test(200);

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/answer").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/xml"
    );
}

#[tokio::test]
async fn test_gather_branches() {
    let app = setup_api_test(200);

    let (_, xml) = app.get("/gather?Digits=1").await;
    assert!(xml.contains("You selected sales. Good for you!"));
    assert!(!xml.contains("<Redirect"));

    let (_, xml) = app.post_form("/gather", "Digits=3").await;
    assert!(xml.contains("Goodbye!"));
    assert!(!xml.contains("<Redirect"));

    let (_, xml) = app.post_form("/gather", "Digits=7").await;
    assert!(xml.contains("Sorry, I don&apos;t understand that choice."));
    assert!(xml.contains(r#"<Redirect method="POST">https://ivr.example.com/answer</Redirect>"#));

    let (_, xml) = app.post_form("/gather", "Digits=12").await;
    assert!(xml.contains("understand that choice"));

    // Timed out gather: straight back to the menu
    let (_, xml) = app.post_form("/gather", "Digits=").await;
    assert!(!xml.contains("<Say"));
    assert!(xml.contains("<Redirect"));
}

#[tokio::test]
async fn test_gather_is_idempotent() {
    let app = setup_api_test(200);

    let (_, first) = app.post_form("/gather", "Digits=1").await;
    let (_, second) = app.post_form("/gather", "Digits=1").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_call_with_json_body_and_session() {
    let app = setup_api_test(200);

    let (status, call_id) = app
        .post_json(
            "/call",
            json!({"name": "Ada", "phone_number": "(555) 123-4567", "session": "desk-1"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&format!("/calls/{}", call_id)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["data"]["name"], "Ada");
    assert_eq!(json["data"]["phone_number"], "+15551234567");

    let (_, body) = app.get("/calls/sessions").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["data"][0]["session"], "desk-1");
    assert_eq!(json["data"][0]["call_id"], call_id.as_str());

    // No CallSid on the callback: the session binding finds the record
    let (_, xml) = app.get("/answer?session=desk-1").await;
    assert!(xml.contains("Hello Ada,"));
    assert!(xml.contains("gather?session=desk-1"));

    let (status, _) = app.post("/hangup?session=desk-1").await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/calls/sessions").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["data"], json!([]));
}

#[tokio::test]
async fn test_call_rejects_bad_input() {
    let app = setup_api_test(200);

    let (status, _) = app.post("/call").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/call?phone_number=12345").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .get("/call?phone_number=5551234567&session=not%20valid")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.records.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_hangup_with_nothing_to_end() {
    let app = setup_api_test(200);

    let (status, _) = app.post("/hangup").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_call_record() {
    let app = setup_api_test(200);

    let (status, body) = app.get("/calls/CAmissing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], false);

    let (status, _) = app.get("/calls/latest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_forwards_call_request() {
    let app = setup_api_test(200);

    let payload = json!({
        "queryResult": {
            "intent": {"displayName": "make.call"},
            "parameters": {"person": {"name": "Ada"}, "phone-number": "8074286551"}
        }
    });
    let (status, body) = app.post_json("/webhook", payload).await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["fulfillmentText"], IntentReplies::default().success_text);

    let requests = app.origination.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].name.as_deref(), Some("Ada"));
    assert_eq!(requests[0].phone_number.as_deref(), Some("8074286551"));
}

#[tokio::test]
async fn test_webhook_failure_replies() {
    let app = setup_api_test(502);

    // No phone number: nothing forwarded
    let (_, body) = app
        .post_json("/webhook", json!({"queryResult": {"parameters": {"name": "Ada"}}}))
        .await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["fulfillmentText"], IntentReplies::default().failure_text);
    assert!(app.origination.requests.lock().unwrap().is_empty());

    // Endpoint refuses
    let (_, body) = app
        .post_json(
            "/webhook",
            json!({"queryResult": {"parameters": {"phone-number": "8074286551"}}}),
        )
        .await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["fulfillmentText"], IntentReplies::default().failure_text);
    assert_eq!(app.origination.requests.lock().unwrap().len(), 1);

    // Not JSON at all
    let (status, body) = app.post_form("/webhook", "garbage").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("fulfillmentText"));
}

#[tokio::test]
async fn test_operational_endpoints() {
    let app = setup_api_test(200);

    let (status, body) = app.post("/intent_detection_twilio").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "200");

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);

    let (status, _) = app.get("/metrics").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_hangup_rejects_path_like_call_id() {
    let app = setup_api_test(200);
    let (_, call_id) = app.post("/call?phone_number=%2B15551234567").await;

    for raw in ["..%2Fx", "..%2FIncomingPhoneNumbers%2FPN999", "CA1.json"] {
        let (status, _) = app.post(&format!("/hangup?call_sid={}", raw)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "call_sid={}", raw);
    }

    // The live call was left alone
    let (status, body) = app.post(&format!("/hangup?call_sid={}", call_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&call_id));
}

#[tokio::test]
async fn test_list_calls_newest_first() {
    let app = setup_api_test(200);

    let (_, body) = app.get("/calls").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["data"]["total"], 0);
    assert_eq!(json["data"]["limit"], 100);

    let mut call_ids = Vec::new();
    for name in ["Ada", "Grace", "Alan"] {
        let (_, call_id) = app
            .post(&format!("/call?name={}&phone_number=%2B15551234567", name))
            .await;
        call_ids.push(call_id);
    }

    let (status, body) = app.get("/calls?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["data"]["total"], 3);
    let calls = json["data"]["calls"].as_array().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0]["name"], "Alan");
    assert_eq!(calls[0]["call_id"], call_ids[2].as_str());
    assert_eq!(calls[1]["name"], "Grace");

    let (status, _) = app.get("/calls?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_long_name_is_recorded_truncated() {
    let app = setup_api_test(200);

    let long_name = "N".repeat(200);
    let (status, _) = app
        .post(&format!("/call?name={}&phone_number=%2B15551234567", long_name))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/calls/latest").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["data"]["name"], "N".repeat(80));
}
