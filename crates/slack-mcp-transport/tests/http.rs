//! End-to-end tests for the MCP router using a fake client factory.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderValue, Request, StatusCode},
    response::Response,
};
use serde_json::{Value, json};
use slack_mcp_core::{ClientFactory, Credential, FactoryError, ToolDefinition, ToolError, ToolHandler};
use slack_mcp_session::SessionRegistry;
use slack_mcp_transport::{CREDENTIAL_HEADER, SESSION_HEADER, create_mcp_router};
use tower::ServiceExt;

struct FakeClient {
    token: String,
}

#[async_trait]
impl ToolHandler for FakeClient {
    fn tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "whoami".to_string(),
            description: "Echo the bound token".to_string(),
            input_schema: json!({"type": "object"}),
        }]
    }

    async fn call_tool(&self, name: &str, _arguments: Value) -> Result<Value, ToolError> {
        match name {
            "whoami" => Ok(json!({"token": self.token})),
            "flaky" => Err(ToolError::Upstream("ratelimited".to_string())),
            "explode" => panic!("boom"),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

#[derive(Clone, Default)]
struct FakeFactory {
    built: Arc<AtomicUsize>,
}

impl ClientFactory for FakeFactory {
    type Client = FakeClient;

    fn connect(&self, credential: Credential) -> Result<FakeClient, FactoryError> {
        self.built.fetch_add(1, Ordering::SeqCst);
        Ok(FakeClient {
            token: credential.expose().to_string(),
        })
    }
}

fn setup() -> (FakeFactory, Arc<SessionRegistry<FakeFactory>>, Router) {
    let factory = FakeFactory::default();
    let registry = SessionRegistry::new(factory.clone());
    let app = create_mcp_router(Arc::clone(&registry));
    (factory, registry, app)
}

fn post(session: Option<&str>, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(session) = session {
        builder = builder.header(SESSION_HEADER, session);
    }
    if let Some(token) = token {
        builder = builder.header(CREDENTIAL_HEADER, token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn bare(method: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri("/mcp");
    if let Some(session) = session {
        builder = builder.header(SESSION_HEADER, session);
    }
    builder.body(Body::empty()).unwrap()
}

fn initialize() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {"protocolVersion": "2025-03-26", "capabilities": {}, "clientInfo": {"name": "test"}}
    })
}

fn call(id: u64, name: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": "tools/call", "params": {"name": name, "arguments": {}}})
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn open_session(app: &Router, token: &str) -> String {
    let response = tokio_test::assert_ok!(
        app.clone()
            .oneshot(post(None, Some(token), &initialize()))
            .await
    );
    assert_eq!(response.status(), StatusCode::OK);
    response
        .headers()
        .get(SESSION_HEADER)
        .expect("session header")
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_initialize_without_credential_is_unauthorized() {
    let (factory, registry, app) = setup();

    let response = app.oneshot(post(None, None, &initialize())).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(SESSION_HEADER).is_none());
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], -32000);
    assert_eq!(body["id"], Value::Null);
    assert_eq!(
        body["error"]["message"],
        "Unauthorized: Missing x-slack-bot-token header"
    );
    assert_eq!(factory.built.load(Ordering::SeqCst), 0);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_blank_credential_is_unauthorized() {
    let (_factory, registry, app) = setup();

    let response = app.oneshot(post(None, Some("   "), &initialize())).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_initialize_opens_session() {
    let (factory, registry, app) = setup();

    let response = app
        .oneshot(post(None, Some("xoxb-one"), &initialize()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SESSION_HEADER).is_some());
    let body = json_body(response).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(body["result"]["serverInfo"]["name"], "slack-mcp-gateway");
    assert_eq!(factory.built.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn test_requests_reuse_the_session_client() {
    let (factory, _registry, app) = setup();
    let session = open_session(&app, "xoxb-one").await;

    for id in 2..5 {
        let response = app
            .clone()
            .oneshot(post(Some(&session), None, &call(id, "whoami")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["id"], id);
        assert_eq!(body["result"]["isError"], false);
        assert!(
            body["result"]["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("xoxb-one")
        );
    }

    assert_eq!(factory.built.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sessions_are_isolated_by_credential() {
    let (factory, registry, app) = setup();
    let first = open_session(&app, "xoxb-one").await;
    let second = open_session(&app, "xoxb-two").await;
    assert_ne!(first, second);

    let response = app
        .oneshot(post(Some(&second), None, &call(7, "whoami")))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert!(
        body["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("xoxb-two")
    );
    assert_eq!(factory.built.load(Ordering::SeqCst), 2);
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn test_unknown_session_is_rejected() {
    let (factory, _registry, app) = setup();

    let response = app
        .oneshot(post(
            Some("00000000-0000-4000-8000-000000000000"),
            Some("xoxb-one"),
            &call(1, "whoami"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], -32000);
    assert_eq!(
        body["error"]["message"],
        "Bad Request: No valid session ID provided"
    );
    assert_eq!(factory.built.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreadable_session_header_does_not_open_session() {
    let (factory, registry, app) = setup();

    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .header(SESSION_HEADER, HeaderValue::from_bytes(b"\xffstale").unwrap())
        .header(CREDENTIAL_HEADER, "xoxb-one")
        .body(Body::from(initialize().to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(SESSION_HEADER).is_none());
    assert_eq!(json_body(response).await["error"]["code"], -32000);
    assert_eq!(factory.built.load(Ordering::SeqCst), 0);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_non_initialize_without_session_is_rejected() {
    let (factory, _registry, app) = setup();

    let response = app
        .oneshot(post(None, Some("xoxb-one"), &call(1, "whoami")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(factory.built.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reinitialize_on_session_is_invalid_request() {
    let (factory, _registry, app) = setup();
    let session = open_session(&app, "xoxb-one").await;

    let response = app
        .oneshot(post(Some(&session), Some("xoxb-one"), &initialize()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(factory.built.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_parse_error() {
    let (_factory, _registry, app) = setup();

    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header(CREDENTIAL_HEADER, "xoxb-one")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], -32700);
}

#[tokio::test]
async fn test_tools_list() {
    let (_factory, _registry, app) = setup();
    let session = open_session(&app, "xoxb-one").await;

    let response = app
        .oneshot(post(
            Some(&session),
            None,
            &json!({"jsonrpc": "2.0", "id": "list", "method": "tools/list"}),
        ))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["id"], "list");
    assert_eq!(body["result"]["tools"][0]["name"], "whoami");
    assert_eq!(body["result"]["tools"][0]["inputSchema"]["type"], "object");
}

#[tokio::test]
async fn test_unknown_method_and_tool() {
    let (_factory, _registry, app) = setup();
    let session = open_session(&app, "xoxb-one").await;

    let response = app
        .clone()
        .oneshot(post(
            Some(&session),
            None,
            &json!({"jsonrpc": "2.0", "id": 2, "method": "resources/list"}),
        ))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["error"]["code"], -32601);

    let response = app
        .oneshot(post(Some(&session), None, &call(3, "nope")))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["error"]["code"], -32602);
}

#[tokio::test]
async fn test_upstream_failure_is_tool_error_result() {
    let (_factory, registry, app) = setup();
    let session = open_session(&app, "xoxb-one").await;
    let live = registry.lookup(session.parse().unwrap()).await.unwrap();
    let mut notifications = live.transport().subscribe();

    let response = app
        .oneshot(post(Some(&session), None, &call(4, "flaky")))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["result"]["isError"], true);
    assert_eq!(body["result"]["content"][0]["text"], "ratelimited");

    let pushed = notifications.recv().await.unwrap();
    assert_eq!(pushed["method"], "notifications/message");
    assert_eq!(pushed["params"]["level"], "error");
}

#[tokio::test]
async fn test_panicking_tool_keeps_session_alive() {
    let (_factory, registry, app) = setup();
    let session = open_session(&app, "xoxb-one").await;

    let response = app
        .clone()
        .oneshot(post(Some(&session), None, &call(5, "explode")))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["error"]["code"], -32603);

    let response = app
        .oneshot(post(Some(&session), None, &call(6, "whoami")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn test_notification_is_accepted_without_body() {
    let (_factory, _registry, app) = setup();
    let session = open_session(&app, "xoxb-one").await;

    let response = app
        .oneshot(post(
            Some(&session),
            None,
            &json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_batch_returns_responses_in_order() {
    let (_factory, _registry, app) = setup();
    let session = open_session(&app, "xoxb-one").await;

    let batch = json!([
        {"jsonrpc": "2.0", "method": "notifications/initialized"},
        {"jsonrpc": "2.0", "id": 10, "method": "ping"},
        call(11, "whoami")
    ]);
    let response = app
        .oneshot(post(Some(&session), None, &batch))
        .await
        .unwrap();

    let body = json_body(response).await;
    let ids: Vec<_> = body.as_array().unwrap().iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, [json!(10), json!(11)]);
}

#[tokio::test]
async fn test_delete_terminates_session() {
    let (_factory, registry, app) = setup();
    let session = open_session(&app, "xoxb-one").await;

    let response = app
        .clone()
        .oneshot(bare("DELETE", Some(&session)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post(Some(&session), None, &call(2, "whoami")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    tokio::time::timeout(Duration::from_secs(1), async {
        while !registry.is_empty().await {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("session was not removed");

    let response = app.oneshot(bare("DELETE", Some(&session))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_without_session_is_rejected() {
    let (_factory, _registry, app) = setup();

    let response = app.clone().oneshot(bare("GET", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(bare("GET", Some("not-a-uuid"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_opens_event_stream() {
    let (_factory, _registry, app) = setup();
    let session = open_session(&app, "xoxb-one").await;

    let response = app.oneshot(bare("GET", Some(&session))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
}
