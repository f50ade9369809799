//! End-to-end tests: JSON-RPC lines in, HTTP calls to a local axum
//! upstream, JSON-RPC lines out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::timeout;

use vap_core::Config;
use vap_mcp::{ChannelTransport, HttpUpstream, JsonRpcResponse, McpTransport, ProxyServer};

const TIMEOUT: Duration = Duration::from_secs(10);

/// Requests seen by the fake upstream, as `(path, body, authorization)`.
#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<(String, Value, Option<String>)>>>);

impl Seen {
    fn record(&self, path: &str, body: Value, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.0.lock().unwrap().push((path.to_string(), body, auth));
    }

    fn paths(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(p, _, _)| p.clone()).collect()
    }

    fn body(&self, path: &str) -> Value {
        self.0
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _, _)| p == path)
            .map(|(_, b, _)| b.clone())
            .unwrap_or(Value::Null)
    }
}

fn fake_upstream(seen: Seen, failures: Arc<AtomicUsize>) -> Router {
    let s1 = seen.clone();
    let s2 = seen.clone();
    let s3 = seen.clone();
    let s4 = seen;
    Router::new()
        .route(
            "/mcp/tools/list",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let seen = s1.clone();
                async move {
                    seen.record("/mcp/tools/list", body, &headers);
                    Json(json!({"tools": [{"name": "generate_image"}]}))
                }
            }),
        )
        .route(
            "/mcp/tools/call",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let seen = s2.clone();
                let failures = failures.clone();
                async move {
                    seen.record("/mcp/tools/call", body.clone(), &headers);
                    if body["name"] == "flaky" {
                        failures.fetch_add(1, Ordering::SeqCst);
                        return (
                            StatusCode::SERVICE_UNAVAILABLE,
                            Json(json!({"detail": "try later"})),
                        );
                    }
                    (
                        StatusCode::OK,
                        Json(json!({"content": [{"type": "text", "text": "balance: $10"}]})),
                    )
                }
            }),
        )
        .route(
            "/v3/tasks",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let seen = s3.clone();
                async move {
                    seen.record("/v3/tasks", body, &headers);
                    Json(json!({"task_id": "vid-42", "status": "pending"}))
                }
            }),
        )
        .route(
            "/v3/tasks/{id}",
            get(move |headers: HeaderMap, Path(id): Path<String>| {
                let seen = s4.clone();
                async move {
                    seen.record(&format!("/v3/tasks/{id}"), Value::Null, &headers);
                    if id == "missing" {
                        return (
                            StatusCode::NOT_FOUND,
                            Json(json!({"detail": "Task not found"})),
                        );
                    }
                    (
                        StatusCode::OK,
                        Json(json!({
                            "task_id": id,
                            "status": "completed",
                            "type": "video",
                            "estimated_cost": 2.4,
                            "result": {"video_url": "https://cdn.example/out.mp4"}
                        })),
                    )
                }
            }),
        )
}

struct Harness {
    client: ChannelTransport,
    seen: Seen,
    failures: Arc<AtomicUsize>,
    server: tokio::task::JoinHandle<()>,
}

impl Harness {
    async fn start(api_key: &str) -> Self {
        let seen = Seen::default();
        let failures = Arc::new(AtomicUsize::new(0));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = fake_upstream(seen.clone(), failures.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut config = Config::default();
        config.api_key = api_key.to_string();
        config.mcp_url = format!("{base}/mcp");
        config.api_base_url = base;

        let upstream = HttpUpstream::from_config(&config).unwrap();
        let proxy = ProxyServer::new(Arc::new(upstream));
        let (client, mut server_side) = ChannelTransport::pair();
        let server = tokio::spawn(async move {
            proxy.run(&mut server_side).await.unwrap();
        });

        Self {
            client,
            seen,
            failures,
            server,
        }
    }

    async fn call(&mut self, request: Value) -> JsonRpcResponse {
        self.client.send(&request.to_string()).await.unwrap();
        let line = timeout(TIMEOUT, self.client.receive())
            .await
            .expect("no response in time")
            .unwrap()
            .unwrap();
        serde_json::from_str(&line).unwrap()
    }

    async fn tool(&mut self, id: i64, name: &str, arguments: Value) -> JsonRpcResponse {
        self.call(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        }))
        .await
    }

    async fn shutdown(self) {
        drop(self.client);
        timeout(TIMEOUT, self.server).await.unwrap().unwrap();
    }
}

fn text(resp: &JsonRpcResponse) -> String {
    resp.result.as_ref().unwrap()["content"][0]["text"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn tools_list_forwarded_with_bearer() {
    let mut h = Harness::start("vap_secret").await;

    let resp = h
        .call(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .await;
    assert_eq!(resp.id, json!(1));
    assert_eq!(resp.result.unwrap()["tools"][0]["name"], "generate_image");

    let seen = h.seen.0.lock().unwrap().clone();
    assert_eq!(seen[0].0, "/mcp/tools/list");
    assert_eq!(seen[0].1, json!({}));
    assert_eq!(seen[0].2.as_deref(), Some("Bearer vap_secret"));

    h.shutdown().await;
}

#[tokio::test]
async fn no_bearer_without_key() {
    let mut h = Harness::start("").await;
    h.call(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .await;
    assert!(h.seen.0.lock().unwrap()[0].2.is_none());
    h.shutdown().await;
}

#[tokio::test]
async fn generate_video_creates_task() {
    let mut h = Harness::start("k").await;

    let resp = h
        .tool(
            2,
            "generate_video",
            json!({"prompt": "a lighthouse", "duration": 6, "generate_audio": false}),
        )
        .await;
    let text = text(&resp);
    assert!(text.contains("Task ID: vid-42"));
    assert!(text.contains("Duration: 6 seconds"));
    assert!(text.contains("Estimated Cost: $1.80"));

    let body = h.seen.body("/v3/tasks");
    assert_eq!(body["type"], "video");
    assert_eq!(body["params"]["prompt"], "a lighthouse");
    assert_eq!(body["params"]["resolution"], "720p");

    h.shutdown().await;
}

#[tokio::test]
async fn get_task_summarizes_completed_video() {
    let mut h = Harness::start("k").await;

    let resp = h.tool(3, "get_task", json!({"task_id": "vid-42"})).await;
    let text = text(&resp);
    assert!(text.starts_with("Task: vid-42\nType: video\nStatus: completed"));
    assert!(text.contains("Estimated Cost: $2.4"));
    assert!(text.contains("Video URL: https://cdn.example/out.mp4"));
    assert_eq!(h.seen.paths(), vec!["/v3/tasks/vid-42".to_string()]);

    h.shutdown().await;
}

#[tokio::test]
async fn get_task_not_found_is_tool_error() {
    let mut h = Harness::start("k").await;

    let resp = h.tool(4, "get_task", json!({"task_id": "missing"})).await;
    assert!(resp.error.is_none());
    let result = resp.result.as_ref().unwrap();
    assert_eq!(result["isError"], true);
    assert_eq!(result["content"][0]["text"], "Error: Task not found");
    assert_eq!(h.seen.paths().len(), 1);

    h.shutdown().await;
}

#[tokio::test]
async fn passthrough_tool_and_retry_exhaustion() {
    let mut h = Harness::start("k").await;

    let resp = h.tool(5, "check_balance", json!({})).await;
    assert_eq!(text(&resp), "balance: $10");
    assert_eq!(
        h.seen.body("/mcp/tools/call"),
        json!({"name": "check_balance", "arguments": {}})
    );

    let resp = h.tool(6, "flaky", json!({})).await;
    assert_eq!(h.failures.load(Ordering::SeqCst), 3);
    let err = resp.error.unwrap();
    assert_eq!(err.code, -32000);
    assert!(err.message.contains("try later"));
    assert!(err.message.contains("after 3 attempts"));

    h.shutdown().await;
}

#[tokio::test]
async fn estimate_makes_no_http_call() {
    let mut h = Harness::start("k").await;

    let resp = h
        .tool(7, "estimate_video_cost", json!({"duration": 6, "generate_audio": false}))
        .await;
    assert!(text(&resp).contains("Cost: $1.80"));
    assert!(h.seen.paths().is_empty());

    h.shutdown().await;
}
