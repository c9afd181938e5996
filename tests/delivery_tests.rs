use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use host_stats::{
    metrics::data::{CpuInfo, DynamicSnapshot, StaticSnapshot},
    web::{create_app, serve_on, AppState, ServerMessage},
    DashboardSession, SnapshotSource, WatchConfig, WebConfig,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

/// Snapshot source that counts how often each snapshot is built.
#[derive(Default)]
struct CountingSource {
    static_calls: AtomicUsize,
    dynamic_calls: AtomicUsize,
}

impl CountingSource {
    fn static_calls(&self) -> usize {
        self.static_calls.load(Ordering::SeqCst)
    }

    fn dynamic_calls(&self) -> usize {
        self.dynamic_calls.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for CountingSource {
    fn static_snapshot(&self) -> StaticSnapshot {
        self.static_calls.fetch_add(1, Ordering::SeqCst);
        StaticSnapshot {
            hostname: "test-host".to_string(),
            platform: "Linux".to_string(),
            arch: "x86_64".to_string(),
            kernel: "6.1.0".to_string(),
            cpu: CpuInfo {
                model: "Test CPU".to_string(),
                cores: 4,
            },
        }
    }

    fn dynamic_snapshot(&self) -> DynamicSnapshot {
        self.dynamic_calls.fetch_add(1, Ordering::SeqCst);
        DynamicSnapshot::new()
    }
}

/// Snapshot source whose every build panics.
struct BrokenSource;

impl SnapshotSource for BrokenSource {
    fn static_snapshot(&self) -> StaticSnapshot {
        panic!("static snapshot exploded");
    }

    fn dynamic_snapshot(&self) -> DynamicSnapshot {
        panic!("dynamic snapshot exploded");
    }
}

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn app_with(source: Arc<dyn SnapshotSource>, config: &WebConfig) -> Router {
    create_app(config, AppState::new(source))
}

async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ORIGIN, "http://dashboard.local")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn spawn_server(source: Arc<dyn SnapshotSource>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_on(
        listener,
        WebConfig::default(),
        source,
        std::future::pending::<()>(),
    ));
    addr
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let url = format!("ws://{}{}", addr, path);
    let (stream, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    stream
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a message")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send_text(client: &mut Client, text: &str) {
    client.send(Message::Text(text.to_string())).await.unwrap();
}

#[tokio::test]
async fn test_static_endpoint_is_stable() {
    let source = Arc::new(CountingSource::default());
    let config = WebConfig::default();

    let (status, _, first) = send(app_with(source.clone(), &config), Method::GET, "/api/static").await;
    assert_eq!(status, StatusCode::OK);
    let (_, _, second) = send(app_with(source.clone(), &config), Method::GET, "/api/static").await;

    let first: Value = serde_json::from_slice(&first).unwrap();
    let second: Value = serde_json::from_slice(&second).unwrap();
    assert_eq!(first["type"], "static");
    assert!(first["timestamp"].as_i64().unwrap() > 0);
    assert_eq!(first["data"]["hostname"], "test-host");
    assert_eq!(first["data"]["cpu"], json!({"model": "Test CPU", "cores": 4}));
    assert_eq!(first["data"], second["data"]);
    assert_eq!(source.static_calls(), 2);
    assert_eq!(source.dynamic_calls(), 0);
}

#[tokio::test]
async fn test_static_endpoint_failure_is_500() {
    let (status, _, body) = send(
        app_with(Arc::new(BrokenSource), &WebConfig::default()),
        Method::GET,
        "/api/static",
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "Failed to retrieve static data");
    assert!(body["timestamp"].is_i64());
}

#[tokio::test]
async fn test_health_endpoint() {
    let source = Arc::new(CountingSource::default());
    let (status, _, body) = send(
        app_with(source.clone(), &WebConfig::default()),
        Method::GET,
        "/api/health",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"], json!({"http": "running", "websocket": "running"}));
    // Health never touches the collectors
    assert_eq!(source.static_calls() + source.dynamic_calls(), 0);
}

#[tokio::test]
async fn test_preflight_is_empty_200_with_cors_headers() {
    let source: Arc<dyn SnapshotSource> = Arc::new(CountingSource::default());

    for uri in ["/api/static", "/anything/else"] {
        let (status, headers, body) =
            send(app_with(source.clone(), &WebConfig::default()), Method::OPTIONS, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    let (_, headers, _) = send(
        app_with(source.clone(), &WebConfig::default()),
        Method::GET,
        "/api/health",
    )
    .await;
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_preflight_without_cors_layer() {
    let config = WebConfig::default().with_cors(false);
    let (status, headers, body) = send(
        app_with(Arc::new(CountingSource::default()), &config),
        Method::OPTIONS,
        "/api/static",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn test_unknown_routes_are_404() {
    let source: Arc<dyn SnapshotSource> = Arc::new(CountingSource::default());
    let cases = [
        (Method::GET, "/api/unknown"),
        (Method::POST, "/api/static"),
        (Method::DELETE, "/api/health"),
        // No upgrade headers
        (Method::GET, "/"),
    ];

    for (method, uri) in cases {
        let (status, _, body) =
            send(app_with(source.clone(), &WebConfig::default()), method, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Not found");
        assert!(body["timestamp"].is_i64());
    }
}

#[tokio::test]
async fn test_initial_push_precedes_any_reply() {
    let source = Arc::new(CountingSource::default());
    let addr = spawn_server(source.clone()).await;
    let mut client = connect(addr, "/").await;

    // Ask for a pong straight away; the dynamic push must still come first
    send_text(&mut client, r#"{"type":"ping"}"#).await;

    let first = next_json(&mut client).await;
    assert_eq!(first["type"], "dynamic");
    assert!(first["data"]["timestamp"].as_i64().unwrap() > 0);
    assert!(first["data"]["cpu"]["usagePercent"].is_number());

    let second = next_json(&mut client).await;
    assert_eq!(second["type"], "pong");
    assert!(second["timestamp"].is_i64());
}

#[tokio::test]
async fn test_ping_does_no_snapshot_work() {
    let source = Arc::new(CountingSource::default());
    let addr = spawn_server(source.clone()).await;
    let mut client = connect(addr, "/ws").await;

    assert_eq!(next_json(&mut client).await["type"], "dynamic");
    assert_eq!(source.dynamic_calls(), 1);

    for _ in 0..3 {
        send_text(&mut client, r#"{"type":"ping"}"#).await;
        assert_eq!(next_json(&mut client).await["type"], "pong");
    }
    assert_eq!(source.dynamic_calls(), 1);
    assert_eq!(source.static_calls(), 0);
}

#[tokio::test]
async fn test_request_dynamic_builds_fresh_snapshot() {
    let source = Arc::new(CountingSource::default());
    let addr = spawn_server(source.clone()).await;
    let mut client = connect(addr, "/").await;

    let initial = next_json(&mut client).await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    send_text(&mut client, r#"{"type":"requestDynamic"}"#).await;
    let refreshed = next_json(&mut client).await;

    assert_eq!(refreshed["type"], "dynamic");
    assert_eq!(source.dynamic_calls(), 2);
    assert!(
        refreshed["data"]["timestamp"].as_i64().unwrap()
            > initial["data"]["timestamp"].as_i64().unwrap()
    );
}

#[tokio::test]
async fn test_bad_messages_get_no_reply_and_keep_connection() {
    let source = Arc::new(CountingSource::default());
    let addr = spawn_server(source.clone()).await;
    let mut client = connect(addr, "/").await;
    next_json(&mut client).await;

    send_text(&mut client, r#"{"type":"subscribe"}"#).await;
    send_text(&mut client, "definitely not json").await;
    send_text(&mut client, r#"{"kind":"ping"}"#).await;
    client.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    send_text(&mut client, r#"{"type":"ping"}"#).await;

    // Replies are in order, so the pong being next proves nothing else was sent
    assert_eq!(next_json(&mut client).await["type"], "pong");
    assert_eq!(source.dynamic_calls(), 1);
}

#[tokio::test]
async fn test_request_static_once_per_connection() {
    let source = Arc::new(CountingSource::default());
    let addr = spawn_server(source.clone()).await;

    let mut client = connect(addr, "/").await;
    next_json(&mut client).await;

    send_text(&mut client, r#"{"type":"requestStatic"}"#).await;
    let reply = next_json(&mut client).await;
    assert_eq!(reply["type"], "static");
    assert_eq!(reply["data"]["hostname"], "test-host");

    send_text(&mut client, r#"{"type":"requestStatic"}"#).await;
    send_text(&mut client, r#"{"type":"ping"}"#).await;
    assert_eq!(next_json(&mut client).await["type"], "pong");
    assert_eq!(source.static_calls(), 1);

    // A second connection has its own delivery state
    let mut other = connect(addr, "/").await;
    next_json(&mut other).await;
    send_text(&mut other, r#"{"type":"requestStatic"}"#).await;
    assert_eq!(next_json(&mut other).await["type"], "static");
    assert_eq!(source.static_calls(), 2);
}

#[tokio::test]
async fn test_failed_dynamic_build_sends_nothing() {
    let addr = spawn_server(Arc::new(BrokenSource)).await;
    let mut client = connect(addr, "/").await;

    send_text(&mut client, r#"{"type":"requestDynamic"}"#).await;
    send_text(&mut client, r#"{"type":"ping"}"#).await;

    // Neither the initial push nor the request produced a message
    assert_eq!(next_json(&mut client).await["type"], "pong");
}

#[tokio::test]
async fn test_static_endpoint_over_http() {
    let addr = spawn_server(Arc::new(CountingSource::default())).await;
    let config = WatchConfig::new(format!("http://{}", addr));

    let data = host_stats::client::fetch_static(&reqwest::Client::new(), &config)
        .await
        .unwrap();
    assert_eq!(data.hostname, "test-host");
    assert_eq!(data.kernel, "6.1.0");
}

#[tokio::test]
async fn test_watch_client_merges_both_halves() {
    let addr = spawn_server(Arc::new(CountingSource::default())).await;
    let config = WatchConfig::new(format!("http://{}", addr))
        .with_interval(Duration::from_millis(20))
        .with_reconnect_delay(Duration::from_millis(50));

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<DashboardSession>();
    let handle = tokio::spawn(host_stats::watch(config, move |session| {
        let _ = tx.send(session.clone());
    }));

    let merged = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let session = rx.recv().await.expect("watch stopped");
            if let Some(view) = session.combined() {
                return view;
            }
        }
    })
    .await
    .expect("no combined view");
    handle.abort();

    assert_eq!(merged["hostname"], "test-host");
    assert_eq!(merged["cpu"]["model"], "Test CPU");
    assert!(merged["cpu"]["usagePercent"].is_number());
    assert!(merged["timestamp"].is_i64());
}

#[tokio::test]
async fn test_server_messages_parse_on_the_client() {
    let source = Arc::new(CountingSource::default());
    let addr = spawn_server(source).await;
    let mut client = connect(addr, "/").await;

    let frame = next_json(&mut client).await;
    let message: ServerMessage = serde_json::from_value(frame).unwrap();
    assert!(matches!(message, ServerMessage::Dynamic { .. }));
}
