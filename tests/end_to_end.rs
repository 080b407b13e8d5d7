//! Runs the real reqwest transport against a stub Paperless API and checks the
//! gauges served on `/metrics`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower::ServiceExt;

use paperless_metrics::http_client::HttpClient;
use paperless_metrics::metrics::{LabelPolicy, PaperlessMetrics};
use paperless_metrics::paperless::PaperlessApi;
use paperless_metrics::poller::{CycleOutcome, Poller};
use paperless_metrics::server::create_router;

const TOKEN: &str = "0123456789abcdef";

/// What the stub answers on `/api/statistics/`.
#[derive(Clone)]
struct Upstream {
    statistics: Arc<std::sync::Mutex<(StatusCode, String)>>,
    tasks_body: String,
    expected_host: Option<String>,
    requests: Arc<AtomicUsize>,
}

impl Upstream {
    fn new(statistics: &str, tasks: &str) -> Self {
        Self {
            statistics: Arc::new(std::sync::Mutex::new((StatusCode::OK, statistics.to_string()))),
            tasks_body: tasks.to_string(),
            expected_host: None,
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn set_statistics(&self, status: StatusCode, body: &str) {
        *self.statistics.lock().unwrap() = (status, body.to_string());
    }
}

fn check_request(upstream: &Upstream, headers: &HeaderMap) -> Option<Response> {
    upstream.requests.fetch_add(1, Ordering::SeqCst);

    let expected_auth = format!("Token {}", TOKEN);
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if auth != Some(expected_auth.as_str()) {
        return Some((StatusCode::UNAUTHORIZED, r#"{"detail":"Invalid token."}"#).into_response());
    }

    if let Some(expected) = &upstream.expected_host {
        let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
        if host != Some(expected.as_str()) {
            return Some((StatusCode::BAD_REQUEST, "wrong host").into_response());
        }
    }

    None
}

async fn statistics(State(upstream): State<Upstream>, headers: HeaderMap) -> Response {
    if let Some(rejected) = check_request(&upstream, &headers) {
        return rejected;
    }
    let (status, body) = upstream.statistics.lock().unwrap().clone();
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn tasks(State(upstream): State<Upstream>, headers: HeaderMap) -> Response {
    if let Some(rejected) = check_request(&upstream, &headers) {
        return rejected;
    }
    (
        [(header::CONTENT_TYPE, "application/json")],
        upstream.tasks_body.clone(),
    )
        .into_response()
}

/// Start the stub on an ephemeral port and return its base URL.
async fn spawn_upstream(upstream: Upstream) -> String {
    let app = Router::new()
        .route("/api/statistics/", get(statistics))
        .route("/api/tasks/", get(tasks))
        .with_state(upstream);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn poller(base_url: &str, token: &str, host_header: &str) -> (Poller, Arc<PaperlessMetrics>) {
    poller_with_timeout(base_url, token, host_header, Duration::from_secs(2))
}

fn poller_with_timeout(
    base_url: &str,
    token: &str,
    host_header: &str,
    timeout: Duration,
) -> (Poller, Arc<PaperlessMetrics>) {
    let metrics = Arc::new(PaperlessMetrics::with_policy(LabelPolicy::Merge).unwrap());
    let client = HttpClient::builder(timeout).build().unwrap();
    let api = PaperlessApi::new(Arc::new(client), base_url, token, host_header);
    let poller = Poller::new(api, metrics.clone(), Duration::from_secs(1800));
    (poller, metrics)
}

async fn scrape(metrics: Arc<PaperlessMetrics>) -> String {
    let response = create_router(metrics)
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

const STATISTICS: &str = r#"{
    "documents_total": 3,
    "documents_inbox": 1,
    "inbox_tag": 2,
    "character_count": 1200,
    "document_file_type_counts": [
        {"mime_type": "application/pdf", "mime_type_count": 2},
        {"mime_type": "image/png", "mime_type_count": 1}
    ]
}"#;

const TASKS: &str = r#"[
    {"id": 1, "task_id": "a", "type": "file", "status": "SUCCESS", "acknowledged": true, "related_document": "1"},
    {"id": 2, "task_id": "b", "type": "file", "status": "SUCCESS", "acknowledged": true, "related_document": 2},
    {"id": 3, "task_id": "c", "type": "file", "status": "FAILURE", "acknowledged": false, "related_document": null}
]"#;

#[tokio::test]
async fn test_poll_and_scrape() {
    let upstream = Upstream::new(STATISTICS, TASKS);
    let base_url = spawn_upstream(upstream.clone()).await;
    let (mut poller, metrics) = poller(&base_url, TOKEN, "");

    assert_eq!(poller.poll_once().await, CycleOutcome::Published);
    assert_eq!(upstream.requests.load(Ordering::SeqCst), 2);

    let text = scrape(metrics).await;
    assert!(text.contains("documents_total 3\n"));
    assert!(text.contains("documents_inbox 1\n"));
    assert!(text.contains("character_count 1200\n"));
    assert!(text.contains(r#"mime_type_count{mime_type="application/pdf"} 2"#));
    assert!(text.contains(r#"mime_type_count{mime_type="image/png"} 1"#));
    assert!(text.contains(r#"file_tasks{status="SUCCESS"} 2"#));
    assert!(text.contains(r#"file_tasks{status="FAILURE"} 1"#));
}

#[tokio::test]
async fn test_trailing_slash_in_base_url() {
    let upstream = Upstream::new(STATISTICS, TASKS);
    let base_url = spawn_upstream(upstream).await;
    let (mut poller, _metrics) = poller(&format!("{}/", base_url), TOKEN, "");

    assert_eq!(poller.poll_once().await, CycleOutcome::Published);
}

#[tokio::test]
async fn test_rejected_token_skips_cycle() {
    let upstream = Upstream::new(STATISTICS, TASKS);
    let base_url = spawn_upstream(upstream.clone()).await;
    let (mut poller, metrics) = poller(&base_url, "wrong-token", "");

    assert_eq!(poller.poll_once().await, CycleOutcome::Skipped);
    assert_eq!(poller.failures(), 1);
    // The tasks endpoint is never asked once statistics failed.
    assert_eq!(upstream.requests.load(Ordering::SeqCst), 1);

    let text = scrape(metrics).await;
    assert!(text.contains("documents_total 0\n"));
}

#[tokio::test]
async fn test_host_header_override() {
    let mut upstream = Upstream::new(STATISTICS, TASKS);
    upstream.expected_host = Some("paperless.example.org".to_string());
    let base_url = spawn_upstream(upstream).await;

    let (mut without_host, _) = poller(&base_url, TOKEN, "");
    assert_eq!(without_host.poll_once().await, CycleOutcome::Skipped);

    let (mut with_host, _) = poller(&base_url, TOKEN, "paperless.example.org");
    assert_eq!(with_host.poll_once().await, CycleOutcome::Published);
}

#[tokio::test]
async fn test_summary_only_body() {
    let upstream = Upstream::new(r#"{"documents_total":3}"#, "[]");
    let base_url = spawn_upstream(upstream).await;
    let (mut poller, metrics) = poller(&base_url, TOKEN, "");

    // No character count means the cycle is not trusted.
    assert_eq!(poller.poll_once().await, CycleOutcome::Skipped);
    let text = scrape(metrics).await;
    assert!(text.contains("documents_total 0\n"));
}

#[tokio::test]
async fn test_empty_body_leaves_previous_values() {
    let upstream = Upstream::new(STATISTICS, TASKS);
    let base_url = spawn_upstream(upstream.clone()).await;
    let (mut poller, metrics) = poller(&base_url, TOKEN, "");

    assert_eq!(poller.poll_once().await, CycleOutcome::Published);
    let before = scrape(metrics.clone()).await;

    upstream.set_statistics(StatusCode::OK, "");
    assert_eq!(poller.poll_once().await, CycleOutcome::Skipped);
    assert_eq!(poller.failures(), 1);

    let after = scrape(metrics).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_unreachable_upstream_skips_cycle() {
    // Bind and drop a listener to get a port nothing is serving on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (mut poller, _metrics) = poller(&format!("http://{}", addr), TOKEN, "");
    assert_eq!(poller.poll_once().await, CycleOutcome::Skipped);
    assert_eq!(poller.failures(), 1);
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    async fn stalled() -> &'static str {
        tokio::time::sleep(Duration::from_secs(30)).await;
        "{}"
    }

    let app = Router::new().route("/api/statistics/", get(stalled));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let (mut poller, _metrics) = poller_with_timeout(
        &format!("http://{}", addr),
        TOKEN,
        "",
        Duration::from_millis(200),
    );

    let outcome = tokio::time::timeout(Duration::from_secs(5), poller.poll_once())
        .await
        .expect("poll cycle should be bounded by the client timeout");
    assert_eq!(outcome, CycleOutcome::Skipped);
    assert_eq!(poller.failures(), 1);
}
