use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};

use retone_ai::{ChatMessage, GenerationError, GenerationOptions, Generator};
use retone_infra::jobs::{RetryPolicy, SchedulerConfig};
use retone_infra::{Coordinator, CoordinatorConfig, InMemoryResultStore};

/// Numbered replies, optionally slow or always failing.
struct TestGenerator {
    calls: AtomicU32,
    delay: Duration,
    fail: bool,
}

impl TestGenerator {
    fn ok() -> Self {
        Self {
            calls: AtomicU32::new(0),
            delay: Duration::ZERO,
            fail: false,
        }
    }
}

#[async_trait]
impl Generator for TestGenerator {
    fn name(&self) -> &str {
        "test"
    }

    async fn generate(
        &self,
        _messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(GenerationError::from_status(500, "model exploded"));
        }
        Ok(json!({ "rewritten_text": format!("Hey world #{n}") }).to_string())
    }
}

struct TestServer {
    base_url: String,
    coordinator: Arc<Coordinator>,
    generator: Arc<TestGenerator>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(generator: TestGenerator, config: CoordinatorConfig) -> Self {
        let generator = Arc::new(generator);
        let coordinator = Arc::new(Coordinator::open(
            config,
            InMemoryResultStore::arc(),
            generator.clone(),
        ));

        // Same router as prod, bound to an ephemeral port.
        let app = retone_api::app::build_app(coordinator.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            coordinator,
            generator,
            handle,
        }
    }

    async fn start() -> Self {
        Self::spawn(TestGenerator::ok(), CoordinatorConfig::default()).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = reqwest::Client::new()
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let srv = TestServer::start().await;

    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn second_identical_request_is_served_from_cache() {
    let srv = TestServer::start().await;
    let request = json!({ "text": "Hello world", "tones": ["casual"] });

    let (status, first) = srv.post("/api/tone", request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["result"], "Hey world #1");
    assert_eq!(first["attemptNumber"], 1);
    assert_eq!(first["totalAttempts"], 1);
    assert_eq!(first["hasMultipleAttempts"], false);
    assert_eq!(first["fromCache"], false);
    assert_eq!(first["cacheKey"], "Hello world:casual");

    let (status, second) = srv.post("/api/tone", request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["fromCache"], true);
    assert_eq!(second["result"], first["result"]);
    assert_eq!(srv.generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn try_again_grows_the_version_history() {
    let srv = TestServer::start().await;

    srv.post("/api/tone", json!({ "text": "Hello world", "tones": ["concise", "casual"] }))
        .await;
    let (status, again) = srv
        .post(
            "/api/tone",
            json!({ "text": "Hello world", "tones": ["casual", "concise"], "tryAgain": true }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["result"], "Hey world #2");
    assert_eq!(again["totalAttempts"], 2);
    assert_eq!(again["attemptNumber"], 2);
    assert_eq!(again["hasMultipleAttempts"], true);

    let (status, view) = srv
        .post(
            "/api/tone/versions",
            json!({ "text": "Hello world", "tones": ["concise", "casual"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["versions"], json!(["Hey world #2", "Hey world #1"]));
    assert_eq!(view["total"], 2);
    assert_eq!(view["hasVersions"], true);
    assert_eq!(view["cacheKey"], "Hello world:casual-concise");
}

#[tokio::test]
async fn invalid_input_is_a_400() {
    let srv = TestServer::start().await;

    for body in [
        json!({ "text": "Hello", "tones": ["sarcastic"] }),
        json!({ "text": "Hello", "tones": [] }),
        json!({ "text": "Hello", "tones": ["casual", "concise", "expanded", "center"] }),
        json!({ "text": "   ", "tones": ["casual"] }),
        json!({ "text": "x".repeat(1001), "tones": ["casual"] }),
    ] {
        let (status, error) = srv.post("/api/tone", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "validation_error");
    }

    let (status, error) = srv.post("/api/tone", json!({ "tones": ["casual"] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "invalid_body");

    assert_eq!(srv.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn generation_failure_is_a_502() {
    let config = CoordinatorConfig {
        scheduler: SchedulerConfig::default()
            .with_retry_policy(RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(10),
            }),
        ..Default::default()
    };
    let generator = TestGenerator {
        fail: true,
        ..TestGenerator::ok()
    };
    let srv = TestServer::spawn(generator, config).await;

    let (status, error) = srv
        .post("/api/tone", json!({ "text": "Hello", "tones": ["casual"] }))
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error["error"], "generation_failed");
    assert_eq!(srv.generator.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn slow_generation_is_a_504() {
    let config = CoordinatorConfig {
        dispatch_timeout: Duration::from_millis(100),
        ..Default::default()
    };
    let generator = TestGenerator {
        delay: Duration::from_millis(500),
        ..TestGenerator::ok()
    };
    let srv = TestServer::spawn(generator, config).await;

    let (status, error) = srv
        .post("/api/tone", json!({ "text": "Hello", "tones": ["casual"] }))
        .await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(error["error"], "timeout");
}

#[tokio::test]
async fn stats_report_finished_jobs() {
    let srv = TestServer::start().await;
    srv.post("/api/tone", json!({ "text": "Hello", "tones": ["casual"] }))
        .await;

    let res = reqwest::get(format!("{}/api/jobs/stats", srv.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();

    assert_eq!(body["scheduler"]["submitted"], 1);
    assert_eq!(body["scheduler"]["completed"], 1);
    assert_eq!(body["scheduler"]["workers"], 3);
    assert_eq!(body["scheduler"]["accepting"], true);
    assert_eq!(body["recent"]["completed"][0]["key"], "Hello:casual");
    assert_eq!(body["recent"]["failed"], json!([]));
}

#[tokio::test]
async fn requests_after_shutdown_are_a_503() {
    let srv = TestServer::start().await;
    srv.coordinator.shutdown().await;

    let (status, error) = srv
        .post("/api/tone", json!({ "text": "Hello", "tones": ["casual"] }))
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error["error"], "shutting_down");
}
