//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! backed by a scripted process runner and a mock publisher, so the whole
//! HTTP surface can be exercised without N_m3u8DL-RE, ffmpeg or a network.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use ripline_core::{
    testing::{MockPublisher, ScriptedRunner},
    config::{ServerConfig, StorageConfig},
    Config, JobOrchestrator, JobStatus, OrchestratorConfig, ProcessRunner, Publisher,
};
use ripline_server::state::AppState;

/// Re-export fixtures for test convenience
pub use ripline_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/process", json!({
///         "url": "https://cdn.example.com/manifest.mpd",
///         "save_name": "clip",
///         "key": "kid:key"
///     })).await;
///
///     assert_eq!(response.status, StatusCode::ACCEPTED);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Scripted process runner - configure tool outcomes
    pub runner: Arc<ScriptedRunner>,
    /// Mock publisher, when enabled
    pub publisher: Option<Arc<MockPublisher>>,
    /// Orchestrator behind the router
    pub orchestrator: Arc<JobOrchestrator>,
    /// Temporary output directory
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub raw: Vec<u8>,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Attach a mock publisher
    pub enable_publisher: bool,
    /// Concurrency limit (0 = unbounded)
    pub max_concurrent_jobs: usize,
}

impl TestConfig {
    /// Create config with a mock publisher attached.
    pub fn with_publisher() -> Self {
        Self {
            enable_publisher: true,
            ..Default::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture without a publisher.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let output_dir = temp_dir.path().to_path_buf();

        let runner = Arc::new(ScriptedRunner::new());
        let publisher = test_config
            .enable_publisher
            .then(|| Arc::new(MockPublisher::new()));

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            storage: StorageConfig {
                output_dir: output_dir.clone(),
            },
            orchestrator: OrchestratorConfig {
                max_concurrent_jobs: test_config.max_concurrent_jobs,
                ..Default::default()
            },
            ..Default::default()
        };

        let orchestrator = Arc::new(JobOrchestrator::new(
            config.orchestrator.clone(),
            Arc::clone(&runner) as Arc<dyn ProcessRunner>,
            publisher.clone().map(|p| p as Arc<dyn Publisher>),
            config.acquirer.clone(),
            config.converter.clone(),
            output_dir,
        ));

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&orchestrator),
            Arc::clone(&runner) as Arc<dyn ProcessRunner>,
        ));

        let router = ripline_server::api::create_router(state);

        Self {
            router,
            runner,
            publisher,
            orchestrator,
            temp_dir,
        }
    }

    /// Output directory the router serves files from.
    pub fn output_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file into the output directory.
    pub fn write_file(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.output_dir().join(name);
        std::fs::write(&path, contents).expect("Failed to write file");
        path
    }

    /// Poll a job until it reaches a terminal state.
    pub async fn wait_for_terminal(&self, job_id: &str) -> Value {
        for _ in 0..200 {
            let response = self.get(&format!("/api/v1/jobs/{}", job_id)).await;
            let terminal = response.body["status"]
                .as_str()
                .and_then(|s| serde_json::from_value::<JobStatus>(Value::from(s)).ok())
                .is_some_and(|s| s.is_terminal());
            if terminal {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Job {} did not reach a terminal state", job_id);
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            raw: body_bytes.to_vec(),
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
