//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the in-process router
//! with a mock debrid provider and a mock torrent index injected, so the
//! HTTP surface can be exercised without network access.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use kaistream_core::{
    testing::{MockProvider, MockProviderFactory, MockTorrentIndex},
    Config, ResolverConfig, Resolver, SessionStore, TorrentFinder,
};
use kaistream_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use kaistream_core::testing::{fixtures, status};

/// Placeholder video configured for every fixture.
pub const INTRO_URL: &str = "https://cdn.example/intro.mp4";

/// Test fixture for API testing with mock dependencies.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock provider shared by every session
    pub provider: Arc<MockProvider>,
    /// Mock torrent index - configure search results and file lists
    pub index: Arc<MockTorrentIndex>,
    /// Session store behind the router
    pub sessions: SessionStore,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
    pub body: Value,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get("location")
            .and_then(|v| v.to_str().ok())
    }
}

impl TestFixture {
    /// Create a new test fixture with a short polling budget.
    pub fn new() -> Self {
        let config = Config {
            resolver: ResolverConfig {
                poll_interval_ms: 10,
                timeout_ms: 50,
                intro_video_url: INTRO_URL.to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let provider = Arc::new(MockProvider::new());
        let index = Arc::new(MockTorrentIndex::new());
        let resolver = Arc::new(Resolver::new(
            config.resolver.clone(),
            Arc::new(MockProviderFactory::new(provider.clone())),
        ));
        let finder = TorrentFinder::new(index.clone(), index.clone(), 4);
        let sessions = SessionStore::new(3600);

        let state = Arc::new(AppState::new(config, sessions.clone(), resolver, finder));

        Self {
            router: create_router(state),
            provider,
            index,
            sessions,
        }
    }

    /// Create a session and return its id.
    pub async fn session(&self, service: &str, api_key: &str) -> String {
        let response = self
            .post(
                "/api/sessions",
                json!({ "service": service, "apiKey": api_key }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["id"]
            .as_str()
            .expect("session id")
            .to_string()
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None).await
    }

    pub async fn head(&self, path: &str) -> TestResponse {
        self.request(Method::HEAD, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request(Method::POST, path, Some(body)).await
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            text,
            body,
        }
    }
}

/// Query string for the playback route.
pub fn playback_query(action: &str, magnet: &str, episode: u32, name: &str) -> String {
    format!(
        "action={}&magnet={}&episode={}&episode_name={}",
        action,
        urlencoding::encode(magnet),
        episode,
        urlencoding::encode(name)
    )
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}
