//! In-process HTTP harness.
//!
//! Drives the real router with `tower::ServiceExt::oneshot`; no socket is
//! bound.

use crate::fixtures::TestProfiles;
use authz::config::BearerConfig;
use authz::handlers::ActionRegistry;
use authz::middleware::HeaderAntiForgerySource;
use authz::routes::{build_routes, AppState};
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Router built from a `TestProfiles` fixture.
///
/// # Example
/// ```rust,ignore
/// let fixture = TestProfiles::new(Algorithm::HS512, 1000);
/// let app = TestApp::new(&fixture, ActionRegistry::new());
/// let response = app.get("/health", &[]).await?;
/// assert_eq!(response.status, StatusCode::OK);
/// ```
pub struct TestApp {
    router: Router,
}

/// Status, headers and raw body of one response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Result<Value, anyhow::Error> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    pub fn new(fixture: &TestProfiles, registry: ActionRegistry) -> Self {
        Self::with_bearer(fixture, registry, BearerConfig::default())
    }

    pub fn with_bearer(
        fixture: &TestProfiles,
        registry: ActionRegistry,
        bearer: BearerConfig,
    ) -> Self {
        let state = AppState {
            profiles: fixture.profiles.clone(),
            registry,
            anti_forgery: Arc::new(HeaderAntiForgerySource::new(
                bearer.anti_forgery_header.as_str(),
            )),
            bearer,
        };

        Self {
            router: build_routes(state),
        }
    }

    /// Send `GET uri` with `headers`.
    pub async fn get(
        &self,
        uri: &str,
        headers: &[(&str, &str)],
    ) -> Result<TestResponse, anyhow::Error> {
        let mut request = Request::builder().method("GET").uri(uri);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = self
            .router
            .clone()
            .oneshot(request.body(Body::empty())?)
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await?.to_bytes();

        Ok(TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec())?,
        })
    }
}
