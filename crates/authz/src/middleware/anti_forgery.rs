//! Anti-forgery tokens for HTTP requests.
//!
//! Token storage belongs to the host application. The engine only needs the
//! current request's token and a comparison, which `AntiForgerySource`
//! provides per request. The default reads it from a request header.

use crate::config::DEFAULT_ANTI_FORGERY_HEADER;
use crate::context::{AntiForgery, CollaboratorError};
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

/// Produces the anti-forgery collaborator for one request.
pub trait AntiForgerySource: Send + Sync {
    fn for_request(&self, headers: &HeaderMap) -> Box<dyn AntiForgery + Send + Sync>;
}

/// Reads the anti-forgery token from a request header.
#[derive(Debug, Clone)]
pub struct HeaderAntiForgerySource {
    header_name: String,
}

impl HeaderAntiForgerySource {
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }
}

impl Default for HeaderAntiForgerySource {
    fn default() -> Self {
        Self::new(DEFAULT_ANTI_FORGERY_HEADER)
    }
}

impl AntiForgerySource for HeaderAntiForgerySource {
    fn for_request(&self, headers: &HeaderMap) -> Box<dyn AntiForgery + Send + Sync> {
        let token = headers
            .get(self.header_name.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string);

        Box::new(RequestAntiForgery { token })
    }
}

/// The anti-forgery token presented with one request, if any.
#[derive(Clone, Default)]
pub struct RequestAntiForgery {
    token: Option<String>,
}

impl RequestAntiForgery {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl AntiForgery for RequestAntiForgery {
    fn current_token(&self) -> Result<String, CollaboratorError> {
        self.token
            .clone()
            .ok_or_else(|| CollaboratorError::new("Request carries no anti-forgery token"))
    }

    /// Constant-time comparison. A request without a token accepts nothing.
    fn validate(&self, candidate: &str) -> Result<bool, CollaboratorError> {
        Ok(self
            .token
            .as_deref()
            .is_some_and(|token| bool::from(token.as_bytes().ct_eq(candidate.as_bytes()))))
    }
}
