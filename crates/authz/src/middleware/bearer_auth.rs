//! Bearer-token authentication middleware.
//!
//! Reads `<header>: <scheme> <token>`, claims the token through the
//! `IdentityProfile` and, for an active identity, stores an
//! `AuthenticatedIdentity` in the request extensions. Claimed tokens for the
//! anonymous or an inactive identity continue as guest requests. Anything
//! that cannot be claimed is answered with a 401 challenge.

use super::anti_forgery::AntiForgerySource;
use crate::config::BearerConfig;
use crate::context::{RequestContext, RequestSession};
use crate::errors::AuthzError;
use crate::models::Identity;
use crate::observability::{hash_for_correlation, metrics};
use crate::services::{ClaimOutcome, IdentityProfile};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

/// `error_description` sent with every bearer challenge.
pub const CHALLENGE_DESCRIPTION: &str = "The access token invalid or expired";

/// State for the bearer-auth middleware.
#[derive(Clone)]
pub struct BearerAuthState {
    pub identity: IdentityProfile,
    pub config: BearerConfig,
    pub anti_forgery: Arc<dyn AntiForgerySource>,
}

/// The identity a request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity(pub Identity);

/// Extract the token from the configured header and scheme.
fn extract_bearer_token<'a>(headers: &'a HeaderMap, config: &BearerConfig) -> Option<&'a str> {
    let value = headers
        .get(config.header_name.as_str())
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            tracing::debug!(target: "authz.middleware.bearer", "Missing authorization header");
            None
        })?;

    let rest = value.strip_prefix(config.scheme.as_str()).or_else(|| {
        tracing::debug!(target: "authz.middleware.bearer", "Authorization scheme mismatch");
        None
    })?;

    // The scheme must be followed by whitespace, then a non-empty token
    if !rest.starts_with(char::is_whitespace) {
        tracing::debug!(target: "authz.middleware.bearer", "Invalid authorization header format");
        return None;
    }

    Some(rest.trim()).filter(|token| !token.is_empty())
}

/// The 401 challenge for `config`.
pub fn challenge(config: &BearerConfig) -> Response {
    let mut response = AuthzError::VerificationFailed.into_response();
    let value = format!(
        "{} realm=\"{}\", error=\"invalid_token\", error_description=\"{}\"",
        config.scheme, config.realm, CHALLENGE_DESCRIPTION
    );

    match HeaderValue::from_str(&value) {
        Ok(value) => {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        Err(e) => {
            tracing::error!(
                target: "authz.middleware.bearer",
                error = %e,
                "Bearer challenge is not a valid header value"
            );
        }
    }

    response
}

/// Outcome of checking a request's bearer token.
enum Authentication {
    Authenticated(Identity),
    Guest,
    Rejected,
}

fn authenticate(state: &BearerAuthState, headers: &HeaderMap) -> Authentication {
    let Some(token) = extract_bearer_token(headers, &state.config) else {
        return Authentication::Rejected;
    };

    let anti_forgery = state.anti_forgery.for_request(headers);
    let session = RequestSession::new();
    let ctx = RequestContext::new(anti_forgery.as_ref(), &session);

    match state.identity.claim(token, ctx) {
        ClaimOutcome::NotClaimed => Authentication::Rejected,
        ClaimOutcome::Identity(identity) if identity.is_active() => {
            Authentication::Authenticated(identity)
        }
        ClaimOutcome::Identity(identity) => {
            tracing::info!(
                target: "authz.middleware.bearer",
                identity_hash = %hash_for_correlation(&identity.id),
                status = identity.status.as_str(),
                "Token identity is not active, continuing as guest"
            );
            Authentication::Guest
        }
        ClaimOutcome::Anonymous => Authentication::Guest,
    }
}

/// Bearer-auth middleware.
///
/// # Response
///
/// - 401 with a `WWW-Authenticate` challenge if the token is missing, uses
///   another scheme, or cannot be claimed
/// - otherwise continues, with `AuthenticatedIdentity` in the extensions when
///   the token names an active identity
#[instrument(skip_all, name = "authz.middleware.bearer")]
pub async fn require_bearer_auth(
    State(state): State<Arc<BearerAuthState>>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()) {
        Authentication::Authenticated(identity) => {
            tracing::debug!(
                target: "authz.middleware.bearer",
                identity_hash = %hash_for_correlation(&identity.id),
                "Request authenticated"
            );
            metrics::record_bearer_auth("authenticated");
            req.extensions_mut().insert(AuthenticatedIdentity(identity));
        }
        Authentication::Guest => {
            metrics::record_bearer_auth("guest");
        }
        Authentication::Rejected => {
            metrics::record_bearer_auth("rejected");
            return challenge(&state.config);
        }
    }

    next.run(req).await
}

/// Extension trait for reading the authenticated identity from a request.
pub trait AuthenticatedIdentityExt {
    /// `None` for guests and for routes without the middleware.
    fn authenticated_identity(&self) -> Option<&Identity>;
}

impl<B> AuthenticatedIdentityExt for axum::extract::Request<B> {
    fn authenticated_identity(&self) -> Option<&Identity> {
        self.extensions()
            .get::<AuthenticatedIdentity>()
            .map(|authenticated| &authenticated.0)
    }
}
