//! Current-identity endpoint behind the bearer middleware.

use crate::middleware::AuthenticatedIdentity;
use axum::{Extension, Json};
use serde::Serialize;

/// Response for `GET /jwt/me`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MeResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
}

/// Report who the bearer token authenticated. Guests get
/// `{"authenticated": false}`.
#[tracing::instrument(skip_all, name = "authz.me")]
pub async fn get_me(current: Option<Extension<AuthenticatedIdentity>>) -> Json<MeResponse> {
    let response = match current {
        Some(Extension(AuthenticatedIdentity(identity))) => MeResponse {
            authenticated: true,
            status: Some(identity.status.as_str()),
            id: Some(identity.id),
        },
        None => MeResponse {
            authenticated: false,
            id: None,
            status: None,
        },
    };

    Json(response)
}
