use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::jwt::JwtValidationError;
use serde::Serialize;
use thiserror::Error;

/// Generic message for every token failure. Callers never learn which check
/// rejected a token.
pub const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("Malformed token")]
    MalformedToken,

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token verification failed")]
    VerificationFailed,

    #[error("Identity could not be resolved")]
    IdentityUnresolved,

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

impl From<JwtValidationError> for AuthzError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge
            | JwtValidationError::MalformedToken
            | JwtValidationError::MissingAlg => AuthzError::MalformedToken,
            JwtValidationError::IatTooFarInFuture => AuthzError::VerificationFailed,
        }
    }
}

impl From<crate::context::CollaboratorError> for AuthzError {
    fn from(err: crate::context::CollaboratorError) -> Self {
        AuthzError::Collaborator(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthzError::MalformedToken
            | AuthzError::UnsupportedAlgorithm(_)
            | AuthzError::VerificationFailed
            | AuthzError::IdentityUnresolved => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                INVALID_TOKEN_MESSAGE.to_string(),
            ),
            AuthzError::MissingParameter(name) => (
                StatusCode::BAD_REQUEST,
                "MISSING_PARAMETER",
                format!("Missing required parameter: {}", name),
            ),
            AuthzError::RouteNotFound(_) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Invalid token.".to_string(),
            ),
            AuthzError::Serialization(_) | AuthzError::Collaborator(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}
