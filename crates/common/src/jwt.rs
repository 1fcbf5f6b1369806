//! JWT wire-format utilities shared across the workspace.
//!
//! This module knows about the compact serialization only
//! (`header.payload.signature`, each segment base64url without padding).
//! It never verifies signatures and never trusts what it decodes; callers
//! must still run the full verification pipeline.
//!
//! - Size limit checked before any decoding
//! - Exact three-segment splitting with access to the signing input
//! - Segment decoding into JSON objects
//! - `alg` lookup in a decoded header
//! - `iat` clock-skew validation, capped at `MAX_CLOCK_SKEW`

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected before base64 decoding or any MAC
/// computation. Identity tokens are ~300 bytes; action tokens grow with the
/// route descriptor but stay well under this bound for realistic parameters.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default clock skew tolerance for the `iat` claim (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum clock skew tolerance that may be configured (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT on the wire.
///
/// Every variant renders the same message so callers can surface it without
/// leaking which step failed. Details are logged at debug level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token is not a structurally valid JWT.
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Header is missing a string `alg` field.
    #[error("The access token is invalid or expired")]
    MissingAlg,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Segments
// =============================================================================

/// The three segments of a compact JWT, borrowed from the original string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSegments<'a> {
    /// `header.payload` exactly as received; this is what the MAC covers.
    pub signing_input: &'a str,
    /// Encoded header segment.
    pub header: &'a str,
    /// Encoded payload segment.
    pub payload: &'a str,
    /// Encoded signature segment.
    pub signature: &'a str,
}

/// Split a compact JWT into its segments.
///
/// # Errors
///
/// - `TokenTooLarge` if the token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` if there are not exactly three non-empty segments
pub fn split_token(token: &str) -> Result<TokenSegments<'_>, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let malformed = || {
        tracing::debug!(
            target: "common.jwt",
            parts = token.split('.').count(),
            "Token rejected: invalid JWT format"
        );
        JwtValidationError::MalformedToken
    };

    let (signing_input, signature) = token.rsplit_once('.').ok_or_else(malformed)?;
    let (header, payload) = signing_input.split_once('.').ok_or_else(malformed)?;

    if payload.contains('.') || header.is_empty() || payload.is_empty() || signature.is_empty()
    {
        return Err(malformed());
    }

    Ok(TokenSegments {
        signing_input,
        header,
        payload,
        signature,
    })
}

/// Decode one base64url (unpadded) segment into raw bytes.
///
/// # Errors
///
/// Returns `MalformedToken` if the segment is not valid base64url.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, JwtValidationError> {
    URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT segment base64");
        JwtValidationError::MalformedToken
    })
}

/// Encode raw bytes as a base64url (unpadded) segment.
#[must_use]
pub fn encode_segment(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a segment that must contain a JSON object.
///
/// # Errors
///
/// Returns `MalformedToken` if the segment is not base64url, not JSON, or
/// the JSON value is not an object.
pub fn decode_json_object(segment: &str) -> Result<Map<String, Value>, JwtValidationError> {
    let bytes = decode_segment(segment)?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => {
            tracing::debug!(target: "common.jwt", "JWT segment is not a JSON object");
            Err(JwtValidationError::MalformedToken)
        }
        Err(e) => {
            tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT segment JSON");
            Err(JwtValidationError::MalformedToken)
        }
    }
}

/// Read the `alg` value from a decoded header without verifying the token.
///
/// The returned name is attacker-controlled and must only be used as a key
/// into a fixed allow-list of algorithms.
///
/// # Errors
///
/// Returns `MissingAlg` if `alg` is absent, empty, or not a string.
pub fn header_alg(header: &Map<String, Value>) -> Result<&str, JwtValidationError> {
    header
        .get("alg")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "common.jwt", "JWT header has no usable alg");
            JwtValidationError::MissingAlg
        })
}

// =============================================================================
// Time
// =============================================================================

/// Validate the `iat` claim against an explicit `now`.
///
/// `clock_skew` is capped at [`MAX_CLOCK_SKEW`].
///
/// # Errors
///
/// Returns `IatTooFarInFuture` if `iat` is more than `clock_skew` ahead of `now`.
pub fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), JwtValidationError> {
    // At most MAX_CLOCK_SKEW seconds, so the cast cannot wrap
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.min(MAX_CLOCK_SKEW).as_secs() as i64;
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
