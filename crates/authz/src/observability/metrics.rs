//! Metrics definitions for the authorization engine
//!
//! All metrics follow Prometheus naming conventions:
//! - `authz_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `profile`: 2 values (identity, route)
//! - `status`: 2 values (success, error)
//! - `failure`: `VerificationFailure::as_str` values plus `none`
//! - `outcome`: 3 values (authenticated, guest, rejected)

use metrics::counter;

// ============================================================================
// Token Metrics
// ============================================================================

/// Record a token issuance
///
/// Metric: `authz_token_issuance_total`
/// Labels: `profile`, `status`
pub fn record_token_issuance(profile: &str, status: &str) {
    counter!("authz_token_issuance_total", "profile" => profile.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Record a token validation result
///
/// Metric: `authz_token_validations_total`
/// Labels: `profile`, `status`, `failure`
pub fn record_token_validation(profile: &str, status: &str, failure: Option<&str>) {
    let failure = failure.unwrap_or("none");
    counter!("authz_token_validations_total", "profile" => profile.to_string(), "status" => status.to_string(), "failure" => failure.to_string())
        .increment(1);
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record a bearer-auth middleware decision
///
/// Metric: `authz_bearer_auth_total`
/// Labels: `outcome`
pub fn record_bearer_auth(outcome: &str) {
    counter!("authz_bearer_auth_total", "outcome" => outcome.to_string()).increment(1);
}
