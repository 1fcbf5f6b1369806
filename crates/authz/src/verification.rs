//! Ordered verification checks for parsed tokens.
//!
//! `verify` runs, short-circuiting on the first failure:
//!
//! 1. time window (`nbf <= now < exp`, `iat` not beyond the clock skew), optional
//! 2. issuer is in the profile's allow-list
//! 3. audience equals the profile's audience
//! 4. anti-forgery claim is valid for the active request
//! 5. signature, under the key derived from the resolved identity
//!
//! A claim that is absent or has the wrong JSON type fails its check.
//! Failures are logged with their reason and returned as a
//! `VerificationFailure`; profiles collapse every reason into "not claimed"
//! so callers cannot tell which check rejected a token.

use crate::context::AntiForgery;
use crate::crypto::SignatureKey;
use crate::errors::AuthzError;
use crate::observability::hash_for_correlation;
use crate::token::claims::{
    Claims, CLAIM_AUDIENCE, CLAIM_CSRF, CLAIM_EXPIRATION, CLAIM_ISSUED_AT, CLAIM_ISSUER,
    CLAIM_NOT_BEFORE,
};
use crate::token::Token;
use common::jwt::validate_iat_at;
use std::fmt;
use std::time::Duration;

/// Why a token was rejected. Used for logs and metric labels only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFailure {
    Malformed,
    MissingClaim(&'static str),
    Expired,
    NotYetValid,
    IssuedInFuture,
    IssuerNotAllowed,
    AudienceMismatch,
    AntiForgeryMismatch,
    AntiForgeryUnavailable,
    UnsupportedAlgorithm,
    BadSignature,
}

impl VerificationFailure {
    /// Bounded label value for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationFailure::Malformed => "malformed",
            VerificationFailure::MissingClaim(_) => "missing_claim",
            VerificationFailure::Expired => "expired",
            VerificationFailure::NotYetValid => "not_yet_valid",
            VerificationFailure::IssuedInFuture => "issued_in_future",
            VerificationFailure::IssuerNotAllowed => "issuer_not_allowed",
            VerificationFailure::AudienceMismatch => "audience_mismatch",
            VerificationFailure::AntiForgeryMismatch => "anti_forgery_mismatch",
            VerificationFailure::AntiForgeryUnavailable => "anti_forgery_unavailable",
            VerificationFailure::UnsupportedAlgorithm => "unsupported_algorithm",
            VerificationFailure::BadSignature => "bad_signature",
        }
    }
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationFailure::MissingClaim(claim) => write!(f, "missing_claim({claim})"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl From<VerificationFailure> for AuthzError {
    fn from(failure: VerificationFailure) -> Self {
        match failure {
            VerificationFailure::Malformed => AuthzError::MalformedToken,
            VerificationFailure::UnsupportedAlgorithm => {
                AuthzError::UnsupportedAlgorithm("unsupported".to_string())
            }
            _ => AuthzError::VerificationFailed,
        }
    }
}

/// Profile-bound inputs to `verify`.
#[derive(Clone, Copy)]
pub struct VerificationPolicy<'a> {
    /// Run the time-window check.
    pub validate_time_window: bool,
    /// Current unix time.
    pub now: i64,
    /// Tolerance for `iat` ahead of `now`.
    pub clock_skew: Duration,
    pub issuers: &'a [String],
    pub audience: &'a str,
    pub anti_forgery: &'a dyn AntiForgery,
}

/// Run every check against `token`.
///
/// `resolve` maps the token's claims to the key its signature must verify
/// under, along with whatever it resolved on the way (typically the
/// identity). It is only called once the claim checks have passed, and its
/// second value is returned on success.
pub fn verify<R>(
    token: &Token,
    policy: &VerificationPolicy<'_>,
    resolve: impl FnOnce(&Claims) -> (SignatureKey, R),
) -> Result<R, VerificationFailure> {
    let claims = token.claims();

    if policy.validate_time_window {
        check_time_window(claims, policy.now, policy.clock_skew)?;
    }
    check_issuer(claims, policy.issuers)?;
    check_audience(claims, policy.audience)?;
    check_anti_forgery(claims, policy.anti_forgery)?;

    let (key, resolved) = resolve(claims);
    check_signature(token, &key)?;

    Ok(resolved)
}

/// `nbf <= now < exp`, and `iat` no further ahead of `now` than `clock_skew`.
pub fn check_time_window(
    claims: &Claims,
    now: i64,
    clock_skew: Duration,
) -> Result<(), VerificationFailure> {
    let not_before = claims.not_before().ok_or_else(|| missing(CLAIM_NOT_BEFORE))?;
    let expiration = claims.expiration().ok_or_else(|| missing(CLAIM_EXPIRATION))?;
    let issued_at = claims.issued_at().ok_or_else(|| missing(CLAIM_ISSUED_AT))?;

    if now < not_before {
        tracing::debug!(
            target: "authz.verify",
            nbf = not_before,
            now = now,
            "Token rejected: not yet valid"
        );
        return Err(VerificationFailure::NotYetValid);
    }

    if now >= expiration {
        tracing::debug!(
            target: "authz.verify",
            exp = expiration,
            now = now,
            "Token rejected: expired"
        );
        return Err(VerificationFailure::Expired);
    }

    validate_iat_at(issued_at, clock_skew, now).map_err(|_| VerificationFailure::IssuedInFuture)
}

/// `iss` is one of `issuers`. Exact string membership.
pub fn check_issuer(claims: &Claims, issuers: &[String]) -> Result<(), VerificationFailure> {
    let issuer = claims.issuer().ok_or_else(|| missing(CLAIM_ISSUER))?;

    if issuers.iter().any(|allowed| allowed == issuer) {
        return Ok(());
    }

    tracing::error!(
        target: "authz.verify",
        issuer = %issuer,
        allowed = ?issuers,
        "Token rejected: issuer not allowed"
    );
    Err(VerificationFailure::IssuerNotAllowed)
}

/// `aud` equals `audience` exactly.
pub fn check_audience(claims: &Claims, audience: &str) -> Result<(), VerificationFailure> {
    let actual = claims.audience().ok_or_else(|| missing(CLAIM_AUDIENCE))?;

    if actual == audience {
        return Ok(());
    }

    tracing::error!(
        target: "authz.verify",
        audience = %actual,
        expected = %audience,
        "Token rejected: audience mismatch"
    );
    Err(VerificationFailure::AudienceMismatch)
}

/// `csrf` is accepted by the request's anti-forgery source. A source error
/// counts as a failed check.
pub fn check_anti_forgery(
    claims: &Claims,
    anti_forgery: &dyn AntiForgery,
) -> Result<(), VerificationFailure> {
    let csrf = claims.csrf().ok_or_else(|| missing(CLAIM_CSRF))?;

    match anti_forgery.validate(csrf) {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::error!(
                target: "authz.verify",
                csrf_hash = %hash_for_correlation(csrf),
                "Token rejected: anti-forgery token mismatch"
            );
            Err(VerificationFailure::AntiForgeryMismatch)
        }
        Err(e) => {
            tracing::warn!(
                target: "authz.verify",
                error = %e,
                "Token rejected: anti-forgery validation unavailable"
            );
            Err(VerificationFailure::AntiForgeryUnavailable)
        }
    }
}

/// Signature verifies under `key` using the token's own `alg`.
pub fn check_signature(token: &Token, key: &SignatureKey) -> Result<(), VerificationFailure> {
    match token.verify_signature(key) {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::error!(
                target: "authz.verify",
                alg = token.algorithm_name().unwrap_or_default(),
                "Token rejected: signature mismatch"
            );
            Err(VerificationFailure::BadSignature)
        }
        Err(AuthzError::UnsupportedAlgorithm(alg)) => {
            tracing::error!(
                target: "authz.verify",
                alg = %alg,
                "Token rejected: unsupported algorithm"
            );
            Err(VerificationFailure::UnsupportedAlgorithm)
        }
        Err(_) => Err(VerificationFailure::Malformed),
    }
}

fn missing(name: &'static str) -> VerificationFailure {
    tracing::debug!(target: "authz.verify", claim = name, "Token rejected: claim missing");
    VerificationFailure::MissingClaim(name)
}
