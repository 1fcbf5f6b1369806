//! Hand-built tokens that each break exactly one verification rule.

use authz::context::RequestSession;
use authz::crypto::{Algorithm, SignatureKey};
use authz::token::{Token, TokenBuilder};
use authz::verification::{self, VerificationFailure, VerificationPolicy};
use authz_test_utils::*;
use common::jwt::{encode_segment, MAX_JWT_SIZE_BYTES};
use std::time::Duration;

const NOW: i64 = 1000;

// ============================================================================
// Helper Functions
// ============================================================================

/// Every claim an identity token for user 42 carries, valid at `NOW`.
fn valid_claims() -> TokenBuilder {
    Token::builder()
        .set_issuer(TEST_SITE_URL)
        .set_audience(TEST_SITE_URL)
        .set_id("42", true)
        .set_issued_at(NOW)
        .set_not_before(NOW)
        .set_expiration(NOW + 3600)
        .set_claim("csrf", TEST_CSRF_TOKEN)
}

fn sign(builder: TokenBuilder, algorithm: Algorithm) -> Result<Token, anyhow::Error> {
    Ok(builder.sign(
        &test_signing_policy(algorithm),
        &test_signature_key(Some("42")),
    )?)
}

fn verifies(fixture: &TestProfiles, token: &Token) -> bool {
    let session = RequestSession::new();
    fixture
        .profiles
        .identity
        .verify_token(token, fixture.ctx(&session))
}

fn failure(token: &Token, now: i64) -> Option<VerificationFailure> {
    let issuers = vec![TEST_SITE_URL.to_string()];
    let anti_forgery = StaticAntiForgery::new(TEST_CSRF_TOKEN);
    let policy = VerificationPolicy {
        validate_time_window: true,
        now,
        clock_skew: Duration::from_secs(300),
        issuers: &issuers,
        audience: TEST_SITE_URL,
        anti_forgery: &anti_forgery,
    };

    verification::verify(token, &policy, |_| (test_signature_key(Some("42")), ())).err()
}

// ============================================================================
// Baseline
// ============================================================================

#[test]
fn test_hand_built_token_verifies() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, NOW);
    let token = sign(valid_claims(), Algorithm::HS512)?;

    assert!(verifies(&fixture, &token));
    assert_eq!(failure(&token, NOW), None);
    Ok(())
}

/// The signer comes from the token's own header, not from the verifier's
/// configured algorithm.
#[test]
fn test_header_algorithm_selects_signer() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, NOW);
    for algorithm in Algorithm::ALL {
        let token = sign(valid_claims(), algorithm)?;
        token.as_str().assert_alg(algorithm.as_str());
        assert!(verifies(&fixture, &token), "{algorithm} token should verify");
    }
    Ok(())
}

// ============================================================================
// Claim checks
// ============================================================================

#[test]
fn test_time_window_boundaries() -> Result<(), anyhow::Error> {
    let token = sign(valid_claims(), Algorithm::HS256)?;

    assert_eq!(failure(&token, NOW - 1), Some(VerificationFailure::NotYetValid));
    assert_eq!(failure(&token, NOW), None);
    assert_eq!(failure(&token, NOW + 3599), None);
    assert_eq!(failure(&token, NOW + 3600), Some(VerificationFailure::Expired));
    Ok(())
}

#[test]
fn test_missing_time_claims_are_rejected() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS256, NOW);
    let without_nbf = sign(
        Token::builder()
            .set_issuer(TEST_SITE_URL)
            .set_audience(TEST_SITE_URL)
            .set_id("42", true)
            .set_issued_at(NOW)
            .set_expiration(NOW + 3600)
            .set_claim("csrf", TEST_CSRF_TOKEN),
        Algorithm::HS256,
    )?;

    assert!(!verifies(&fixture, &without_nbf));
    assert_eq!(
        failure(&without_nbf, NOW),
        Some(VerificationFailure::MissingClaim("nbf"))
    );
    Ok(())
}

#[test]
fn test_iat_beyond_clock_skew_is_rejected() -> Result<(), anyhow::Error> {
    let within = sign(valid_claims().set_issued_at(NOW + 300), Algorithm::HS256)?;
    let beyond = sign(valid_claims().set_issued_at(NOW + 301), Algorithm::HS256)?;

    assert_eq!(failure(&within, NOW), None);
    assert_eq!(failure(&beyond, NOW), Some(VerificationFailure::IssuedInFuture));
    Ok(())
}

#[test]
fn test_foreign_issuer_is_rejected() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS256, NOW);
    let token = sign(valid_claims().set_issuer("https://evil.example"), Algorithm::HS256)?;

    assert!(!verifies(&fixture, &token));
    assert_eq!(failure(&token, NOW), Some(VerificationFailure::IssuerNotAllowed));
    Ok(())
}

#[test]
fn test_foreign_audience_is_rejected() -> Result<(), anyhow::Error> {
    let token = sign(valid_claims().set_audience("https://other.example"), Algorithm::HS256)?;
    assert_eq!(failure(&token, NOW), Some(VerificationFailure::AudienceMismatch));
    Ok(())
}

#[test]
fn test_wrong_anti_forgery_token_is_rejected() -> Result<(), anyhow::Error> {
    let token = sign(valid_claims().set_claim("csrf", TEST_CSRF_TOKEN_OTHER), Algorithm::HS256)?;
    assert_eq!(failure(&token, NOW), Some(VerificationFailure::AntiForgeryMismatch));
    Ok(())
}

/// Checks run in a fixed order; the first failure wins.
#[test]
fn test_time_window_is_checked_first() -> Result<(), anyhow::Error> {
    let token = sign(
        valid_claims()
            .set_issuer("https://evil.example")
            .set_claim("csrf", TEST_CSRF_TOKEN_OTHER),
        Algorithm::HS256,
    )?;
    assert_eq!(failure(&token, NOW + 3600), Some(VerificationFailure::Expired));
    assert_eq!(failure(&token, NOW), Some(VerificationFailure::IssuerNotAllowed));
    Ok(())
}

// ============================================================================
// Signature checks
// ============================================================================

#[test]
fn test_key_for_other_principal_is_rejected() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS256, NOW);
    let token = valid_claims().sign(
        &test_signing_policy(Algorithm::HS256),
        &test_signature_key(Some("43")),
    )?;

    assert!(!verifies(&fixture, &token));
    assert_eq!(failure(&token, NOW), Some(VerificationFailure::BadSignature));
    Ok(())
}

#[test]
fn test_tampered_payload_is_rejected() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS256, NOW);
    let token = sign(valid_claims(), Algorithm::HS256)?;
    let forged = sign(valid_claims().set_expiration(NOW + 999_999), Algorithm::HS256)?;

    // Forged payload, original signature
    let (header, _) = token.signing_input().split_once('.').unwrap_or_default();
    let (_, payload) = forged.signing_input().split_once('.').unwrap_or_default();
    let (_, signature) = token.as_str().rsplit_once('.').unwrap_or_default();
    let spliced = Token::parse(&format!("{header}.{payload}.{signature}"))?;

    assert!(!verifies(&fixture, &spliced));
    Ok(())
}

#[test]
fn test_unsupported_algorithm_is_rejected() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS256, NOW);
    let token = sign(valid_claims(), Algorithm::HS256)?;
    let (_, payload) = token.signing_input().split_once('.').unwrap_or_default();

    for alg in ["none", "RS256", "hs256"] {
        let header = encode_segment(format!(r#"{{"alg":"{alg}","typ":"JWT"}}"#).as_bytes());
        let (_, signature) = token.as_str().rsplit_once('.').unwrap_or_default();
        let wire = format!("{header}.{payload}.{signature}");

        let parsed = Token::parse(&wire)?;
        assert!(!verifies(&fixture, &parsed), "alg {alg} must not verify");
        assert_eq!(
            failure(&parsed, NOW),
            Some(VerificationFailure::UnsupportedAlgorithm)
        );
    }
    Ok(())
}

// ============================================================================
// Malformed input
// ============================================================================

#[test]
fn test_malformed_wire_tokens_are_not_claimed() {
    let fixture = TestProfiles::new(Algorithm::HS256, NOW);
    let session = RequestSession::new();
    let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);

    for wire in ["", "a.b", "a.b.c.d", "!!!.???.***", oversized.as_str()] {
        assert!(
            !fixture
                .profiles
                .identity
                .claim(wire, fixture.ctx(&session))
                .is_claimed(),
            "{wire:.20} must not be claimed"
        );
        assert!(fixture
            .profiles
            .actions
            .claim(wire, true, fixture.ctx(&session))
            .is_none());
    }
}

#[test]
fn test_header_without_alg_is_malformed() {
    let header = encode_segment(br#"{"typ":"JWT"}"#);
    let payload = encode_segment(b"{}");
    assert!(Token::parse(&format!("{header}.{payload}.c2ln")).is_err());
}

#[test]
fn test_derived_keys_differ_per_principal() -> Result<(), anyhow::Error> {
    let token = sign(valid_claims(), Algorithm::HS512)?;
    let keys: [SignatureKey; 3] = [
        test_signature_key(None),
        test_signature_key(Some("")),
        test_signature_key(Some("4")),
    ];
    for key in &keys {
        assert!(!token.verify_signature(key)?);
    }
    Ok(())
}
