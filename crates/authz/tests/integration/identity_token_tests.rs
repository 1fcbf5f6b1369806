//! Identity token issuance and claiming through the public profile API.

use authz::context::{RequestContext, RequestSession, Session};
use authz::crypto::Algorithm;
use authz::errors::AuthzError;
use authz::models::{IdentityRef, IdentityStatus};
use authz::ClaimOutcome;
use authz_test_utils::*;

// ============================================================================
// Issue / claim lifecycle
// ============================================================================

/// User 42, audience = site, duration 3600, issued at 1000: the token is
/// valid until 4600 (exclusive) and only with the original anti-forgery
/// token.
#[test]
fn test_identity_token_lifecycle() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let token = fixture.issue_identity(TEST_USER_ACTIVE_ID)?;

    token
        .as_str()
        .assert_valid_jwt()
        .assert_alg("HS512")
        .assert_header("jti", "42")
        .assert_claim("jti", "42")
        .assert_claim("iss", TEST_SITE_URL)
        .assert_claim("aud", TEST_SITE_URL)
        .assert_claim("iat", 1000)
        .assert_claim("nbf", 1000)
        .assert_claim("csrf", TEST_CSRF_TOKEN)
        .assert_expires_at(4600);

    let session = RequestSession::new();

    fixture.clock.set(4599);
    let outcome = fixture.profiles.identity.claim(token.as_str(), fixture.ctx(&session));
    assert_eq!(outcome.identity().map(|i| i.id.as_str()), Some("42"));

    let forged = StaticAntiForgery::new(TEST_CSRF_TOKEN_OTHER);
    let ctx = RequestContext::new(&forged, &session);
    assert_eq!(
        fixture.profiles.identity.claim(token.as_str(), ctx),
        ClaimOutcome::NotClaimed
    );

    fixture.clock.set(4600);
    assert!(!fixture.profiles.identity.verify_token(&token, fixture.ctx(&session)));

    fixture.clock.set(4601);
    assert_eq!(
        fixture.profiles.identity.claim(token.as_str(), fixture.ctx(&session)),
        ClaimOutcome::NotClaimed
    );

    // Claiming never changes the session
    assert!(session.identity().is_none());

    Ok(())
}

#[test]
fn test_issue_by_username_and_email() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS256, 1000);
    let session = RequestSession::new();

    for reference in [TEST_USERNAME_ACTIVE, TEST_EMAIL_ACTIVE] {
        let token = fixture.profiles.identity.issue(
            IdentityRef::UsernameOrEmail(reference.to_string()),
            None,
            None,
            fixture.ctx(&session),
        )?;
        token.as_str().assert_claim("jti", "42");
    }

    Ok(())
}

#[test]
fn test_uid_principal_signs_token() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS384, 1000);
    let token = fixture.issue_identity(TEST_USER_UID_ID)?;

    assert!(token.verify_signature(&test_signature_key(Some(TEST_USER_UID)))?);
    assert!(!token.verify_signature(&test_signature_key(Some("43")))?);

    let session = RequestSession::new();
    let outcome = fixture.profiles.identity.claim(token.as_str(), fixture.ctx(&session));
    assert_eq!(outcome.identity().map(|i| i.id.as_str()), Some("43"));

    Ok(())
}

#[test]
fn test_inactive_identity_is_still_claimed() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let token = fixture.issue_identity(TEST_USER_INACTIVE_ID)?;

    let session = RequestSession::new();
    let outcome = fixture.profiles.identity.claim(token.as_str(), fixture.ctx(&session));
    assert_eq!(
        outcome.identity().map(|i| i.status),
        Some(IdentityStatus::Inactive)
    );

    Ok(())
}

// ============================================================================
// Anonymous fallback
// ============================================================================

#[test]
fn test_unknown_user_gets_verifiable_anonymous_token() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let token = fixture.issue_identity(TEST_USER_UNKNOWN_ID)?;

    token.as_str().assert_claim("jti", "");

    let session = RequestSession::new();
    assert_eq!(
        fixture.profiles.identity.claim(token.as_str(), fixture.ctx(&session)),
        ClaimOutcome::Anonymous
    );

    Ok(())
}

#[test]
fn test_directory_outage_at_verification_rejects_token() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let token = fixture.issue_identity(TEST_USER_ACTIVE_ID)?;

    // Falls back to the anonymous key, which did not sign this token
    fixture.directory.fail_lookups(true);
    let session = RequestSession::new();
    assert_eq!(
        fixture.profiles.identity.claim(token.as_str(), fixture.ctx(&session)),
        ClaimOutcome::NotClaimed
    );

    Ok(())
}

// ============================================================================
// Issue-time overrides and failures
// ============================================================================

#[test]
fn test_explicit_audience_and_duration() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let session = RequestSession::new();

    let token = fixture.profiles.identity.issue(
        IdentityRef::Id(TEST_USER_ACTIVE_ID),
        Some("https://other.example"),
        Some(60),
        fixture.ctx(&session),
    )?;

    token
        .as_str()
        .assert_claim("aud", "https://other.example")
        .assert_expires_at(1060);

    // Only the profile audience is accepted at verification
    assert!(!fixture.profiles.identity.verify_token(&token, fixture.ctx(&session)));

    Ok(())
}

#[test]
fn test_current_user_reference_reads_session() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let session = RequestSession::new();
    let anonymous = fixture.profiles.identity.issue(
        IdentityRef::CurrentUser,
        None,
        None,
        fixture.ctx(&session),
    )?;
    anonymous.as_str().assert_claim("jti", "");

    let signed_in = RequestSession::with_identity(authz::models::Identity::new(
        "42",
        IdentityStatus::Active,
    ));
    let token = fixture.profiles.identity.issue(
        IdentityRef::CurrentUser,
        None,
        None,
        fixture.ctx(&signed_in),
    )?;
    token.as_str().assert_claim("jti", "42");

    Ok(())
}

#[test]
fn test_anti_forgery_failure_at_issue_is_an_error() {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let session = RequestSession::new();
    let ctx = RequestContext::new(&FailingAntiForgery, &session);

    let result = fixture
        .profiles
        .identity
        .issue(IdentityRef::Id(TEST_USER_ACTIVE_ID), None, None, ctx);
    assert!(matches!(result, Err(AuthzError::Collaborator(_))));
}

#[test]
fn test_parse_without_verification_returns_expired_token() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let token = fixture.issue_identity(TEST_USER_ACTIVE_ID)?;
    let session = RequestSession::new();

    fixture.clock.set(10_000);
    let parsed = fixture
        .profiles
        .identity
        .parse(token.as_str(), false, false, fixture.ctx(&session))
        .ok_or_else(|| anyhow::anyhow!("parse failed"))?;
    assert_eq!(parsed.claims().identity().as_deref(), Some("42"));

    assert!(fixture
        .profiles
        .identity
        .parse(token.as_str(), true, false, fixture.ctx(&session))
        .is_none());

    Ok(())
}
