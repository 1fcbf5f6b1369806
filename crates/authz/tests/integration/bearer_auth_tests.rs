//! Bearer-auth middleware over the real router.

use authz::config::BearerConfig;
use authz::crypto::Algorithm;
use authz::handlers::ActionRegistry;
use authz::models::IdentityStatus;
use authz_test_utils::*;
use axum::http::StatusCode;
use serde_json::json;

const CHALLENGE: &str = "Bearer realm=\"api\", error=\"invalid_token\", error_description=\"The access token invalid or expired\"";

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_missing_header_is_challenged() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let app = TestApp::new(&fixture, ActionRegistry::new());

    let response = app.get("/jwt/me", &[]).await?;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.header("www-authenticate"), Some(CHALLENGE));
    assert_eq!(
        response.json()?,
        json!({"error": {"code": "INVALID_TOKEN", "message": "The access token is invalid or expired"}})
    );
    Ok(())
}

#[tokio::test]
async fn test_bad_tokens_are_challenged() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let app = TestApp::new(&fixture, ActionRegistry::new());
    let token = fixture.issue_identity(TEST_USER_ACTIVE_ID)?;
    let valid = bearer(token.as_str());

    let cases: [&[(&str, &str)]; 4] = [
        // Wrong scheme
        &[("authorization", "Basic dXNlcjpwYXNz"), ("x-csrf-token", TEST_CSRF_TOKEN)],
        // Garbage token
        &[("authorization", "Bearer not-a-jwt"), ("x-csrf-token", TEST_CSRF_TOKEN)],
        // No anti-forgery header
        &[("authorization", valid.as_str())],
        // Different anti-forgery token
        &[("authorization", valid.as_str()), ("x-csrf-token", TEST_CSRF_TOKEN_OTHER)],
    ];

    for headers in cases {
        let response = app.get("/jwt/me", headers).await?;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "headers: {headers:?}");
        assert_eq!(response.header("www-authenticate"), Some(CHALLENGE));
    }
    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_challenged() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let app = TestApp::new(&fixture, ActionRegistry::new());
    let token = fixture.issue_identity(TEST_USER_ACTIVE_ID)?;

    fixture.clock.set(4600);
    let response = app
        .get(
            "/jwt/me",
            &[
                ("authorization", bearer(token.as_str()).as_str()),
                ("x-csrf-token", TEST_CSRF_TOKEN),
            ],
        )
        .await?;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

// ============================================================================
// Accepted requests
// ============================================================================

#[tokio::test]
async fn test_active_identity_is_authenticated() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let app = TestApp::new(&fixture, ActionRegistry::new());
    let token = fixture.issue_identity(TEST_USER_ACTIVE_ID)?;

    let response = app
        .get(
            "/jwt/me",
            &[
                ("authorization", bearer(token.as_str()).as_str()),
                ("x-csrf-token", TEST_CSRF_TOKEN),
            ],
        )
        .await?;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json()?,
        json!({"authenticated": true, "id": "42", "status": "active"})
    );
    Ok(())
}

#[tokio::test]
async fn test_inactive_and_anonymous_identities_continue_as_guests() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let app = TestApp::new(&fixture, ActionRegistry::new());

    for id in [TEST_USER_INACTIVE_ID, TEST_USER_UNKNOWN_ID] {
        let token = fixture.issue_identity(id)?;
        let response = app
            .get(
                "/jwt/me",
                &[
                    ("authorization", bearer(token.as_str()).as_str()),
                    ("x-csrf-token", TEST_CSRF_TOKEN),
                ],
            )
            .await?;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json()?, json!({"authenticated": false}));
    }
    Ok(())
}

#[tokio::test]
async fn test_status_change_after_issue_takes_effect() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let app = TestApp::new(&fixture, ActionRegistry::new());
    let token = fixture.issue_identity(TEST_USER_ACTIVE_ID)?;
    let authorization = bearer(token.as_str());
    let headers = [
        ("authorization", authorization.as_str()),
        ("x-csrf-token", TEST_CSRF_TOKEN),
    ];

    fixture
        .directory
        .set_status(TEST_USER_ACTIVE_ID, IdentityStatus::Suspended);

    let response = app.get("/jwt/me", &headers).await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()?, json!({"authenticated": false}));
    Ok(())
}

#[tokio::test]
async fn test_custom_header_and_scheme() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let config = BearerConfig {
        header_name: "X-Api-Token".to_string(),
        scheme: "JWT".to_string(),
        realm: "admin".to_string(),
        anti_forgery_header: "X-XSRF".to_string(),
    };
    let app = TestApp::with_bearer(&fixture, ActionRegistry::new(), config);
    let token = fixture.issue_identity(TEST_USER_ACTIVE_ID)?;
    let value = format!("JWT {}", token.as_str());

    let response = app
        .get("/jwt/me", &[("x-api-token", value.as_str()), ("x-xsrf", TEST_CSRF_TOKEN)])
        .await?;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .get(
            "/jwt/me",
            &[("authorization", bearer(token.as_str()).as_str()), ("x-xsrf", TEST_CSRF_TOKEN)],
        )
        .await?;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.header("www-authenticate"),
        Some("JWT realm=\"admin\", error=\"invalid_token\", error_description=\"The access token invalid or expired\"")
    );
    Ok(())
}

#[tokio::test]
async fn test_health_needs_no_token() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let app = TestApp::new(&fixture, ActionRegistry::new());

    let response = app.get("/health", &[]).await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "OK");
    Ok(())
}
