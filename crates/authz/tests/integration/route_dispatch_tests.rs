//! Route-token dispatch endpoints over the real router.

use authz::crypto::Algorithm;
use authz::errors::AuthzError;
use authz::handlers::ActionRegistry;
use authz::models::RouteDescriptor;
use authz_test_utils::*;
use axum::http::StatusCode;
use serde_json::{json, Value};

fn registry() -> ActionRegistry {
    ActionRegistry::new()
        .register(TEST_ACTION_UPDATE_USER, |invocation| {
            let id = invocation
                .params
                .get("id")
                .ok_or_else(|| AuthzError::MissingParameter("id".to_string()))?;
            Ok(json!({ "updated": id }))
        })
        .register(TEST_ACTION_WHOAMI, |invocation| {
            Ok(json!({ "user": invocation.identity.map(|i| i.id) }))
        })
}

fn csrf() -> [(&'static str, &'static str); 1] {
    [("x-csrf-token", TEST_CSRF_TOKEN)]
}

// ============================================================================
// Successful dispatch
// ============================================================================

#[tokio::test]
async fn test_dispatch_by_query_and_path() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let app = TestApp::new(&fixture, registry());
    let descriptor = RouteDescriptor::new(TEST_ACTION_UPDATE_USER).with_param("id", 7);
    let token = fixture.issue_action(&descriptor, None)?;

    for uri in [
        format!("/jwt/route?jwt={}", token.as_str()),
        format!("/jwt/route/{}", token.as_str()),
    ] {
        let response = app.get(&uri, &csrf()).await?;
        assert_eq!(response.status, StatusCode::OK, "uri: {uri}");
        assert_eq!(response.json()?, json!({"updated": 7}));
    }
    Ok(())
}

#[tokio::test]
async fn test_dispatch_assumes_token_identity() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let app = TestApp::new(&fixture, registry());
    let whoami = RouteDescriptor::new(TEST_ACTION_WHOAMI);

    let bound = fixture.issue_action(&whoami, Some(TEST_USER_ACTIVE_ID))?;
    let response = app
        .get(&format!("/jwt/route/{}", bound.as_str()), &csrf())
        .await?;
    assert_eq!(response.json()?, json!({"user": "42"}));

    let anonymous = fixture.issue_action(&whoami, None)?;
    let response = app
        .get(&format!("/jwt/route/{}", anonymous.as_str()), &csrf())
        .await?;
    assert_eq!(response.json()?, json!({"user": Value::Null}));
    Ok(())
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_unclaimable_tokens_are_not_found() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let app = TestApp::new(&fixture, registry());
    let token = fixture.issue_action(&RouteDescriptor::new(TEST_ACTION_WHOAMI), None)?;
    let path = format!("/jwt/route/{}", token.as_str());

    // Garbage, missing anti-forgery header, expired
    let garbage = app.get("/jwt/route/not-a-jwt", &csrf()).await?;
    let no_csrf = app.get(&path, &[]).await?;
    fixture.clock.set(4600);
    let expired = app.get(&path, &csrf()).await?;

    for response in [garbage, no_csrf, expired] {
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(
            response.json()?,
            json!({"error": {"code": "NOT_FOUND", "message": "Invalid token."}})
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_unregistered_action_is_not_found() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let app = TestApp::new(&fixture, registry());
    let token = fixture.issue_action(&RouteDescriptor::new("users/delete"), None)?;

    let response = app
        .get(&format!("/jwt/route?jwt={}", token.as_str()), &csrf())
        .await?;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_missing_jwt_parameter_is_bad_request() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let app = TestApp::new(&fixture, registry());

    for uri in ["/jwt/route", "/jwt/route?jwt="] {
        let response = app.get(uri, &csrf()).await?;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "uri: {uri}");
        assert_eq!(
            response.json()?,
            json!({"error": {"code": "MISSING_PARAMETER", "message": "Missing required parameter: jwt"}})
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_handler_error_is_returned() -> Result<(), anyhow::Error> {
    let fixture = TestProfiles::new(Algorithm::HS512, 1000);
    let app = TestApp::new(&fixture, registry());
    let token = fixture.issue_action(&RouteDescriptor::new(TEST_ACTION_UPDATE_USER), None)?;

    let response = app
        .get(&format!("/jwt/route/{}", token.as_str()), &csrf())
        .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    Ok(())
}
