mod common;

use axum::http::StatusCode;
use serde_json::json;
use time::{Duration, OffsetDateTime};

use common::{test_config, Factory, TestApp};
use roster::config::Environment;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let response = app.server.get("/").await;

    response.assert_status(StatusCode::OK);
    response.assert_text("Hello, Roster!");
}

#[tokio::test]
async fn test_security_headers() {
    let app = TestApp::new().await;

    let response = app.server.get("/").await;

    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert_eq!(response.header("x-frame-options"), "DENY");
    assert_eq!(response.header("referrer-policy"), "no-referrer");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/v1/nothing-here").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Cannot GET /api/v1/nothing-here");
}

#[tokio::test]
async fn test_missing_token() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/v1/users/me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["statusCode"], 401);
    assert_eq!(
        body["message"],
        "You are not logged in! Please log in to get access."
    );
}

#[tokio::test]
async fn test_invalid_token() {
    let app = TestApp::new().await;

    let response = app
        .server
        .get("/api/v1/users/me")
        .add_header("Authorization", "Bearer invalid-token")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Invalid token. Please log in again.");
}

#[tokio::test]
async fn test_expired_token() {
    let app = TestApp::new().await;
    let factory = Factory::new(&app.state);
    let auth = factory.create_user().await;

    let expired = app
        .state
        .tokens
        .issue_at(auth.user.id, OffsetDateTime::now_utc() - Duration::hours(48))
        .unwrap();

    let response = app
        .server
        .get("/api/v1/users/me")
        .add_header("Authorization", format!("Bearer {}", expired))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Your token has expired! Please log in again.");
}

#[tokio::test]
async fn test_token_from_cookie() {
    let app = TestApp::new().await;
    let factory = Factory::new(&app.state);
    let auth = factory.create_user().await;

    let response = app
        .server
        .get("/api/v1/users/me")
        .add_header("Cookie", format!("jwt={}", auth.token))
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["user"]["id"], auth.user.id.to_string());
}

#[tokio::test]
async fn test_sign_in_cookie_authenticates() {
    let app = TestApp::new().await;
    let factory = Factory::new(&app.state);
    let auth = factory.create_user().await;

    let sign_in = app
        .server
        .post("/api/v1/auth/sign-in")
        .json(&json!({ "email": auth.user.email, "password": common::TEST_PASSWORD }))
        .await;
    let cookie = sign_in.cookie("jwt");

    let response = app
        .server
        .get("/api/v1/users/me")
        .add_header("Cookie", format!("jwt={}", cookie.value()))
        .await;

    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_password_change_invalidates_older_tokens() {
    let app = TestApp::new().await;
    let factory = Factory::new(&app.state);
    let auth = factory.create_user().await;

    // Issued well before the reset below
    let old_token = app
        .state
        .tokens
        .issue_at(auth.user.id, OffsetDateTime::now_utc() - Duration::minutes(5))
        .unwrap();

    app.server
        .get("/api/v1/users/me")
        .add_header("Authorization", format!("Bearer {}", old_token))
        .await
        .assert_status(StatusCode::OK);

    app.server
        .post("/api/v1/auth/forgot-password")
        .json(&json!({ "email": auth.user.email }))
        .await
        .assert_status(StatusCode::OK);
    let secret = app.last_reset_secret().await.unwrap();
    app.server
        .patch(&format!("/api/v1/auth/reset-password/{}", secret))
        .json(&json!({ "password": "N3w!Password" }))
        .await
        .assert_status(StatusCode::OK);

    let response = app
        .server
        .get("/api/v1/users/me")
        .add_header("Authorization", format!("Bearer {}", old_token))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(
        body["message"],
        "User recently changed password! Please log in again."
    );

    // A token issued after the change is accepted
    let fresh_token = app
        .state
        .tokens
        .issue_at(auth.user.id, OffsetDateTime::now_utc() + Duration::seconds(1))
        .unwrap();
    app.server
        .get("/api/v1/users/me")
        .add_header("Authorization", format!("Bearer {}", fresh_token))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_token_from_same_second_as_password_change_is_rejected() {
    let app = TestApp::new().await;
    let factory = Factory::new(&app.state);
    let auth = factory.create_user().await;

    app.server
        .post("/api/v1/auth/forgot-password")
        .json(&json!({ "email": auth.user.email }))
        .await
        .assert_status(StatusCode::OK);
    let secret = app.last_reset_secret().await.unwrap();

    // Stamped immediately before the change, usually within the same second
    let token = app.state.tokens.issue(auth.user.id).unwrap();

    app.server
        .patch(&format!("/api/v1/auth/reset-password/{}", secret))
        .json(&json!({ "password": "N3w!Password" }))
        .await
        .assert_status(StatusCode::OK);

    app.server
        .get("/api/v1/users/me")
        .add_header("Authorization", format!("Bearer {}", token))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_development_errors_include_details() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/v1/users/me").await;

    let body: serde_json::Value = response.json();
    assert_eq!(body["path"], "/api/v1/users/me");
    assert!(body["timestamp"].as_str().is_some());
    assert!(body["error"].as_str().unwrap().contains("Unauthorized"));
}

#[tokio::test]
async fn test_production_errors_hide_details() {
    let mut config = test_config();
    config.environment = Environment::Production;
    config.app_url = Some("https://roster.example.com".to_string());
    let app = TestApp::with_config(config).await;

    let response = app.server.get("/api/v1/users/me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert!(body.get("path").is_none());
    assert!(body.get("timestamp").is_none());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_production_cookie_is_secure() {
    let mut config = test_config();
    config.environment = Environment::Production;
    config.app_url = Some("https://roster.example.com".to_string());
    let app = TestApp::with_config(config).await;

    let response = app
        .server
        .post("/api/v1/auth/sign-up")
        .json(&json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "password": "Str0ng!Passw0rd",
            "position": "Analyst"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.cookie("jwt").secure(), Some(true));
}
