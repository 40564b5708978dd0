//! Integration tests for health, the widget handshake and token minting.

use contactdeck::bridge::ScriptedBridge;
use contactdeck_integration_tests::{TestContext, WORKSPACE_KEY, WORKSPACE_SECRET};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use reqwest::StatusCode;
use serde_json::Value;

fn decode(token: &str) -> Value {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.set_issuer(&[WORKSPACE_KEY]);

    jsonwebtoken::decode::<Value>(
        token,
        &DecodingKey::from_secret(WORKSPACE_SECRET.as_bytes()),
        &validation,
    )
    .expect("Token should verify with the workspace secret")
    .claims
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::start(ScriptedBridge::contacts()).await;

    let resp = ctx
        .client
        .get(ctx.url("/health"))
        .send()
        .await
        .expect("Failed to call health");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("Failed to read body"), "ok");
}

#[tokio::test]
async fn test_handshake_redirects_when_signed_out() {
    let ctx = TestContext::start(ScriptedBridge::contacts()).await;

    let resp = ctx
        .client
        .get(ctx.url("/"))
        .send()
        .await
        .expect("Failed to call handshake");

    assert!(resp.status().is_redirection());
    assert_eq!(
        resp.headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some("/sign-in")
    );
}

#[tokio::test]
async fn test_handshake_returns_fresh_token() {
    let ctx = TestContext::start(ScriptedBridge::contacts()).await;

    let resp = ctx.get("/").send().await.expect("Failed to call handshake");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("no-store")
    );

    let body: Value = resp.json().await.expect("Failed to parse handshake");
    assert_eq!(body["connection"], "hubspot");

    let claims = decode(body["token"].as_str().expect("token should be a string"));
    assert_eq!(claims["id"], "user_123");
    assert_eq!(claims["name"], "Test User");
    assert_eq!(claims["fields"]["emails"][0], "test@example.com");
    assert_eq!(claims["iss"], WORKSPACE_KEY);
    assert!(claims.get("exp").is_none());
}

#[tokio::test]
async fn test_session_token_requires_identity() {
    let ctx = TestContext::start(ScriptedBridge::contacts()).await;

    let signed_out = ctx
        .client
        .get(ctx.url("/api/session-token"))
        .send()
        .await
        .expect("Failed to call session-token");
    assert_eq!(signed_out.status(), StatusCode::UNAUTHORIZED);

    let signed_in = ctx
        .get("/api/session-token")
        .send()
        .await
        .expect("Failed to call session-token");
    assert_eq!(signed_in.status(), StatusCode::OK);

    let body: Value = signed_in.json().await.expect("Failed to parse token");
    let claims = decode(body["token"].as_str().expect("token should be a string"));
    assert_eq!(claims["id"], "user_123");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let ctx = TestContext::start(ScriptedBridge::contacts()).await;

    let resp = ctx
        .client
        .get(ctx.url("/health"))
        .header("x-request-id", "req-42")
        .send()
        .await
        .expect("Failed to call health");

    assert_eq!(
        resp.headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-42")
    );
}
