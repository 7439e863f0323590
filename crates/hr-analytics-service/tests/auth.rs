//! Authentication integration tests.

mod common;

use std::sync::Arc;

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, AUTHORIZATION, ORIGIN,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum_test::TestServer;
use chrono::Utc;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{
    bearer, claims_for, sign_token, test_config, test_jwks, valid_claims, TestHarness,
    TEST_CLIENT_ID,
};
use hr_analytics_service::{create_router, AppState};
use hr_analytics_store::MemoryStore;

async fn get_usage(harness: &TestHarness, auth: HeaderValue) -> axum_test::TestResponse {
    harness
        .server
        .get("/usage")
        .add_header(AUTHORIZATION, auth)
        .await
}

// ============================================================================
// Bearer tokens
// ============================================================================

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let harness = TestHarness::new();

    for route in ["/usage", "/categories", "/performance", "/demographics", "/dashboard_stats"] {
        let response = harness.server.get(route).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED, "{route}");
    }

    let response = harness.server.get("/usage").await;
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn valid_token_is_accepted() {
    let harness = TestHarness::new();

    let response = get_usage(&harness, TestHarness::user_auth_header()).await;

    response.assert_status_ok();
}

#[tokio::test]
async fn access_token_with_client_id_is_accepted() {
    let harness = TestHarness::new();
    let mut claims = valid_claims();
    claims["token_use"] = json!("access");
    claims["client_id"] = json!(TEST_CLIENT_ID);
    claims.as_object_mut().unwrap().remove("aud");

    let response = get_usage(&harness, bearer(&sign_token(&claims))).await;

    response.assert_status_ok();
}

#[tokio::test]
async fn non_bearer_scheme_is_unauthorized() {
    let harness = TestHarness::new();
    let token = sign_token(&valid_claims());

    let response = get_usage(
        &harness,
        HeaderValue::from_str(&format!("Basic {token}")).unwrap(),
    )
    .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_token_is_unauthorized() {
    let harness = TestHarness::new();

    let response = get_usage(&harness, bearer("not.a.jwt")).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_issuer_is_unauthorized() {
    let harness = TestHarness::new();

    let response = get_usage(
        &harness,
        bearer(&sign_token(&claims_for("https://elsewhere.test/pool"))),
    )
    .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn foreign_audience_is_unauthorized() {
    let harness = TestHarness::new();
    let mut claims = valid_claims();
    claims["aud"] = json!("some-other-app");

    let response = get_usage(&harness, bearer(&sign_token(&claims))).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let harness = TestHarness::new();
    let mut claims = valid_claims();
    claims["exp"] = json!(Utc::now().timestamp() - 3600);

    let response = get_usage(&harness, bearer(&sign_token(&claims))).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_token_use_is_unauthorized() {
    let harness = TestHarness::new();
    let mut claims = valid_claims();
    claims["token_use"] = json!("refresh");

    let response = get_usage(&harness, bearer(&sign_token(&claims))).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// CORS
// ============================================================================

#[tokio::test]
async fn cors_preflight_succeeds_without_auth() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .method(Method::OPTIONS, "/usage")
        .add_header(ORIGIN, HeaderValue::from_static("https://dashboard.example.com"))
        .add_header(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("GET"))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("*"))
    );
}

// ============================================================================
// JWKS fetched from the issuer
// ============================================================================

fn remote_jwks_server(issuer: &str) -> TestServer {
    let config = hr_analytics_service::ServiceConfig {
        auth_issuer: issuer.to_string(),
        ..test_config(None)
    };
    let state = AppState::new(Arc::new(MemoryStore::new()), config);
    TestServer::new(create_router(state)).expect("Failed to create test server")
}

#[tokio::test]
async fn jwks_is_fetched_once_and_cached() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_jwks()))
        .expect(1)
        .mount(&mock)
        .await;

    let server = remote_jwks_server(&mock.uri());
    let auth = bearer(&sign_token(&claims_for(&mock.uri())));

    for _ in 0..2 {
        let response = server
            .get("/usage")
            .add_header(AUTHORIZATION, auth.clone())
            .await;
        response.assert_status_ok();
    }
}

#[tokio::test]
async fn jwks_fetch_failure_is_bad_gateway() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock)
        .await;

    let server = remote_jwks_server(&mock.uri());
    let response = server
        .get("/usage")
        .add_header(AUTHORIZATION, bearer(&sign_token(&claims_for(&mock.uri()))))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "external_service_error");
}

#[tokio::test]
async fn unknown_kid_is_unauthorized_after_refresh() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keys": []})))
        .mount(&mock)
        .await;

    let server = remote_jwks_server(&mock.uri());
    let response = server
        .get("/usage")
        .add_header(AUTHORIZATION, bearer(&sign_token(&claims_for(&mock.uri()))))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// JWKS loaded from a file
// ============================================================================

const JWKS_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/jwks.json");

fn jwks_file_server(issuer: &str, jwks_path: &str) -> TestServer {
    let config = hr_analytics_service::ServiceConfig {
        auth_issuer: issuer.to_string(),
        auth_jwks_path: Some(jwks_path.to_string()),
        ..test_config(None)
    };
    let state = AppState::new(Arc::new(MemoryStore::new()), config);
    TestServer::new(create_router(state)).expect("Failed to create test server")
}

#[tokio::test]
async fn jwks_file_verifies_tokens_without_the_issuer() {
    // Nothing listens on the issuer, so any fetch would fail the request.
    let issuer = "http://127.0.0.1:9/pool";
    let server = jwks_file_server(issuer, JWKS_FILE);

    let response = server
        .get("/usage")
        .add_header(AUTHORIZATION, bearer(&sign_token(&claims_for(issuer))))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn jwks_file_rejects_unknown_kid() {
    let issuer = "http://127.0.0.1:9/pool";
    let server = jwks_file_server(issuer, JWKS_FILE);

    let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
    header.kid = Some("rotated-away".into());
    let key = jsonwebtoken::EncodingKey::from_rsa_pem(include_bytes!("fixtures/test_key.pem"))
        .expect("Invalid test key");
    let token = jsonwebtoken::encode(&header, &claims_for(issuer), &key).unwrap();

    let response = server
        .get("/usage")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_jwks_file_falls_back_to_the_issuer() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_jwks()))
        .expect(1)
        .mount(&mock)
        .await;

    let server = jwks_file_server(&mock.uri(), "tests/fixtures/no-such-jwks.json");
    let response = server
        .get("/usage")
        .add_header(AUTHORIZATION, bearer(&sign_token(&claims_for(&mock.uri()))))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn unparsable_jwks_file_falls_back_to_the_issuer() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_jwks()))
        .expect(1)
        .mount(&mock)
        .await;

    let not_jwks = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test_key.pem");
    let server = jwks_file_server(&mock.uri(), not_jwks);
    let response = server
        .get("/usage")
        .add_header(AUTHORIZATION, bearer(&sign_token(&claims_for(&mock.uri()))))
        .await;

    response.assert_status_ok();
}
