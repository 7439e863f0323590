//! Common test utilities for hr-analytics integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use hr_analytics_core::QueryRecord;
use hr_analytics_service::{create_router, AppState, Jwks, ServiceConfig};
use hr_analytics_store::{MemoryStore, Store};

/// Issuer the test tokens claim.
pub const TEST_ISSUER: &str = "https://issuer.test/pool";

/// App client the test tokens are issued to.
pub const TEST_CLIENT_ID: &str = "dashboard-client";

/// Key ID of the test signing key.
pub const TEST_KID: &str = "test-key-1";

const TEST_PRIVATE_KEY: &[u8] = include_bytes!("fixtures/test_key.pem");
const TEST_JWKS: &str = include_str!("fixtures/jwks.json");

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The backing table, for seeding and inspecting rows.
    pub store: Arc<MemoryStore>,
    /// The service API key for ingest requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with an empty table.
    pub fn new() -> Self {
        let service_api_key = "test-service-key".to_string();
        let config = test_config(Some(service_api_key.clone()));
        let store = Arc::new(MemoryStore::new());

        let state = AppState::with_key_set(store.clone(), config, &test_jwks());
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            service_api_key,
        }
    }

    /// Create a harness whose table already holds `records`.
    pub fn with_records(records: &[QueryRecord]) -> Self {
        let harness = Self::new();
        harness
            .store
            .put_records(records)
            .expect("Failed to seed records");
        harness
    }

    /// Authorization header for a valid dashboard user.
    pub fn user_auth_header() -> HeaderValue {
        bearer(&sign_token(&valid_claims()))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration shared by every test server.
pub fn test_config(service_api_key: Option<String>) -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        auth_issuer: TEST_ISSUER.into(),
        auth_client_ids: vec![TEST_CLIENT_ID.into()],
        service_api_key,
        ..ServiceConfig::default()
    }
}

/// The public half of the test signing key.
pub fn test_jwks() -> Jwks {
    serde_json::from_str(TEST_JWKS).expect("Invalid test JWKS")
}

/// Claims of an ID token that passes every check, valid for an hour.
pub fn valid_claims() -> Value {
    claims_for(TEST_ISSUER)
}

/// Valid claims except for the issuer.
pub fn claims_for(issuer: &str) -> Value {
    json!({
        "sub": "0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0",
        "iss": issuer,
        "aud": TEST_CLIENT_ID,
        "token_use": "id",
        "exp": Utc::now().timestamp() + 3600,
        "cognito:username": "jdoe",
        "email": "jdoe@example.com"
    })
}

/// Sign claims with the test key.
pub fn sign_token(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.into());
    let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY).expect("Invalid test key");
    encode(&header, claims, &key).expect("Failed to sign token")
}

/// `Bearer <token>` header value.
pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).expect("Invalid header value")
}

/// Header name helper for custom headers.
pub fn header(name: &'static str) -> HeaderName {
    HeaderName::from_static(name)
}
