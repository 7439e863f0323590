//! Record ingestion integration tests.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderValue, StatusCode};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use common::{header, TestHarness};
use hr_analytics_store::Store;

fn api_key(harness: &TestHarness) -> HeaderValue {
    HeaderValue::from_str(&harness.service_api_key).unwrap()
}

// ============================================================================
// Single record
// ============================================================================

#[tokio::test]
async fn put_record_stores_row() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/records")
        .add_header(header("x-api-key"), api_key(&harness))
        .add_header(header("x-service-name"), HeaderValue::from_static("chatbot"))
        .json(&json!({
            "user_id": "user123",
            "timestamp": "2025-03-15T09:55:00.123456",
            "category": "benefits",
            "satisfaction": "5",
            "resolved": "true",
            "department": "HR",
            "seniority": "Senior",
            "new_user": false
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["stored"], 1);

    let timestamp = Utc.with_ymd_and_hms(2025, 3, 15, 9, 55, 0).unwrap()
        + chrono::Duration::microseconds(123_456);
    let stored = harness
        .store
        .get_record("user123", timestamp)
        .unwrap()
        .unwrap();
    assert_eq!(stored.satisfaction, Some(5));
    assert!(stored.resolved);
    assert_eq!(stored.seniority.as_str(), "senior");
}

#[tokio::test]
async fn put_record_requires_api_key() {
    let harness = TestHarness::new();
    let record = json!({"user_id": "user123", "timestamp": "2025-03-15T09:55:00Z"});

    let response = harness.server.post("/records").json(&record).await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = harness
        .server
        .post("/records")
        .add_header(header("x-api-key"), HeaderValue::from_static("wrong-key"))
        .json(&record)
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    // A dashboard token is not an ingest credential.
    let response = harness
        .server
        .post("/records")
        .add_header(AUTHORIZATION, TestHarness::user_auth_header())
        .json(&record)
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    assert_eq!(harness.store.count().unwrap(), 0);
}

#[tokio::test]
async fn put_record_rejects_bad_timestamp() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/records")
        .add_header(header("x-api-key"), api_key(&harness))
        .json(&json!({"user_id": "user123", "timestamp": "yesterday"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "bad_request");
}

// ============================================================================
// Batch
// ============================================================================

#[tokio::test]
async fn batch_stores_all_rows() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/records/batch")
        .add_header(header("x-api-key"), api_key(&harness))
        .json(&json!({
            "records": [
                {"user_id": "alice", "timestamp": "2025-03-15T09:00:00Z", "category": "payroll"},
                {"user_id": "bob", "timestamp": "2025-03-15T10:00:00Z", "resolved": false},
                {"user_id": "alice", "timestamp": "2025-03-15T11:00:00Z", "satisfaction": 4}
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["stored"], 3);
    assert_eq!(harness.store.count().unwrap(), 3);
    assert_eq!(harness.store.list_user_records("alice", 10).unwrap().len(), 2);
}

#[tokio::test]
async fn batch_with_invalid_record_stores_nothing() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/records/batch")
        .add_header(header("x-api-key"), api_key(&harness))
        .json(&json!({
            "records": [
                {"user_id": "alice", "timestamp": "2025-03-15T09:00:00Z"},
                {"user_id": "   ", "timestamp": "2025-03-15T10:00:00Z"}
            ]
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("record 1:"));
    assert_eq!(harness.store.count().unwrap(), 0);
}

#[tokio::test]
async fn oversized_batch_is_rejected() {
    let harness = TestHarness::new();
    let records: Vec<Value> = (0..1001)
        .map(|i| json!({"user_id": format!("user{i}"), "timestamp": "2025-03-15T09:00:00Z"}))
        .collect();

    let response = harness
        .server
        .post("/records/batch")
        .add_header(header("x-api-key"), api_key(&harness))
        .json(&json!({ "records": records }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(harness.store.count().unwrap(), 0);
}

#[tokio::test]
async fn ingested_rows_feed_metrics() {
    let harness = TestHarness::new();
    let now = Utc::now().to_rfc3339();

    harness
        .server
        .post("/records")
        .add_header(header("x-api-key"), api_key(&harness))
        .json(&json!({"user_id": "alice", "timestamp": now, "category": "benefits"}))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/categories")
        .add_header(AUTHORIZATION, TestHarness::user_auth_header())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["category_distribution"], json!({"benefits": 1}));
}
