//! Client SDK tests against a mocked service.

use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hr_analytics_client::{AnalyticsClient, ClientError, ClientOptions};
use hr_analytics_core::{QueryRecord, RangePreset, WindowParams};

fn dashboard_client(server: &MockServer) -> AnalyticsClient {
    AnalyticsClient::new(server.uri())
        .unwrap()
        .with_bearer_token("test-jwt")
}

fn ingest_client(server: &MockServer) -> AnalyticsClient {
    AnalyticsClient::with_options(server.uri(), ClientOptions::with_service_name("seeder"))
        .unwrap()
        .with_api_key("secret")
}

#[tokio::test]
async fn usage_sends_bearer_and_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usage"))
        .and(query_param("range", "30d"))
        .and(header("authorization", "Bearer test-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_queries": 3,
            "unique_users": 2,
            "avg_queries_per_user": 1.5,
            "daily_active_users": {"2025-03-15": 2},
            "query_volume": {"2025-03-15": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let usage = dashboard_client(&server)
        .usage(&WindowParams::preset(RangePreset::ThirtyDays))
        .await
        .unwrap();

    assert_eq!(usage.total_queries, 3);
    assert_eq!(usage.unique_users, 2);
    assert_eq!(usage.daily_active_users.get("2025-03-15"), Some(&2));
}

#[tokio::test]
async fn categories_parse_new_topics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "category_distribution": {"benefits": 2},
            "top_5_categories": [["benefits", 2]],
            "trending_topics": [
                {
                    "category": "benefits",
                    "growth": null,
                    "is_new": true,
                    "recent_count": 2,
                    "previous_count": 0
                }
            ]
        })))
        .mount(&server)
        .await;

    let categories = dashboard_client(&server).categories().await.unwrap();

    assert_eq!(categories.top_5_categories, vec![("benefits".to_string(), 2)]);
    assert!(categories.trending_topics[0].is_new);
    assert_eq!(categories.trending_topics[0].growth, None);
}

#[tokio::test]
async fn unauthorized_maps_to_typed_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/performance"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "unauthorized", "message": "unauthorized"}
        })))
        .mount(&server)
        .await;

    let err = dashboard_client(&server)
        .performance(&WindowParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized { .. }));
}

#[tokio::test]
async fn non_json_error_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/demographics"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let err = dashboard_client(&server)
        .demographics(&WindowParams::default())
        .await
        .unwrap_err();

    match err {
        ClientError::Api { status, code, .. } => {
            assert_eq!(status, 503);
            assert_eq!(code, "unknown");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn put_record_sends_service_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/records"))
        .and(header("x-api-key", "secret"))
        .and(header("x-service-name", "seeder"))
        .and(body_partial_json(json!({
            "user_id": "user123",
            "timestamp": "2025-03-15T09:55:00Z",
            "category": "benefits"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stored": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let record = QueryRecord::new("user123", Utc.with_ymd_and_hms(2025, 3, 15, 9, 55, 0).unwrap())
        .with_category("benefits");
    let response = ingest_client(&server).put_record(&record).await.unwrap();

    assert_eq!(response.stored, 1);
}

#[tokio::test]
async fn put_records_splits_large_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/records/batch"))
        .respond_with(|request: &wiremock::Request| {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            let stored = body["records"].as_array().unwrap().len();
            ResponseTemplate::new(200).set_body_json(json!({ "stored": stored }))
        })
        .expect(2)
        .mount(&server)
        .await;

    let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
    let records: Vec<QueryRecord> = (0..1500)
        .map(|i| QueryRecord::new(format!("user{i}"), start + chrono::Duration::seconds(i)))
        .collect();

    let response = ingest_client(&server).put_records(&records).await.unwrap();

    assert_eq!(response.stored, 1500);
}

#[tokio::test]
async fn health_needs_no_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "service": "hr-analytics",
            "version": "0.1.0"
        })))
        .mount(&server)
        .await;

    let health = AnalyticsClient::new(server.uri())
        .unwrap()
        .health()
        .await
        .unwrap();

    assert_eq!(health.status, "ok");
}
