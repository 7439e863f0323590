//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, metrics, records};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for metric endpoints.
const METRICS_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Maximum concurrent requests for ingest endpoints.
const INGEST_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Metrics (bearer JWT auth, also served under `/metrics`)
/// - `GET /usage` - Query volume and active users
/// - `GET /categories` - Category distribution and trends
/// - `GET /performance` - Satisfaction and resolution rates
/// - `GET /demographics` - Department and seniority breakdowns
/// - `GET /dashboard_stats` - Headline dashboard numbers
///
/// ## Ingest (Service API Key auth)
/// - `POST /records` - Store one record
/// - `POST /records/batch` - Store many records atomically
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let metric_routes = Router::new()
        .route("/usage", get(metrics::get_usage))
        .route("/categories", get(metrics::get_categories))
        .route("/performance", get(metrics::get_performance))
        .route("/demographics", get(metrics::get_demographics))
        .route("/dashboard_stats", get(metrics::get_dashboard_stats))
        .layer(ConcurrencyLimitLayer::new(METRICS_MAX_CONCURRENT_REQUESTS));

    let ingest_routes = Router::new()
        .route("/", post(records::put_record))
        .route("/batch", post(records::put_records_batch))
        .layer(ConcurrencyLimitLayer::new(INGEST_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .merge(metric_routes.clone())
        .nest("/metrics", metric_routes)
        .nest("/records", ingest_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}
