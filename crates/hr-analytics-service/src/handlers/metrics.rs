//! Metric handlers.
//!
//! Every handler scans the analytics table for its window and hands the rows
//! to the pure aggregations in `hr_analytics_core`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;

use hr_analytics_core::{
    category_metrics, category_windows, dashboard_stats, demographic_metrics,
    performance_metrics, usage_metrics, CategoryMetrics, DashboardStats, DemographicMetrics,
    PerformanceMetrics, QueryRecord, UsageMetrics, WindowParams,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Rows inside the requested window.
fn windowed_records(state: &AppState, params: &WindowParams) -> Result<Vec<QueryRecord>, ApiError> {
    let window = params.resolve(Utc::now());
    tracing::debug!(window = %window, "Scanning analytics window");
    Ok(state.store.scan_window(&window)?)
}

/// Query volume and active users.
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(params): Query<WindowParams>,
) -> Result<Json<UsageMetrics>, ApiError> {
    let records = windowed_records(&state, &params)?;

    tracing::info!(subject = %auth.subject, rows = records.len(), "Usage metrics requested");

    Ok(Json(usage_metrics(&records)))
}

/// Category distribution over the last week and growth against the week before.
pub async fn get_categories(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<CategoryMetrics>, ApiError> {
    let (recent_window, previous_window) = category_windows(Utc::now());
    let recent = state.store.scan_window(&recent_window)?;
    let previous = state.store.scan_window(&previous_window)?;

    tracing::info!(
        subject = %auth.subject,
        recent = recent.len(),
        previous = previous.len(),
        "Category metrics requested"
    );

    Ok(Json(category_metrics(&recent, &previous)))
}

/// Satisfaction and resolution rates.
///
/// Covers the whole table unless a window is given.
pub async fn get_performance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(params): Query<WindowParams>,
) -> Result<Json<PerformanceMetrics>, ApiError> {
    let records = if params.is_specified() {
        windowed_records(&state, &params)?
    } else {
        state.store.scan_all()?
    };

    tracing::info!(subject = %auth.subject, rows = records.len(), "Performance metrics requested");

    Ok(Json(performance_metrics(&records)))
}

/// Department, seniority, and new-user breakdowns.
pub async fn get_demographics(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(params): Query<WindowParams>,
) -> Result<Json<DemographicMetrics>, ApiError> {
    let records = windowed_records(&state, &params)?;

    tracing::info!(subject = %auth.subject, rows = records.len(), "Demographic metrics requested");

    Ok(Json(demographic_metrics(&records)))
}

/// Headline numbers for the dashboard.
pub async fn get_dashboard_stats(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(params): Query<WindowParams>,
) -> Result<Json<DashboardStats>, ApiError> {
    let records = windowed_records(&state, &params)?;

    tracing::info!(subject = %auth.subject, rows = records.len(), "Dashboard stats requested");

    Ok(Json(dashboard_stats(&records)))
}
