//! Core types and aggregations for hr-analytics.
//!
//! This crate provides the foundational pieces shared by the service, store,
//! client, and admin tooling:
//!
//! - **Records**: `QueryRecord`, `RecordInput`, `Seniority`
//! - **Windows**: `TimeWindow`, `WindowParams`, `RangePreset`
//! - **Metrics**: usage, categories, performance, demographics, dashboard stats
//!
//! Everything here is pure: no I/O, no clocks. Callers pass `now` explicitly
//! so results are reproducible in tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod metrics;
pub mod record;
pub mod window;

pub use error::{AnalyticsError, Result};
pub use metrics::{
    category_metrics, category_windows, dashboard_stats, demographic_metrics,
    performance_metrics, usage_metrics, CategoryMetrics, DashboardStats, DemographicMetrics,
    PerformanceMetrics, TrendingTopic, UsageMetrics,
};
pub use record::{
    key_precision, parse_timestamp, sample_records, QueryRecord, RecordInput, Seniority,
};
pub use window::{RangePreset, TimeWindow, WindowParams};

/// Default name of the analytics table.
pub const DEFAULT_TABLE_NAME: &str = "QueryAnalytics";
