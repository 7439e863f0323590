//! Metric aggregations over analytics records.
//!
//! Each function is a pure fold over a slice of records. Percentages and
//! averages are rounded to two decimals; any division by zero reports `0`.

// Record counts stay far below 2^52, so usize -> f64 is exact here.
#![allow(clippy::cast_precision_loss)]

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{QueryRecord, Seniority};
use crate::window::TimeWindow;

/// Number of entries in the top-categories list.
pub const TOP_CATEGORIES: usize = 5;

/// Length of each category comparison window, in days.
pub const CATEGORY_WINDOW_DAYS: i64 = 7;

/// Query volume and user activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    /// Number of queries in the window.
    pub total_queries: usize,
    /// Distinct users in the window.
    pub unique_users: usize,
    /// Queries divided by distinct users.
    pub avg_queries_per_user: f64,
    /// Distinct users per UTC day (`YYYY-MM-DD`).
    pub daily_active_users: BTreeMap<String, usize>,
    /// Queries per UTC day.
    pub query_volume: BTreeMap<String, usize>,
}

/// Compute usage metrics.
#[must_use]
pub fn usage_metrics(records: &[QueryRecord]) -> UsageMetrics {
    let mut unique_users = HashSet::new();
    let mut users_by_day: BTreeMap<String, HashSet<&str>> = BTreeMap::new();
    let mut query_volume: BTreeMap<String, usize> = BTreeMap::new();

    for record in records {
        let day = record.timestamp.format("%Y-%m-%d").to_string();
        unique_users.insert(record.user_id.as_str());
        users_by_day
            .entry(day.clone())
            .or_default()
            .insert(record.user_id.as_str());
        *query_volume.entry(day).or_default() += 1;
    }

    let total_queries = records.len();
    let avg_queries_per_user = ratio(total_queries as f64, unique_users.len() as f64);

    UsageMetrics {
        total_queries,
        unique_users: unique_users.len(),
        avg_queries_per_user: round2(avg_queries_per_user),
        daily_active_users: users_by_day
            .into_iter()
            .map(|(day, users)| (day, users.len()))
            .collect(),
        query_volume,
    }
}

/// Category distribution and trends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetrics {
    /// Queries per category in the recent window.
    pub category_distribution: BTreeMap<String, usize>,
    /// Largest categories, as `[category, count]` pairs.
    pub top_5_categories: Vec<(String, usize)>,
    /// Growth of each recent category against the previous window.
    pub trending_topics: Vec<TrendingTopic>,
}

/// Growth of one category between two windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingTopic {
    /// Category name.
    pub category: String,
    /// Percentage growth; `None` when the category is new.
    pub growth: Option<f64>,
    /// The category had no queries in the previous window.
    pub is_new: bool,
    /// Queries in the recent window.
    pub recent_count: usize,
    /// Queries in the previous window.
    pub previous_count: usize,
}

/// The recent and previous comparison windows for category trends.
#[must_use]
pub fn category_windows(now: DateTime<Utc>) -> (TimeWindow, TimeWindow) {
    let recent = TimeWindow::last_days(now, CATEGORY_WINDOW_DAYS);
    let previous = TimeWindow::new(
        recent.start - Duration::days(CATEGORY_WINDOW_DAYS),
        recent.start,
    );
    (recent, previous)
}

/// Compute category metrics from the recent and previous window rows.
#[must_use]
pub fn category_metrics(recent: &[QueryRecord], previous: &[QueryRecord]) -> CategoryMetrics {
    let recent_counts = count_by(recent, |r| r.category_label().to_string());
    let previous_counts = count_by(previous, |r| r.category_label().to_string());

    let mut top: Vec<(String, usize)> = recent_counts
        .iter()
        .map(|(category, count)| (category.clone(), *count))
        .collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(TOP_CATEGORIES);

    let mut trending: Vec<TrendingTopic> = recent_counts
        .iter()
        .map(|(category, &recent_count)| {
            let previous_count = previous_counts.get(category).copied().unwrap_or(0);
            let growth = (previous_count > 0).then(|| {
                round2(
                    (recent_count as f64 - previous_count as f64) / previous_count as f64 * 100.0,
                )
            });
            TrendingTopic {
                category: category.clone(),
                growth,
                is_new: previous_count == 0,
                recent_count,
                previous_count,
            }
        })
        .collect();
    trending.sort_by(compare_trending);

    CategoryMetrics {
        category_distribution: recent_counts,
        top_5_categories: top,
        trending_topics: trending,
    }
}

/// New categories first, then fastest growth, then name.
fn compare_trending(a: &TrendingTopic, b: &TrendingTopic) -> Ordering {
    match (a.growth, b.growth) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.total_cmp(&x),
    }
    .then_with(|| a.category.cmp(&b.category))
}

/// Satisfaction, resolution, and latency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Number of queries considered.
    pub total_queries: usize,
    /// Percentage of queries rated 4 or higher.
    pub satisfaction_rate: f64,
    /// Percentage of queries resolved without human intervention.
    pub resolution_rate: f64,
    /// Mean seconds from query to response.
    pub average_response_time: f64,
}

/// Compute performance metrics.
#[must_use]
pub fn performance_metrics(records: &[QueryRecord]) -> PerformanceMetrics {
    let total = records.len();
    let satisfied = records
        .iter()
        .filter(|r| r.satisfaction.is_some_and(|s| s >= 4))
        .count();
    let resolved = records.iter().filter(|r| r.resolved).count();

    PerformanceMetrics {
        total_queries: total,
        satisfaction_rate: percentage(satisfied, total),
        resolution_rate: percentage(resolved, total),
        average_response_time: average_response_time(records),
    }
}

/// Department, seniority, and new-user breakdowns, as percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicMetrics {
    /// Share of queries per department.
    pub department_usage: BTreeMap<String, f64>,
    /// Share of queries per seniority level.
    pub seniority_usage: BTreeMap<String, f64>,
    /// Share of queries from new and returning users.
    pub new_vs_returning: BTreeMap<String, f64>,
}

/// Compute demographic metrics.
///
/// With no records every breakdown is empty. Otherwise the seniority and
/// new-vs-returning maps always carry all of their keys, even at zero.
#[must_use]
pub fn demographic_metrics(records: &[QueryRecord]) -> DemographicMetrics {
    let total = records.len();
    if total == 0 {
        return DemographicMetrics {
            department_usage: BTreeMap::new(),
            seniority_usage: BTreeMap::new(),
            new_vs_returning: BTreeMap::new(),
        };
    }

    let departments = count_by(records, |r| r.department_label().to_string());

    let mut seniority: HashMap<Seniority, usize> = HashMap::new();
    for record in records {
        *seniority.entry(record.seniority).or_default() += 1;
    }

    let new_users = records.iter().filter(|r| r.new_user).count();

    DemographicMetrics {
        department_usage: departments
            .into_iter()
            .map(|(dept, count)| (dept, percentage(count, total)))
            .collect(),
        seniority_usage: Seniority::ALL
            .iter()
            .map(|level| {
                let count = seniority.get(level).copied().unwrap_or(0);
                (level.as_str().to_string(), percentage(count, total))
            })
            .collect(),
        new_vs_returning: BTreeMap::from([
            ("new".to_string(), percentage(new_users, total)),
            ("returning".to_string(), percentage(total - new_users, total)),
        ]),
    }
}

/// Headline numbers for the dashboard landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Distinct users in the window.
    pub active_users: usize,
    /// Number of queries in the window.
    pub total_queries: usize,
    /// Mean rating as a percentage of the maximum (5), over valid ratings only.
    pub average_satisfaction: f64,
    /// Mean seconds from query to response.
    pub average_response_time: f64,
}

/// Compute dashboard stats.
#[must_use]
pub fn dashboard_stats(records: &[QueryRecord]) -> DashboardStats {
    let active_users: BTreeSet<&str> = records.iter().map(|r| r.user_id.as_str()).collect();

    let ratings: Vec<u32> = records
        .iter()
        .filter_map(|r| r.satisfaction)
        .filter(|s| (1..=5).contains(s))
        .map(u32::from)
        .collect();
    let rating_sum: u32 = ratings.iter().sum();
    let average_satisfaction = ratio(f64::from(rating_sum), ratings.len() as f64 * 5.0) * 100.0;

    DashboardStats {
        active_users: active_users.len(),
        total_queries: records.len(),
        average_satisfaction: round2(average_satisfaction),
        average_response_time: average_response_time(records),
    }
}

fn average_response_time(records: &[QueryRecord]) -> f64 {
    let times: Vec<f64> = records
        .iter()
        .filter_map(QueryRecord::response_time_seconds)
        .collect();
    round2(ratio(times.iter().sum(), times.len() as f64))
}

fn count_by<F>(records: &[QueryRecord], key: F) -> BTreeMap<String, usize>
where
    F: Fn(&QueryRecord) -> String,
{
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(key(record)).or_default() += 1;
    }
    counts
}

fn percentage(part: usize, whole: usize) -> f64 {
    round2(ratio(part as f64, whole as f64) * 100.0)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
