//! Time window resolution.
//!
//! Metric endpoints accept either a custom `start_date`/`end_date` pair or a
//! preset `range`. Both resolve to a half-open UTC interval `[start, end)`.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A half-open UTC time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Exclusive upper bound.
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window from explicit bounds.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `days` days leading up to `now`.
    #[must_use]
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        Self::new(now - Duration::days(days), now)
    }

    /// Whether `instant` falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Whether the window can contain no instant at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Preset look-back ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RangePreset {
    /// Last 7 days.
    #[default]
    SevenDays,
    /// Last 30 days.
    ThirtyDays,
    /// Last 3 months (90 days).
    ThreeMonths,
    /// Last 6 months (180 days).
    SixMonths,
    /// Last 9 months (270 days).
    NineMonths,
}

impl RangePreset {
    /// Parse a preset name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "7d" => Some(Self::SevenDays),
            "30d" => Some(Self::ThirtyDays),
            "3m" => Some(Self::ThreeMonths),
            "6m" => Some(Self::SixMonths),
            "9m" => Some(Self::NineMonths),
            _ => None,
        }
    }

    /// Length of the range in days.
    #[must_use]
    pub const fn days(self) -> i64 {
        match self {
            Self::SevenDays => 7,
            Self::ThirtyDays => 30,
            Self::ThreeMonths => 90,
            Self::SixMonths => 180,
            Self::NineMonths => 270,
        }
    }

    /// The wire name of the preset.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
            Self::ThreeMonths => "3m",
            Self::SixMonths => "6m",
            Self::NineMonths => "9m",
        }
    }
}

/// Window selection as given in a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowParams {
    /// Custom start day, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Custom end day, `YYYY-MM-DD`, included in full.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Preset name (`7d`, `30d`, `3m`, `6m`, `9m`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
}

impl WindowParams {
    /// Select a preset range.
    #[must_use]
    pub fn preset(preset: RangePreset) -> Self {
        Self {
            range: Some(preset.as_str().to_string()),
            ..Self::default()
        }
    }

    /// Select a custom day range.
    #[must_use]
    pub fn dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start_date: Some(start.format("%Y-%m-%d").to_string()),
            end_date: Some(end.format("%Y-%m-%d").to_string()),
            range: None,
        }
    }

    /// Whether the caller asked for any window at all.
    #[must_use]
    pub fn is_specified(&self) -> bool {
        [&self.start_date, &self.end_date, &self.range]
            .iter()
            .any(|v| present(v.as_deref()).is_some())
    }

    /// Resolve to a concrete window relative to `now`.
    ///
    /// A complete custom date pair wins over the preset. If either date fails
    /// to parse, or the end day is the last representable one, the result is
    /// the default 7-day range. An unknown preset name also means 7 days.
    #[must_use]
    pub fn resolve(&self, now: DateTime<Utc>) -> TimeWindow {
        if let (Some(start), Some(end)) = (
            present(self.start_date.as_deref()),
            present(self.end_date.as_deref()),
        ) {
            let end_exclusive =
                parse_day(end).and_then(|end| end.checked_add_signed(Duration::days(1)));
            return match (parse_day(start), end_exclusive) {
                (Some(start), Some(end)) => TimeWindow::new(start, end),
                _ => TimeWindow::last_days(now, RangePreset::default().days()),
            };
        }

        let preset = present(self.range.as_deref())
            .and_then(RangePreset::parse)
            .unwrap_or_default();
        TimeWindow::last_days(now, preset.days())
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_day(value: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}
