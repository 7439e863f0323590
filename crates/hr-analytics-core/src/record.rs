//! Analytics record types.
//!
//! A `QueryRecord` is one row of the analytics table: a single question asked
//! of the HR assistant, keyed by `(user_id, timestamp)`.

use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AnalyticsError, Result};

/// Label used when a category or department is missing.
pub const UNKNOWN: &str = "unknown";

/// Seniority level of the employee who asked the question.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    /// Junior staff.
    Junior,
    /// Mid-level staff.
    Mid,
    /// Senior staff.
    Senior,
    /// Missing or unrecognised level.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Seniority {
    /// All levels, in reporting order.
    pub const ALL: [Seniority; 4] = [Self::Junior, Self::Mid, Self::Senior, Self::Unknown];

    /// Classify a free-form value. Matching is case-insensitive; anything
    /// unrecognised is `Unknown`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "junior" => Self::Junior,
            "mid" => Self::Mid,
            "senior" => Self::Senior,
            _ => Self::Unknown,
        }
    }

    /// The wire name of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Junior => "junior",
            Self::Mid => "mid",
            Self::Senior => "senior",
            Self::Unknown => UNKNOWN,
        }
    }
}

/// A stored analytics row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Partition key: who asked.
    pub user_id: String,

    /// Sort key: when the query was logged.
    pub timestamp: DateTime<Utc>,

    /// Topic of the question (e.g. "benefits").
    pub category: Option<String>,

    /// Rating given by the user, nominally 1..=5.
    pub satisfaction: Option<u8>,

    /// Resolved without human intervention.
    pub resolved: bool,

    /// When the question was submitted.
    pub query_timestamp: Option<DateTime<Utc>>,

    /// When the answer was returned.
    pub response_timestamp: Option<DateTime<Utc>>,

    /// Department of the asking employee.
    pub department: Option<String>,

    /// Seniority of the asking employee.
    pub seniority: Seniority,

    /// First-time user of the assistant.
    pub new_user: bool,
}

impl QueryRecord {
    /// Create a bare record with only the primary key set.
    ///
    /// The timestamp is truncated to whole microseconds, the precision of the
    /// table key.
    #[must_use]
    pub fn new(user_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            timestamp: key_precision(timestamp),
            category: None,
            satisfaction: None,
            resolved: false,
            query_timestamp: None,
            response_timestamp: None,
            department: None,
            seniority: Seniority::Unknown,
            new_user: false,
        }
    }

    /// Set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the satisfaction rating.
    #[must_use]
    pub fn with_satisfaction(mut self, rating: u8) -> Self {
        self.satisfaction = Some(rating);
        self
    }

    /// Set the resolved flag.
    #[must_use]
    pub fn with_resolved(mut self, resolved: bool) -> Self {
        self.resolved = resolved;
        self
    }

    /// Set query and response times.
    #[must_use]
    pub fn with_response(mut self, query: DateTime<Utc>, response: DateTime<Utc>) -> Self {
        self.query_timestamp = Some(query);
        self.response_timestamp = Some(response);
        self
    }

    /// Set the department.
    #[must_use]
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Set the seniority level.
    #[must_use]
    pub fn with_seniority(mut self, seniority: Seniority) -> Self {
        self.seniority = seniority;
        self
    }

    /// Set the new-user flag.
    #[must_use]
    pub fn with_new_user(mut self, new_user: bool) -> Self {
        self.new_user = new_user;
        self
    }

    /// Category label, `unknown` when missing.
    #[must_use]
    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(UNKNOWN)
    }

    /// Department label, `unknown` when missing.
    #[must_use]
    pub fn department_label(&self) -> &str {
        self.department.as_deref().unwrap_or(UNKNOWN)
    }

    /// Seconds between query and response, when both are known.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn response_time_seconds(&self) -> Option<f64> {
        let (query, response) = self.query_timestamp.zip(self.response_timestamp)?;
        Some((response - query).num_milliseconds() as f64 / 1000.0)
    }
}

/// A record as it arrives on the wire (seed files, ingest API).
///
/// Booleans may be JSON booleans or the strings `"true"`/`"false"`, and the
/// rating may be a number or a numeric string. Timestamps stay raw until
/// [`QueryRecord::try_from`] validates them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordInput {
    /// Partition key.
    pub user_id: String,
    /// Sort key, RFC 3339 or naive ISO-8601 (UTC).
    pub timestamp: String,
    /// Topic of the question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Rating.
    #[serde(
        default,
        deserialize_with = "lenient_rating",
        skip_serializing_if = "Option::is_none"
    )]
    pub satisfaction: Option<i64>,
    /// Resolved flag.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub resolved: bool,
    /// Query submission time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_timestamp: Option<String>,
    /// Response time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_timestamp: Option<String>,
    /// Department.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Seniority, free-form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seniority: Option<String>,
    /// New-user flag.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub new_user: bool,
}

impl From<&QueryRecord> for RecordInput {
    fn from(record: &QueryRecord) -> Self {
        let format = |t: DateTime<Utc>| t.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true);
        Self {
            user_id: record.user_id.clone(),
            timestamp: format(record.timestamp),
            category: record.category.clone(),
            satisfaction: record.satisfaction.map(i64::from),
            resolved: record.resolved,
            query_timestamp: record.query_timestamp.map(format),
            response_timestamp: record.response_timestamp.map(format),
            department: record.department.clone(),
            seniority: Some(record.seniority.as_str().to_string()),
            new_user: record.new_user,
        }
    }
}

impl TryFrom<RecordInput> for QueryRecord {
    type Error = AnalyticsError;

    fn try_from(input: RecordInput) -> Result<Self> {
        let user_id = input.user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(AnalyticsError::EmptyUserId);
        }

        let timestamp =
            parse_timestamp(&input.timestamp).ok_or_else(|| AnalyticsError::InvalidTimestamp {
                field: "timestamp",
                value: input.timestamp.clone(),
            })?;

        let satisfaction = input
            .satisfaction
            .map(|r| u8::try_from(r).map_err(|_| AnalyticsError::InvalidRating(r)))
            .transpose()?;

        // Secondary timestamps are informational; a bad one is treated as absent.
        let query_timestamp = input.query_timestamp.as_deref().and_then(parse_timestamp);
        let response_timestamp = input.response_timestamp.as_deref().and_then(parse_timestamp);

        Ok(Self {
            user_id,
            timestamp: key_precision(timestamp),
            category: non_blank(input.category),
            satisfaction,
            resolved: input.resolved,
            query_timestamp,
            response_timestamp,
            department: non_blank(input.department),
            seniority: input
                .seniority
                .as_deref()
                .map_or(Seniority::Unknown, Seniority::parse),
            new_user: input.new_user,
        })
    }
}

/// Parse a timestamp in RFC 3339 or naive ISO-8601 form (assumed UTC).
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Truncate a timestamp to the microsecond precision rows are keyed on.
#[must_use]
pub fn key_precision(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(6)
}

/// The built-in sample rows used by `seed` when no file is given.
#[must_use]
pub fn sample_records(now: DateTime<Utc>) -> Vec<QueryRecord> {
    let at = |h: u32, m: u32| {
        Utc.with_ymd_and_hms(2025, 3, 15, h, m, 0)
            .single()
            .unwrap_or(now)
    };

    vec![
        QueryRecord::new("user123", now)
            .with_category("benefits")
            .with_satisfaction(4)
            .with_resolved(true)
            .with_response(at(9, 55), at(9, 59))
            .with_department("HR")
            .with_seniority(Seniority::Mid)
            .with_new_user(false),
        // Offset so both rows get distinct sort keys even for the same user.
        QueryRecord::new("user456", now + Duration::microseconds(1))
            .with_category("policies")
            .with_satisfaction(5)
            .with_resolved(false)
            .with_response(at(10, 5), at(10, 9))
            .with_department("IT")
            .with_seniority(Seniority::Senior)
            .with_new_user(true),
    ]
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrText {
    Bool(bool),
    Text(String),
}

fn lenient_bool<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<bool, D::Error> {
    match Option::<BoolOrText>::deserialize(deserializer)? {
        None => Ok(false),
        Some(BoolOrText::Bool(b)) => Ok(b),
        Some(BoolOrText::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            other => Err(D::Error::custom(format!("invalid boolean: {other}"))),
        },
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Int(i64),
    Text(String),
}

fn lenient_rating<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error> {
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Int(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid rating: {s}"))),
    }
}
