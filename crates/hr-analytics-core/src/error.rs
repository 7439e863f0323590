//! Error types for hr-analytics.

/// Result type for hr-analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Errors that can occur while building or validating analytics records.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// The partition key is missing or blank.
    #[error("user_id must not be empty")]
    EmptyUserId,

    /// A required timestamp could not be parsed.
    #[error("invalid {field}: {value}")]
    InvalidTimestamp {
        /// The field that failed to parse.
        field: &'static str,
        /// The raw value.
        value: String,
    },

    /// A satisfaction rating outside the storable range.
    #[error("invalid satisfaction rating: {0}")]
    InvalidRating(i64),
}
