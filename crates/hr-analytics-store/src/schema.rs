//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary records, keyed by `user_id || 0x00 || time`.
    pub const RECORDS: &str = "records";

    /// Index: records by time, keyed by `time || user_id`.
    /// Value is empty (index only).
    pub const RECORDS_BY_TIME: &str = "records_by_time";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::RECORDS, cf::RECORDS_BY_TIME]
}
