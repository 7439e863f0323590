//! Storage layer for hr-analytics.
//!
//! The analytics table holds one row per HR assistant query, keyed by
//! `(user_id, timestamp)`. Two backends implement the [`Store`] trait:
//!
//! - [`RocksStore`] (feature `rocksdb-backend`, on by default): persistent,
//!   with a time-ordered secondary index for window scans.
//! - [`MemoryStore`]: process-local, used by tests and ephemeral deployments.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use hr_analytics_core::{QueryRecord, TimeWindow};
//! use hr_analytics_store::{RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/hr-analytics/QueryAnalytics").unwrap();
//!
//! let record = QueryRecord::new("user123", Utc::now()).with_category("benefits");
//! store.put_record(&record).unwrap();
//!
//! let last_week = store.scan_window(&TimeWindow::last_days(Utc::now(), 7)).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};
use hr_analytics_core::{QueryRecord, TimeWindow};

/// The storage trait defining all table operations.
pub trait Store: Send + Sync {
    /// Insert or replace a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_record(&self, record: &QueryRecord) -> Result<()> {
        self.put_records(std::slice::from_ref(record))
    }

    /// Insert or replace many records in one atomic write.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; nothing is written.
    fn put_records(&self, records: &[QueryRecord]) -> Result<()>;

    /// Get a record by its primary key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_record(&self, user_id: &str, timestamp: DateTime<Utc>) -> Result<Option<QueryRecord>>;

    /// List one user's records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_user_records(&self, user_id: &str, limit: usize) -> Result<Vec<QueryRecord>>;

    /// All records with `window.start <= timestamp < window.end`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn scan_window(&self, window: &TimeWindow) -> Result<Vec<QueryRecord>>;

    /// Every record in the table, ordered by user then time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn scan_all(&self) -> Result<Vec<QueryRecord>>;

    /// Number of records in the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count(&self) -> Result<usize>;

    /// Delete a record by its primary key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the record doesn't exist.
    fn delete_record(&self, user_id: &str, timestamp: DateTime<Utc>) -> Result<()>;

    /// Delete every record, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn clear(&self) -> Result<usize>;
}
