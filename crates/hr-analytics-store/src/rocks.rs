//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use hr_analytics_core::{QueryRecord, TimeWindow};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

type Db = DBWithThreadMode<MultiThreaded>;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<Db>,
}

impl RocksStore {
    /// Open or create a `RocksDB` table at the given path.
    ///
    /// Creating an existing table is a no-op, so this doubles as the
    /// bootstrap step.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = Db::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(path = %path.as_ref().display(), "Opened RocksDB table");

        Ok(Self { db: Arc::new(db) })
    }

    /// Remove the table's files entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the files cannot be removed (e.g. the table is open).
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        Db::destroy(&Options::default(), path.as_ref())
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_by_key(&self, key: &[u8]) -> Result<Option<QueryRecord>> {
        let cf = self.cf(cf::RECORDS)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }
}

impl Store for RocksStore {
    fn put_records(&self, records: &[QueryRecord]) -> Result<()> {
        let cf_records = self.cf(cf::RECORDS)?;
        let cf_by_time = self.cf(cf::RECORDS_BY_TIME)?;

        let mut batch = WriteBatch::default();
        for record in records {
            let value = Self::serialize(record)?;
            batch.put_cf(
                &cf_records,
                keys::record_key(&record.user_id, record.timestamp),
                value,
            );
            batch.put_cf(
                &cf_by_time,
                keys::time_index_key(&record.user_id, record.timestamp),
                [],
            );
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(count = records.len(), "Records written");
        Ok(())
    }

    fn get_record(&self, user_id: &str, timestamp: DateTime<Utc>) -> Result<Option<QueryRecord>> {
        self.get_by_key(&keys::record_key(user_id, timestamp))
    }

    fn list_user_records(&self, user_id: &str, limit: usize) -> Result<Vec<QueryRecord>> {
        let cf_records = self.cf(cf::RECORDS)?;
        let prefix = keys::user_prefix(user_id);
        let upper = keys::user_upper_bound(user_id);

        // Walk backwards from just past the user's last key for newest-first order.
        let iter = self
            .db
            .iterator_cf(&cf_records, IteratorMode::From(&upper, Direction::Reverse));

        let mut records = Vec::new();
        for item in iter {
            if records.len() >= limit {
                break;
            }

            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if key.as_ref() >= upper.as_slice() {
                continue;
            }
            if !key.starts_with(&prefix) {
                break;
            }
            // A longer key belongs to a user id that embeds the separator.
            if key.len() != prefix.len() + keys::TIME_LEN {
                continue;
            }

            records.push(Self::deserialize(&value)?);
        }

        Ok(records)
    }

    fn scan_window(&self, window: &TimeWindow) -> Result<Vec<QueryRecord>> {
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let cf_by_time = self.cf(cf::RECORDS_BY_TIME)?;
        let start = keys::encode_time(window.start);
        let end = keys::encode_time(window.end);

        let iter = self
            .db
            .iterator_cf(&cf_by_time, IteratorMode::From(&start, Direction::Forward));

        let mut records = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            // Keys carry microseconds; the exact bound is checked on the record.
            if key.get(..keys::TIME_LEN).is_some_and(|t| t > end.as_slice()) {
                break;
            }

            let Some((timestamp, user_id)) = keys::split_time_index_key(&key) else {
                tracing::warn!("Skipping malformed time index key");
                continue;
            };

            if let Some(record) = self.get_by_key(&keys::record_key(user_id, timestamp))? {
                if window.contains(record.timestamp) {
                    records.push(record);
                }
            }
        }

        Ok(records)
    }

    fn scan_all(&self) -> Result<Vec<QueryRecord>> {
        let cf_records = self.cf(cf::RECORDS)?;

        self.db
            .iterator_cf(&cf_records, IteratorMode::Start)
            .map(|item| {
                let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
                Self::deserialize(&value)
            })
            .collect()
    }

    fn count(&self) -> Result<usize> {
        let cf_records = self.cf(cf::RECORDS)?;
        let mut count = 0;
        for item in self.db.iterator_cf(&cf_records, IteratorMode::Start) {
            item.map_err(|e| StoreError::Database(e.to_string()))?;
            count += 1;
        }
        Ok(count)
    }

    fn delete_record(&self, user_id: &str, timestamp: DateTime<Utc>) -> Result<()> {
        let record_key = keys::record_key(user_id, timestamp);

        // Check if record exists
        if self.get_by_key(&record_key)?.is_none() {
            return Err(StoreError::NotFound {
                entity: "record",
                id: format!("{user_id}@{}", timestamp.to_rfc3339()),
            });
        }

        let cf_records = self.cf(cf::RECORDS)?;
        let cf_by_time = self.cf(cf::RECORDS_BY_TIME)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_records, record_key);
        batch.delete_cf(&cf_by_time, keys::time_index_key(user_id, timestamp));

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        let mut batch = WriteBatch::default();

        for (name, is_primary) in [(cf::RECORDS, true), (cf::RECORDS_BY_TIME, false)] {
            let handle = self.cf(name)?;
            for item in self.db.iterator_cf(&handle, IteratorMode::Start) {
                let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
                batch.delete_cf(&handle, key);
                if is_primary {
                    removed += 1;
                }
            }
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(removed, "Table cleared");
        Ok(removed)
    }
}
