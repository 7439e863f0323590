//! In-memory storage implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use hr_analytics_core::{key_precision, QueryRecord, TimeWindow};

use crate::error::{Result, StoreError};
use crate::Store;

#[derive(Default)]
struct Tables {
    records: BTreeMap<(String, DateTime<Utc>), QueryRecord>,
    by_time: BTreeSet<(DateTime<Utc>, String)>,
}

/// Process-local storage with the same ordering guarantees as `RocksStore`.
///
/// Rows are keyed on microsecond timestamps, like the `RocksStore` key.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }
}

impl Store for MemoryStore {
    fn put_records(&self, records: &[QueryRecord]) -> Result<()> {
        let mut tables = self.write()?;
        for record in records {
            let timestamp = key_precision(record.timestamp);
            tables.by_time.insert((timestamp, record.user_id.clone()));
            tables
                .records
                .insert((record.user_id.clone(), timestamp), record.clone());
        }
        Ok(())
    }

    fn get_record(&self, user_id: &str, timestamp: DateTime<Utc>) -> Result<Option<QueryRecord>> {
        let tables = self.read()?;
        let key = (user_id.to_string(), key_precision(timestamp));
        Ok(tables.records.get(&key).cloned())
    }

    fn list_user_records(&self, user_id: &str, limit: usize) -> Result<Vec<QueryRecord>> {
        let tables = self.read()?;
        let from = (user_id.to_string(), DateTime::<Utc>::MIN_UTC);
        let to = (user_id.to_string(), DateTime::<Utc>::MAX_UTC);

        Ok(tables
            .records
            .range(from..=to)
            .rev()
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn scan_window(&self, window: &TimeWindow) -> Result<Vec<QueryRecord>> {
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let tables = self.read()?;
        let lower = Bound::Included((key_precision(window.start), String::new()));

        // Keys carry microseconds; the exact bound is checked on the record.
        Ok(tables
            .by_time
            .range((lower, Bound::Unbounded))
            .take_while(|(timestamp, _)| *timestamp < window.end)
            .filter_map(|(timestamp, user_id)| tables.records.get(&(user_id.clone(), *timestamp)))
            .filter(|record| window.contains(record.timestamp))
            .cloned()
            .collect())
    }

    fn scan_all(&self) -> Result<Vec<QueryRecord>> {
        let tables = self.read()?;
        Ok(tables.records.values().cloned().collect())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.read()?.records.len())
    }

    fn delete_record(&self, user_id: &str, timestamp: DateTime<Utc>) -> Result<()> {
        let mut tables = self.write()?;
        let key_time = key_precision(timestamp);
        if tables
            .records
            .remove(&(user_id.to_string(), key_time))
            .is_none()
        {
            return Err(StoreError::NotFound {
                entity: "record",
                id: format!("{user_id}@{}", timestamp.to_rfc3339()),
            });
        }
        tables.by_time.remove(&(key_time, user_id.to_string()));
        Ok(())
    }

    fn clear(&self) -> Result<usize> {
        let mut tables = self.write()?;
        let removed = tables.records.len();
        *tables = Tables::default();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, hour, 0, 0).unwrap()
    }

    #[test]
    fn upsert_replaces_by_primary_key() {
        let store = MemoryStore::new();
        store
            .put_record(&QueryRecord::new("alice", at(9)).with_category("benefits"))
            .unwrap();
        store
            .put_record(&QueryRecord::new("alice", at(9)).with_category("payroll"))
            .unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let record = store.get_record("alice", at(9)).unwrap().unwrap();
        assert_eq!(record.category.as_deref(), Some("payroll"));
        assert_eq!(store.scan_window(&TimeWindow::new(at(0), at(23))).unwrap().len(), 1);
    }

    #[test]
    fn window_is_half_open_and_time_ordered() {
        let store = MemoryStore::new();
        store
            .put_records(&[
                QueryRecord::new("bob", at(12)),
                QueryRecord::new("alice", at(10)),
                QueryRecord::new("carol", at(11)),
                QueryRecord::new("dave", at(13)),
            ])
            .unwrap();

        let rows = store.scan_window(&TimeWindow::new(at(10), at(13))).unwrap();
        let users: Vec<_> = rows.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(users, ["alice", "carol", "bob"]);
    }

    #[test]
    fn user_listing_is_newest_first() {
        let store = MemoryStore::new();
        for hour in [8, 10, 9] {
            store.put_record(&QueryRecord::new("alice", at(hour))).unwrap();
        }
        store.put_record(&QueryRecord::new("alicia", at(11))).unwrap();

        let rows = store.list_user_records("alice", 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, at(10));
        assert_eq!(rows[1].timestamp, at(9));
    }

    #[test]
    fn rows_within_one_microsecond_share_a_key() {
        let store = MemoryStore::new();
        let mut first = QueryRecord::new("u", at(9)).with_category("benefits");
        first.timestamp = at(9) + Duration::nanoseconds(100);
        let mut second = QueryRecord::new("u", at(9)).with_category("payroll");
        second.timestamp = at(9) + Duration::nanoseconds(600);
        store.put_records(&[first, second]).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let record = store
            .get_record("u", at(9) + Duration::nanoseconds(100))
            .unwrap()
            .unwrap();
        assert_eq!(record.category.as_deref(), Some("payroll"));

        // Same microsecond as the stored row, but after it.
        let start = at(9) + Duration::nanoseconds(900);
        assert!(store
            .scan_window(&TimeWindow::new(start, at(10)))
            .unwrap()
            .is_empty());
        assert_eq!(store.scan_window(&TimeWindow::new(at(9), at(10))).unwrap().len(), 1);
    }

    #[test]
    fn delete_and_clear() {
        let store = MemoryStore::new();
        store.put_record(&QueryRecord::new("alice", at(9))).unwrap();
        store
            .put_record(&QueryRecord::new("bob", at(9) + Duration::minutes(1)))
            .unwrap();

        store.delete_record("alice", at(9)).unwrap();
        assert!(matches!(
            store.delete_record("alice", at(9)),
            Err(StoreError::NotFound { .. })
        ));
        assert!(store
            .scan_window(&TimeWindow::new(at(0), at(23)))
            .unwrap()
            .iter()
            .all(|r| r.user_id == "bob"));

        assert_eq!(store.clear().unwrap(), 1);
        assert_eq!(store.count().unwrap(), 0);
    }
}
