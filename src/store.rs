use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::filter::Filter;
use crate::types::LogRecord;

/// Records and the filter map live under one lock so filtered reads never
/// observe a record-in-transit or a half-applied filter change.
#[derive(Default)]
struct Inner {
    records: Vec<Arc<LogRecord>>,
    filters: HashMap<String, Filter>,
}

/// Thread-safe append-only store for parsed records plus named filters.
#[derive(Default)]
pub struct LogStore {
    inner: Mutex<Inner>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record and report whether it passes the current filter
    /// set. Insert and evaluation happen under the same lock.
    pub fn append(&self, record: Arc<LogRecord>) -> bool {
        let mut inner = self.inner.lock();
        inner.records.push(Arc::clone(&record));
        inner.filters.values().all(|filter| filter(&record))
    }

    /// Append a batch and return the subset passing the current filter set,
    /// in input order.
    pub fn append_batch(&self, records: Vec<Arc<LogRecord>>) -> Vec<Arc<LogRecord>> {
        let mut inner = self.inner.lock();
        inner.records.extend(records.iter().cloned());
        records
            .into_iter()
            .filter(|record| inner.filters.values().all(|filter| filter(record)))
            .collect()
    }

    /// Point-in-time copy of all records.
    pub fn read_all(&self) -> Vec<Arc<LogRecord>> {
        self.inner.lock().records.clone()
    }

    /// Point-in-time copy of the records passing every registered filter.
    pub fn read_filtered(&self) -> Vec<Arc<LogRecord>> {
        let inner = self.inner.lock();
        inner
            .records
            .iter()
            .filter(|record| inner.filters.values().all(|filter| filter(record)))
            .cloned()
            .collect()
    }

    /// Register a filter. A later filter with the same name replaces the
    /// earlier one.
    pub fn add_filter(&self, name: impl Into<String>, filter: Filter) {
        self.inner.lock().filters.insert(name.into(), filter);
    }

    pub fn remove_filter(&self, name: &str) {
        self.inner.lock().filters.remove(name);
    }

    pub fn clear_filters(&self) {
        self.inner.lock().filters.clear();
    }

    /// Empty both the records and the filter map.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.records.clear();
        inner.filters.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter;
    use crate::types::Level;

    fn record(level: Level, tag: &str) -> Arc<LogRecord> {
        Arc::new(LogRecord {
            timestamp: "01-02 03:04:05.678".to_string(),
            pid: 1,
            tid: 1,
            level,
            tag: tag.to_string(),
            message: "m".to_string(),
        })
    }

    #[test]
    fn test_append_and_read_all() {
        let store = LogStore::new();
        store.append(record(Level::Info, "a"));
        store.append(record(Level::Warn, "b"));
        assert_eq!(store.len(), 2);

        let mut snapshot = store.read_all();
        snapshot.clear();
        // Mutating the snapshot must not affect the store.
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_read_filtered_is_subset() {
        let store = LogStore::new();
        store.append(record(Level::Info, "a"));
        store.append(record(Level::Error, "b"));

        assert_eq!(store.read_filtered().len(), store.read_all().len());

        store.add_filter("errors", filter::min_level(Level::Error));
        let filtered = store.read_filtered();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].tag, "b");
    }

    #[test]
    fn test_remove_filter_restores_full_view() {
        let store = LogStore::new();
        store.append(record(Level::Info, "a"));
        store.add_filter("errors", filter::min_level(Level::Error));
        assert!(store.read_filtered().is_empty());

        store.remove_filter("errors");
        assert_eq!(store.read_filtered().len(), store.read_all().len());
    }

    #[test]
    fn test_same_name_filter_replaces() {
        let store = LogStore::new();
        store.append(record(Level::Warn, "a"));
        store.add_filter("level", filter::min_level(Level::Error));
        assert!(store.read_filtered().is_empty());

        store.add_filter("level", filter::min_level(Level::Warn));
        assert_eq!(store.read_filtered().len(), 1);
    }

    #[test]
    fn test_all_filters_must_pass() {
        let store = LogStore::new();
        store.append(record(Level::Error, "net"));
        store.append(record(Level::Error, "ui"));
        store.add_filter("level", filter::min_level(Level::Error));
        store.add_filter("tag", filter::tag_matches("^net$").unwrap());
        assert_eq!(store.read_filtered().len(), 1);
    }

    #[test]
    fn test_append_reports_filter_pass() {
        let store = LogStore::new();
        store.add_filter("errors", filter::min_level(Level::Error));
        assert!(!store.append(record(Level::Info, "a")));
        assert!(store.append(record(Level::Fatal, "b")));
        // Failing the filter set still appends.
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_append_batch_returns_passing_subset() {
        let store = LogStore::new();
        store.add_filter("errors", filter::min_level(Level::Error));
        let passed = store.append_batch(vec![
            record(Level::Info, "a"),
            record(Level::Error, "b"),
            record(Level::Info, "c"),
        ]);
        assert_eq!(passed.len(), 1);
        assert_eq!(passed[0].tag, "b");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_clear_empties_records_and_filters() {
        let store = LogStore::new();
        store.append(record(Level::Info, "a"));
        store.add_filter("errors", filter::min_level(Level::Error));
        store.clear();
        assert!(store.is_empty());

        // Filters are gone too: a low-level record passes again.
        store.append(record(Level::Verbose, "b"));
        assert_eq!(store.read_filtered().len(), 1);
    }

    #[test]
    fn test_concurrent_appends() {
        let store = Arc::new(LogStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    store.append(record(Level::Info, "t"));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 800);
    }
}
