//! Durable, date-scoped cache over search results
//!
//! One entry is valid for the remainder of its capture day; any key miss,
//! cross-day read or unparsable file is a cache miss, never an error.
//! Writes go to a temporary file followed by an atomic rename so a reader
//! can never observe a partially-written entry.

use crate::error::Result;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Composite key: (query text, calendar day of capture, lookback window).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: String,
    pub capture_date: NaiveDate,
    pub lookback_days: u32,
}

impl CacheKey {
    /// Key for a query captured today.
    pub fn today(query: impl Into<String>, lookback_days: u32) -> Self {
        Self {
            query: query.into(),
            capture_date: Utc::now().date_naive(),
            lookback_days,
        }
    }

    /// File name for this key, e.g. `crude_oil_price_forecast_2025-10-06_7d.json`.
    fn file_name(&self) -> String {
        let slug: String = self
            .query
            .chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        format!("{slug}_{}_{}d.json", self.capture_date, self.lookback_days)
    }
}

/// On-disk entry envelope.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    cached_at: chrono::DateTime<Utc>,
    payload: Value,
}

/// File-backed cache store.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Open (creating if needed) a cache directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Look up a cached payload.
    ///
    /// Returns `None` on a missing file, an entry captured on a different
    /// calendar day than the key asks for, or a corrupted entry.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let path = self.path_for(key);
        let raw = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupted cache entry, treating as miss");
                return None;
            }
        };

        if entry.cached_at.date_naive() != key.capture_date {
            debug!(path = %path.display(), "stale cache entry from a different day");
            return None;
        }

        debug!(query = %key.query, "cache hit");
        Some(entry.payload)
    }

    /// Store a payload under the key's capture day.
    pub fn put(&self, key: &CacheKey, payload: Value) -> Result<()> {
        let entry = CacheEntry {
            cached_at: Utc::now(),
            payload,
        };
        let path = self.path_for(key);
        write_atomic(&path, &serde_json::to_vec_pretty(&entry)?)?;
        debug!(query = %key.query, path = %path.display(), "cache entry written");
        Ok(())
    }
}

/// Write to `<path>.tmp` then rename into place. Rename within one
/// directory is atomic on the platforms we target, so concurrent readers
/// see either the old entry or the new one, never a partial write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_put_then_get_same_day() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path()).unwrap();
        let key = CacheKey::today("crude oil price forecast", 7);

        assert!(store.get(&key).is_none());
        store.put(&key, json!({"organic": [1, 2, 3]})).unwrap();
        assert_eq!(store.get(&key).unwrap()["organic"], json!([1, 2, 3]));
    }

    #[test]
    fn test_cross_day_read_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path()).unwrap();

        let yesterday = Utc::now().date_naive() - chrono::Days::new(1);
        let stale_key = CacheKey {
            query: "sugar outlook".to_string(),
            capture_date: yesterday,
            lookback_days: 7,
        };
        // Entry written today under yesterday's key file
        store.put(&stale_key, json!("payload")).unwrap();

        // cached_at (today) does not match the key's capture day
        assert!(store.get(&stale_key).is_none());
    }

    #[test]
    fn test_corrupted_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path()).unwrap();
        let key = CacheKey::today("usd thb forecast", 7);

        store.put(&key, json!({})).unwrap();
        let path = dir.path().join(key.file_name());
        fs::write(&path, "{ not json").unwrap();

        assert!(store.get(&key).is_none());
    }

    #[test]
    fn test_overwrite_leaves_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path()).unwrap();
        let key = CacheKey::today("q", 30);

        store.put(&key, json!(1)).unwrap();
        store.put(&key, json!(2)).unwrap();
        assert_eq!(store.get(&key).unwrap(), json!(2));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_distinct_lookback_windows_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path()).unwrap();
        let week = CacheKey::today("crude oil", 7);
        let month = CacheKey::today("crude oil", 30);

        store.put(&week, json!("week")).unwrap();
        assert!(store.get(&month).is_none());
    }
}
