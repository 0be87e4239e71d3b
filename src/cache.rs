//! Short-lived cache of fetch results, keyed by date range.
//!
//! One [`QueryCache`] is built at startup and handed to the server state; it
//! lives as long as the server and is cleared on shutdown. Caching is off
//! unless the server is started with a nonzero TTL. When on, the cache holds
//! at most `max_entries` ranges and evicts the oldest first.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use crate::sales::{DateRange, FetchResult};

struct CachedEntry {
    stored_at: Instant,
    result: Arc<FetchResult>,
}

pub struct QueryCache {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<DateRange, CachedEntry>>,
}

impl QueryCache {
    /// A `ttl` or `max_entries` of zero disables caching.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero() && self.max_entries > 0
    }

    /// Returns the cached result for `range` if it is younger than the TTL.
    /// Expired entries are dropped on the way.
    pub async fn get(&self, range: &DateRange) -> Option<Arc<FetchResult>> {
        let mut entries = self.entries.lock().await;
        match entries.get(range) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                debug!(start = %range.start(), end = %range.end(), "Query cache hit");
                Some(entry.result.clone())
            }
            Some(_) => {
                entries.remove(range);
                None
            }
            None => None,
        }
    }

    /// Stores `result` and returns a shared handle to it. When the cache is
    /// full the entry stored longest ago is evicted.
    pub async fn insert(&self, range: DateRange, result: FetchResult) -> Arc<FetchResult> {
        let result = Arc::new(result);
        if !self.is_enabled() {
            return result;
        }

        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        while entries.len() >= self.max_entries && !entries.contains_key(&range) {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| *key)
            else {
                break;
            };
            entries.remove(&oldest);
            debug!(start = %oldest.start(), end = %oldest.end(), "Query cache evicted oldest entry");
        }
        entries.insert(
            range,
            CachedEntry {
                stored_at: Instant::now(),
                result: result.clone(),
            },
        );
        result
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Drops every entry. Returns how many were held.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let held = entries.len();
        entries.clear();
        held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sales::SalesRecord;
    use chrono::NaiveDate;

    fn range(day: u32) -> DateRange {
        DateRange::single_day(NaiveDate::from_ymd_opt(2024, 6, day).unwrap())
    }

    fn result() -> FetchResult {
        FetchResult {
            records: vec![SalesRecord::new("20240601", "수서", "경부선", 1)],
            total_count: 1,
            page_count: 1,
        }
    }

    #[tokio::test]
    async fn test_hit_after_insert() {
        let cache = QueryCache::new(Duration::from_secs(60), 8);
        assert!(cache.get(&range(1)).await.is_none());

        cache.insert(range(1), result()).await;
        let hit = cache.get(&range(1)).await.unwrap();
        assert_eq!(hit.total_count, 1);
        assert!(cache.get(&range(2)).await.is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_never_stores() {
        let cache = QueryCache::disabled();
        let returned = cache.insert(range(1), result()).await;
        assert_eq!(returned.total_count, 1);
        assert_eq!(cache.len().await, 0);
        assert!(cache.get(&range(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let cache = QueryCache::new(Duration::from_millis(20), 8);
        cache.insert(range(1), result()).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(cache.get(&range(1)).await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_clear_reports_count() {
        let cache = QueryCache::new(Duration::from_secs(60), 8);
        cache.insert(range(1), result()).await;
        cache.insert(range(2), result()).await;
        assert_eq!(cache.clear().await, 2);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_zero_capacity_never_stores() {
        let cache = QueryCache::new(Duration::from_secs(60), 0);
        cache.insert(range(1), result()).await;
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_full_cache_evicts_oldest_entry() {
        let cache = QueryCache::new(Duration::from_secs(60), 2);
        cache.insert(range(1), result()).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.insert(range(2), result()).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.insert(range(3), result()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&range(1)).await.is_none());
        assert!(cache.get(&range(2)).await.is_some());
        assert!(cache.get(&range(3)).await.is_some());
    }

    #[tokio::test]
    async fn test_refreshing_a_cached_range_does_not_evict() {
        let cache = QueryCache::new(Duration::from_secs(60), 2);
        cache.insert(range(1), result()).await;
        cache.insert(range(2), result()).await;
        cache.insert(range(2), result()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&range(1)).await.is_some());
    }
}
