//! Process-wide TTL cache for aggregated search results.
//!
//! Entries are never evicted on read. A stale entry counts as a miss and stays
//! in the map until it is overwritten or removed by [`SearchCache::purge_expired`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use trawl_core::CacheConfig;

use crate::request::SearchRequest;
use crate::types::{MediaResult, MediaType};

/// Cache key for one aggregated search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Lowercased source filter, or `"all"`
    pub source: String,
    pub media_type: MediaType,
    /// Query exactly as supplied
    pub query: String,
    pub page: u32,
}

impl CacheKey {
    pub fn new(source: Option<&str>, media_type: MediaType, query: &str, page: u32) -> Self {
        let source = source
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "all".to_string());

        Self {
            source,
            media_type,
            query: query.to_string(),
            page,
        }
    }

    pub fn from_request(request: &SearchRequest) -> Self {
        Self::new(
            request.source.as_deref(),
            request.media_type,
            &request.query,
            request.page,
        )
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.source, self.media_type, self.query, self.page
        )
    }
}

/// Cached payload with its insertion time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub stored_at: Instant,
    pub payload: Arc<Vec<MediaResult>>,
}

impl CacheEntry {
    pub fn new(payload: Arc<Vec<MediaResult>>) -> Self {
        Self {
            stored_at: Instant::now(),
            payload,
        }
    }

    /// Valid while strictly younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatistics {
    pub entries: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
}

impl CacheStatistics {
    /// Fraction of lookups answered from the cache, 0.0 when none happened.
    pub fn calculate_hit_rate(hit_count: u64, miss_count: u64) -> f64 {
        if hit_count + miss_count == 0 {
            0.0
        } else {
            (hit_count as f64) / ((hit_count + miss_count) as f64)
        }
    }
}

/// Mutex-guarded result cache shared by every search.
///
/// Critical sections never await, so a blocking mutex is used.
#[derive(Debug)]
pub struct SearchCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl SearchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the payload when a fresh entry exists.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<MediaResult>>> {
        let entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(self.ttl) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Cache hit for {}", key);
                Some(Arc::clone(&entry.payload))
            }
            Some(_) => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Cache entry for {} is stale", key);
                None
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Cache miss for {}", key);
                None
            }
        }
    }

    /// Stores `payload`, replacing any previous entry for `key`.
    pub fn put(&self, key: CacheKey, payload: Arc<Vec<MediaResult>>) {
        tracing::debug!("Caching {} results for {}", payload.len(), key);
        self.entries.lock().insert(key, CacheEntry::new(payload));
    }

    /// Removes every stale entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(self.ttl));
        let purged = before - entries.len();
        if purged > 0 {
            tracing::debug!("Purged {} expired cache entries", purged);
        }
        purged
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn statistics(&self) -> CacheStatistics {
        let hit_count = self.hit_count.load(Ordering::Relaxed);
        let miss_count = self.miss_count.load(Ordering::Relaxed);
        CacheStatistics {
            entries: self.len(),
            hit_count,
            miss_count,
            hit_rate: CacheStatistics::calculate_hit_rate(hit_count, miss_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(ids: &[&str]) -> Arc<Vec<MediaResult>> {
        Arc::new(
            ids.iter()
                .map(|id| MediaResult {
                    id: id.to_string(),
                    title: format!("Item {id}"),
                    url: format!("https://example.com/{id}"),
                    thumbnail: String::new(),
                    preview_video: String::new(),
                    duration: Some("N/A".to_string()),
                    source: "Example".to_string(),
                    media_type: MediaType::Videos,
                })
                .collect(),
        )
    }

    #[test]
    fn test_key_normalizes_source_filter() {
        let a = CacheKey::new(Some(" Sex.com "), MediaType::Gifs, "cats", 2);
        let b = CacheKey::new(Some("sex.com"), MediaType::Gifs, "cats", 2);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "sex.com:gifs:cats:2");

        let all = CacheKey::new(None, MediaType::Videos, "cats", 1);
        assert_eq!(all.source, "all");
        assert_ne!(all, CacheKey::new(None, MediaType::Videos, "Cats", 1));
    }

    #[test]
    fn test_hit_and_miss_accounting() {
        let cache = SearchCache::new(Duration::from_secs(60));
        let key = CacheKey::new(None, MediaType::Videos, "cats", 1);

        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), payload(&["1", "2"]));
        assert_eq!(cache.get(&key).unwrap().len(), 2);

        let stats = cache.statistics();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_put_overwrites() {
        let cache = SearchCache::new(Duration::from_secs(60));
        let key = CacheKey::new(None, MediaType::Videos, "cats", 1);

        cache.put(key.clone(), payload(&["1"]));
        cache.put(key.clone(), payload(&["2", "3"]));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).unwrap()[0].id, "2");
    }

    #[test]
    fn test_stale_entries_miss_but_stay_until_purged() {
        let cache = SearchCache::new(Duration::ZERO);
        let key = CacheKey::new(None, MediaType::Videos, "cats", 1);
        cache.put(key.clone(), payload(&["1"]));

        assert!(cache.get(&key).is_none());
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = SearchCache::new(Duration::from_millis(40));
        let key = CacheKey::new(Some("example"), MediaType::Gifs, "loop", 1);
        cache.put(key.clone(), payload(&["1"]));

        assert!(cache.get(&key).is_some());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get(&key).is_none());
    }
}
