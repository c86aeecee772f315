use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use value_core::RawMetrics;

/// Default time-to-live for cached provider responses (1 hour).
pub const DEFAULT_CACHE_TTL_SECS: i64 = 3600;

struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// Per-ticker response cache with an explicit TTL. Injected into
/// [`YahooClient`](crate::YahooClient); the client works without one.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry<RawMetrics>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached record for `ticker` if younger than the TTL.
    pub fn get(&self, ticker: &str) -> Option<RawMetrics> {
        let entry = self.entries.get(ticker)?;
        if Utc::now() - entry.cached_at < self.ttl {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    /// Store a fresh record. Stale entries are dropped first so the map stays
    /// bounded by the number of tickers fetched within one TTL.
    pub fn insert(&self, ticker: &str, metrics: RawMetrics) {
        let purged = self.purge_expired();
        if purged > 0 {
            tracing::debug!("Purged {} stale cache entries", purged);
        }
        self.insert_at(ticker, metrics, Utc::now());
    }

    fn insert_at(&self, ticker: &str, metrics: RawMetrics, cached_at: DateTime<Utc>) {
        self.entries.insert(
            ticker.to_string(),
            CacheEntry {
                data: metrics,
                cached_at,
            },
        );
    }

    /// Drop stale entries, returning how many were removed.
    fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| now - e.cached_at < self.ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_CACHE_TTL_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_entry_is_served() {
        let cache = ResponseCache::default();
        cache.insert("AAPL", RawMetrics::new("AAPL"));
        assert_eq!(cache.get("AAPL").map(|m| m.ticker), Some("AAPL".to_string()));
        assert!(cache.get("MSFT").is_none());
    }

    #[test]
    fn test_stale_entry_is_ignored() {
        let cache = ResponseCache::new(Duration::minutes(10));
        cache.insert_at("OLD", RawMetrics::new("OLD"), Utc::now() - Duration::minutes(11));
        assert!(cache.get("OLD").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insert_evicts_stale_entries() {
        let cache = ResponseCache::new(Duration::minutes(10));
        for t in ["A", "B", "C"] {
            cache.insert_at(t, RawMetrics::new(t), Utc::now() - Duration::minutes(30));
        }
        cache.insert_at("KEEP", RawMetrics::new("KEEP"), Utc::now() - Duration::minutes(5));
        assert_eq!(cache.len(), 4);

        cache.insert("NEW", RawMetrics::new("NEW"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("KEEP").is_some());
        assert!(cache.get("NEW").is_some());
    }

    #[test]
    fn test_zero_ttl_never_serves() {
        let cache = ResponseCache::new(Duration::zero());
        cache.insert("KO", RawMetrics::new("KO"));
        assert!(cache.get("KO").is_none());
    }
}
