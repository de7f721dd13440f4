//! Hot Cache Abstraction
//!
//! Key/value cache used for three concerns, each under its own key prefix:
//! - `hw:<digest>` - hardware digest to visitor id, bounded TTL
//! - `rl:<identifier>` - rate limit counters, window TTL
//! - `metric:<name>` - monotonic counters, no TTL
//!
//! The engine consumes the [`Cache`] trait; [`MemoryCache`] is the in-process
//! implementation. A networked backend can be swapped in behind the same
//! trait without touching the identification path.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::rate_limit::{RateLimitConfig, RateLimitResult};

/// Cache-specific result type alias
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache failure modes
///
/// These are never fatal on the identification path; callers demote them to
/// a cache miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("corrupt cache value for key {key}")]
    CorruptValue { key: String },
}

/// Trait for cache backends
#[trait_variant::make(Cache: Send)]
pub trait LocalCache {
    /// Look up the visitor id cached for a hardware digest
    async fn get_visitor(&self, hardware_digest: &str) -> CacheResult<Option<String>>;

    /// Cache the hardware digest to visitor id mapping
    async fn set_visitor(
        &self,
        hardware_digest: &str,
        visitor_id: &str,
        ttl: Duration,
    ) -> CacheResult<()>;

    /// Increment the counter for `identifier` and compare against the limit
    ///
    /// Fixed-window semantics: the counter expiry is refreshed on every
    /// increment and the post-increment value is compared to the limit.
    async fn check_rate_limit(
        &self,
        identifier: &str,
        config: &RateLimitConfig,
    ) -> CacheResult<RateLimitResult>;

    /// Increment a metric counter, returning the new value
    async fn increment_metric(&self, name: &str) -> CacheResult<i64>;

    /// Read a metric counter (0 when never incremented)
    async fn get_metric(&self, name: &str) -> CacheResult<i64>;
}

struct Entry {
    value: String,
    expires_at_ms: Option<i64>,
}

impl Entry {
    fn is_expired(&self, now_ms: i64) -> bool {
        matches!(self.expires_at_ms, Some(at) if at <= now_ms)
    }
}

/// In-process cache backed by a keyed map with millisecond expiry stamps
///
/// Expired entries are treated as absent and dropped on access.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Increment the stringified counter at `key`, resetting when expired.
    async fn increment(&self, key: String, ttl: Option<Duration>) -> CacheResult<i64> {
        let now_ms = Self::now_ms();
        let mut entries = self.entries.lock().await;

        let count = match entries.get(&key) {
            Some(entry) if !entry.is_expired(now_ms) => {
                let current: i64 = entry
                    .value
                    .parse()
                    .map_err(|_| CacheError::CorruptValue { key: key.clone() })?;
                current + 1
            }
            _ => 1,
        };

        let expires_at_ms = ttl.map(|ttl| now_ms + ttl.as_millis() as i64);
        entries.insert(
            key,
            Entry {
                value: count.to_string(),
                expires_at_ms,
            },
        );

        Ok(count)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for MemoryCache {
    async fn get_visitor(&self, hardware_digest: &str) -> CacheResult<Option<String>> {
        let key = format!("hw:{hardware_digest}");
        let now_ms = Self::now_ms();
        let mut entries = self.entries.lock().await;

        match entries.get(&key) {
            Some(entry) if entry.is_expired(now_ms) => {
                entries.remove(&key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_visitor(
        &self,
        hardware_digest: &str,
        visitor_id: &str,
        ttl: Duration,
    ) -> CacheResult<()> {
        let key = format!("hw:{hardware_digest}");
        let expires_at_ms = Self::now_ms() + ttl.as_millis() as i64;

        self.entries.lock().await.insert(
            key,
            Entry {
                value: visitor_id.to_string(),
                expires_at_ms: Some(expires_at_ms),
            },
        );

        Ok(())
    }

    async fn check_rate_limit(
        &self,
        identifier: &str,
        config: &RateLimitConfig,
    ) -> CacheResult<RateLimitResult> {
        let key = format!("rl:{identifier}");
        let count = self.increment(key, Some(config.window)).await?;

        let allowed = count <= i64::from(config.max_requests);
        let remaining = i64::from(config.max_requests)
            .saturating_sub(count)
            .max(0) as u32;

        Ok(RateLimitResult {
            allowed,
            remaining,
            retry_after_secs: config.window_secs(),
        })
    }

    async fn increment_metric(&self, name: &str) -> CacheResult<i64> {
        self.increment(format!("metric:{name}"), None).await
    }

    async fn get_metric(&self, name: &str) -> CacheResult<i64> {
        let key = format!("metric:{name}");
        let entries = self.entries.lock().await;

        match entries.get(&key) {
            Some(entry) => entry
                .value
                .parse()
                .map_err(|_| CacheError::CorruptValue { key: key.clone() }),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cache, Duration, MemoryCache, RateLimitConfig};

    #[tokio::test]
    async fn test_visitor_roundtrip() {
        let cache = MemoryCache::new();

        assert_eq!(cache.get_visitor("abc").await.unwrap(), None);

        cache
            .set_visitor("abc", "visitor-1", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            cache.get_visitor("abc").await.unwrap(),
            Some("visitor-1".to_string())
        );
    }

    #[tokio::test]
    async fn test_visitor_entry_expires() {
        let cache = MemoryCache::new();
        cache
            .set_visitor("abc", "visitor-1", Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.get_visitor("abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rate_limit_fixed_window() {
        let cache = MemoryCache::new();
        let config = RateLimitConfig::new(2, 60);

        let first = cache.check_rate_limit("ip:1.2.3.4", &config).await.unwrap();
        let second = cache.check_rate_limit("ip:1.2.3.4", &config).await.unwrap();
        let third = cache.check_rate_limit("ip:1.2.3.4", &config).await.unwrap();

        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);
        assert!(!third.allowed);
        assert_eq!(third.retry_after_secs, 60);
    }

    #[tokio::test]
    async fn test_rate_limit_window_resets() {
        let cache = MemoryCache::new();
        let config = RateLimitConfig {
            max_requests: 1,
            window: Duration::from_millis(20),
        };

        assert!(cache.check_rate_limit("ip:x", &config).await.unwrap().allowed);
        assert!(!cache.check_rate_limit("ip:x", &config).await.unwrap().allowed);

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.check_rate_limit("ip:x", &config).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_rate_limit_keys_are_independent() {
        let cache = MemoryCache::new();
        let config = RateLimitConfig::new(1, 60);

        assert!(cache.check_rate_limit("ip:a", &config).await.unwrap().allowed);
        assert!(cache.check_rate_limit("ip:b", &config).await.unwrap().allowed);
        assert!(!cache.check_rate_limit("ip:a", &config).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_metrics_accumulate() {
        let cache = MemoryCache::new();

        assert_eq!(cache.get_metric("cache_hits").await.unwrap(), 0);
        assert_eq!(cache.increment_metric("cache_hits").await.unwrap(), 1);
        assert_eq!(cache.increment_metric("cache_hits").await.unwrap(), 2);
        assert_eq!(cache.get_metric("cache_hits").await.unwrap(), 2);
    }
}
