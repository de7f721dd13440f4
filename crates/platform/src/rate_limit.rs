//! Rate Limiting Infrastructure
//!
//! Common rate limiting abstractions. The counter state itself lives in the
//! cache (see [`crate::cache::Cache::check_rate_limit`]); this module only
//! defines the configuration and result types.

use std::time::Duration;

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 1000,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    /// Seconds the caller should wait before retrying when denied
    pub retry_after_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_windows() {
        let config = RateLimitConfig::new(2, 60);
        assert_eq!(config.max_requests, 2);
        assert_eq!(config.window_ms(), 60_000);
        assert_eq!(config.window_secs(), 60);
    }

    #[test]
    fn test_default_matches_per_ip_policy() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 1000);
        assert_eq!(config.window, Duration::from_secs(60));
    }
}
