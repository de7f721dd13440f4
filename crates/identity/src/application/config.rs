//! Application Configuration
//!
//! Configuration for the identification engine and its rate limits.

use std::time::Duration;

use platform::rate_limit::RateLimitConfig;

use crate::domain::features::Weights;

/// Identification engine configuration
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Jaccard score separating heal from create, in [0, 1]
    pub similarity_threshold: f64,
    /// Feature weights per signal stability tier
    pub weights: Weights,
    /// TTL for hardware digest to visitor id cache entries
    pub cache_ttl: Duration,
    /// Per-IP rate limit
    pub ip_rate_limit: RateLimitConfig,
    /// Per-hardware-digest rate limit
    pub hardware_rate_limit: RateLimitConfig,
    /// Maximum candidates fetched per subnet
    pub candidate_limit: i64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.75,
            weights: Weights::default(),
            cache_ttl: Duration::from_secs(48 * 3600),
            ip_rate_limit: RateLimitConfig::new(1000, 60),
            hardware_rate_limit: RateLimitConfig::new(2000, 3600),
            candidate_limit: 50,
        }
    }
}

impl IdentityConfig {
    /// Clamp tunables into their valid ranges
    pub fn normalized(mut self) -> Self {
        self.similarity_threshold = self.similarity_threshold.clamp(0.0, 1.0);
        self
    }
}
