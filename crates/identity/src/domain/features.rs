//! Feature Extraction
//!
//! Projects a signal bundle into a weighted feature map. Pure functions:
//! the same bundle and weight table always produce the same map and digests
//! byte-for-byte.

use std::collections::BTreeMap;

use platform::crypto::{sha256_hex, sha256_hex_truncated};

use crate::domain::signals::Signals;

/// Tunable weights for the three signal stability tiers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub hardware: f64,
    pub environment: f64,
    pub software: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            hardware: 0.8,
            environment: 0.5,
            software: 0.2,
        }
    }
}

/// A fingerprint as weighted features plus a digest of its stable subset
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub features: BTreeMap<String, f64>,
    /// Digest over the features weighted at or above the environment tier;
    /// used only for the similarity fast path
    pub digest: String,
}

/// Convert signals into a weighted feature vector
pub fn extract_features(signals: &Signals, weights: &Weights) -> FeatureVector {
    let mut features = BTreeMap::new();

    // Hardware features
    if !signals.canvas_2d_hash.is_empty() {
        features.insert(
            format!("canvas:{}", signals.canvas_2d_hash),
            weights.hardware,
        );
    }
    if !signals.audio_hash.is_empty() {
        features.insert(format!("audio:{}", signals.audio_hash), weights.hardware);
    }
    features.insert(
        format!("webgl:{}:{}", signals.webgl_vendor, signals.webgl_renderer),
        weights.hardware,
    );

    // WebGL extensions (sorted for consistency)
    features.insert(
        format!("webgl_ext:{}", hash_string_list(&signals.webgl_extensions)),
        weights.hardware * 0.7,
    );

    features.insert(
        format!("hw_concurrency:{}", signals.hardware_concurrency),
        weights.hardware * 0.6,
    );
    features.insert(
        format!("device_memory:{:.0}", signals.device_memory),
        weights.hardware * 0.6,
    );
    features.insert(
        format!("color_depth:{}", signals.color_depth),
        weights.hardware * 0.5,
    );

    // Environment features
    if !signals.timezone.is_empty() {
        features.insert(format!("tz:{}", signals.timezone), weights.environment);
    }
    features.insert(
        format!("lang:{}", hash_string_list(&signals.languages)),
        weights.environment,
    );
    features.insert(
        format!("fonts:{}", hash_string_list(&signals.fonts)),
        weights.environment * 0.9,
    );
    features.insert(
        format!("screen:{}x{}", signals.screen_width, signals.screen_height),
        weights.environment * 0.7,
    );

    // Software features - most volatile
    if !signals.platform.is_empty() {
        features.insert(format!("platform:{}", signals.platform), weights.software);
    }

    // Browser name and major version only; patch churn must not move the map
    let browser_version = extract_browser_version(&signals.user_agent);
    if !browser_version.is_empty() {
        features.insert(format!("browser:{browser_version}"), weights.software);
    }

    let digest = vector_digest(&features, weights);

    FeatureVector { features, digest }
}

/// Hash over hardware-tier signals only; the exact-match cache key
///
/// Identical for two bundles that agree on the six hardware fields no
/// matter how much the environment or software tiers drift.
pub fn compute_hardware_digest(signals: &Signals) -> String {
    let parts = [
        signals.canvas_2d_hash.as_str(),
        signals.audio_hash.as_str(),
        signals.webgl_vendor.as_str(),
        signals.webgl_renderer.as_str(),
        &signals.hardware_concurrency.to_string(),
        &format!("{:.0}", signals.device_memory),
    ];

    sha256_hex(parts.join("|").as_bytes())
}

/// Consistent digest for a string list: lowercase-stable sort, comma join,
/// SHA-256 truncated to 16 hex chars. Empty lists collapse to `empty`.
pub fn hash_string_list(items: &[String]) -> String {
    if items.is_empty() {
        return "empty".to_string();
    }

    let mut sorted = items.to_vec();
    sorted.sort_by_key(|s| s.to_lowercase());

    sha256_hex_truncated(sorted.join(",").as_bytes(), 8)
}

/// Extract browser name and major version from a user agent
///
/// Returns the empty string when no known browser token is followed by a
/// version segment.
pub fn extract_browser_version(user_agent: &str) -> String {
    if user_agent.is_empty() {
        return String::new();
    }

    let ua = user_agent.to_lowercase();

    for browser in ["chrome", "firefox", "safari", "edge", "opera"] {
        if let Some(idx) = ua.find(browser) {
            let rest = &ua[idx..];
            if let Some(slash) = rest.find('/') {
                let segment = rest[slash + 1..].split('/').next().unwrap_or("");
                let major = segment.split('.').next().unwrap_or("").trim();
                return format!("{browser}:{major}");
            }
        }
    }

    String::new()
}

/// Deterministic digest over the high-weight subset of a feature map
fn vector_digest(features: &BTreeMap<String, f64>, weights: &Weights) -> String {
    let parts: Vec<String> = features
        .iter()
        .filter(|(_, &weight)| weight >= weights.environment)
        .map(|(key, weight)| format!("{key}:{weight:.2}"))
        .collect();

    sha256_hex_truncated(parts.join("|").as_bytes(), 16)
}
