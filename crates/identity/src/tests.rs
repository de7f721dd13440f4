//! Unit tests for the identity crate
//!
//! Engine scenarios run against an in-memory repository double and the
//! in-process cache; pure domain logic is tested directly.

use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::application::identify::extract_ip_subnet;
use crate::domain::entities::{DailyStat, Identification, Visitor};
use crate::domain::repository::IdentityRepository;
use crate::domain::signals::Signals;
use crate::error::IdentityResult;

/// In-memory repository double emulating the store contract, including the
/// trigger that bumps visitor metadata on every identification insert.
#[derive(Clone, Default)]
struct MemoryRepository {
    inner: Arc<Mutex<MemState>>,
}

#[derive(Default)]
struct MemState {
    visitors: Vec<Visitor>,
    identifications: Vec<Identification>,
    last_analytics_days: Option<i32>,
}

impl MemoryRepository {
    fn identifications(&self) -> Vec<Identification> {
        self.inner.lock().unwrap().identifications.clone()
    }

    fn visitors(&self) -> Vec<Visitor> {
        self.inner.lock().unwrap().visitors.clone()
    }

    fn last_analytics_days(&self) -> Option<i32> {
        self.inner.lock().unwrap().last_analytics_days
    }
}

impl IdentityRepository for MemoryRepository {
    async fn create_visitor(&self, ip: &str) -> IdentityResult<Visitor> {
        let visitor = Visitor::new(ip);
        self.inner.lock().unwrap().visitors.push(visitor.clone());
        Ok(visitor)
    }

    async fn create_identification(&self, ident: &Identification) -> IdentityResult<()> {
        let mut state = self.inner.lock().unwrap();

        if let Some(visitor) = state
            .visitors
            .iter_mut()
            .find(|v| v.visitor_id == ident.visitor_id)
        {
            visitor.updated_at = ident.created_at;
            visitor.last_seen_ip = Some(ident.ip_address.clone());
            visitor.visit_count += 1;
        }

        state.identifications.push(ident.clone());
        Ok(())
    }

    async fn find_candidates(
        &self,
        subnet: &str,
        limit: i64,
    ) -> IdentityResult<Vec<Identification>> {
        let state = self.inner.lock().unwrap();

        let mut latest: Vec<Identification> = Vec::new();
        for ident in state
            .identifications
            .iter()
            .filter(|i| extract_ip_subnet(&i.ip_address) == subnet)
        {
            match latest
                .iter_mut()
                .find(|l| l.visitor_id == ident.visitor_id)
            {
                Some(existing) => {
                    if ident.created_at > existing.created_at {
                        *existing = ident.clone();
                    }
                }
                None => latest.push(ident.clone()),
            }
        }

        latest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        latest.truncate(limit as usize);
        Ok(latest)
    }

    async fn get_analytics(&self, days: i32) -> IdentityResult<Vec<DailyStat>> {
        let mut state = self.inner.lock().unwrap();
        state.last_analytics_days = Some(days);

        let today = Utc::now().date_naive();
        let idents = &state.identifications;
        if idents.is_empty() {
            return Ok(Vec::new());
        }

        let total = idents.len() as i64;
        let mut unique: Vec<_> = idents.iter().map(|i| i.visitor_id).collect();
        unique.sort_by_key(|id| *id.as_uuid());
        unique.dedup();

        Ok(vec![DailyStat {
            date: today,
            unique_visitors: unique.len() as i64,
            total_requests: total,
            avg_confidence: idents.iter().map(|i| i.confidence_score).sum::<f64>() / total as f64,
            bot_requests: idents.iter().filter(|i| i.is_bot).count() as i64,
        }])
    }

    async fn get_recent(&self, limit: i64, offset: i64) -> IdentityResult<Vec<Identification>> {
        let state = self.inner.lock().unwrap();
        let mut all = state.identifications.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

/// The S1 reference bundle: a desktop box with a discrete GPU
fn base_signals() -> Signals {
    Signals {
        canvas_2d_hash: "abc123".to_string(),
        audio_hash: "def456".to_string(),
        webgl_vendor: "NVIDIA".to_string(),
        webgl_renderer: "GeForce GTX 1080".to_string(),
        hardware_concurrency: 8,
        device_memory: 16.0,
        timezone: "America/New_York".to_string(),
        languages: vec!["en-US".to_string(), "en".to_string()],
        ..Default::default()
    }
}

mod features_tests {
    use super::base_signals;
    use crate::domain::features::{
        Weights, compute_hardware_digest, extract_browser_version, extract_features,
        hash_string_list,
    };
    use crate::domain::signals::Signals;

    #[test]
    fn test_extraction_is_deterministic() {
        let signals = base_signals();
        let weights = Weights::default();

        let v1 = extract_features(&signals, &weights);
        let v2 = extract_features(&signals, &weights);

        assert_eq!(v1, v2);
        assert_eq!(v1.digest, v2.digest);
        assert_eq!(v1.digest.len(), 32);
    }

    #[test]
    fn test_feature_keys_and_weights() {
        let signals = base_signals();
        let vector = extract_features(&signals, &Weights::default());

        assert_eq!(vector.features.get("canvas:abc123"), Some(&0.8));
        assert_eq!(vector.features.get("audio:def456"), Some(&0.8));
        assert_eq!(
            vector.features.get("webgl:NVIDIA:GeForce GTX 1080"),
            Some(&0.8)
        );
        assert_eq!(vector.features.get("hw_concurrency:8"), Some(&(0.8 * 0.6)));
        assert_eq!(vector.features.get("device_memory:16"), Some(&(0.8 * 0.6)));
        assert_eq!(vector.features.get("tz:America/New_York"), Some(&0.5));
        assert_eq!(
            vector.features.get("webgl_ext:empty"),
            Some(&(0.8 * 0.7)),
        );
    }

    #[test]
    fn test_optional_features_omitted() {
        let signals = Signals::default();
        let vector = extract_features(&signals, &Weights::default());

        assert!(!vector.features.keys().any(|k| k.starts_with("canvas:")));
        assert!(!vector.features.keys().any(|k| k.starts_with("audio:")));
        assert!(!vector.features.keys().any(|k| k.starts_with("tz:")));
        assert!(!vector.features.keys().any(|k| k.starts_with("platform:")));
        assert!(!vector.features.keys().any(|k| k.starts_with("browser:")));
        // Unconditional keys survive even on an empty bundle
        assert!(vector.features.contains_key("webgl::"));
        assert!(vector.features.contains_key("screen:0x0"));
    }

    #[test]
    fn test_hardware_digest_stable_across_soft_drift() {
        let base = base_signals();

        let mut drifted = base.clone();
        drifted.timezone = "Europe/Berlin".to_string();
        drifted.user_agent = "Mozilla/5.0 Chrome/121.0.0.0".to_string();
        drifted.languages = vec!["de-DE".to_string()];
        drifted.fonts = vec!["Arial".to_string()];
        drifted.platform = "Linux x86_64".to_string();

        assert_eq!(compute_hardware_digest(&base), compute_hardware_digest(&drifted));
    }

    #[test]
    fn test_hardware_digest_changes_with_hardware() {
        let base = base_signals();

        let mut swapped = base.clone();
        swapped.webgl_renderer = "GeForce RTX 3080".to_string();

        assert_ne!(compute_hardware_digest(&base), compute_hardware_digest(&swapped));
    }

    #[test]
    fn test_vector_digest_ignores_software_tier() {
        let base = base_signals();
        let weights = Weights::default();

        let mut updated = base.clone();
        updated.user_agent = "Mozilla/5.0 Chrome/121.0.0.0".to_string();
        updated.platform = "Win32".to_string();

        let v1 = extract_features(&base, &weights);
        let v2 = extract_features(&updated, &weights);
        assert_eq!(v1.digest, v2.digest);

        let mut moved = base.clone();
        moved.timezone = "Europe/Berlin".to_string();
        let v3 = extract_features(&moved, &weights);
        assert_ne!(v1.digest, v3.digest);
    }

    #[test]
    fn test_extract_browser_version() {
        let cases = [
            (
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36",
                "chrome:120",
            ),
            (
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Firefox/121.0",
                "firefox:121",
            ),
            ("", ""),
            ("curl/8.4.0", ""),
        ];

        for (ua, expected) in cases {
            assert_eq!(extract_browser_version(ua), expected, "ua: {ua}");
        }
    }

    #[test]
    fn test_hash_string_list_sentinel_and_case() {
        assert_eq!(hash_string_list(&[]), "empty");

        let mixed = vec!["Arial".to_string(), "courier".to_string()];
        let swapped = vec!["courier".to_string(), "Arial".to_string()];
        assert_eq!(hash_string_list(&mixed), hash_string_list(&swapped));
    }
}

mod similarity_tests {
    use super::base_signals;
    use crate::domain::features::{Weights, extract_features};
    use crate::domain::similarity::weighted_jaccard;

    #[test]
    fn test_identical_signals_score_one() {
        let weights = Weights::default();
        let v1 = extract_features(&base_signals(), &weights);
        let v2 = extract_features(&base_signals(), &weights);

        assert_eq!(weighted_jaccard(&v1, &v2), 1.0);
    }

    #[test]
    fn test_software_change_stays_above_threshold() {
        let weights = Weights::default();

        let mut base = base_signals();
        base.user_agent = "Mozilla/5.0 Chrome/120.0.0.0".to_string();
        base.platform = "Win32".to_string();

        let mut updated = base.clone();
        updated.user_agent = "Mozilla/5.0 Chrome/121.0.0.0".to_string();

        let v1 = extract_features(&base, &weights);
        let v2 = extract_features(&updated, &weights);

        assert!(weighted_jaccard(&v1, &v2) >= 0.75);
    }

    #[test]
    fn test_hardware_change_drops_below_threshold() {
        let weights = Weights::default();
        let base = base_signals();

        let mut different = base.clone();
        different.canvas_2d_hash = "xyz789".to_string();
        different.audio_hash = "uvw012".to_string();
        different.webgl_renderer = "GeForce RTX 3080".to_string();

        let v1 = extract_features(&base, &weights);
        let v2 = extract_features(&different, &weights);

        assert!(weighted_jaccard(&v1, &v2) < 0.75);
    }

    #[test]
    fn test_symmetry_and_bounds() {
        let weights = Weights::default();
        let base = base_signals();

        let mut other = base.clone();
        other.timezone = "Europe/Berlin".to_string();
        other.canvas_2d_hash = "ffff0000".to_string();

        let v1 = extract_features(&base, &weights);
        let v2 = extract_features(&other, &weights);

        let forward = weighted_jaccard(&v1, &v2);
        let backward = weighted_jaccard(&v2, &v1);

        assert_eq!(forward, backward);
        assert!((0.0..=1.0).contains(&forward));
    }
}

mod validate_tests {
    use crate::domain::signals::Signals;
    use crate::domain::validate::validate_signals;
    use crate::error::IdentityError;

    fn valid_signals() -> Signals {
        Signals {
            canvas_2d_hash: "abc123def456".to_string(),
            audio_hash: "feedbeef".to_string(),
            hardware_concurrency: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_bundle_passes() {
        assert!(validate_signals(valid_signals()).is_ok());
    }

    #[test]
    fn test_missing_audio_rejected() {
        let mut signals = valid_signals();
        signals.audio_hash = String::new();

        let err = validate_signals(signals).unwrap_err();
        assert!(matches!(
            err,
            IdentityError::InvalidSignal {
                field: "audio_hash",
                ..
            }
        ));
    }

    #[test]
    fn test_hardware_concurrency_range() {
        let mut signals = valid_signals();
        signals.hardware_concurrency = 257;
        assert!(validate_signals(signals).is_err());

        let mut signals = valid_signals();
        signals.hardware_concurrency = -1;
        assert!(validate_signals(signals).is_err());

        let mut signals = valid_signals();
        signals.hardware_concurrency = 0;
        assert!(validate_signals(signals).is_ok());
    }

    #[test]
    fn test_user_agent_length_cap() {
        let mut signals = valid_signals();
        signals.user_agent = "x".repeat(1001);
        assert!(validate_signals(signals).is_err());

        let mut signals = valid_signals();
        signals.user_agent = "x".repeat(1000);
        assert!(validate_signals(signals).is_ok());
    }

    #[test]
    fn test_strings_are_sanitized() {
        let mut signals = valid_signals();
        signals.user_agent = "Mozilla\x00/5.0\x07".to_string();
        signals.fonts = vec!["Ari\x00al".to_string()];

        let clean = validate_signals(signals).unwrap();
        assert_eq!(clean.user_agent, "Mozilla/5.0");
        assert_eq!(clean.fonts, vec!["Arial".to_string()]);
    }
}

mod bot_tests {
    use super::base_signals;
    use crate::domain::bot::detect_bot;

    #[test]
    fn test_clean_bundle_is_not_bot() {
        assert!(!detect_bot(&base_signals()));
    }

    #[test]
    fn test_automation_flags() {
        for flag in 0..5 {
            let mut signals = base_signals();
            match flag {
                0 => signals.webdriver = true,
                1 => signals.phantom_present = true,
                2 => signals.selenium_present = true,
                3 => signals.automation_present = true,
                _ => signals.headless_chrome = true,
            }
            assert!(detect_bot(&signals), "flag {flag} should mark bot");
        }
    }

    #[test]
    fn test_missing_hardware_signals() {
        let mut signals = base_signals();
        signals.canvas_2d_hash = "error".to_string();
        assert!(detect_bot(&signals));

        let mut signals = base_signals();
        signals.audio_hash = String::new();
        assert!(detect_bot(&signals));

        let mut signals = base_signals();
        signals.hardware_concurrency = 0;
        assert!(detect_bot(&signals));

        let mut signals = base_signals();
        signals.device_memory = 0.0;
        assert!(detect_bot(&signals));
    }

    #[test]
    fn test_software_rendered_webgl() {
        let mut signals = base_signals();
        signals.webgl_vendor = "Brian Paul".to_string();
        assert!(detect_bot(&signals));

        let mut signals = base_signals();
        signals.webgl_renderer = "Google SwiftShader".to_string();
        assert!(detect_bot(&signals));
    }
}

mod engine_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use kernel::id::RequestId;
    use platform::cache::{Cache, MemoryCache};

    use super::{MemoryRepository, base_signals};
    use crate::application::config::IdentityConfig;
    use crate::application::identify::{IdentifyInput, IdentifyUseCase};
    use crate::domain::features::compute_hardware_digest;
    use crate::domain::signals::Signals;

    fn make_engine(
        repo: &MemoryRepository,
        cache: &Arc<MemoryCache>,
    ) -> IdentifyUseCase<MemoryRepository, MemoryCache> {
        IdentifyUseCase::new(
            Arc::new(repo.clone()),
            cache.clone(),
            Arc::new(IdentityConfig::default()),
        )
    }

    fn input(signals: Signals) -> IdentifyInput {
        IdentifyInput {
            request_id: RequestId::new(),
            signals,
            ip_address: "192.168.1.0".to_string(),
        }
    }

    #[tokio::test]
    async fn test_identical_bundle_twice_converges_on_cache() {
        let repo = MemoryRepository::default();
        let cache = Arc::new(MemoryCache::new());
        let engine = make_engine(&repo, &cache);

        let first = engine.execute(input(base_signals())).await.unwrap();
        assert!(first.is_new);
        assert_eq!(first.confidence, 1.0);

        let second = engine.execute(input(base_signals())).await.unwrap();
        assert!(!second.is_new);
        assert_eq!(second.confidence, 1.0);
        assert_eq!(second.visitor_id, first.visitor_id);

        // Both requests were persisted, and only one visitor exists
        assert_eq!(repo.identifications().len(), 2);
        assert_eq!(repo.visitors().len(), 1);
    }

    #[tokio::test]
    async fn test_browser_update_heals_via_similarity() {
        let repo = MemoryRepository::default();

        let mut original = base_signals();
        original.user_agent = "Mozilla/5.0 Chrome/120.0.0.0".to_string();

        let cache = Arc::new(MemoryCache::new());
        let first = make_engine(&repo, &cache)
            .execute(input(original.clone()))
            .await
            .unwrap();
        assert!(first.is_new);

        // Cold cache forces the similarity path
        let mut updated = original;
        updated.user_agent = "Mozilla/5.0 Chrome/121.0.0.0".to_string();

        let cold_cache = Arc::new(MemoryCache::new());
        let second = make_engine(&repo, &cold_cache)
            .execute(input(updated))
            .await
            .unwrap();

        assert!(!second.is_new);
        assert_eq!(second.visitor_id, first.visitor_id);
        assert!(second.confidence >= 0.75);
        assert!(second.confidence <= 1.0);
    }

    #[tokio::test]
    async fn test_gpu_swap_creates_new_visitor() {
        let repo = MemoryRepository::default();
        let cache = Arc::new(MemoryCache::new());
        let engine = make_engine(&repo, &cache);

        let first = engine.execute(input(base_signals())).await.unwrap();

        let mut swapped = base_signals();
        swapped.canvas_2d_hash = "xyz789".to_string();
        swapped.audio_hash = "uvw012".to_string();
        swapped.webgl_renderer = "GeForce RTX 3080".to_string();

        let second = engine.execute(input(swapped)).await.unwrap();

        assert!(second.is_new);
        assert_eq!(second.confidence, 1.0);
        assert_ne!(second.visitor_id, first.visitor_id);
        assert_eq!(repo.visitors().len(), 2);
    }

    #[tokio::test]
    async fn test_bot_marker_recorded_without_affecting_matching() {
        let repo = MemoryRepository::default();
        let cache = Arc::new(MemoryCache::new());
        let engine = make_engine(&repo, &cache);

        let mut signals = base_signals();
        signals.webdriver = true;

        let output = engine.execute(input(signals)).await.unwrap();
        assert!(output.is_new);

        let stored = repo.identifications();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_bot);
    }

    #[tokio::test]
    async fn test_unparseable_cache_entry_treated_as_miss() {
        let repo = MemoryRepository::default();
        let cache = Arc::new(MemoryCache::new());

        let digest = compute_hardware_digest(&base_signals());
        cache
            .set_visitor(&digest, "definitely-not-a-uuid", Duration::from_secs(60))
            .await
            .unwrap();

        let output = make_engine(&repo, &cache)
            .execute(input(base_signals()))
            .await
            .unwrap();

        // The corrupt entry must not be trusted; a fresh visitor is minted
        assert!(output.is_new);
        assert_eq!(repo.visitors().len(), 1);
    }

    #[tokio::test]
    async fn test_visitor_metadata_bumped_per_identification() {
        let repo = MemoryRepository::default();
        let cache = Arc::new(MemoryCache::new());
        let engine = make_engine(&repo, &cache);

        engine.execute(input(base_signals())).await.unwrap();
        engine.execute(input(base_signals())).await.unwrap();

        let visitors = repo.visitors();
        assert_eq!(visitors.len(), 1);
        // Creation counts one visit, each identification adds another
        assert_eq!(visitors[0].visit_count, 3);
        assert_eq!(visitors[0].last_seen_ip.as_deref(), Some("192.168.1.0"));
    }

    #[tokio::test]
    async fn test_subnet_scoping_hides_candidates() {
        let repo = MemoryRepository::default();
        let cache = Arc::new(MemoryCache::new());
        let engine = make_engine(&repo, &cache);

        let first = engine.execute(input(base_signals())).await.unwrap();

        // Same device, different /24, cold cache: no candidates in scope
        let cold_cache = Arc::new(MemoryCache::new());
        let far_input = IdentifyInput {
            request_id: RequestId::new(),
            signals: base_signals(),
            ip_address: "10.9.8.0".to_string(),
        };
        let second = make_engine(&repo, &cold_cache)
            .execute(far_input)
            .await
            .unwrap();

        assert!(second.is_new);
        assert_ne!(second.visitor_id, first.visitor_id);
    }
}

mod reporting_tests {
    use std::sync::Arc;

    use super::MemoryRepository;
    use crate::application::reporting::ReportingUseCase;

    #[tokio::test]
    async fn test_analytics_days_clamped() {
        let repo = MemoryRepository::default();
        let reporting = ReportingUseCase::new(Arc::new(repo.clone()));

        reporting.analytics(365).await.unwrap();
        assert_eq!(repo.last_analytics_days(), Some(90));

        reporting.analytics(-5).await.unwrap();
        assert_eq!(repo.last_analytics_days(), Some(1));
    }

    #[tokio::test]
    async fn test_recent_page_clamped() {
        let repo = MemoryRepository::default();
        let reporting = ReportingUseCase::new(Arc::new(repo));

        let page = reporting.recent(500, -3).await.unwrap();
        assert_eq!(page.limit, 100);
        assert_eq!(page.offset, 0);

        let page = reporting.recent(20, 40).await.unwrap();
        assert_eq!(page.limit, 20);
        assert_eq!(page.offset, 40);
    }
}

mod dto_tests {
    use kernel::id::{RequestId, VisitorId};

    use crate::presentation::dto::*;

    #[test]
    fn test_identify_response_serialization() {
        let response = IdentifyResponse {
            visitor_id: VisitorId::new(),
            confidence: 0.92,
            is_new: false,
            request_id: RequestId::new(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"visitor_id\""));
        assert!(json.contains("\"confidence\":0.92"));
        assert!(json.contains("\"is_new\":false"));
        assert!(json.contains("\"request_id\""));
    }

    #[test]
    fn test_identify_request_deserialization() {
        let json = r#"{"signals":{"canvas_2d_hash":"abc123de","audio_hash":"def456aa","hardware_concurrency":8,"device_memory":16,"languages":["en-US","en"]}}"#;
        let request: IdentifyRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.signals.canvas_2d_hash, "abc123de");
        assert_eq!(request.signals.hardware_concurrency, 8);
        assert_eq!(request.signals.device_memory, 16.0);
        // Absent fields fall back to zero values
        assert!(request.signals.timezone.is_empty());
        assert!(!request.signals.webdriver);
    }

    #[test]
    fn test_queries_default() {
        let query: AnalyticsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.days, 7);

        let query: RecentQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 50);
        assert_eq!(query.offset, 0);
    }

    #[test]
    fn test_error_response_serialization() {
        let body = ErrorResponse {
            error: "invalid signal audio_hash: required".to_string(),
            request_id: RequestId::new(),
        };

        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"error\""));
        assert!(json.contains("\"request_id\""));
    }
}
