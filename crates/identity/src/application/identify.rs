//! Identify Use Case
//!
//! The identification engine: cache probe, candidate retrieval, similarity
//! scoring, the heal/create decision, and persistence of the outcome.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{RequestId, VisitorId};
use platform::cache::Cache;
use uuid::Uuid;

use crate::application::config::IdentityConfig;
use crate::domain::bot::detect_bot;
use crate::domain::entities::Identification;
use crate::domain::features::{compute_hardware_digest, extract_features};
use crate::domain::repository::IdentityRepository;
use crate::domain::signals::Signals;
use crate::domain::similarity::weighted_jaccard;
use crate::error::IdentityResult;

/// Metric counter names, shared with the metrics endpoint
pub const METRIC_TOTAL: &str = "total_identifications";
pub const METRIC_NEW_VISITORS: &str = "new_visitors";
pub const METRIC_HEALED: &str = "healed_identifications";
pub const METRIC_CACHE_HITS: &str = "cache_hits";

/// Input DTO for an identification request
///
/// `signals` must already be validated; `ip_address` is the anonymized
/// caller address.
#[derive(Debug, Clone)]
pub struct IdentifyInput {
    pub request_id: RequestId,
    pub signals: Signals,
    pub ip_address: String,
}

/// Output DTO for an identification request
#[derive(Debug, Clone)]
pub struct IdentifyOutput {
    pub visitor_id: VisitorId,
    pub confidence: f64,
    pub is_new: bool,
    pub request_id: RequestId,
}

/// Identify Use Case
pub struct IdentifyUseCase<R, C>
where
    R: IdentityRepository,
    C: Cache,
{
    repo: Arc<R>,
    cache: Arc<C>,
    config: Arc<IdentityConfig>,
}

impl<R, C> IdentifyUseCase<R, C>
where
    R: IdentityRepository,
    C: Cache,
{
    pub fn new(repo: Arc<R>, cache: Arc<C>, config: Arc<IdentityConfig>) -> Self {
        Self {
            repo,
            cache,
            config,
        }
    }

    /// Run the matching pipeline for one validated request
    pub async fn execute(&self, input: IdentifyInput) -> IdentityResult<IdentifyOutput> {
        let hardware_digest = compute_hardware_digest(&input.signals);

        // Step 1: exact-match probe on the hardware digest. Cache faults
        // and unparseable entries demote to a miss, never fail the request.
        match self.cache.get_visitor(&hardware_digest).await {
            Ok(Some(cached)) => match Uuid::parse_str(&cached) {
                Ok(visitor_uuid) => {
                    return self
                        .record_cache_hit(&input, VisitorId::from_uuid(visitor_uuid), hardware_digest)
                        .await;
                }
                Err(_) => {
                    tracing::warn!(
                        hardware_digest = %hardware_digest,
                        "Unparseable visitor id in cache, treating as miss"
                    );
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Cache probe failed, treating as miss");
            }
        }

        // Step 2: feature vector of the incoming bundle
        let incoming = extract_features(&input.signals, &self.config.weights);

        // Step 3: scope candidates to the caller's /24
        let subnet = extract_ip_subnet(&input.ip_address);

        // Step 4: one row per distinct visitor in the subnet
        let candidates = self
            .repo
            .find_candidates(&subnet, self.config.candidate_limit)
            .await?;

        // Step 5: best-scoring candidate. Strict > keeps the first (most
        // recent) candidate on ties.
        let mut best_score = 0.0;
        let mut best_match: Option<&Identification> = None;

        for candidate in &candidates {
            let vector = extract_features(&candidate.signals, &self.config.weights);
            let score = weighted_jaccard(&incoming, &vector);

            if score > best_score {
                best_score = score;
                best_match = Some(candidate);
            }
        }

        // Step 6: heal onto the matched visitor, or mint a new one
        let (visitor_id, confidence, is_new) = match best_match {
            Some(matched) if best_score >= self.config.similarity_threshold => {
                self.write_through(&hardware_digest, matched.visitor_id)
                    .await;
                let _ = self.cache.increment_metric(METRIC_HEALED).await;

                tracing::info!(
                    visitor_id = %matched.visitor_id,
                    score = best_score,
                    "Healed identification onto existing visitor"
                );

                (matched.visitor_id, best_score, false)
            }
            _ => {
                let visitor = self.repo.create_visitor(&input.ip_address).await?;

                self.write_through(&hardware_digest, visitor.visitor_id)
                    .await;
                let _ = self.cache.increment_metric(METRIC_NEW_VISITORS).await;

                tracing::info!(visitor_id = %visitor.visitor_id, "Created new visitor");

                (visitor.visitor_id, 1.0, true)
            }
        };

        // Step 7: persist the identification
        let ident = build_identification(&input, visitor_id, confidence, hardware_digest);
        self.repo.create_identification(&ident).await?;

        Ok(IdentifyOutput {
            visitor_id,
            confidence,
            is_new,
            request_id: ident.request_id,
        })
    }

    /// Cache hit: persist with full confidence and return immediately
    async fn record_cache_hit(
        &self,
        input: &IdentifyInput,
        visitor_id: VisitorId,
        hardware_digest: String,
    ) -> IdentityResult<IdentifyOutput> {
        let ident = build_identification(input, visitor_id, 1.0, hardware_digest);
        self.repo.create_identification(&ident).await?;

        let _ = self.cache.increment_metric(METRIC_CACHE_HITS).await;

        tracing::info!(visitor_id = %visitor_id, "Identified via hardware digest cache");

        Ok(IdentifyOutput {
            visitor_id,
            confidence: 1.0,
            is_new: false,
            request_id: ident.request_id,
        })
    }

    /// Cache write-through; failures are logged, never propagated
    async fn write_through(&self, hardware_digest: &str, visitor_id: VisitorId) {
        if let Err(e) = self
            .cache
            .set_visitor(
                hardware_digest,
                &visitor_id.to_string(),
                self.config.cache_ttl,
            )
            .await
        {
            tracing::warn!(error = %e, "Cache write-through failed");
        }
    }
}

fn build_identification(
    input: &IdentifyInput,
    visitor_id: VisitorId,
    confidence: f64,
    hardware_hash: String,
) -> Identification {
    let user_agent = if input.signals.user_agent.is_empty() {
        None
    } else {
        Some(input.signals.user_agent.clone())
    };

    Identification {
        request_id: input.request_id,
        visitor_id,
        ip_address: input.ip_address.clone(),
        user_agent,
        signals: input.signals.clone(),
        confidence_score: confidence,
        created_at: Utc::now(),
        hardware_hash,
        is_bot: detect_bot(&input.signals),
    }
}

/// The /24 subnet of a dotted-quad address, in CIDR string form
///
/// Non-IPv4 input passes through unchanged.
pub fn extract_ip_subnet(ip: &str) -> String {
    let parts: Vec<&str> = ip.split('.').collect();
    if parts.len() != 4 {
        return ip.to_string();
    }
    format!("{}.{}.{}.0/24", parts[0], parts[1], parts[2])
}
