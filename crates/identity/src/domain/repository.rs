//! Repository Traits
//!
//! Interfaces for identity persistence. Implementation is in the
//! infrastructure layer.

use crate::domain::entities::{DailyStat, Identification, Visitor};
use crate::error::IdentityResult;

/// Identity store contract consumed by the identification engine
#[trait_variant::make(IdentityRepository: Send)]
pub trait LocalIdentityRepository {
    /// Allocate a fresh visitor first seen at `ip`
    async fn create_visitor(&self, ip: &str) -> IdentityResult<Visitor>;

    /// Append an identification record
    ///
    /// Must also bump the referenced visitor's `updated_at`, `last_seen_ip`
    /// and `visit_count` as one logical operation.
    async fn create_identification(&self, ident: &Identification) -> IdentityResult<()>;

    /// Most recent identification per distinct visitor in `subnet`,
    /// ordered by recency, capped by `limit`
    async fn find_candidates(&self, subnet: &str, limit: i64)
        -> IdentityResult<Vec<Identification>>;

    /// Daily aggregates for the last `days` days
    async fn get_analytics(&self, days: i32) -> IdentityResult<Vec<DailyStat>>;

    /// Recent identifications, newest first
    async fn get_recent(&self, limit: i64, offset: i64) -> IdentityResult<Vec<Identification>>;
}
