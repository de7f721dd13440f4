//! Reporting Use Cases
//!
//! Read-only projections for the dashboard collaborator: daily analytics
//! and recent identifications with pagination.

use std::sync::Arc;

use crate::domain::entities::{DailyStat, Identification};
use crate::domain::repository::IdentityRepository;
use crate::error::IdentityResult;

/// Upper bound on the analytics window
pub const MAX_ANALYTICS_DAYS: i32 = 90;
/// Upper bound on a single page of identifications
pub const MAX_PAGE_LIMIT: i64 = 100;

/// A clamped page of recent identifications
#[derive(Debug, Clone)]
pub struct RecentPage {
    pub identifications: Vec<Identification>,
    pub limit: i64,
    pub offset: i64,
}

/// Reporting Use Case
pub struct ReportingUseCase<R>
where
    R: IdentityRepository,
{
    repo: Arc<R>,
}

impl<R> ReportingUseCase<R>
where
    R: IdentityRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Daily aggregates, window clamped to [1, 90] days
    pub async fn analytics(&self, days: i32) -> IdentityResult<Vec<DailyStat>> {
        let days = days.clamp(1, MAX_ANALYTICS_DAYS);
        self.repo.get_analytics(days).await
    }

    /// Recent identifications, limit clamped to [1, 100]
    pub async fn recent(&self, limit: i64, offset: i64) -> IdentityResult<RecentPage> {
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        let offset = offset.max(0);

        let identifications = self.repo.get_recent(limit, offset).await?;

        Ok(RecentPage {
            identifications,
            limit,
            offset,
        })
    }
}
