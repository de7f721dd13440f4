//! API DTOs (Data Transfer Objects)

use kernel::id::{RequestId, VisitorId};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{DailyStat, Identification};
use crate::domain::signals::Signals;

/// Request for POST /v1/identify
#[derive(Debug, Clone, Deserialize)]
pub struct IdentifyRequest {
    pub signals: Signals,
}

/// Response for POST /v1/identify
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyResponse {
    pub visitor_id: VisitorId,
    pub confidence: f64,
    pub is_new: bool,
    pub request_id: RequestId,
}

/// Error body carrying the request id for log correlation
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub request_id: RequestId,
}

/// Response for GET /metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub total_identifications: i64,
    pub new_visitors: i64,
    pub healed_identifications: i64,
    pub cache_hits: i64,
    /// Percentage of identifications served from the hardware digest cache
    pub cache_hit_rate: f64,
}

/// Query for GET /api/analytics
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default = "default_days")]
    pub days: i32,
}

fn default_days() -> i32 {
    7
}

/// Response for GET /api/analytics
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsResponse {
    pub analytics: Vec<DailyStat>,
}

/// Query for GET /api/identifications
#[derive(Debug, Clone, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Response for GET /api/identifications
#[derive(Debug, Clone, Serialize)]
pub struct RecentResponse {
    pub identifications: Vec<Identification>,
    pub limit: i64,
    pub offset: i64,
}

/// Response for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}
