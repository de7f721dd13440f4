//! Domain Entities
//!
//! Core business entities for the identification domain.

use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::{RequestId, VisitorId};
use serde::Serialize;

use crate::domain::signals::Signals;

/// Visitor entity - a unique browser/device identity
///
/// Created exactly once per distinct device. Last-seen metadata and the
/// visit count are bumped by the store whenever a new identification
/// references the visitor.
#[derive(Debug, Clone, Serialize)]
pub struct Visitor {
    pub visitor_id: VisitorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub trust_score: f64,
    pub first_seen_ip: Option<String>,
    pub last_seen_ip: Option<String>,
    pub visit_count: i32,
}

impl Visitor {
    /// Create a fresh visitor first seen at `ip`
    pub fn new(ip: &str) -> Self {
        let now = Utc::now();
        Self {
            visitor_id: VisitorId::new(),
            created_at: now,
            updated_at: now,
            trust_score: 1.0,
            first_seen_ip: Some(ip.to_string()),
            last_seen_ip: Some(ip.to_string()),
            visit_count: 1,
        }
    }
}

/// Identification entity - one fingerprint submission, append-only
#[derive(Debug, Clone, Serialize)]
pub struct Identification {
    pub request_id: RequestId,
    pub visitor_id: VisitorId,
    pub ip_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub signals: Signals,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
    pub hardware_hash: String,
    pub is_bot: bool,
}

/// Daily aggregate projected for the analytics endpoint
#[derive(Debug, Clone, Serialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub unique_visitors: i64,
    pub total_requests: i64,
    pub avg_confidence: f64,
    pub bot_requests: i64,
}
