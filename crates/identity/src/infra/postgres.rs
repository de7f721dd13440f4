//! PostgreSQL Repository Implementation

use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::{RequestId, VisitorId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{DailyStat, Identification, Visitor};
use crate::domain::repository::IdentityRepository;
use crate::domain::signals::Signals;
use crate::error::{IdentityError, IdentityResult};

/// PostgreSQL-backed repository
///
/// The visitor metadata bump on every identification insert is done by a
/// trigger installed with the migrations, so inserts stay single statements.
#[derive(Clone)]
pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verify database connectivity
    pub async fn health_check(&self) -> IdentityResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

impl IdentityRepository for PgIdentityRepository {
    async fn create_visitor(&self, ip: &str) -> IdentityResult<Visitor> {
        let visitor = Visitor::new(ip);

        sqlx::query(
            r#"
            INSERT INTO visitors (
                visitor_id,
                created_at,
                updated_at,
                trust_score,
                first_seen_ip,
                last_seen_ip,
                visit_count
            ) VALUES ($1, $2, $3, $4, $5::inet, $6::inet, $7)
            "#,
        )
        .bind(visitor.visitor_id.into_uuid())
        .bind(visitor.created_at)
        .bind(visitor.updated_at)
        .bind(visitor.trust_score)
        .bind(&visitor.first_seen_ip)
        .bind(&visitor.last_seen_ip)
        .bind(visitor.visit_count)
        .execute(&self.pool)
        .await?;

        tracing::info!(visitor_id = %visitor.visitor_id, "Visitor created");

        Ok(visitor)
    }

    async fn create_identification(&self, ident: &Identification) -> IdentityResult<()> {
        let signals_json = serde_json::to_value(&ident.signals)
            .map_err(|e| IdentityError::Internal(format!("failed to serialize signals: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO identifications (
                request_id,
                visitor_id,
                ip_address,
                user_agent,
                signals,
                confidence_score,
                created_at,
                hardware_hash,
                is_bot
            ) VALUES ($1, $2, $3::inet, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(ident.request_id.into_uuid())
        .bind(ident.visitor_id.into_uuid())
        .bind(&ident.ip_address)
        .bind(&ident.user_agent)
        .bind(signals_json)
        .bind(ident.confidence_score)
        .bind(ident.created_at)
        .bind(&ident.hardware_hash)
        .bind(ident.is_bot)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            request_id = %ident.request_id,
            visitor_id = %ident.visitor_id,
            confidence = ident.confidence_score,
            is_bot = ident.is_bot,
            "Identification stored"
        );

        Ok(())
    }

    async fn find_candidates(
        &self,
        subnet: &str,
        limit: i64,
    ) -> IdentityResult<Vec<Identification>> {
        let rows = sqlx::query_as::<_, IdentificationRow>(
            r#"
            SELECT
                request_id,
                visitor_id,
                ip_address::TEXT AS ip_address,
                user_agent,
                signals,
                confidence_score,
                created_at,
                hardware_hash,
                is_bot
            FROM (
                SELECT DISTINCT ON (visitor_id) *
                FROM identifications
                WHERE ip_subnet = $1::cidr
                ORDER BY visitor_id, created_at DESC
            ) latest
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(subnet)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_identification()).collect()
    }

    async fn get_analytics(&self, days: i32) -> IdentityResult<Vec<DailyStat>> {
        let rows = sqlx::query_as::<_, DailyStatRow>(
            r#"
            SELECT
                date,
                unique_visitors,
                total_requests,
                avg_confidence,
                bot_requests
            FROM visitor_analytics
            WHERE date >= CURRENT_DATE - $1::integer
            ORDER BY date DESC
            "#,
        )
        .bind(days)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DailyStatRow::into_daily_stat).collect())
    }

    async fn get_recent(&self, limit: i64, offset: i64) -> IdentityResult<Vec<Identification>> {
        let rows = sqlx::query_as::<_, IdentificationRow>(
            r#"
            SELECT
                request_id,
                visitor_id,
                ip_address::TEXT AS ip_address,
                user_agent,
                signals,
                confidence_score,
                created_at,
                hardware_hash,
                is_bot
            FROM identifications
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_identification()).collect()
    }
}

// Internal row types for sqlx mapping
#[derive(sqlx::FromRow)]
struct IdentificationRow {
    request_id: Uuid,
    visitor_id: Uuid,
    ip_address: String,
    user_agent: Option<String>,
    signals: serde_json::Value,
    confidence_score: f64,
    created_at: DateTime<Utc>,
    hardware_hash: String,
    is_bot: bool,
}

impl IdentificationRow {
    fn into_identification(self) -> IdentityResult<Identification> {
        let signals: Signals = serde_json::from_value(self.signals)
            .map_err(|e| IdentityError::Internal(format!("failed to deserialize signals: {e}")))?;

        Ok(Identification {
            request_id: RequestId::from_uuid(self.request_id),
            visitor_id: VisitorId::from_uuid(self.visitor_id),
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            signals,
            confidence_score: self.confidence_score,
            created_at: self.created_at,
            hardware_hash: self.hardware_hash,
            is_bot: self.is_bot,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DailyStatRow {
    date: NaiveDate,
    unique_visitors: i64,
    total_requests: i64,
    avg_confidence: f64,
    bot_requests: i64,
}

impl DailyStatRow {
    fn into_daily_stat(self) -> DailyStat {
        DailyStat {
            date: self.date,
            unique_visitors: self.unique_visitors,
            total_requests: self.total_requests,
            avg_confidence: self.avg_confidence,
            bot_requests: self.bot_requests,
        }
    }
}
