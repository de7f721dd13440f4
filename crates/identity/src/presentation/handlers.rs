//! HTTP Handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use kernel::error::app_error::{AppResult, ResultExt};
use kernel::error::kind::ErrorKind;
use kernel::id::RequestId;
use platform::cache::Cache;
use platform::client::{anonymize_ip, extract_client_ip};

use crate::application::config::IdentityConfig;
use crate::application::identify::{
    IdentifyInput, IdentifyUseCase, METRIC_CACHE_HITS, METRIC_HEALED, METRIC_NEW_VISITORS,
    METRIC_TOTAL,
};
use crate::application::reporting::ReportingUseCase;
use crate::domain::features::compute_hardware_digest;
use crate::domain::repository::IdentityRepository;
use crate::domain::validate::validate_signals;
use crate::error::IdentityError;
use crate::presentation::dto::{
    AnalyticsQuery, AnalyticsResponse, ErrorResponse, HealthResponse, IdentifyRequest,
    IdentifyResponse, MetricsResponse, RecentQuery, RecentResponse,
};

/// Shared state for identity handlers
pub struct AppState<R, C>
where
    R: IdentityRepository + Send + Sync + 'static,
    C: Cache + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub cache: Arc<C>,
    pub config: Arc<IdentityConfig>,
}

impl<R, C> Clone for AppState<R, C>
where
    R: IdentityRepository + Send + Sync + 'static,
    C: Cache + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            cache: self.cache.clone(),
            config: self.config.clone(),
        }
    }
}

/// POST /v1/identify
pub async fn identify<R, C>(
    State(state): State<AppState<R, C>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<IdentifyRequest>, JsonRejection>,
) -> Response
where
    R: IdentityRepository + Send + Sync + 'static,
    C: Cache + Send + Sync + 'static,
{
    let request_id = RequestId::new();

    let Json(req) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            tracing::warn!(
                request_id = %request_id,
                error = %rejection,
                "Failed to parse request body"
            );
            return error_response(
                StatusCode::BAD_REQUEST,
                "Invalid request body".to_string(),
                request_id,
            );
        }
    };

    let signals = match validate_signals(req.signals) {
        Ok(signals) => signals,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request validation failed");
            return error_response(StatusCode::BAD_REQUEST, e.to_string(), request_id);
        }
    };

    // The engine only ever sees the anonymized address
    let ip_address = extract_client_ip(&headers, Some(addr.ip()))
        .map(|ip| anonymize_ip(ip).to_string())
        .unwrap_or_default();

    // Per-hardware-digest rate limit, checked once the body is parsed.
    // A cache fault never blocks traffic.
    let hardware_digest = compute_hardware_digest(&signals);
    match state
        .cache
        .check_rate_limit(
            &format!("hw:{hardware_digest}"),
            &state.config.hardware_rate_limit,
        )
        .await
    {
        Ok(result) if !result.allowed => {
            tracing::warn!(request_id = %request_id, "Hardware rate limit exceeded");
            return IdentityError::RateLimited {
                retry_after_secs: result.retry_after_secs,
            }
            .into_response();
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Hardware rate limit check failed, allowing request");
        }
    }

    let use_case = IdentifyUseCase::new(
        state.repo.clone(),
        state.cache.clone(),
        state.config.clone(),
    );

    let input = IdentifyInput {
        request_id,
        signals,
        ip_address: ip_address.clone(),
    };

    let output = match use_case.execute(input).await {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                error = %e,
                ip = %ip_address,
                "Identification failed"
            );
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to identify visitor".to_string(),
                request_id,
            );
        }
    };

    let _ = state.cache.increment_metric(METRIC_TOTAL).await;

    tracing::info!(
        request_id = %request_id,
        visitor_id = %output.visitor_id,
        is_new = output.is_new,
        confidence = output.confidence,
        "Identification successful"
    );

    (
        StatusCode::OK,
        Json(IdentifyResponse {
            visitor_id: output.visitor_id,
            confidence: output.confidence,
            is_new: output.is_new,
            request_id: output.request_id,
        }),
    )
        .into_response()
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "identity-api",
    })
}

/// GET /metrics
pub async fn metrics<R, C>(State(state): State<AppState<R, C>>) -> Json<MetricsResponse>
where
    R: IdentityRepository + Send + Sync + 'static,
    C: Cache + Send + Sync + 'static,
{
    let total = state.cache.get_metric(METRIC_TOTAL).await.unwrap_or(0);
    let new_visitors = state
        .cache
        .get_metric(METRIC_NEW_VISITORS)
        .await
        .unwrap_or(0);
    let healed = state.cache.get_metric(METRIC_HEALED).await.unwrap_or(0);
    let cache_hits = state.cache.get_metric(METRIC_CACHE_HITS).await.unwrap_or(0);

    Json(MetricsResponse {
        total_identifications: total,
        new_visitors,
        healed_identifications: healed,
        cache_hits,
        cache_hit_rate: calculate_rate(cache_hits, total),
    })
}

/// GET /api/analytics
pub async fn analytics<R, C>(
    State(state): State<AppState<R, C>>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<AnalyticsResponse>>
where
    R: IdentityRepository + Send + Sync + 'static,
    C: Cache + Send + Sync + 'static,
{
    let reporting = ReportingUseCase::new(state.repo.clone());

    let analytics = reporting
        .analytics(query.days)
        .await
        .map_app_err(ErrorKind::InternalServerError, "Failed to fetch analytics")?;

    Ok(Json(AnalyticsResponse { analytics }))
}

/// GET /api/identifications
pub async fn recent_identifications<R, C>(
    State(state): State<AppState<R, C>>,
    Query(query): Query<RecentQuery>,
) -> AppResult<Json<RecentResponse>>
where
    R: IdentityRepository + Send + Sync + 'static,
    C: Cache + Send + Sync + 'static,
{
    let reporting = ReportingUseCase::new(state.repo.clone());

    let page = reporting.recent(query.limit, query.offset).await.map_app_err(
        ErrorKind::InternalServerError,
        "Failed to fetch identifications",
    )?;

    Ok(Json(RecentResponse {
        identifications: page.identifications,
        limit: page.limit,
        offset: page.offset,
    }))
}

fn error_response(status: StatusCode, error: String, request_id: RequestId) -> Response {
    (status, Json(ErrorResponse { error, request_id })).into_response()
}

fn calculate_rate(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    (numerator as f64 / denominator as f64) * 100.0
}
