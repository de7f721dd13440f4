//! Identity Middleware

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use platform::cache::Cache;
use platform::client::extract_client_ip;

use crate::domain::repository::IdentityRepository;
use crate::error::IdentityError;
use crate::presentation::handlers::AppState;

/// Per-IP rate limit, keyed on the raw (pre-anonymization) client address
///
/// Cache failures never block traffic; the request passes through.
pub async fn limit_by_ip<R, C>(
    State(state): State<AppState<R, C>>,
    req: Request,
    next: Next,
) -> Response
where
    R: IdentityRepository + Send + Sync + 'static,
    C: Cache + Send + Sync + 'static,
{
    let direct_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    let Some(ip) = extract_client_ip(req.headers(), direct_ip) else {
        return next.run(req).await;
    };

    let identifier = format!("ip:{ip}");

    match state
        .cache
        .check_rate_limit(&identifier, &state.config.ip_rate_limit)
        .await
    {
        Ok(result) if !result.allowed => {
            tracing::warn!(ip = %ip, "Rate limit exceeded");
            IdentityError::RateLimited {
                retry_after_secs: result.retry_after_secs,
            }
            .into_response()
        }
        Ok(_) => next.run(req).await,
        Err(e) => {
            tracing::warn!(error = %e, "Rate limit check failed, allowing request");
            next.run(req).await
        }
    }
}
