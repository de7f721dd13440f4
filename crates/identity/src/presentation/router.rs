//! Identity Router

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::{
    Router,
    routing::{get, post},
};
use platform::cache::Cache;

use crate::application::config::IdentityConfig;
use crate::domain::repository::IdentityRepository;
use crate::presentation::handlers::{self, AppState};
use crate::presentation::middleware::limit_by_ip;

/// Create the identity router for any repository and cache implementation
pub fn identity_router<R, C>(repo: Arc<R>, cache: Arc<C>, config: Arc<IdentityConfig>) -> Router
where
    R: IdentityRepository + Send + Sync + 'static,
    C: Cache + Send + Sync + 'static,
{
    let state = AppState {
        repo,
        cache,
        config,
    };

    let identify = Router::new()
        .route("/v1/identify", post(handlers::identify::<R, C>))
        .route_layer(from_fn_with_state(state.clone(), limit_by_ip::<R, C>))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics::<R, C>))
        .route("/api/analytics", get(handlers::analytics::<R, C>))
        .route(
            "/api/identifications",
            get(handlers::recent_identifications::<R, C>),
        )
        .with_state(state)
        .merge(identify)
}
