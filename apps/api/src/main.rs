//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; application-level errors use the
//! unified error types from `kernel` and the identity crate.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, http,
    http::{Method, header},
};
use identity::domain::features::Weights;
use identity::{IdentityConfig, PgIdentityRepository, identity_router};
use platform::cache::MemoryCache;
use platform::rate_limit::RateLimitConfig;
use platform::retry::{RetryConfig, with_retry};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,identity=info,platform=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection with startup retry; cancellation and missing-row
    // classes are never retried.
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    let pool = with_retry(
        &RetryConfig::default(),
        || {
            PgPoolOptions::new()
                .max_connections(25)
                .min_connections(5)
                .max_lifetime(Duration::from_secs(3600))
                .connect(&database_url)
        },
        |err| !matches!(err, sqlx::Error::RowNotFound),
    )
    .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../database/migrations").run(&pool).await?;

    tracing::info!("Migrations completed");

    let repo = PgIdentityRepository::new(pool);
    repo.health_check().await?;

    // In-process hot cache: hardware digest lookups, rate limits, metrics
    let cache = MemoryCache::new();

    let config = load_identity_config();
    tracing::info!(
        threshold = config.similarity_threshold,
        candidate_limit = config.candidate_limit,
        "Initialized identification engine"
    );

    // CORS configuration
    let cors_origins = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
    let cors = build_cors(&cors_origins);

    // Build router
    let app = Router::new()
        .merge(identity_router(
            Arc::new(repo),
            Arc::new(cache),
            Arc::new(config),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("API_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::new(host.parse()?, port);

    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Engine configuration from the environment, falling back to defaults
fn load_identity_config() -> IdentityConfig {
    let defaults = IdentityConfig::default();

    IdentityConfig {
        similarity_threshold: env_parse("SIMILARITY_THRESHOLD", defaults.similarity_threshold),
        weights: Weights {
            hardware: env_parse("HARDWARE_WEIGHT", defaults.weights.hardware),
            environment: env_parse("ENVIRONMENT_WEIGHT", defaults.weights.environment),
            software: env_parse("SOFTWARE_WEIGHT", defaults.weights.software),
        },
        cache_ttl: Duration::from_secs(env_parse("CACHE_TTL_HOURS", 48u64) * 3600),
        ip_rate_limit: RateLimitConfig::new(
            env_parse("RATE_LIMIT_REQUESTS", defaults.ip_rate_limit.max_requests),
            env_parse("RATE_LIMIT_WINDOW_SECS", 60),
        ),
        hardware_rate_limit: RateLimitConfig::new(
            env_parse(
                "RATE_LIMIT_BY_HARDWARE",
                defaults.hardware_rate_limit.max_requests,
            ),
            env_parse("RATE_LIMIT_HARDWARE_WINDOW_SECS", 3600),
        ),
        candidate_limit: env_parse("CANDIDATE_LIMIT", defaults.candidate_limit),
    }
    .normalized()
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn build_cors(origins: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]));

    if origins.trim() == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let allowed: Vec<http::HeaderValue> = origins
            .split(',')
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();
        cors.allow_origin(allowed)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down gracefully...");
}
