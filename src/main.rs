use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use qrly::api;
use qrly::auth::AuthService;
use qrly::config::{Config, DatabaseBackend};
use qrly::ratelimit::{NoopRateLimiter, RateLimitService, RateLimiter, RedisRateLimiter};
use qrly::redirect;
use qrly::storage::{PostgresStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(
                SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
            )
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.database.url);
            Arc::new(PostgresStorage::new(&config.database.url).await?)
        }
    };

    // Initialize database
    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    // Initialize auth service
    let auth_service = Arc::new(AuthService::new(&config.api_tokens));

    // Select rate limiter backend
    let limiter: Arc<dyn RateLimiter> = match config.rate_limit.redis_url.as_deref() {
        Some(url) => {
            info!(
                "🚦 Redirect rate limiting via Redis ({} per {}s window)",
                config.rate_limit.per_window, config.rate_limit.window_secs
            );
            Arc::new(RedisRateLimiter::new(
                url,
                config.rate_limit.per_window,
                Duration::from_secs(config.rate_limit.window_secs),
            )?)
        }
        None => {
            info!("🚦 No REDIS_URL configured - redirect rate limiting is disabled");
            Arc::new(NoopRateLimiter::new(config.rate_limit.per_window))
        }
    };
    let rate_limiter = RateLimitService::new(
        limiter,
        config.rate_limit.per_window,
        Duration::from_millis(config.rate_limit.timeout_ms),
    );

    // Create routers
    let api_router = api::create_api_router(Arc::clone(&storage), auth_service);
    let redirect_router = redirect::create_redirect_router(
        Arc::clone(&storage),
        rate_limiter,
        config.base_url.clone(),
        config.geo_country_header.clone(),
    );

    // Start API server
    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 API server listening on http://{}", api_addr);
    info!("   - API endpoints available at http://{}/api/...", api_addr);

    // Start redirect server
    let redirect_addr = format!(
        "{}:{}",
        config.redirect_server.host, config.redirect_server.port
    );
    let redirect_listener = tokio::net::TcpListener::bind(&redirect_addr).await?;
    info!("🚀 Redirect server listening on http://{}", redirect_addr);
    info!("   - Scans served at {}/go/<code>", config.base_url);

    // Run both servers concurrently
    tokio::try_join!(
        axum::serve(api_listener, api_router),
        axum::serve(redirect_listener, redirect_router),
    )?;

    Ok(())
}
