//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::infrastructure::external::{
    build_http_client, Geocoder, NominatimClient, PaymentGateway, WompiClient,
};
use crate::infrastructure::{cache, database};
use crate::presentation::http::handlers::health;
use crate::presentation::http::routes;
use crate::presentation::middleware::{RateLimitConfig, RateLimiter};

/// Rate limiter key segment for the credential endpoints
const AUTH_LIMITER_ENDPOINT: &str = "auth";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// `None` when no Redis URL is configured
    pub redis: Option<ConnectionManager>,
    pub settings: Arc<Settings>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub geocoder: Arc<dyn Geocoder>,
    pub auth_limiter: RateLimiter,
}

impl AppState {
    /// Wire the HTTP clients and the auth limiter around existing connections.
    pub fn new(db: PgPool, redis: Option<ConnectionManager>, settings: Settings) -> Result<Self> {
        let http = build_http_client(&settings.nominatim.user_agent)?;
        let gateway: Arc<dyn PaymentGateway> =
            Arc::new(WompiClient::new(http.clone(), &settings.wompi));
        let geocoder: Arc<dyn Geocoder> =
            Arc::new(NominatimClient::new(http, &settings.nominatim));
        let auth_limiter = RateLimiter::new(
            redis.clone(),
            AUTH_LIMITER_ENDPOINT,
            RateLimitConfig::from(&settings.rate_limit),
        );

        Ok(Self {
            db,
            redis,
            settings: Arc::new(settings),
            gateway,
            geocoder,
            auth_limiter,
        })
    }
}

/// Full router with every middleware layer applied
pub fn build_router(state: AppState) -> Router {
    routes::create_router(state)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db).await?;
            tracing::info!("Database migrations applied");
        }

        let redis = cache::create_redis_client(&settings.redis).await?;
        match &redis {
            Some(_) => tracing::info!("Redis connection established"),
            None => tracing::warn!("Redis not configured; caching disabled, rate limits kept in memory"),
        }

        let addr = settings.server_addr();
        let state = AppState::new(db, redis, settings)?;
        let router = build_router(state);

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
