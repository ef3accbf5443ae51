//! Application settings and configuration structures.

use std::net::SocketAddr;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Redis configuration (optional cache and rate limit backend)
    pub redis: RedisSettings,

    /// JWT authentication settings
    pub jwt: JwtSettings,

    /// Rate limiting configuration
    pub rate_limit: RateLimitSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Wompi payment gateway
    pub wompi: WompiSettings,

    /// Nominatim geocoding proxy
    pub nominatim: NominatimSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Apply pending migrations on startup
    pub run_migrations: bool,
}

/// Redis configuration.
///
/// Redis is optional. Without it the city cache is bypassed and the
/// auth rate limiter keeps its windows in process memory.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: Option<String>,
}

/// JWT authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens
    pub secret: String,

    /// Token issuer (`iss` claim)
    pub issuer: String,

    /// Token audience (`aud` claim)
    pub audience: String,

    /// Access token expiry in minutes
    pub access_token_expiry_minutes: i64,

    /// Refresh token expiry in days
    pub refresh_token_expiry_days: i64,
}

/// Rate limiting configuration for the authentication endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Requests allowed per minute and client
    pub auth_requests_per_minute: u32,

    /// Extra requests tolerated above the base limit
    pub auth_burst: u32,

    /// Key clients by X-Forwarded-For / X-Real-IP. Only enable behind a
    /// proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// Wompi gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WompiSettings {
    /// API base URL, sandbox by default
    pub base_url: String,

    /// Public (merchant) key
    pub public_key: String,

    /// Private key used as bearer token for transaction calls
    pub private_key: String,

    /// Secret used to sign webhook events
    pub events_secret: String,

    /// Default currency for payment intents
    pub currency: String,
}

/// Nominatim geocoding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimSettings {
    pub base_url: String,

    /// Nominatim rejects requests without an identifying User-Agent
    pub user_agent: String,

    /// Country appended to every free-text query
    pub country: String,

    /// How long autocomplete results stay in Redis
    pub cache_ttl_seconds: u64,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if JWT secret is too short.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("jwt.issuer", "TurnoYa")?
            .set_default("jwt.audience", "TurnoYaUsers")?
            .set_default("jwt.access_token_expiry_minutes", 1440)?
            .set_default("jwt.refresh_token_expiry_days", 7)?
            .set_default("rate_limit.auth_requests_per_minute", 5)?
            .set_default("rate_limit.auth_burst", 2)?
            .set_default("rate_limit.trust_forwarded_headers", false)?
            .set_default("cors.allowed_origins", vec!["http://localhost:8100", "http://localhost:4200"])?
            .set_default("wompi.base_url", "https://sandbox.wompi.co")?
            .set_default("wompi.public_key", "")?
            .set_default("wompi.private_key", "")?
            .set_default("wompi.events_secret", "")?
            .set_default("wompi.currency", "COP")?
            .set_default("nominatim.base_url", "https://nominatim.openstreetmap.org")?
            .set_default("nominatim.user_agent", "TurnoYaApp/1.0 (contacto@tunegocio.com)")?
            .set_default("nominatim.country", "Colombia")?
            .set_default("nominatim.cache_ttl_seconds", 86400)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=5000 -> server.port = 5000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option("wompi.public_key", std::env::var("WOMPI_PUBLIC_KEY").ok())?
            .set_override_option("wompi.private_key", std::env::var("WOMPI_PRIVATE_KEY").ok())?
            .set_override_option(
                "wompi.events_secret",
                std::env::var("WOMPI_EVENTS_SECRET").ok(),
            )?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                if settings.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
                    return Err(ConfigError::Message(format!(
                        "JWT secret must be at least {} characters. Current length: {}",
                        MIN_JWT_SECRET_LENGTH,
                        settings.jwt.secret.len()
                    )));
                }
                Ok(settings)
            })
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

impl ServerSettings {
    /// Get the socket address for binding.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl RedisSettings {
    /// Redis URL, ignoring blank values coming from empty env vars.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}
