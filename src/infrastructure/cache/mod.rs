//! Cache Module
//!
//! Optional Redis connection and caching utilities.
//!
//! Redis backs two concerns: the city autocomplete cache and the auth rate
//! limiter. Both degrade gracefully when no Redis URL is configured.
//!
//! ```text
//! CityService ---> RedisCache --+
//!                               +--> ConnectionManager (optional)
//! RateLimiter ------------------+
//! ```

mod cache_service;

pub use cache_service::{Cache, RedisCache};

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Prefix applied to every key this service writes.
pub const KEY_PREFIX: &str = "turnoya:";

/// Connect to Redis when a URL is configured.
///
/// Returns `Ok(None)` when Redis is disabled; connection failures are errors.
#[instrument(skip(settings))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<Option<ConnectionManager>, redis::RedisError> {
    let Some(url) = settings.url() else {
        info!("Redis not configured, running without cache");
        return Ok(None);
    };

    info!("Connecting to Redis...");
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(Some(manager))
}

/// Cache key builders.
pub mod keys {
    /// Prefix for rate limiting windows (e.g., "ratelimit:auth:10.0.0.1")
    pub const RATE_LIMIT: &str = "ratelimit:";

    /// Prefix for city autocomplete results (e.g., "cities:bogota|cundinamarca")
    pub const CITY_SEARCH: &str = "cities:";

    #[inline]
    pub fn rate_limit(endpoint: &str, identifier: &str) -> String {
        format!("{}{}:{}", RATE_LIMIT, endpoint, identifier)
    }

    /// Key for an autocomplete query, normalized so casing and spacing
    /// variants share an entry.
    pub fn city_search(query: &str, department: Option<&str>) -> String {
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        format!(
            "{}{}|{}",
            CITY_SEARCH,
            normalize(query),
            department.map(normalize).unwrap_or_default()
        )
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_city_search_key_is_normalized() {
            assert_eq!(
                city_search("  San   Gil ", Some("Santander")),
                "cities:san gil|santander"
            );
            assert_eq!(city_search("Cali", None), "cities:cali|");
        }

        #[test]
        fn test_rate_limit_key() {
            assert_eq!(rate_limit("auth", "10.0.0.1"), "ratelimit:auth:10.0.0.1");
        }
    }
}
