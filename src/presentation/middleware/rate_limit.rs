//! Rate Limiting Middleware
//!
//! Sliding window limiter for the authentication endpoints. Windows live in
//! Redis when it is configured and in process memory otherwise.
//!
//! Redis failures let the request through: an unavailable cache must not lock
//! users out of login.

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use serde::Serialize;

use crate::config::RateLimitSettings;
use crate::infrastructure::cache::{keys, KEY_PREFIX};
use crate::presentation::middleware::auth::AuthUser;
use crate::shared::error::ErrorResponse;
use crate::startup::AppState;

const WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local window_start = tonumber(ARGV[2])
local max_requests = tonumber(ARGV[3])
local window_seconds = tonumber(ARGV[4])

redis.call('ZREMRANGEBYSCORE', key, '-inf', window_start)
local current_count = redis.call('ZCARD', key)

if current_count < max_requests then
    local member = now_ms .. ':' .. math.random(1000000)
    redis.call('ZADD', key, now_ms, member)
    redis.call('EXPIRE', key, window_seconds + 1)
    return {1, current_count + 1}
else
    local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
    local retry_after = 0
    if oldest and #oldest >= 2 then
        retry_after = oldest[2] + (window_seconds * 1000) - now_ms
    end
    return {0, current_count, retry_after}
end
"#;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_seconds: u64,
    pub burst_allowance: u32,
    /// Use forwarded client-IP headers when keying anonymous requests
    pub trust_forwarded_headers: bool,
}

impl RateLimitConfig {
    pub fn max_requests(&self) -> u32 {
        self.requests_per_window + self.burst_allowance
    }

    fn window_ms(&self) -> i64 {
        (self.window_seconds * 1000) as i64
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            requests_per_window: settings.auth_requests_per_minute,
            window_seconds: 60,
            burst_allowance: settings.auth_burst,
            trust_forwarded_headers: settings.trust_forwarded_headers,
        }
    }
}

/// Rate limit status reported to clients.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp when the window resets
    pub reset_at: i64,
    /// Seconds until a retry can succeed
    pub retry_after: u64,
}

#[derive(Debug, Serialize)]
struct RateLimitExceededResponse {
    #[serde(flatten)]
    error: ErrorResponse,
    #[serde(rename = "rateLimit")]
    rate_limit: RateLimitInfo,
}

// ============================================================================
// Limiter
// ============================================================================

/// Checks between sweeps of idle in-memory windows.
const SWEEP_EVERY: u64 = 256;

/// In-memory windows: request timestamps (ms) per key.
#[derive(Default)]
struct LocalWindows {
    windows: DashMap<String, VecDeque<i64>>,
    checks: AtomicU64,
}

impl LocalWindows {
    /// Drop timestamps older than `window_start` and forget keys left empty.
    fn sweep(&self, window_start: i64) {
        self.windows.retain(|_, window| {
            prune(window, window_start);
            !window.is_empty()
        });
    }
}

fn prune(window: &mut VecDeque<i64>, window_start: i64) {
    while window.front().is_some_and(|&t| t <= window_start) {
        window.pop_front();
    }
}

#[derive(Clone)]
enum Backend {
    Redis(ConnectionManager),
    Local(Arc<LocalWindows>),
}

/// Sliding window rate limiter.
///
/// Each key keeps the timestamps of the requests inside the window; a request
/// is allowed while fewer than `requests_per_window + burst_allowance` remain.
#[derive(Clone)]
pub struct RateLimiter {
    backend: Backend,
    config: RateLimitConfig,
    endpoint: &'static str,
}

impl RateLimiter {
    /// Limiter backed by Redis when a connection is available.
    pub fn new(redis: Option<ConnectionManager>, endpoint: &'static str, config: RateLimitConfig) -> Self {
        let backend = match redis {
            Some(conn) => Backend::Redis(conn),
            None => Backend::Local(Arc::new(LocalWindows::default())),
        };
        Self {
            backend,
            config,
            endpoint,
        }
    }

    /// In-process limiter.
    pub fn local(endpoint: &'static str, config: RateLimitConfig) -> Self {
        Self::new(None, endpoint, config)
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// `Ok` when the request is allowed, `Err` when it is rate limited.
    pub async fn check(&self, identifier: &str) -> Result<RateLimitInfo, RateLimitInfo> {
        let key = format!("{}{}", KEY_PREFIX, keys::rate_limit(self.endpoint, identifier));
        let now_ms = chrono::Utc::now().timestamp_millis();
        match &self.backend {
            Backend::Redis(conn) => self.check_redis(conn.clone(), &key, now_ms).await,
            Backend::Local(local) => self.check_local(local, key, now_ms),
        }
    }

    fn info(&self, count: u32, now_ms: i64, retry_after_ms: i64) -> RateLimitInfo {
        let limit = self.config.max_requests();
        RateLimitInfo {
            limit,
            remaining: limit.saturating_sub(count),
            reset_at: now_ms / 1000 + self.config.window_seconds as i64,
            retry_after: (retry_after_ms.max(0) as u64).div_ceil(1000),
        }
    }

    async fn check_redis(
        &self,
        mut conn: ConnectionManager,
        key: &str,
        now_ms: i64,
    ) -> Result<RateLimitInfo, RateLimitInfo> {
        let result: Vec<i64> = match redis::Script::new(WINDOW_SCRIPT)
            .key(key)
            .arg(now_ms)
            .arg(now_ms - self.config.window_ms())
            .arg(self.config.max_requests() as i64)
            .arg(self.config.window_seconds as i64)
            .invoke_async(&mut conn)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Rate limiter Redis error: {}", e);
                return Ok(self.info(0, now_ms, 0));
            }
        };

        let allowed = result.first().copied() == Some(1);
        let count = result.get(1).copied().unwrap_or_default() as u32;
        if allowed {
            Ok(self.info(count, now_ms, 0))
        } else {
            Err(self.info(count, now_ms, result.get(2).copied().unwrap_or_default()))
        }
    }

    fn check_local(
        &self,
        local: &LocalWindows,
        key: String,
        now_ms: i64,
    ) -> Result<RateLimitInfo, RateLimitInfo> {
        let window_start = now_ms - self.config.window_ms();
        // Sweep before taking the entry; retain would block on its shard.
        if local.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            local.sweep(window_start);
        }

        let mut window = local.windows.entry(key).or_default();
        prune(&mut window, window_start);

        let count = window.len() as u32;
        if count < self.config.max_requests() {
            window.push_back(now_ms);
            Ok(self.info(count + 1, now_ms, 0))
        } else {
            let retry_ms = window
                .front()
                .map(|&oldest| oldest + self.config.window_ms() - now_ms)
                .unwrap_or_default();
            Err(self.info(count, now_ms, retry_ms))
        }
    }
}

// ============================================================================
// Identifier Extraction
// ============================================================================

/// Key a request by user, then forwarded client IP when the proxy is trusted,
/// then peer address.
fn extract_identifier(request: &Request, client_ip: Option<IpAddr>, trust_forwarded: bool) -> String {
    if let Some(auth_user) = request.extensions().get::<AuthUser>() {
        return format!("user:{}", auth_user.user_id);
    }
    if !trust_forwarded {
        return match client_ip {
            Some(ip) => format!("ip:{}", ip),
            None => {
                tracing::warn!("Could not determine client identifier for rate limiting");
                "ip:unknown".to_string()
            }
        };
    }

    let header_ip = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .and_then(|ip| ip.parse::<IpAddr>().ok())
    };

    match header_ip("x-forwarded-for")
        .or_else(|| header_ip("x-real-ip"))
        .or(client_ip)
    {
        Some(ip) => format!("ip:{}", ip),
        None => {
            tracing::warn!("Could not determine client identifier for rate limiting");
            "ip:unknown".to_string()
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Rate limiting for login, registration and token refresh.
pub async fn rate_limit_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    let identifier = extract_identifier(
        &request,
        peer,
        state.auth_limiter.config().trust_forwarded_headers,
    );

    match state.auth_limiter.check(&identifier).await {
        Ok(info) => {
            let mut response = next.run(request).await;
            add_rate_limit_headers(response.headers_mut(), &info);
            response
        }
        Err(info) => {
            tracing::warn!(identifier = %identifier, "Rate limit exceeded");
            create_rate_limit_response(info)
        }
    }
}

fn add_rate_limit_headers(headers: &mut header::HeaderMap, info: &RateLimitInfo) {
    headers.insert("X-RateLimit-Limit", HeaderValue::from(info.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(info.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(info.reset_at));
}

fn create_rate_limit_response(info: RateLimitInfo) -> Response {
    let info = RateLimitInfo { remaining: 0, ..info };
    let body = RateLimitExceededResponse {
        error: ErrorResponse {
            code: 10006,
            message: "Demasiados intentos. Intenta de nuevo en unos segundos.".to_string(),
            errors: None,
        },
        rate_limit: info,
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(info.retry_after));
    add_rate_limit_headers(response.headers_mut(), &info);
    response
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn config(requests: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_window: requests,
            window_seconds: 60,
            burst_allowance: burst,
            trust_forwarded_headers: false,
        }
    }

    fn local_windows(limiter: &RateLimiter) -> &LocalWindows {
        match &limiter.backend {
            Backend::Local(local) => local,
            Backend::Redis(_) => panic!("expected the in-memory backend"),
        }
    }

    #[tokio::test]
    async fn test_local_limiter_allows_up_to_limit_plus_burst() {
        let limiter = RateLimiter::local("auth", config(2, 1));

        for expected_remaining in [2, 1, 0] {
            let info = limiter.check("ip:10.0.0.1").await.unwrap();
            assert_eq!(info.remaining, expected_remaining);
        }
        let rejected = limiter.check("ip:10.0.0.1").await.unwrap_err();
        assert_eq!(rejected.limit, 3);
        assert!(rejected.retry_after > 0 && rejected.retry_after <= 60);
    }

    #[tokio::test]
    async fn test_local_limiter_keys_are_independent() {
        let limiter = RateLimiter::local("auth", config(1, 0));
        assert!(limiter.check("ip:10.0.0.1").await.is_ok());
        assert!(limiter.check("ip:10.0.0.1").await.is_err());
        assert!(limiter.check("ip:10.0.0.2").await.is_ok());
    }

    #[test]
    fn test_sweep_forgets_expired_keys() {
        let limiter = RateLimiter::local("auth", config(5, 0));
        let local = local_windows(&limiter);
        let now_ms = 1_900_000_000_000;

        for i in 0..10 {
            assert!(limiter.check_local(local, format!("ip:10.0.0.{i}"), now_ms).is_ok());
        }
        assert!(limiter.check_local(local, "ip:10.0.1.1".into(), now_ms + 30_000).is_ok());
        assert_eq!(local.windows.len(), 11);

        local.sweep(now_ms + 61_000 - limiter.config.window_ms());
        assert_eq!(local.windows.len(), 1);
        assert!(local.windows.contains_key("ip:10.0.1.1"));
    }

    #[test]
    fn test_idle_keys_are_swept_during_checks() {
        let limiter = RateLimiter::local("auth", config(5, 0));
        let local = local_windows(&limiter);
        let now_ms = 1_900_000_000_000;

        for i in 0..SWEEP_EVERY - 1 {
            assert!(limiter.check_local(local, format!("ip:old-{i}"), now_ms).is_ok());
        }
        assert_eq!(local.windows.len() as u64, SWEEP_EVERY - 1);

        // The next check falls on a sweep and lands after every old window closed.
        let later = now_ms + limiter.config.window_ms() + 1;
        assert!(limiter.check_local(local, "ip:fresh".into(), later).is_ok());
        assert_eq!(local.windows.len(), 1);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = RateLimitSettings {
            auth_requests_per_minute: 5,
            auth_burst: 2,
            trust_forwarded_headers: false,
        };
        let config = RateLimitConfig::from(&settings);
        assert_eq!(config.max_requests(), 7);
        assert_eq!(config.window_seconds, 60);
        assert!(!config.trust_forwarded_headers);
    }

    #[test]
    fn test_identifier_prefers_forwarded_for_behind_trusted_proxy() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        let peer = "127.0.0.1".parse().ok();
        assert_eq!(extract_identifier(&request, peer, true), "ip:203.0.113.7");
    }

    #[test]
    fn test_identifier_ignores_forwarded_headers_by_default() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .header("x-real-ip", "198.51.100.4")
            .body(Body::empty())
            .unwrap();
        let peer = "192.168.1.20".parse().ok();
        assert_eq!(extract_identifier(&request, peer, false), "ip:192.168.1.20");
    }

    #[test]
    fn test_identifier_falls_back_to_peer() {
        let request = Request::builder()
            .header("x-forwarded-for", "garbage")
            .body(Body::empty())
            .unwrap();
        let peer = "192.168.1.20".parse().ok();
        assert_eq!(extract_identifier(&request, peer, true), "ip:192.168.1.20");
        assert_eq!(extract_identifier(&request, None, true), "ip:unknown");
    }

    #[test]
    fn test_rejection_sets_retry_after() {
        let response = create_rate_limit_response(RateLimitInfo {
            limit: 7,
            remaining: 3,
            reset_at: 1_900_000_000,
            retry_after: 12,
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "12");
        assert_eq!(response.headers()["X-RateLimit-Remaining"], "0");
    }
}
