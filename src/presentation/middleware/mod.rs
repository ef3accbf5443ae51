//! Middleware
//!
//! Tower middleware for request processing.

pub mod auth;
pub mod cors;
pub mod logging;
pub mod rate_limit;

pub use auth::{auth_middleware, require_admin, AuthUser};
pub use logging::{create_trace_layer, track_metrics};
pub use rate_limit::{rate_limit_auth, RateLimitConfig, RateLimitInfo, RateLimiter};
