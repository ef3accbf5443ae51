//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database repositories (PostgreSQL)
//! - Cache implementations (Redis, optional)
//! - External API clients (Wompi, Nominatim)
//! - Prometheus metrics

pub mod cache;
pub mod database;
pub mod external;
pub mod metrics;
pub mod repositories;
