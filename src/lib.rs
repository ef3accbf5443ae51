//! # TurnoYa API Library
//!
//! Appointment booking for local businesses:
//! - RESTful HTTP API for accounts, businesses, catalogs, schedules and bookings
//! - Wompi payment intents and signed webhooks
//! - City autocomplete proxied through Nominatim
//! - PostgreSQL for persistent storage, Redis (optional) for caching and rate limits
//! - A client library mirroring the mobile apps' session, error and guard policies
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Core business entities, value objects and repository traits
//! - **Application Layer**: Use-case services and DTOs
//! - **Infrastructure Layer**: Database, cache, metrics and external HTTP clients
//! - **Presentation Layer**: HTTP routes, handlers and middleware
//!
//! ## Module Structure
//!
//! ```text
//! turnoya_api/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, slot generation
//! +-- application/    Services and DTOs
//! +-- infrastructure/ Postgres, Redis, Wompi, Nominatim, Prometheus
//! +-- presentation/   HTTP routes and middleware
//! +-- client/         Typed API client and mobile-side policies
//! +-- shared/         Errors and validation helpers
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP handlers
pub mod presentation;

// API client for consumers of the HTTP surface
pub mod client;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
