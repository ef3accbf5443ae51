//! HTTP Handlers
//!
//! Request handlers for the REST API, one module per resource.

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod business;
pub mod cities;
pub mod employees;
pub mod health;
pub mod payments;
pub mod schedules;
pub mod services;
pub mod users;
