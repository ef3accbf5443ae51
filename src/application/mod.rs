//! Application Layer
//!
//! Use-case services for accounts, businesses, catalog, scheduling,
//! appointments and payments, plus the request/response DTOs the HTTP
//! layer exchanges with them.

pub mod dto;
pub mod services;
