//! Data Transfer Objects
//!
//! Request bodies and query strings (validated with `validator`) and the
//! camelCase response shapes the mobile clients read.

pub mod request;
pub mod response;
