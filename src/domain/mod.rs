//! # Domain Layer
//!
//! The domain layer contains the core business logic of the booking platform.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Core domain entities (User, Business, Service, Appointment, etc.)
//! - **value_objects**: Immutable value types (WorkingHours, GeoPoint, references)
//! - **services**: Domain services for logic spanning several entities
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Entities encapsulate domain behavior

pub mod entities;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use value_objects::*;
