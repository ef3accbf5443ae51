//! Value Objects
//!
//! Immutable domain types without identity.

pub mod geo;
pub mod reference;
pub mod working_hours;

pub use geo::GeoPoint;
pub use working_hours::{DaySchedule, WorkingHours};
