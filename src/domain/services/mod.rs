//! # Domain Services
//!
//! Domain services hold business logic that doesn't naturally belong to a
//! single entity. They operate on already-loaded domain data and never touch
//! storage.
//!
//! ## Services
//!
//! - **availability**: bookable time slot grid for a service on a given day

pub mod availability;

pub use availability::{generate_slots, Busy, SlotQuery, SlotRules, TimeSlot};
