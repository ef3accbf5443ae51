//! # Domain Entities
//!
//! Core domain entities of the booking platform. All entities map directly
//! to their corresponding database tables.
//!
//! ## Core Entities
//!
//! - **User**: account with credentials, role and moderation state
//! - **Business**: a merchant, with its settings and images
//! - **Service**: something a business sells, with price and duration
//! - **Employee**: staff member of a business
//! - **Appointment**: a booking of a service, with its status history
//!
//! ## Supporting Entities
//!
//! - **RefreshToken**: rotating refresh tokens for JWT sessions
//! - **Schedule**: weekly schedules of businesses and employees
//! - **WompiTransaction**: payment attempts reconciled via webhook
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod appointment;
mod business;
mod employee;
mod payment;
mod refresh_token;
mod schedule;
mod service;
mod user;

pub use appointment::{
    Appointment, AppointmentRepository, AppointmentStatus, AppointmentStatusHistory, ChangedBy,
    CustomerCounter, DateRange, NewAppointment, PaymentStatus,
};
pub use business::{
    Business, BusinessImage, BusinessRepository, BusinessSearch, BusinessSettings, NoShowPolicy,
};
pub use employee::{Employee, EmployeeRepository};
pub use payment::{PaymentRepository, TransactionStatus, WompiTransaction};
pub use refresh_token::{RefreshToken, RefreshTokenRepository};
pub use schedule::{
    Schedule, ScheduleRepository, ScheduleScope, TimeBlock, WorkingDay,
    DEFAULT_APPOINTMENT_DURATION,
};
pub use service::{Service, ServiceRepository, MAX_SERVICE_DURATION, MIN_SERVICE_DURATION};
pub use user::{User, UserRepository, UserRole, UserSearch};

#[cfg(test)]
pub use appointment::MockAppointmentRepository;
#[cfg(test)]
pub use business::MockBusinessRepository;
#[cfg(test)]
pub use employee::MockEmployeeRepository;
#[cfg(test)]
pub use payment::MockPaymentRepository;
#[cfg(test)]
pub use refresh_token::MockRefreshTokenRepository;
#[cfg(test)]
pub use schedule::MockScheduleRepository;
#[cfg(test)]
pub use service::MockServiceRepository;
#[cfg(test)]
pub use user::MockUserRepository;
