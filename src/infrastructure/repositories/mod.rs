//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! Each repository handles data access for one entity type and converts
//! between private `sqlx::FromRow` row structs and domain entities.
//!
//! ## Available Repositories
//!
//! - **UserRepository** - accounts, moderation and admin search
//! - **RefreshTokenRepository** - hashed refresh tokens
//! - **BusinessRepository** - businesses, settings, images, cascade delete
//! - **ServiceRepository** / **EmployeeRepository** - business catalog and staff
//! - **ScheduleRepository** - business and employee weekly schedules
//! - **AppointmentRepository** - bookings with status history
//! - **PaymentRepository** - Wompi transactions
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use turnoya_api::infrastructure::repositories::{PgBusinessRepository, PgScheduleRepository};
//!
//! fn setup(pool: PgPool) {
//!     let businesses = PgBusinessRepository::new(pool.clone());
//!     let schedules = PgScheduleRepository::business(pool);
//! }
//! ```

pub mod appointment_repository;
pub mod business_repository;
pub mod employee_repository;
pub mod payment_repository;
pub mod refresh_token_repository;
pub mod schedule_repository;
pub mod service_repository;
pub mod user_repository;

pub use appointment_repository::PgAppointmentRepository;
pub use business_repository::PgBusinessRepository;
pub use employee_repository::PgEmployeeRepository;
pub use payment_repository::PgPaymentRepository;
pub use refresh_token_repository::PgRefreshTokenRepository;
pub use schedule_repository::PgScheduleRepository;
pub use service_repository::PgServiceRepository;
pub use user_repository::PgUserRepository;
