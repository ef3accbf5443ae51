//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: registration, login, JWT and refresh token rotation
//! - **UserService**: profile and password of the caller
//! - **AdminService**: user search and moderation
//! - **BusinessService**: businesses, images and booking settings
//! - **CatalogService**: services offered by a business
//! - **EmployeeService**: staff of a business
//! - **ScheduleService**: weekly schedules of businesses and employees
//! - **AppointmentService**: availability, booking and status lifecycle
//! - **PaymentService**: Wompi payment intents and webhooks
//! - **CityService**: city autocomplete

use uuid::Uuid;

use crate::domain::UserRole;

pub mod admin_service;
pub mod appointment_service;
pub mod auth_service;
pub mod business_service;
pub mod catalog_service;
pub mod city_service;
pub mod employee_service;
pub mod payment_service;
pub mod schedule_service;
pub mod user_service;

pub use admin_service::{AdminError, AdminService, AdminServiceImpl, UserPage};
pub use appointment_service::{
    AppointmentError, AppointmentService, AppointmentServiceImpl, OwnerAction,
};
pub use auth_service::{
    AuthError, AuthResult, AuthService, AuthServiceImpl, AuthTokens, Claims,
};
pub use business_service::{
    BusinessDetail, BusinessError, BusinessService, BusinessServiceImpl, BusinessSummary,
    ImageUpload,
};
pub use catalog_service::{CatalogError, CatalogService, CatalogServiceImpl};
pub use city_service::{CityError, CityService, CityServiceImpl, CitySuggestion};
pub use employee_service::{EmployeeError, EmployeeService, EmployeeServiceImpl};
pub use payment_service::{PaymentError, PaymentService, PaymentServiceImpl, WebhookOutcome};
pub use schedule_service::{ScheduleError, ScheduleService, ScheduleServiceImpl};
pub use user_service::{UserError, UserService, UserServiceImpl};

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
