//! Request DTOs
//!
//! Data structures for API request bodies and query strings. Field names are
//! camelCase on the wire.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::{BusinessSearch, DateRange, WorkingDay};
use crate::shared::validation::{
    validate_e164_phone, validate_gender, validate_http_url, validate_local_phone,
    validate_minimum_age, validate_password_strength, validate_positive_amount,
};

fn validate_self_service_role(role: &str) -> Result<(), ValidationError> {
    match role {
        "Customer" | "BusinessOwner" => Ok(()),
        _ => {
            let mut err = ValidationError::new("role");
            err.message = Some("El rol debe ser Customer o BusinessOwner".into());
            Err(err)
        }
    }
}

fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("currency");
        err.message = Some("Currency debe tener 3 caracteres".into());
        Err(err)
    }
}

fn default_currency() -> String {
    "COP".to_string()
}

fn default_payment_method() -> String {
    "Wompi".to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Auth
// ============================================================================

/// Registration request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        email(message = "El email no es válido"),
        length(max = 100, message = "El email no puede exceder 100 caracteres")
    )]
    pub email: String,

    #[validate(
        length(min = 8, max = 100, message = "La contraseña debe tener entre 8 y 100 caracteres"),
        custom(function = "validate_password_strength")
    )]
    pub password: String,

    #[validate(must_match(other = "password", message = "Las contraseñas no coinciden"))]
    pub confirm_password: String,

    #[validate(length(min = 2, max = 50, message = "El nombre debe tener entre 2 y 50 caracteres"))]
    pub first_name: String,

    #[validate(length(min = 2, max = 50, message = "El apellido debe tener entre 2 y 50 caracteres"))]
    pub last_name: String,

    #[validate(custom(function = "validate_e164_phone"))]
    pub phone: Option<String>,

    #[validate(custom(function = "validate_self_service_role"))]
    pub role: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "El email no es válido"))]
    pub email: String,

    #[validate(length(min = 1, message = "La contraseña es requerida"))]
    pub password: String,
}

/// Refresh request: the (possibly expired) access token plus its refresh token
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "El token es requerido"))]
    pub token: String,

    #[validate(length(min = 1, message = "El refresh token es requerido"))]
    pub refresh_token: String,
}

/// Role change, used by both the self-service and the admin endpoint
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, message = "El rol es requerido"))]
    pub role: String,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(max = 50, message = "El nombre no puede exceder 50 caracteres"))]
    pub first_name: Option<String>,

    #[validate(length(max = 50, message = "El apellido no puede exceder 50 caracteres"))]
    pub last_name: Option<String>,

    #[validate(custom(function = "validate_local_phone"))]
    pub phone_number: Option<String>,

    #[validate(custom(function = "validate_local_phone"))]
    pub phone: Option<String>,

    #[validate(custom(function = "validate_http_url"))]
    pub photo_url: Option<String>,

    #[validate(custom(function = "validate_minimum_age"))]
    pub date_of_birth: Option<NaiveDate>,

    #[validate(custom(function = "validate_gender"))]
    pub gender: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "La contraseña actual es requerida"))]
    pub current_password: String,

    pub new_password: String,

    pub confirm_password: String,
}

// ============================================================================
// Admin
// ============================================================================

/// `GET /api/admin/users` query string
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchUsersQuery {
    pub search_term: Option<String>,
    pub role: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserStatusRequest {
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub block_until: Option<DateTime<Utc>>,
}

// ============================================================================
// Business
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusinessRequest {
    #[validate(length(min = 3, max = 100, message = "El nombre debe tener entre 3 y 100 caracteres"))]
    pub name: String,

    #[validate(length(max = 1000, message = "La descripción no puede exceder 1000 caracteres"))]
    pub description: Option<String>,

    #[validate(length(min = 3, max = 50, message = "La categoría debe tener entre 3 y 50 caracteres"))]
    pub category: String,

    #[validate(length(min = 5, max = 200, message = "La dirección debe tener entre 5 y 200 caracteres"))]
    pub address: String,

    #[validate(length(min = 2, max = 50, message = "La ciudad debe tener entre 2 y 50 caracteres"))]
    pub city: String,

    #[validate(length(min = 2, max = 50, message = "El departamento debe tener entre 2 y 50 caracteres"))]
    pub department: String,

    #[validate(custom(function = "validate_local_phone"))]
    pub phone: Option<String>,

    #[validate(email(message = "El formato del email no es válido"))]
    pub email: Option<String>,

    #[validate(custom(function = "validate_http_url"))]
    pub website: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "La latitud debe estar entre -90 y 90"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "La longitud debe estar entre -180 y 180"))]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBusinessRequest {
    #[validate(length(min = 3, max = 100, message = "El nombre debe tener entre 3 y 100 caracteres"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "La descripción no puede exceder 1000 caracteres"))]
    pub description: Option<String>,

    #[validate(length(min = 3, max = 50, message = "La categoría debe tener entre 3 y 50 caracteres"))]
    pub category: Option<String>,

    #[validate(length(min = 5, max = 200, message = "La dirección debe tener entre 5 y 200 caracteres"))]
    pub address: Option<String>,

    #[validate(length(min = 2, max = 50, message = "La ciudad debe tener entre 2 y 50 caracteres"))]
    pub city: Option<String>,

    #[validate(length(min = 2, max = 50, message = "El departamento debe tener entre 2 y 50 caracteres"))]
    pub department: Option<String>,

    #[validate(custom(function = "validate_local_phone"))]
    pub phone: Option<String>,

    #[validate(email(message = "El formato del email no es válido"))]
    pub email: Option<String>,

    #[validate(custom(function = "validate_http_url"))]
    pub website: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "La latitud debe estar entre -90 y 90"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "La longitud debe estar entre -180 y 180"))]
    pub longitude: Option<f64>,

    pub is_active: Option<bool>,
}

/// `GET /api/business/nearby` query string
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    #[validate(range(min = -90.0, max = 90.0, message = "La latitud debe estar entre -90 y 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "La longitud debe estar entre -180 y 180"))]
    pub longitude: f64,

    #[validate(range(exclusive_min = 0.0, max = 500.0, message = "El radio debe estar entre 0 y 500 km"))]
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
}

fn default_radius_km() -> f64 {
    10.0
}

/// `GET /api/business/search` query string
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSearchQuery {
    pub query: Option<String>,
    pub city: Option<String>,
    pub category: Option<String>,
}

impl From<BusinessSearchQuery> for BusinessSearch {
    fn from(query: BusinessSearchQuery) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            query: clean(query.query),
            city: clean(query.city),
            category: clean(query.category),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSettingsRequest {
    #[validate(length(max = 2000, message = "Los horarios de trabajo no pueden exceder 2000 caracteres"))]
    pub working_hours: Option<String>,

    #[validate(range(min = 1, max = 365, message = "Los días de anticipación deben estar entre 1 y 365"))]
    #[serde(default = "default_advance_days")]
    pub booking_advance_days: i32,

    #[validate(range(min = 0, max = 168, message = "Las horas de cancelación deben estar entre 0 y 168"))]
    #[serde(default = "default_cancellation_hours")]
    pub cancellation_hours: i32,

    #[serde(default)]
    pub requires_deposit: bool,

    #[validate(length(max = 500, message = "La política de no-show no puede exceder 500 caracteres"))]
    pub no_show_policy: Option<String>,

    #[validate(range(min = 15, max = 480, message = "La duración del slot debe estar entre 15 y 480 minutos"))]
    #[serde(default = "default_slot_duration")]
    pub default_slot_duration: i32,

    #[validate(range(min = 0, max = 120, message = "El tiempo de buffer debe estar entre 0 y 120 minutos"))]
    #[serde(default)]
    pub buffer_time_between_appointments: i32,
}

fn default_advance_days() -> i32 {
    30
}

fn default_cancellation_hours() -> i32 {
    24
}

fn default_slot_duration() -> i32 {
    30
}

// ============================================================================
// Services & Employees
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    #[validate(length(min = 3, max = 100, message = "El nombre debe tener entre 3 y 100 caracteres"))]
    pub name: String,

    #[validate(length(max = 500, message = "La descripción no puede exceder 500 caracteres"))]
    pub description: Option<String>,

    pub price: Decimal,

    /// Minutes
    pub duration: i32,

    #[serde(default)]
    pub requires_deposit: bool,

    pub deposit_amount: Option<Decimal>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServiceRequest {
    #[validate(length(min = 3, max = 100, message = "El nombre debe tener entre 3 y 100 caracteres"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "La descripción no puede exceder 500 caracteres"))]
    pub description: Option<String>,

    pub price: Option<Decimal>,
    pub duration: Option<i32>,
    pub requires_deposit: Option<bool>,
    pub deposit_amount: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 2, max = 50, message = "El nombre debe tener entre 2 y 50 caracteres"))]
    pub first_name: String,

    #[validate(length(min = 2, max = 50, message = "El apellido debe tener entre 2 y 50 caracteres"))]
    pub last_name: String,

    #[validate(custom(function = "validate_local_phone"))]
    pub phone: Option<String>,

    #[validate(email(message = "El formato del email no es válido"))]
    pub email: Option<String>,

    #[validate(length(max = 100, message = "El cargo no puede exceder 100 caracteres"))]
    pub position: Option<String>,

    #[validate(length(max = 500, message = "La biografía no puede exceder 500 caracteres"))]
    pub bio: Option<String>,

    #[validate(custom(function = "validate_http_url"))]
    pub profile_picture_url: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeeRequest {
    #[validate(length(min = 2, max = 50, message = "El nombre debe tener entre 2 y 50 caracteres"))]
    pub first_name: Option<String>,

    #[validate(length(min = 2, max = 50, message = "El apellido debe tener entre 2 y 50 caracteres"))]
    pub last_name: Option<String>,

    #[validate(custom(function = "validate_local_phone"))]
    pub phone: Option<String>,

    #[validate(email(message = "El formato del email no es válido"))]
    pub email: Option<String>,

    #[validate(length(max = 100, message = "El cargo no puede exceder 100 caracteres"))]
    pub position: Option<String>,

    #[validate(length(max = 500, message = "La biografía no puede exceder 500 caracteres"))]
    pub bio: Option<String>,

    #[validate(custom(function = "validate_http_url"))]
    pub profile_picture_url: Option<String>,

    pub is_active: Option<bool>,
}

// ============================================================================
// Schedules
// ============================================================================

/// Body of `POST /api/business-schedules` and `POST /api/employee-schedules`.
///
/// `ownerId` is the business or employee id; `businessId` and `employeeId`
/// are accepted as aliases.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    #[serde(alias = "businessId", alias = "employeeId")]
    pub owner_id: Uuid,

    pub appointment_duration: Option<i32>,

    #[serde(default)]
    pub working_days: Vec<WorkingDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    pub appointment_duration: Option<i32>,

    #[serde(default)]
    pub working_days: Vec<WorkingDay>,
}

// ============================================================================
// Appointments
// ============================================================================

/// `GET /api/appointments/availability` query string.
///
/// Every field is optional so missing ones can be reported with their own
/// message instead of a generic deserialization error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub business_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub business_id: Uuid,
    pub service_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub scheduled_date: DateTime<Utc>,

    #[validate(length(max = 500, message = "Las notas no pueden exceder 500 caracteres"))]
    pub notes: Option<String>,
}

/// `from`/`to` filters of appointment listings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl From<DateRangeQuery> for DateRange {
    fn from(query: DateRangeQuery) -> Self {
        Self {
            from: query.from,
            to: query.to,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelAppointmentRequest {
    #[validate(length(max = 300, message = "La razón no puede exceder 300 caracteres"))]
    pub reason: Option<String>,
}

// ============================================================================
// Payments & Cities
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    pub appointment_id: Uuid,

    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Decimal,

    #[validate(custom(function = "validate_currency"))]
    #[serde(default = "default_currency")]
    pub currency: String,

    #[validate(length(min = 1, message = "PaymentMethod es requerido"))]
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityAutocompleteQuery {
    pub query: Option<String>,
    pub department: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn register_json(password: &str, confirm: &str, role: &str) -> serde_json::Value {
        serde_json::json!({
            "email": "ana@example.com",
            "password": password,
            "confirmPassword": confirm,
            "firstName": "Ana",
            "lastName": "Pérez",
            "phone": "+573001234567",
            "role": role
        })
    }

    #[test]
    fn test_register_request_valid() {
        let req: RegisterRequest =
            serde_json::from_value(register_json("Secreta1!", "Secreta1!", "Customer")).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_register_password_mismatch() {
        let req: RegisterRequest =
            serde_json::from_value(register_json("Secreta1!", "Otra1234!", "Customer")).unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("confirm_password"));
    }

    #[test]
    fn test_register_rejects_admin_role() {
        let req: RegisterRequest =
            serde_json::from_value(register_json("Secreta1!", "Secreta1!", "Admin")).unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("role"));
    }

    #[test]
    fn test_register_weak_password() {
        let req: RegisterRequest =
            serde_json::from_value(register_json("secreta1", "secreta1", "Customer")).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_payment_intent_defaults() {
        let req: CreatePaymentIntentRequest = serde_json::from_value(serde_json::json!({
            "appointmentId": Uuid::now_v7(),
            "amount": 25000
        }))
        .unwrap();
        assert_eq!(req.currency, "COP");
        assert_eq!(req.payment_method, "Wompi");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_payment_intent_rejects_zero_amount_and_bad_currency() {
        let req: CreatePaymentIntentRequest = serde_json::from_value(serde_json::json!({
            "appointmentId": Uuid::now_v7(),
            "amount": 0,
            "currency": "PESOS"
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("amount"));
        assert!(errors.field_errors().contains_key("currency"));
    }

    #[test]
    fn test_nearby_default_radius() {
        let query: NearbyQuery =
            serde_json::from_value(serde_json::json!({"latitude": 4.6, "longitude": -74.1}))
                .unwrap();
        assert_eq!(query.radius_km, 10.0);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_settings_request_bounds() {
        let req: BusinessSettingsRequest = serde_json::from_value(serde_json::json!({
            "bookingAdvanceDays": 400,
            "defaultSlotDuration": 10
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("booking_advance_days"));
        assert!(errors.field_errors().contains_key("default_slot_duration"));
    }

    #[test]
    fn test_schedule_request_accepts_business_id_alias() {
        let id = Uuid::now_v7();
        let req: CreateScheduleRequest = serde_json::from_value(serde_json::json!({
            "businessId": id,
            "workingDays": [{"dayOfWeek": 0, "isOpen": true,
                             "timeBlocks": [{"start": "09:00", "end": "17:00"}], "breaks": []}]
        }))
        .unwrap();
        assert_eq!(req.owner_id, id);
        assert_eq!(req.working_days.len(), 1);
    }

    #[test]
    fn test_profile_rejects_bad_gender_and_url() {
        let req = UpdateProfileRequest {
            gender: Some("X".into()),
            photo_url: Some("foto.png".into()),
            ..Default::default()
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("gender"));
        assert!(errors.field_errors().contains_key("photo_url"));
    }
}
