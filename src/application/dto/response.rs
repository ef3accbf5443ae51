//! Response DTOs
//!
//! Data structures for API response bodies. Field names are camelCase on
//! the wire.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::application::services::{AuthResult, BusinessDetail, BusinessSummary, UserPage};
use crate::domain::{
    Appointment, AppointmentStatusHistory, Business, BusinessImage, BusinessSettings, Employee,
    Schedule, ScheduleScope, Service, User, WompiTransaction, WorkingDay,
};

// ============================================================================
// Users
// ============================================================================

/// Compact user shape returned by auth endpoints and role changes
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: String,
    pub profile_picture_url: Option<String>,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            role: user.role.as_str().to_string(),
            profile_picture_url: user.photo_url.clone(),
            is_email_verified: user.is_email_verified,
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
    pub user: UserDto,
}

impl From<AuthResult> for AuthResponse {
    fn from(result: AuthResult) -> Self {
        Self {
            token: result.tokens.access_token,
            refresh_token: result.tokens.refresh_token,
            expires_in: result.tokens.expires_in,
            user: UserDto::from(result.user),
        }
    }
}

/// The caller's own profile
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileDto {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub role: String,
    pub is_email_verified: bool,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub average_rating: Decimal,
    pub completed_appointments: i32,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfileDto {
    fn from(user: User) -> Self {
        Self {
            full_name: user.full_name(),
            role: user.role.as_str().to_string(),
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            phone: user.phone,
            photo_url: user.photo_url,
            date_of_birth: user.date_of_birth,
            gender: user.gender,
            is_email_verified: user.is_email_verified,
            is_active: user.is_active,
            last_login: user.last_login,
            average_rating: user.average_rating,
            completed_appointments: user.completed_appointments,
            created_at: user.created_at,
        }
    }
}

/// Admin view of an account, moderation fields included
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserManageDto {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub block_until: Option<DateTime<Utc>>,
    pub is_email_verified: bool,
    pub average_rating: Decimal,
    pub completed_appointments: i32,
    pub no_show_count: i32,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserManageDto {
    fn from(user: User) -> Self {
        Self {
            full_name: user.full_name(),
            role: user.role.as_str().to_string(),
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            is_active: user.is_active,
            is_blocked: user.is_blocked,
            block_reason: user.block_reason,
            block_until: user.block_until,
            is_email_verified: user.is_email_verified,
            average_rating: user.average_rating,
            completed_appointments: user.completed_appointments,
            no_show_count: user.no_show_count,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedUsersResponse {
    pub users: Vec<UserManageDto>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl From<UserPage> for PaginatedUsersResponse {
    fn from(page: UserPage) -> Self {
        let total_pages = page.total_pages();
        Self {
            has_next_page: page.page < total_pages,
            has_previous_page: page.page > 1,
            users: page.users.into_iter().map(UserManageDto::from).collect(),
            total_count: page.total_count,
            page: page.page,
            page_size: page.page_size,
            total_pages,
        }
    }
}

// ============================================================================
// Business
// ============================================================================

fn encode_image(image: &BusinessImage) -> String {
    STANDARD.encode(&image.image_data)
}

/// Business card used by every list endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessListDto {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub city: String,
    pub address: String,
    pub average_rating: Decimal,
    pub total_reviews: i32,
    pub is_active: bool,
    /// Kilometers from the search point, nearby search only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    pub image_base64: Option<String>,
}

impl From<BusinessSummary> for BusinessListDto {
    fn from(summary: BusinessSummary) -> Self {
        let BusinessSummary {
            business,
            image,
            distance_km,
        } = summary;
        Self {
            id: business.id,
            name: business.name,
            category: business.category,
            city: business.city,
            address: business.address,
            average_rating: business.average_rating,
            total_reviews: business.total_reviews,
            is_active: business.is_active,
            distance: distance_km.map(|d| (d * 100.0).round() / 100.0),
            image_base64: image.as_ref().map(encode_image),
        }
    }
}

/// Full business record, as returned after create and update
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDto {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub address: String,
    pub city: String,
    pub department: String,
    pub country: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub average_rating: Decimal,
    pub total_reviews: i32,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Business> for BusinessDto {
    fn from(b: Business) -> Self {
        Self {
            id: b.id,
            owner_id: b.owner_id,
            name: b.name,
            description: b.description,
            category: b.category,
            address: b.address,
            city: b.city,
            department: b.department,
            country: b.country,
            phone: b.phone,
            email: b.email,
            website: b.website,
            latitude: b.latitude,
            longitude: b.longitude,
            average_rating: b.average_rating,
            total_reviews: b.total_reviews,
            is_active: b.is_active,
            is_verified: b.is_verified,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDetailDto {
    #[serde(flatten)]
    pub business: BusinessDto,
    pub owner: Option<UserDto>,
    pub services: Vec<ServiceDto>,
    pub employees: Vec<EmployeeDto>,
}

impl From<BusinessDetail> for BusinessDetailDto {
    fn from(detail: BusinessDetail) -> Self {
        Self {
            owner: detail.owner.map(UserDto::from),
            services: detail.services.into_iter().map(ServiceDto::from).collect(),
            employees: detail.employees.into_iter().map(EmployeeDto::from).collect(),
            business: BusinessDto::from(detail.business),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSettingsDto {
    pub working_hours: Option<String>,
    pub booking_advance_days: i32,
    pub cancellation_hours: i32,
    pub requires_deposit: bool,
    pub no_show_policy: String,
    pub default_slot_duration: i32,
    pub buffer_time_between_appointments: i32,
}

impl From<BusinessSettings> for BusinessSettingsDto {
    fn from(s: BusinessSettings) -> Self {
        Self {
            requires_deposit: s.requires_deposit(),
            no_show_policy: s.no_show_policy.as_str().to_string(),
            working_hours: s.working_hours,
            booking_advance_days: s.max_advance_booking_days,
            cancellation_hours: s.free_cancellation_hours,
            default_slot_duration: s.slot_duration,
            buffer_time_between_appointments: s.buffer_time,
        }
    }
}

// ============================================================================
// Catalog & Staff
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDto {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    /// Minutes
    pub duration: i32,
    pub requires_deposit: bool,
    pub deposit_amount: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Service> for ServiceDto {
    fn from(s: Service) -> Self {
        Self {
            id: s.id,
            business_id: s.business_id,
            name: s.name,
            description: s.description,
            price: s.price,
            duration: s.duration_minutes,
            requires_deposit: s.requires_deposit,
            deposit_amount: s.deposit_amount,
            is_active: s.is_active,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    pub id: Uuid,
    pub business_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Employee> for EmployeeDto {
    fn from(e: Employee) -> Self {
        Self {
            full_name: e.full_name(),
            id: e.id,
            business_id: e.business_id,
            first_name: e.first_name,
            last_name: e.last_name,
            phone: e.phone,
            email: e.email,
            position: e.position,
            bio: e.bio,
            profile_picture_url: e.profile_picture_url,
            is_active: e.is_active,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<Uuid>,
    pub appointment_duration: i32,
    pub working_days: Vec<WorkingDay>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleDto {
    pub fn new(scope: ScheduleScope, schedule: Schedule) -> Self {
        let (business_id, employee_id) = match scope {
            ScheduleScope::Business => (Some(schedule.owner_id), None),
            ScheduleScope::Employee => (None, Some(schedule.owner_id)),
        };
        Self {
            business_id,
            employee_id,
            appointment_duration: schedule.appointment_duration,
            working_days: schedule.working_days,
            created_at: schedule.created_at,
            updated_at: schedule.updated_at,
        }
    }
}

// ============================================================================
// Appointments & Payments
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDto {
    pub id: Uuid,
    pub reference_number: String,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub service_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub scheduled_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: String,
    pub payment_status: String,
    pub total_amount: Decimal,
    pub deposit_amount: Decimal,
    pub deposit_paid: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentDto {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            reference_number: a.reference_number,
            user_id: a.user_id,
            business_id: a.business_id,
            service_id: a.service_id,
            employee_id: a.employee_id,
            scheduled_date: a.scheduled_date,
            end_date: a.end_date,
            status: a.status.as_str().to_string(),
            payment_status: a.payment_status.as_str().to_string(),
            total_amount: a.total_amount,
            deposit_amount: a.deposit_amount,
            deposit_paid: a.deposit_paid,
            notes: a.notes,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentHistoryDto {
    pub old_status: Option<String>,
    pub new_status: String,
    pub changed_by: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AppointmentStatusHistory> for AppointmentHistoryDto {
    fn from(h: AppointmentStatusHistory) -> Self {
        Self {
            old_status: h.old_status.map(|s| s.as_str().to_string()),
            new_status: h.new_status.as_str().to_string(),
            changed_by: h.changed_by.as_str().to_string(),
            reason: h.reason,
            created_at: h.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    pub id: String,
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub payment_method: String,
}

impl From<WompiTransaction> for PaymentDto {
    fn from(tx: WompiTransaction) -> Self {
        Self {
            // The gateway id once known, our own id before that
            id: tx.wompi_id.unwrap_or_else(|| tx.id.to_string()),
            reference: tx.reference,
            amount: tx.amount,
            currency: tx.currency,
            status: tx.status.as_str().to_string(),
            payment_method: tx.payment_method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_user_dto_is_camel_case() {
        let user = User::new("ana@example.com", "hash".into(), "Ana", "Pérez", UserRole::BusinessOwner);
        let json = serde_json::to_value(UserDto::from(&user)).unwrap();
        assert_eq!(json["fullName"], "Ana Pérez");
        assert_eq!(json["role"], "BusinessOwner");
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn test_paginated_users_flags() {
        let page = UserPage {
            users: Vec::new(),
            total_count: 25,
            page: 2,
            page_size: 10,
        };
        let response = PaginatedUsersResponse::from(page);
        assert_eq!(response.total_pages, 3);
        assert!(response.has_next_page);
        assert!(response.has_previous_page);
    }

    #[test]
    fn test_business_list_encodes_first_image() {
        let business = Business::new(Uuid::now_v7(), "Spa Zen", "Spa");
        let image = BusinessImage::new(business.id, vec![1, 2, 3], "image/png");
        let dto = BusinessListDto::from(BusinessSummary {
            business,
            image: Some(image),
            distance_km: Some(1.23456),
        });
        assert_eq!(dto.image_base64.as_deref(), Some("AQID"));
        assert_eq!(dto.distance, Some(1.23));
    }

    #[test]
    fn test_settings_dto_maps_deposit_policy() {
        let mut settings = BusinessSettings::defaults_for(Uuid::now_v7());
        settings.no_show_policy = crate::domain::NoShowPolicy::Deposit;
        let json = serde_json::to_value(BusinessSettingsDto::from(settings)).unwrap();
        assert_eq!(json["requiresDeposit"], true);
        assert_eq!(json["noShowPolicy"], "Deposit");
        assert_eq!(json["bookingAdvanceDays"], 90);
    }

    #[test]
    fn test_schedule_dto_names_owner_by_scope() {
        let schedule = Schedule::new(Uuid::now_v7(), None, Vec::new());
        let json = serde_json::to_value(ScheduleDto::new(ScheduleScope::Employee, schedule)).unwrap();
        assert!(json.get("employeeId").is_some());
        assert!(json.get("businessId").is_none());
        assert_eq!(json["appointmentDuration"], 30);
    }
}
