//! Appointment entity, its lifecycle and status history.
//!
//! Maps to the `appointments` and `appointment_status_history` tables.
//!
//! ```text
//!   Pending --confirm--> Confirmed --complete--> Completed
//!      |                    |
//!      +---- no-show -------+----> NoShow
//!      |                    |
//!      +---- cancel --------+----> Cancelled   (also from NoShow)
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::reference;
use crate::shared::error::AppError;

/// Appointment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "confirmed" => Self::Confirmed,
            "completed" => Self::Completed,
            "cancelled" | "canceled" => Self::Cancelled,
            "noshow" | "no_show" => Self::NoShow,
            _ => Self::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::NoShow => "NoShow",
        }
    }

    /// Still holds its time slot against new bookings.
    pub fn blocks_booking(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Shown as occupied in the availability grid.
    pub fn occupies_slot(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        match (self, next) {
            (Pending, Confirmed) => true,
            (Confirmed, Completed) => true,
            (Pending | Confirmed, NoShow) => true,
            (Pending | Confirmed | NoShow, Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment state of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Unpaid,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "paid" => Self::Paid,
            "unpaid" => Self::Unpaid,
            "refunded" => Self::Refunded,
            "partiallyrefunded" => Self::PartiallyRefunded,
            _ => Self::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Unpaid => "Unpaid",
            Self::Refunded => "Refunded",
            Self::PartiallyRefunded => "PartiallyRefunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who triggered a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangedBy {
    User,
    Business,
    System,
}

impl ChangedBy {
    pub fn from_str(s: &str) -> Self {
        match s {
            "Business" => Self::Business,
            "System" => Self::System,
            _ => Self::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Business => "Business",
            Self::System => "System",
        }
    }
}

/// A booking of a service, optionally with a specific employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub reference_number: String,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub service_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub scheduled_date: DateTime<Utc>,
    /// Always `scheduled_date` plus the service duration
    pub end_date: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub deposit_amount: Decimal,
    pub deposit_paid: bool,
    pub notes: Option<String>,
    pub wompi_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether `[start, end)` overlaps this appointment.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end_date && end > self.scheduled_date
    }

    /// Apply a status change, returning the history row to record.
    pub fn transition(
        &mut self,
        next: AppointmentStatus,
        changed_by: ChangedBy,
        reason: Option<String>,
    ) -> Result<AppointmentStatusHistory, AppointmentStatus> {
        if !self.status.can_transition_to(next) {
            return Err(self.status);
        }
        let history = AppointmentStatusHistory::new(
            self.id,
            Some(self.status),
            next,
            changed_by,
            reason,
        );
        self.status = next;
        self.updated_at = Utc::now();
        Ok(history)
    }
}

/// Everything needed to insert a new appointment.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub service_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub scheduled_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_amount: Decimal,
    pub deposit_amount: Decimal,
    pub notes: Option<String>,
}

impl NewAppointment {
    /// Build the Pending appointment with a fresh reference number.
    pub fn into_appointment(self, now: DateTime<Utc>) -> Appointment {
        Appointment {
            id: Uuid::now_v7(),
            reference_number: reference::appointment_reference(now),
            user_id: self.user_id,
            business_id: self.business_id,
            service_id: self.service_id,
            employee_id: self.employee_id,
            scheduled_date: self.scheduled_date,
            end_date: self.end_date,
            status: AppointmentStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount: self.total_amount,
            deposit_amount: self.deposit_amount,
            deposit_paid: false,
            notes: self.notes,
            wompi_reference: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Audit row for each status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentStatusHistory {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub old_status: Option<AppointmentStatus>,
    pub new_status: AppointmentStatus,
    pub changed_by: ChangedBy,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AppointmentStatusHistory {
    pub fn new(
        appointment_id: Uuid,
        old_status: Option<AppointmentStatus>,
        new_status: AppointmentStatus,
        changed_by: ChangedBy,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            appointment_id,
            old_status,
            new_status,
            changed_by,
            reason,
            created_at: Utc::now(),
        }
    }
}

/// Customer statistic bumped in the same write as a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerCounter {
    Completed,
    NoShow,
}

impl CustomerCounter {
    /// Column of `users` that holds the counter
    pub fn column(&self) -> &'static str {
        match self {
            Self::Completed => "completed_appointments",
            Self::NoShow => "no_show_count",
        }
    }
}

/// Time window filter for appointment listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppError>;

    /// Appointments of a customer, newest first.
    async fn find_by_user(&self, user_id: Uuid, range: DateRange) -> Result<Vec<Appointment>, AppError>;

    /// Appointments of a business, newest first.
    async fn find_by_business(
        &self,
        business_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<Appointment>, AppError>;

    /// Pending or Confirmed appointments starting inside `[day_start, day_end)`.
    async fn find_occupying(
        &self,
        business_id: Uuid,
        employee_id: Option<Uuid>,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppError>;

    /// Insert the appointment with its first history row, unless a
    /// booking-blocking appointment of the same service, or of the same
    /// employee, overlaps it. `None` when the slot is taken.
    ///
    /// The check and the insert are atomic against concurrent bookings of
    /// that service or employee.
    async fn create_if_free(
        &self,
        appointment: &Appointment,
        history: &AppointmentStatusHistory,
    ) -> Result<Option<Appointment>, AppError>;

    /// Write `appointment.status` only if the stored status is still
    /// `expected`, together with the history row and the optional customer
    /// counter. `false` when the stored status had already moved on.
    async fn update_status(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
        history: &AppointmentStatusHistory,
        counter: Option<CustomerCounter>,
    ) -> Result<bool, AppError>;

    async fn update_payment(
        &self,
        id: Uuid,
        payment_status: PaymentStatus,
        deposit_paid: bool,
        wompi_reference: Option<String>,
    ) -> Result<(), AppError>;

    async fn history(&self, appointment_id: Uuid) -> Result<Vec<AppointmentStatusHistory>, AppError>;
}
