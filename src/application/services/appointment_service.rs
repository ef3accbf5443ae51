//! Appointment Service
//!
//! Availability grid, booking and the appointment status lifecycle.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::Actor;
use crate::application::dto::request::{AvailabilityQuery, CreateAppointmentRequest};
use crate::domain::services::{generate_slots, Busy, SlotQuery, SlotRules, TimeSlot};
use crate::domain::{
    Appointment, AppointmentRepository, AppointmentStatus, AppointmentStatusHistory,
    BusinessRepository, ChangedBy, CustomerCounter, DateRange, EmployeeRepository,
    NewAppointment, Service, ServiceRepository,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Owner-driven status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerAction {
    Confirm,
    Complete,
    NoShow,
}

impl OwnerAction {
    fn target(&self) -> AppointmentStatus {
        match self {
            Self::Confirm => AppointmentStatus::Confirmed,
            Self::Complete => AppointmentStatus::Completed,
            Self::NoShow => AppointmentStatus::NoShow,
        }
    }

    fn counter(&self) -> Option<CustomerCounter> {
        match self {
            Self::Confirm => None,
            Self::Complete => Some(CustomerCounter::Completed),
            Self::NoShow => Some(CustomerCounter::NoShow),
        }
    }
}

#[async_trait]
pub trait AppointmentService: Send + Sync {
    async fn availability(&self, query: AvailabilityQuery) -> Result<Vec<TimeSlot>, AppointmentError>;

    async fn book(
        &self,
        actor: Actor,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError>;

    /// The caller's appointments, newest first
    async fn list_mine(&self, actor: Actor, range: DateRange) -> Result<Vec<Appointment>, AppointmentError>;

    /// Appointments of a business; owner only
    async fn list_for_business(
        &self,
        actor: Actor,
        business_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Visible to the customer and the business owner
    async fn get(&self, actor: Actor, id: Uuid) -> Result<Appointment, AppointmentError>;

    async fn history(
        &self,
        actor: Actor,
        id: Uuid,
    ) -> Result<Vec<AppointmentStatusHistory>, AppointmentError>;

    async fn apply_owner_action(
        &self,
        actor: Actor,
        id: Uuid,
        action: OwnerAction,
    ) -> Result<Appointment, AppointmentError>;

    async fn cancel(
        &self,
        actor: Actor,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    /// A required availability parameter is absent
    #[error("{0}")]
    MissingParameter(&'static str),

    #[error("La fecha debe ser futura")]
    DateInPast,

    #[error("Negocio no encontrado")]
    BusinessNotFound,

    #[error("Servicio no encontrado")]
    ServiceNotFound,

    #[error("El servicio no pertenece al negocio o no está activo")]
    ServiceUnavailable,

    #[error("El empleado no pertenece al negocio o no está activo")]
    EmployeeUnavailable,

    #[error("Selected time slot is not available")]
    SlotTaken,

    #[error("Cita no encontrada")]
    NotFound,

    #[error("No tienes permisos para esta cita")]
    Forbidden,

    #[error("No se puede cambiar el estado de {from} a {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    /// Another request changed the status after it was read
    #[error("La cita cambió de estado, vuelve a intentarlo")]
    StatusChanged,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::MissingParameter(_)
            | AppointmentError::DateInPast
            | AppointmentError::ServiceUnavailable
            | AppointmentError::EmployeeUnavailable
            | AppointmentError::InvalidTransition { .. } => AppError::BadRequest(err.to_string()),
            AppointmentError::BusinessNotFound
            | AppointmentError::ServiceNotFound
            | AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SlotTaken | AppointmentError::StatusChanged => {
                AppError::Conflict(err.to_string())
            }
            AppointmentError::Forbidden => AppError::Forbidden(err.to_string()),
            AppointmentError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

fn internal(e: AppError) -> AppointmentError {
    AppointmentError::Internal(e.to_string())
}

/// Required availability parameters, or the message for the first missing one.
fn required_params(
    query: &AvailabilityQuery,
) -> Result<(Uuid, Uuid, NaiveDate), AppointmentError> {
    let business_id = query
        .business_id
        .ok_or(AppointmentError::MissingParameter("El ID del negocio es requerido"))?;
    let service_id = query
        .service_id
        .ok_or(AppointmentError::MissingParameter("El ID del servicio es requerido"))?;
    let date = query
        .date
        .ok_or(AppointmentError::MissingParameter("La fecha es requerida"))?;
    Ok((business_id, service_id, date))
}

pub struct AppointmentServiceImpl<A, B, S, E>
where
    A: AppointmentRepository,
    B: BusinessRepository,
    S: ServiceRepository,
    E: EmployeeRepository,
{
    appointment_repo: Arc<A>,
    business_repo: Arc<B>,
    service_repo: Arc<S>,
    employee_repo: Arc<E>,
}

impl<A, B, S, E> AppointmentServiceImpl<A, B, S, E>
where
    A: AppointmentRepository,
    B: BusinessRepository,
    S: ServiceRepository,
    E: EmployeeRepository,
{
    pub fn new(
        appointment_repo: Arc<A>,
        business_repo: Arc<B>,
        service_repo: Arc<S>,
        employee_repo: Arc<E>,
    ) -> Self {
        Self {
            appointment_repo,
            business_repo,
            service_repo,
            employee_repo,
        }
    }

    async fn find(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointment_repo
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or(AppointmentError::NotFound)
    }

    async fn is_business_owner(&self, actor: Actor, business_id: Uuid) -> Result<bool, AppointmentError> {
        let business = self
            .business_repo
            .find_by_id(business_id)
            .await
            .map_err(internal)?;
        Ok(business.is_some_and(|b| b.is_owned_by(actor.user_id)))
    }

    async fn bookable_service(
        &self,
        business_id: Uuid,
        service_id: Uuid,
    ) -> Result<Service, AppointmentError> {
        let service = self
            .service_repo
            .find_by_id(service_id)
            .await
            .map_err(internal)?
            .ok_or(AppointmentError::ServiceNotFound)?;
        if service.business_id != business_id || !service.is_active {
            return Err(AppointmentError::ServiceUnavailable);
        }
        Ok(service)
    }

    /// Persist a transition, guarded on the status it was validated against.
    async fn transition(
        &self,
        mut appointment: Appointment,
        next: AppointmentStatus,
        changed_by: ChangedBy,
        reason: Option<String>,
        counter: Option<CustomerCounter>,
    ) -> Result<Appointment, AppointmentError> {
        let expected = appointment.status;
        let history = appointment
            .transition(next, changed_by, reason)
            .map_err(|from| AppointmentError::InvalidTransition { from, to: next })?;

        let applied = self
            .appointment_repo
            .update_status(&appointment, expected, &history, counter)
            .await
            .map_err(internal)?;
        if !applied {
            warn!(
                appointment_id = %appointment.id,
                expected = expected.as_str(),
                to = next.as_str(),
                "Appointment status changed concurrently"
            );
            return Err(AppointmentError::StatusChanged);
        }

        metrics::record_status_change(next.as_str());
        info!(
            appointment_id = %appointment.id,
            from = ?history.old_status,
            to = next.as_str(),
            changed_by = changed_by.as_str(),
            "Appointment status changed"
        );
        Ok(appointment)
    }
}

#[async_trait]
impl<A, B, S, E> AppointmentService for AppointmentServiceImpl<A, B, S, E>
where
    A: AppointmentRepository + 'static,
    B: BusinessRepository + 'static,
    S: ServiceRepository + 'static,
    E: EmployeeRepository + 'static,
{
    #[instrument(skip(self))]
    async fn availability(&self, query: AvailabilityQuery) -> Result<Vec<TimeSlot>, AppointmentError> {
        let (business_id, service_id, date) = required_params(&query)?;
        let service = self.bookable_service(business_id, service_id).await?;

        if let Some(employee_id) = query.employee_id {
            let employee = self
                .employee_repo
                .find_by_id(employee_id)
                .await
                .map_err(internal)?;
            if !employee.is_some_and(|e| e.business_id == business_id) {
                return Ok(Vec::new());
            }
        }

        let settings = self
            .business_repo
            .find_settings(business_id)
            .await
            .map_err(internal)?;
        let rules = settings.as_ref().map(SlotRules::from).unwrap_or_default();
        let hours = match settings.as_ref().map(|s| s.parsed_working_hours()) {
            Some(Ok(hours)) => hours,
            Some(Err(e)) => {
                warn!(business_id = %business_id, error = %e, "Stored working hours are unreadable");
                return Ok(Vec::new());
            }
            None => None,
        };

        let day_start = date.and_hms_opt(0, 0, 0).map(|t| t.and_utc()).ok_or_else(|| {
            AppointmentError::Internal(format!("Invalid date {}", date))
        })?;
        let busy: Vec<Busy> = self
            .appointment_repo
            .find_occupying(business_id, query.employee_id, day_start, day_start + Duration::days(1))
            .await
            .map_err(internal)?
            .into_iter()
            .filter(|a| a.status.occupies_slot())
            .map(|a| Busy {
                start: a.scheduled_date,
                end: a.end_date,
            })
            .collect();

        Ok(generate_slots(&SlotQuery {
            date,
            service_duration: service.duration_minutes,
            rules,
            hours: hours.as_ref(),
            busy: &busy,
            now: Utc::now(),
        }))
    }

    async fn book(
        &self,
        actor: Actor,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let now = Utc::now();
        if request.scheduled_date <= now {
            return Err(AppointmentError::DateInPast);
        }

        self.business_repo
            .find_by_id(request.business_id)
            .await
            .map_err(internal)?
            .ok_or(AppointmentError::BusinessNotFound)?;
        let service = self
            .bookable_service(request.business_id, request.service_id)
            .await?;

        if let Some(employee_id) = request.employee_id {
            let employee = self
                .employee_repo
                .find_by_id(employee_id)
                .await
                .map_err(internal)?;
            if !employee.is_some_and(|e| e.works_for(request.business_id)) {
                return Err(AppointmentError::EmployeeUnavailable);
            }
        }

        let end_date = request.scheduled_date + service.duration();
        let appointment = NewAppointment {
            user_id: actor.user_id,
            business_id: request.business_id,
            service_id: service.id,
            employee_id: request.employee_id,
            scheduled_date: request.scheduled_date,
            end_date,
            total_amount: service.price,
            deposit_amount: service.booking_deposit(),
            notes: request
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        }
        .into_appointment(now);
        let history = AppointmentStatusHistory::new(
            appointment.id,
            None,
            AppointmentStatus::Pending,
            ChangedBy::User,
            None,
        );

        let Some(created) = self
            .appointment_repo
            .create_if_free(&appointment, &history)
            .await
            .map_err(internal)?
        else {
            info!(
                service_id = %service.id,
                employee_id = ?request.employee_id,
                start = %request.scheduled_date,
                "Booking rejected, slot taken"
            );
            return Err(AppointmentError::SlotTaken);
        };

        metrics::record_appointment_created();
        info!(
            appointment_id = %created.id,
            reference = %created.reference_number,
            business_id = %created.business_id,
            "Appointment booked"
        );
        Ok(created)
    }

    async fn list_mine(&self, actor: Actor, range: DateRange) -> Result<Vec<Appointment>, AppointmentError> {
        self.appointment_repo
            .find_by_user(actor.user_id, range)
            .await
            .map_err(internal)
    }

    async fn list_for_business(
        &self,
        actor: Actor,
        business_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if !self.is_business_owner(actor, business_id).await? {
            return Err(AppointmentError::Forbidden);
        }
        self.appointment_repo
            .find_by_business(business_id, range)
            .await
            .map_err(internal)
    }

    async fn get(&self, actor: Actor, id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.find(id).await?;
        if appointment.user_id != actor.user_id
            && !self.is_business_owner(actor, appointment.business_id).await?
        {
            return Err(AppointmentError::Forbidden);
        }
        Ok(appointment)
    }

    async fn history(
        &self,
        actor: Actor,
        id: Uuid,
    ) -> Result<Vec<AppointmentStatusHistory>, AppointmentError> {
        let appointment = self.get(actor, id).await?;
        self.appointment_repo
            .history(appointment.id)
            .await
            .map_err(internal)
    }

    async fn apply_owner_action(
        &self,
        actor: Actor,
        id: Uuid,
        action: OwnerAction,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.find(id).await?;
        if !self.is_business_owner(actor, appointment.business_id).await? {
            return Err(AppointmentError::Forbidden);
        }

        self.transition(
            appointment,
            action.target(),
            ChangedBy::Business,
            None,
            action.counter(),
        )
        .await
    }

    async fn cancel(
        &self,
        actor: Actor,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.find(id).await?;
        let changed_by = if appointment.user_id == actor.user_id {
            ChangedBy::User
        } else if self.is_business_owner(actor, appointment.business_id).await? {
            ChangedBy::Business
        } else {
            return Err(AppointmentError::Forbidden);
        };

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        self.transition(appointment, AppointmentStatus::Cancelled, changed_by, reason, None)
            .await
    }
}
