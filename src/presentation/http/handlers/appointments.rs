//! Appointment Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::request::{
    AvailabilityQuery, CancelAppointmentRequest, CreateAppointmentRequest, DateRangeQuery,
};
use crate::application::dto::response::{AppointmentDto, AppointmentHistoryDto};
use crate::application::services::{AppointmentService, AppointmentServiceImpl, OwnerAction};
use crate::domain::services::TimeSlot;
use crate::domain::Appointment;
use crate::infrastructure::repositories::{
    PgAppointmentRepository, PgBusinessRepository, PgEmployeeRepository, PgServiceRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

type PgAppointmentService = AppointmentServiceImpl<
    PgAppointmentRepository,
    PgBusinessRepository,
    PgServiceRepository,
    PgEmployeeRepository,
>;

fn appointment_service(state: &AppState) -> PgAppointmentService {
    AppointmentServiceImpl::new(
        Arc::new(PgAppointmentRepository::new(state.db.clone())),
        Arc::new(PgBusinessRepository::new(state.db.clone())),
        Arc::new(PgServiceRepository::new(state.db.clone())),
        Arc::new(PgEmployeeRepository::new(state.db.clone())),
    )
}

fn dtos(appointments: Vec<Appointment>) -> Json<Vec<AppointmentDto>> {
    Json(appointments.into_iter().map(AppointmentDto::from).collect())
}

/// Bookable slots of a service on a date
pub async fn availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<TimeSlot>>, AppError> {
    let slots = appointment_service(&state).availability(query).await?;
    Ok(Json(slots))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentDto>), AppError> {
    body.validate().map_err(validation_error)?;

    let appointment = appointment_service(&state).book(auth.actor(), body).await?;
    Ok((StatusCode::CREATED, Json(AppointmentDto::from(appointment))))
}

pub async fn my_appointments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Vec<AppointmentDto>>, AppError> {
    let appointments = appointment_service(&state)
        .list_mine(auth.actor(), range.into())
        .await?;
    Ok(dtos(appointments))
}

pub async fn business_appointments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(business_id): Path<Uuid>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Vec<AppointmentDto>>, AppError> {
    let appointments = appointment_service(&state)
        .list_for_business(auth.actor(), business_id, range.into())
        .await?;
    Ok(dtos(appointments))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentDto>, AppError> {
    let appointment = appointment_service(&state).get(auth.actor(), id).await?;
    Ok(Json(AppointmentDto::from(appointment)))
}

pub async fn appointment_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AppointmentHistoryDto>>, AppError> {
    let history = appointment_service(&state).history(auth.actor(), id).await?;
    Ok(Json(
        history.into_iter().map(AppointmentHistoryDto::from).collect(),
    ))
}

// ============================================================================
// Status transitions
// ============================================================================

async fn owner_action(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    action: OwnerAction,
) -> Result<Json<AppointmentDto>, AppError> {
    let appointment = appointment_service(state)
        .apply_owner_action(auth.actor(), id, action)
        .await?;
    Ok(Json(AppointmentDto::from(appointment)))
}

pub async fn confirm(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentDto>, AppError> {
    owner_action(&state, &auth, id, OwnerAction::Confirm).await
}

pub async fn complete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentDto>, AppError> {
    owner_action(&state, &auth, id, OwnerAction::Complete).await
}

pub async fn no_show(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentDto>, AppError> {
    owner_action(&state, &auth, id, OwnerAction::NoShow).await
}

/// Cancel as the customer or the business owner; the body is optional
pub async fn cancel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelAppointmentRequest>>,
) -> Result<Json<AppointmentDto>, AppError> {
    let Json(body) = body.unwrap_or_default();
    body.validate().map_err(validation_error)?;

    let appointment = appointment_service(&state)
        .cancel(auth.actor(), id, body.reason)
        .await?;
    Ok(Json(AppointmentDto::from(appointment)))
}
