//! Schedule Handlers
//!
//! Business and employee schedules share one set of handlers; the route
//! decides the scope through a `ScheduleScope` extension.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::application::dto::request::{CreateScheduleRequest, UpdateScheduleRequest};
use crate::application::dto::response::ScheduleDto;
use crate::application::services::{ScheduleService, ScheduleServiceImpl};
use crate::domain::ScheduleScope;
use crate::infrastructure::repositories::{
    PgBusinessRepository, PgEmployeeRepository, PgScheduleRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

fn schedule_service(
    state: &AppState,
    scope: ScheduleScope,
) -> ScheduleServiceImpl<PgScheduleRepository, PgBusinessRepository, PgEmployeeRepository> {
    let schedules = match scope {
        ScheduleScope::Business => PgScheduleRepository::business(state.db.clone()),
        ScheduleScope::Employee => PgScheduleRepository::employee(state.db.clone()),
    };
    ScheduleServiceImpl::new(
        scope,
        Arc::new(schedules),
        Arc::new(PgBusinessRepository::new(state.db.clone())),
        Arc::new(PgEmployeeRepository::new(state.db.clone())),
    )
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Extension(scope): Extension<ScheduleScope>,
    Path(owner_id): Path<Uuid>,
) -> Result<Json<ScheduleDto>, AppError> {
    let schedule = schedule_service(&state, scope).get(owner_id).await?;
    Ok(Json(ScheduleDto::new(scope, schedule)))
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Extension(scope): Extension<ScheduleScope>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleDto>), AppError> {
    let schedule = schedule_service(&state, scope)
        .create(auth.actor(), body)
        .await?;
    Ok((StatusCode::CREATED, Json(ScheduleDto::new(scope, schedule))))
}

pub async fn update_schedule(
    State(state): State<AppState>,
    Extension(scope): Extension<ScheduleScope>,
    Extension(auth): Extension<AuthUser>,
    Path(owner_id): Path<Uuid>,
    Json(body): Json<UpdateScheduleRequest>,
) -> Result<Json<ScheduleDto>, AppError> {
    let schedule = schedule_service(&state, scope)
        .update(auth.actor(), owner_id, body)
        .await?;
    Ok(Json(ScheduleDto::new(scope, schedule)))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    Extension(scope): Extension<ScheduleScope>,
    Extension(auth): Extension<AuthUser>,
    Path(owner_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    schedule_service(&state, scope)
        .delete(auth.actor(), owner_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
