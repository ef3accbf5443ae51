//! Employee Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::request::{CreateEmployeeRequest, UpdateEmployeeRequest};
use crate::application::dto::response::EmployeeDto;
use crate::application::services::{EmployeeService, EmployeeServiceImpl};
use crate::infrastructure::repositories::{PgBusinessRepository, PgEmployeeRepository};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

fn employee_service(
    state: &AppState,
) -> EmployeeServiceImpl<PgBusinessRepository, PgEmployeeRepository> {
    EmployeeServiceImpl::new(
        Arc::new(PgBusinessRepository::new(state.db.clone())),
        Arc::new(PgEmployeeRepository::new(state.db.clone())),
    )
}

pub async fn list_by_business(
    State(state): State<AppState>,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Vec<EmployeeDto>>, AppError> {
    let employees = employee_service(&state).list_by_business(business_id).await?;
    Ok(Json(employees.into_iter().map(EmployeeDto::from).collect()))
}

pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EmployeeDto>, AppError> {
    let employee = employee_service(&state).get(id).await?;
    Ok(Json(EmployeeDto::from(employee)))
}

pub async fn create_employee(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(business_id): Path<Uuid>,
    Json(body): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<EmployeeDto>), AppError> {
    body.validate().map_err(validation_error)?;

    let employee = employee_service(&state)
        .create(auth.actor(), business_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(EmployeeDto::from(employee))))
}

pub async fn update_employee(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateEmployeeRequest>,
) -> Result<Json<EmployeeDto>, AppError> {
    body.validate().map_err(validation_error)?;

    let employee = employee_service(&state).update(auth.actor(), id, body).await?;
    Ok(Json(EmployeeDto::from(employee)))
}

pub async fn delete_employee(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    employee_service(&state).delete(auth.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
