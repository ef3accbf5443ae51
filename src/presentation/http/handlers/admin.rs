//! Admin Handlers
//!
//! Mounted behind `require_admin`, so every caller here is an Admin.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::request::{SearchUsersQuery, UpdateRoleRequest, UpdateUserStatusRequest};
use crate::application::dto::response::{PaginatedUsersResponse, UserDto, UserManageDto};
use crate::application::services::{AdminService, AdminServiceImpl};
use crate::infrastructure::repositories::PgUserRepository;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

fn admin_service(state: &AppState) -> AdminServiceImpl<PgUserRepository> {
    AdminServiceImpl::new(Arc::new(PgUserRepository::new(state.db.clone())))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<SearchUsersQuery>,
) -> Result<Json<PaginatedUsersResponse>, AppError> {
    let page = admin_service(&state).list_users(&query).await?;
    Ok(Json(PaginatedUsersResponse::from(page)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserManageDto>, AppError> {
    let user = admin_service(&state).get_user(user_id).await?;
    Ok(Json(UserManageDto::from(user)))
}

/// Block or unblock a user
pub async fn update_status(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateUserStatusRequest>,
) -> Result<Json<UserManageDto>, AppError> {
    let user = admin_service(&state).set_status(user_id, body).await?;
    Ok(Json(UserManageDto::from(user)))
}

pub async fn update_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<UserDto>, AppError> {
    body.validate().map_err(validation_error)?;

    let user = admin_service(&state).set_role(user_id, &body.role).await?;
    Ok(Json(UserDto::from(user)))
}
