//! Current User Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::application::dto::request::{ChangePasswordRequest, UpdateProfileRequest};
use crate::application::dto::response::UserProfileDto;
use crate::application::services::{UserService, UserServiceImpl};
use crate::infrastructure::repositories::PgUserRepository;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

fn user_service(state: &AppState) -> UserServiceImpl<PgUserRepository> {
    UserServiceImpl::new(Arc::new(PgUserRepository::new(state.db.clone())))
}

/// Get current user profile
pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserProfileDto>, AppError> {
    let user = user_service(&state).get_profile(auth.user_id).await?;
    Ok(Json(UserProfileDto::from(user)))
}

/// Update current user profile
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfileDto>, AppError> {
    body.validate().map_err(validation_error)?;

    let user = user_service(&state)
        .update_profile(auth.user_id, body)
        .await?;
    Ok(Json(UserProfileDto::from(user)))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    body.validate().map_err(validation_error)?;

    user_service(&state)
        .change_password(auth.user_id, &body)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
