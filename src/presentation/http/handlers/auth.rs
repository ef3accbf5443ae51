//! Authentication Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::request::{
    LoginRequest, RefreshTokenRequest, RegisterRequest, UpdateRoleRequest,
};
use crate::application::dto::response::{AuthResponse, UserDto};
use crate::application::services::{AuthService, AuthServiceImpl};
use crate::infrastructure::repositories::{PgRefreshTokenRepository, PgUserRepository};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

fn auth_service(state: &AppState) -> AuthServiceImpl<PgUserRepository, PgRefreshTokenRepository> {
    AuthServiceImpl::new(
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgRefreshTokenRepository::new(state.db.clone())),
        state.settings.jwt.clone(),
    )
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    body.validate().map_err(validation_error)?;

    let result = auth_service(&state).register(&body).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse::from(result))))
}

/// Login with credentials
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    body.validate().map_err(validation_error)?;

    let result = auth_service(&state).login(&body.email, &body.password).await?;
    Ok(Json(AuthResponse::from(result)))
}

/// Rotate a refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    body.validate().map_err(validation_error)?;

    let result = auth_service(&state)
        .refresh(&body.token, &body.refresh_token)
        .await?;
    Ok(Json(AuthResponse::from(result)))
}

/// Revoke every refresh token of a user
pub async fn revoke(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth_service(&state).revoke(auth.actor(), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change a user's role
pub async fn change_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<UserDto>, AppError> {
    body.validate().map_err(validation_error)?;

    let user = auth_service(&state)
        .change_role(auth.actor(), user_id, &body.role)
        .await?;
    Ok(Json(UserDto::from(user)))
}
