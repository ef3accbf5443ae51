//! Authentication Middleware
//!
//! Bearer JWT validation for protected routes, plus the admin role gate.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::application::services::auth_service::{decode_access_token, AuthError};
use crate::application::services::Actor;
use crate::domain::UserRole;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated user extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

/// Validate the bearer token and attach an `AuthUser` to the request.
fn authenticate(state: &AppState, request: &Request) -> Result<AuthUser, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".into()))?;

    let claims = decode_access_token(&state.settings.jwt, token, true).map_err(|e| match e {
        AuthError::TokenExpired => AppError::Unauthorized("Token expired".into()),
        _ => AppError::Unauthorized("Invalid token".into()),
    })?;

    let user_id = claims
        .user_id()
        .map_err(|_| AppError::Unauthorized("Invalid token claims".into()))?;
    let role = UserRole::parse(&claims.role)
        .ok_or_else(|| AppError::Unauthorized("Invalid token claims".into()))?;

    Ok(AuthUser {
        user_id,
        email: claims.email,
        role,
    })
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &request)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Reject callers whose token does not carry the Admin role.
///
/// Must run after `auth_middleware`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let is_admin = request
        .extensions()
        .get::<AuthUser>()
        .is_some_and(|user| user.role == UserRole::Admin);
    if !is_admin {
        return Err(AppError::Forbidden("Se requiere rol de administrador".into()));
    }
    Ok(next.run(request).await)
}
