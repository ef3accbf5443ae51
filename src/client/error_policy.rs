//! HTTP error policy
//!
//! Which calls carry a token, what the user is told for each status, and
//! what happens on a 401.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::session::Session;

/// Endpoints that never carry a bearer token and never trigger a refresh
pub const PUBLIC_PATHS: [&str; 4] = [
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/refresh",
    "/api/payments/webhook",
];

pub const LOGIN_ROUTE: &str = "/auth/login";
pub const FALLBACK_MESSAGE: &str = "Ocurrio un error inesperado.";
pub const OFFLINE_MESSAGE: &str = "No se pudo conectar con el servidor.";
pub const BAD_CREDENTIALS_MESSAGE: &str = "Credenciales invalidas.";
pub const FORBIDDEN_MESSAGE: &str = "No tienes permisos para esta accion.";
pub const SERVER_ERROR_MESSAGE: &str = "Error del servidor. Intentalo mas tarde.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Sesion expirada. Inicia sesion de nuevo.";

pub fn is_public_endpoint(url: &str) -> bool {
    PUBLIC_PATHS.iter().any(|path| url.contains(path))
}

/// A string body as-is, else its `message` field, else the fallback.
pub fn resolve_message(body: &Value) -> String {
    match body {
        Value::String(s) => s.clone(),
        _ => body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(FALLBACK_MESSAGE)
            .to_string(),
    }
}

pub fn notification_for(status: u16, body: &Value) -> String {
    let message = resolve_message(body);
    match status {
        0 => OFFLINE_MESSAGE.to_string(),
        401 if message.is_empty() => BAD_CREDENTIALS_MESSAGE.to_string(),
        403 => FORBIDDEN_MESSAGE.to_string(),
        s if s >= 500 => SERVER_ERROR_MESSAGE.to_string(),
        _ => message,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnauthorizedAction {
    /// Drop the session and navigate to the given route
    ClearAndRedirect(&'static str),
    /// Refresh the token, then repeat the request once
    RefreshAndRetry,
}

/// What to do with a 401. `None` for public endpoints, whose 401s are
/// ordinary errors such as bad credentials.
pub fn on_unauthorized(
    url: &str,
    session: Option<&Session>,
    now: DateTime<Utc>,
) -> Option<UnauthorizedAction> {
    if is_public_endpoint(url) {
        return None;
    }
    match session {
        Some(s) if s.is_valid(now) => Some(UnauthorizedAction::RefreshAndRetry),
        _ => Some(UnauthorizedAction::ClearAndRedirect(LOGIN_ROUTE)),
    }
}
