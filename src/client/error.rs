//! Client errors

use serde_json::Value;

use super::error_policy::{notification_for, resolve_message, LOGIN_ROUTE, SESSION_EXPIRED_MESSAGE};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success response; `body` is JSON when the server sent JSON, else a string
    #[error("HTTP {status}: {}", resolve_message(.body))]
    Api { status: u16, body: Value },

    /// Refreshing failed; the stored session was cleared
    #[error("Sesion expirada. Inicia sesion de nuevo.")]
    SessionExpired,

    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status, 0 when the server was unreachable
    pub fn status(&self) -> u16 {
        match self {
            Self::Api { status, .. } => *status,
            Self::SessionExpired => 401,
            Self::Transport(e) => e.status().map(|s| s.as_u16()).unwrap_or(0),
            Self::Storage(_) | Self::Serialization(_) => 0,
        }
    }

    /// Text to show the user
    pub fn notification(&self) -> String {
        match self {
            Self::Api { status, body } => notification_for(*status, body),
            Self::SessionExpired => SESSION_EXPIRED_MESSAGE.to_string(),
            Self::Transport(_) => notification_for(self.status(), &Value::Null),
            Self::Storage(_) | Self::Serialization(_) => notification_for(0, &Value::Null),
        }
    }

    /// Route the app should navigate to, if any
    pub fn redirect_to(&self) -> Option<&'static str> {
        matches!(self, Self::SessionExpired).then_some(LOGIN_ROUTE)
    }
}
