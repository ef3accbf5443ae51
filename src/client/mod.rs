//! API Client
//!
//! A typed client for the TurnoYa HTTP API, carrying the same session,
//! guard and error-notification rules as the mobile apps.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use turnoya_api::client::{ApiClient, Credentials, FileSessionStore};
//!
//! let store = Arc::new(FileSessionStore::new(data_dir));
//! let api = ApiClient::new("https://api.turnoya.co", store)?;
//! api.login(&Credentials { email, password }).await?;
//! let mine = api.my_appointments().await?;
//! ```

pub mod api;
pub mod error;
pub mod error_policy;
pub mod guards;
pub mod models;
pub mod session;

pub use api::ApiClient;
pub use error::ClientError;
pub use error_policy::{
    is_public_endpoint, notification_for, on_unauthorized, resolve_message, UnauthorizedAction,
};
pub use guards::{admin_guard, auth_guard, role_guard, GuardDecision};
pub use models::{
    AppointmentSummary, AuthPayload, AuthUserPayload, AvailabilityParams, Credentials,
    NewAppointment, Registration, Slot,
};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore, SessionUser, SESSION_KEY};
