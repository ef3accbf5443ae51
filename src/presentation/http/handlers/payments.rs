//! Payment Handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::request::CreatePaymentIntentRequest;
use crate::application::dto::response::PaymentDto;
use crate::application::services::{PaymentService, PaymentServiceImpl};
use crate::infrastructure::external::PaymentGateway;
use crate::infrastructure::repositories::{PgAppointmentRepository, PgPaymentRepository};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

/// Header carrying the hex HMAC of the webhook body
pub const SIGNATURE_HEADER: &str = "x-wompi-signature";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: &'static str,
}

fn payment_service(
    state: &AppState,
) -> PaymentServiceImpl<PgPaymentRepository, PgAppointmentRepository, dyn PaymentGateway> {
    PaymentServiceImpl::new(
        Arc::new(PgPaymentRepository::new(state.db.clone())),
        Arc::new(PgAppointmentRepository::new(state.db.clone())),
        state.gateway.clone(),
        state.settings.wompi.events_secret.clone(),
    )
}

/// Open a Wompi transaction for an appointment
pub async fn create_intent(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreatePaymentIntentRequest>,
) -> Result<Json<PaymentDto>, AppError> {
    body.validate().map_err(validation_error)?;

    let transaction = payment_service(&state)
        .create_intent(auth.actor(), body)
        .await?;
    Ok(Json(PaymentDto::from(transaction)))
}

pub async fn payment_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<PaymentDto>, AppError> {
    let transaction = payment_service(&state)
        .status(auth.actor(), appointment_id)
        .await?;
    Ok(Json(PaymentDto::from(transaction)))
}

/// Wompi event delivery. The raw body is needed for the signature check.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = payment_service(&state)
        .handle_webhook(&body, signature)
        .await?;
    Ok(Json(WebhookAck {
        received: true,
        outcome: outcome.as_str(),
    }))
}
