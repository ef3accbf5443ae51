//! Payment Service
//!
//! Wompi payment intents, payment status and event webhooks.
//!
//! ```text
//! intent:  appointment ──> WompiTransaction (PENDING) ──> gateway ──> store
//! webhook: raw body ──> signature ──> event ──> transaction ──> appointment
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::Actor;
use crate::application::dto::request::CreatePaymentIntentRequest;
use crate::domain::{
    Appointment, AppointmentRepository, PaymentRepository, TransactionStatus, WompiTransaction,
};
use crate::infrastructure::external::{verify_signature, GatewayTransaction, PaymentGateway};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Event body posted by Wompi.
#[derive(Debug, Deserialize)]
pub struct WompiEvent {
    #[serde(default)]
    pub event: String,
    /// Wompi sends an object here; it is kept only for logging
    #[serde(default)]
    pub signature: Option<serde_json::Value>,
    pub data: Option<WompiEventData>,
}

#[derive(Debug, Deserialize)]
pub struct WompiEventData {
    pub transaction: Option<WompiEventTransaction>,
}

#[derive(Debug, Deserialize)]
pub struct WompiEventTransaction {
    pub id: String,
    pub reference: String,
    pub status: String,
    pub payment_method_type: Option<String>,
}

/// What a verified webhook did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied,
    /// No stored transaction carries the reference
    UnknownReference,
    /// The event has no transaction
    Ignored,
    /// The transaction already reached a state the event may not undo
    Stale,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::UnknownReference => "unknown_reference",
            Self::Ignored => "ignored",
            Self::Stale => "stale",
        }
    }
}

#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn create_intent(
        &self,
        actor: Actor,
        request: CreatePaymentIntentRequest,
    ) -> Result<WompiTransaction, PaymentError>;

    /// Latest transaction of an appointment
    async fn status(&self, actor: Actor, appointment_id: Uuid) -> Result<WompiTransaction, PaymentError>;

    /// Verify and apply a webhook delivery.
    async fn handle_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, PaymentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Cita no encontrada")]
    AppointmentNotFound,

    #[error("No hay pagos registrados para la cita")]
    NotFound,

    #[error("No tienes permisos para esta cita")]
    Forbidden,

    #[error("Firma de webhook inválida")]
    InvalidSignature,

    #[error("Evento de webhook inválido")]
    MalformedEvent,

    #[error("El monto no se puede cobrar")]
    InvalidAmount,

    /// Wompi failure, keeps the upstream status
    #[error(transparent)]
    Gateway(AppError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::AppointmentNotFound | PaymentError::NotFound => {
                AppError::NotFound(err.to_string())
            }
            PaymentError::Forbidden => AppError::Forbidden(err.to_string()),
            PaymentError::InvalidSignature => AppError::Unauthorized(err.to_string()),
            PaymentError::MalformedEvent | PaymentError::InvalidAmount => {
                AppError::BadRequest(err.to_string())
            }
            PaymentError::Gateway(e) => e,
            PaymentError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

fn internal(e: AppError) -> PaymentError {
    PaymentError::Internal(e.to_string())
}

pub struct PaymentServiceImpl<P, A, G>
where
    P: PaymentRepository,
    A: AppointmentRepository,
    G: PaymentGateway + ?Sized,
{
    payment_repo: Arc<P>,
    appointment_repo: Arc<A>,
    gateway: Arc<G>,
    events_secret: String,
}

impl<P, A, G> PaymentServiceImpl<P, A, G>
where
    P: PaymentRepository,
    A: AppointmentRepository,
    G: PaymentGateway + ?Sized,
{
    pub fn new(
        payment_repo: Arc<P>,
        appointment_repo: Arc<A>,
        gateway: Arc<G>,
        events_secret: impl Into<String>,
    ) -> Self {
        Self {
            payment_repo,
            appointment_repo,
            gateway,
            events_secret: events_secret.into(),
        }
    }

    async fn customer_appointment(
        &self,
        actor: Actor,
        appointment_id: Uuid,
    ) -> Result<Appointment, PaymentError> {
        let appointment = self
            .appointment_repo
            .find_by_id(appointment_id)
            .await
            .map_err(internal)?
            .ok_or(PaymentError::AppointmentNotFound)?;
        if appointment.user_id != actor.user_id && !actor.is_admin() {
            return Err(PaymentError::Forbidden);
        }
        Ok(appointment)
    }

    async fn apply_event(
        &self,
        event: &WompiEventTransaction,
        raw: String,
    ) -> Result<WebhookOutcome, PaymentError> {
        let Some(mut transaction) = self
            .payment_repo
            .find_by_reference(&event.reference)
            .await
            .map_err(internal)?
        else {
            warn!(reference = %event.reference, "Webhook for unknown payment reference");
            return Ok(WebhookOutcome::UnknownReference);
        };

        let status = TransactionStatus::from_str(&event.status);
        if !transaction.status.can_move_to(status) {
            warn!(
                reference = %transaction.reference,
                current = transaction.status.as_str(),
                received = status.as_str(),
                "Out of order webhook ignored"
            );
            return Ok(WebhookOutcome::Stale);
        }
        transaction.apply_webhook(&event.id, status, raw);
        self.payment_repo
            .update(&transaction)
            .await
            .map_err(internal)?;

        if let Some(payment_status) = status.appointment_effect() {
            self.appointment_repo
                .update_payment(
                    transaction.appointment_id,
                    payment_status,
                    status == TransactionStatus::Approved,
                    Some(transaction.reference.clone()),
                )
                .await
                .map_err(internal)?;
        }

        info!(
            reference = %transaction.reference,
            appointment_id = %transaction.appointment_id,
            status = status.as_str(),
            method = ?event.payment_method_type,
            "Payment webhook applied"
        );
        Ok(WebhookOutcome::Applied)
    }
}

#[async_trait]
impl<P, A, G> PaymentService for PaymentServiceImpl<P, A, G>
where
    P: PaymentRepository + 'static,
    A: AppointmentRepository + 'static,
    G: PaymentGateway + ?Sized + 'static,
{
    #[instrument(skip(self, request), fields(appointment_id = %request.appointment_id))]
    async fn create_intent(
        &self,
        actor: Actor,
        request: CreatePaymentIntentRequest,
    ) -> Result<WompiTransaction, PaymentError> {
        let appointment = self.customer_appointment(actor, request.appointment_id).await?;

        let mut transaction = WompiTransaction::new(
            appointment.id,
            request.amount,
            &request.currency,
            &request.payment_method,
        );
        let Some(amount_in_cents) = transaction.amount_in_cents() else {
            warn!(amount = %transaction.amount, "Payment amount cannot be charged in cents");
            return Err(PaymentError::InvalidAmount);
        };
        transaction.wompi_id = self
            .gateway
            .create_transaction(&GatewayTransaction {
                amount_in_cents,
                currency: transaction.currency.clone(),
                reference: transaction.reference.clone(),
            })
            .await
            .map_err(PaymentError::Gateway)?;

        let created = self
            .payment_repo
            .create(&transaction)
            .await
            .map_err(internal)?;
        self.appointment_repo
            .update_payment(
                appointment.id,
                appointment.payment_status,
                appointment.deposit_paid,
                Some(created.reference.clone()),
            )
            .await
            .map_err(internal)?;

        info!(reference = %created.reference, amount = %created.amount, "Payment intent created");
        Ok(created)
    }

    async fn status(&self, actor: Actor, appointment_id: Uuid) -> Result<WompiTransaction, PaymentError> {
        self.customer_appointment(actor, appointment_id).await?;
        self.payment_repo
            .latest_for_appointment(appointment_id)
            .await
            .map_err(internal)?
            .ok_or(PaymentError::NotFound)
    }

    async fn handle_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, PaymentError> {
        if !verify_signature(&self.events_secret, body, signature.unwrap_or_default()) {
            metrics::record_payment_webhook("invalid_signature");
            warn!("Rejected webhook with invalid signature");
            return Err(PaymentError::InvalidSignature);
        }

        let event: WompiEvent = serde_json::from_slice(body).map_err(|e| {
            metrics::record_payment_webhook("malformed");
            warn!(error = %e, "Unreadable webhook body");
            PaymentError::MalformedEvent
        })?;

        let outcome = match event.data.and_then(|d| d.transaction) {
            Some(transaction) => {
                let raw = String::from_utf8_lossy(body).into_owned();
                self.apply_event(&transaction, raw).await?
            }
            None => {
                info!(event = %event.event, "Webhook without transaction ignored");
                WebhookOutcome::Ignored
            }
        };

        metrics::record_payment_webhook(outcome.as_str());
        Ok(outcome)
    }
}
