//! Wompi payment transactions.
//!
//! Maps to the `wompi_transactions` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::appointment::PaymentStatus;
use crate::domain::value_objects::reference;
use crate::shared::error::AppError;

/// Transaction status as reported by Wompi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Approved,
    Declined,
    Error,
    Voided,
}

impl TransactionStatus {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "APPROVED" => Self::Approved,
            "DECLINED" => Self::Declined,
            "ERROR" => Self::Error,
            "VOIDED" => Self::Voided,
            _ => Self::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Declined => "DECLINED",
            Self::Error => "ERROR",
            Self::Voided => "VOIDED",
        }
    }

    /// Whether a webhook reporting `next` may replace this status. Approved
    /// only moves on to a void, and a void is final; anything else arriving
    /// late is out of order.
    pub fn can_move_to(&self, next: Self) -> bool {
        match self {
            Self::Approved => matches!(next, Self::Approved | Self::Voided),
            Self::Voided => next == Self::Voided,
            _ => true,
        }
    }

    /// Payment state the appointment takes on, if this status changes it.
    pub fn appointment_effect(&self) -> Option<PaymentStatus> {
        match self {
            Self::Approved => Some(PaymentStatus::Paid),
            Self::Declined | Self::Error => Some(PaymentStatus::Unpaid),
            Self::Voided => Some(PaymentStatus::Refunded),
            Self::Pending => None,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payment attempt for an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WompiTransaction {
    pub id: Uuid,
    pub appointment_id: Uuid,
    /// Transaction id assigned by Wompi
    pub wompi_id: Option<String>,
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: TransactionStatus,
    pub payment_method: String,
    pub webhook_received: bool,
    /// Raw webhook body, kept for reconciliation
    pub webhook_data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WompiTransaction {
    pub fn new(appointment_id: Uuid, amount: Decimal, currency: &str, payment_method: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            appointment_id,
            wompi_id: None,
            reference: reference::payment_reference(now),
            amount,
            currency: currency.to_uppercase(),
            status: TransactionStatus::Pending,
            payment_method: payment_method.to_string(),
            webhook_received: false,
            webhook_data: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Amount in the minor unit Wompi expects. `None` when the amount is not
    /// positive, carries fractions of a cent or does not fit in an `i64`.
    pub fn amount_in_cents(&self) -> Option<i64> {
        use rust_decimal::prelude::ToPrimitive;
        let cents = self.amount.checked_mul(Decimal::ONE_HUNDRED)?;
        if cents <= Decimal::ZERO || !cents.fract().is_zero() {
            return None;
        }
        cents.to_i64()
    }

    pub fn apply_webhook(&mut self, wompi_id: &str, status: TransactionStatus, raw: String) {
        self.wompi_id = Some(wompi_id.to_string());
        self.status = status;
        self.webhook_received = true;
        self.webhook_data = Some(raw);
        self.updated_at = Utc::now();
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, transaction: &WompiTransaction) -> Result<WompiTransaction, AppError>;

    async fn find_by_reference(&self, reference: &str) -> Result<Option<WompiTransaction>, AppError>;

    /// Most recent transaction of an appointment.
    async fn latest_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<WompiTransaction>, AppError>;

    async fn update(&self, transaction: &WompiTransaction) -> Result<(), AppError>;
}
