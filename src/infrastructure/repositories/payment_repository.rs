//! Payment Repository Implementation
//!
//! PostgreSQL implementation of the PaymentRepository trait over the
//! `wompi_transactions` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{PaymentRepository, TransactionStatus, WompiTransaction};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    appointment_id: Uuid,
    wompi_id: Option<String>,
    reference: String,
    amount: Decimal,
    currency: String,
    status: String,
    payment_method: String,
    webhook_received: bool,
    webhook_data: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_transaction(self) -> WompiTransaction {
        WompiTransaction {
            id: self.id,
            appointment_id: self.appointment_id,
            wompi_id: self.wompi_id,
            reference: self.reference,
            amount: self.amount,
            currency: self.currency,
            status: TransactionStatus::from_str(&self.status),
            payment_method: self.payment_method,
            webhook_received: self.webhook_received,
            webhook_data: self.webhook_data,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL payment repository implementation.
#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn create(&self, transaction: &WompiTransaction) -> Result<WompiTransaction, AppError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO wompi_transactions (id, appointment_id, wompi_id, reference, amount, currency,
                                            status, payment_method, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING id, appointment_id, wompi_id, reference, amount, currency, status,
                      payment_method, webhook_received, webhook_data, created_at, updated_at
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.appointment_id)
        .bind(&transaction.wompi_id)
        .bind(&transaction.reference)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(transaction.status.as_str())
        .bind(&transaction.payment_method)
        .bind(transaction.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_transaction())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<WompiTransaction>, AppError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, appointment_id, wompi_id, reference, amount, currency, status,
                   payment_method, webhook_received, webhook_data, created_at, updated_at
            FROM wompi_transactions
            WHERE reference = $1
            "#,
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_transaction()))
    }

    async fn latest_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<WompiTransaction>, AppError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, appointment_id, wompi_id, reference, amount, currency, status,
                   payment_method, webhook_received, webhook_data, created_at, updated_at
            FROM wompi_transactions
            WHERE appointment_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(appointment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_transaction()))
    }

    async fn update(&self, transaction: &WompiTransaction) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE wompi_transactions
            SET wompi_id = $2,
                status = $3,
                webhook_received = $4,
                webhook_data = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(transaction.id)
        .bind(&transaction.wompi_id)
        .bind(transaction.status.as_str())
        .bind(transaction.webhook_received)
        .bind(&transaction.webhook_data)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Transaction with id {} not found",
                transaction.id
            )));
        }

        Ok(())
    }
}
