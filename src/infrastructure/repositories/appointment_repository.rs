//! Appointment Repository Implementation
//!
//! PostgreSQL implementation of the AppointmentRepository trait. Status
//! changes are written together with their history row in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{
    Appointment, AppointmentRepository, AppointmentStatus, AppointmentStatusHistory, ChangedBy,
    CustomerCounter, DateRange, PaymentStatus,
};
use crate::shared::error::AppError;

const APPOINTMENT_COLUMNS: &str = "id, reference_number, user_id, business_id, service_id, \
     employee_id, scheduled_date, end_date, status, payment_status, total_amount, \
     deposit_amount, deposit_paid, notes, wompi_reference, created_at, updated_at";

/// Statuses that still hold their slot against new bookings.
const BLOCKING_STATUSES: &str = "('Pending', 'Confirmed', 'NoShow')";

#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: Uuid,
    reference_number: String,
    user_id: Uuid,
    business_id: Uuid,
    service_id: Uuid,
    employee_id: Option<Uuid>,
    scheduled_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    status: String,
    payment_status: String,
    total_amount: Decimal,
    deposit_amount: Decimal,
    deposit_paid: bool,
    notes: Option<String>,
    wompi_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AppointmentRow {
    fn into_appointment(self) -> Appointment {
        Appointment {
            id: self.id,
            reference_number: self.reference_number,
            user_id: self.user_id,
            business_id: self.business_id,
            service_id: self.service_id,
            employee_id: self.employee_id,
            scheduled_date: self.scheduled_date,
            end_date: self.end_date,
            status: AppointmentStatus::from_str(&self.status),
            payment_status: PaymentStatus::from_str(&self.payment_status),
            total_amount: self.total_amount,
            deposit_amount: self.deposit_amount,
            deposit_paid: self.deposit_paid,
            notes: self.notes,
            wompi_reference: self.wompi_reference,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    appointment_id: Uuid,
    old_status: Option<String>,
    new_status: String,
    changed_by: String,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl HistoryRow {
    fn into_history(self) -> AppointmentStatusHistory {
        AppointmentStatusHistory {
            id: self.id,
            appointment_id: self.appointment_id,
            old_status: self.old_status.map(|s| AppointmentStatus::from_str(&s)),
            new_status: AppointmentStatus::from_str(&self.new_status),
            changed_by: ChangedBy::from_str(&self.changed_by),
            reason: self.reason,
            created_at: self.created_at,
        }
    }
}

/// Advisory lock keys guarding the booking check for a service and its
/// optional employee, sorted so concurrent bookings lock in the same order.
fn booking_lock_keys(service_id: Uuid, employee_id: Option<Uuid>) -> Vec<i64> {
    let mut keys: Vec<i64> = std::iter::once(service_id)
        .chain(employee_id)
        .map(|id| id.as_u128() as i64)
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// PostgreSQL appointment repository implementation.
#[derive(Clone)]
pub struct PgAppointmentRepository {
    pool: PgPool,
}

impl PgAppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_history(
        tx: &mut Transaction<'_, Postgres>,
        history: &AppointmentStatusHistory,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO appointment_status_history
                (id, appointment_id, old_status, new_status, changed_by, reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(history.id)
        .bind(history.appointment_id)
        .bind(history.old_status.map(|s| s.as_str()))
        .bind(history.new_status.as_str())
        .bind(history.changed_by.as_str())
        .bind(&history.reason)
        .bind(history.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn find_in_range(
        &self,
        owner_column: &str,
        owner_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<Appointment>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM appointments
            WHERE {} = $1
              AND ($2::TIMESTAMPTZ IS NULL OR scheduled_date >= $2)
              AND ($3::TIMESTAMPTZ IS NULL OR scheduled_date <= $3)
            ORDER BY scheduled_date DESC
            "#,
            APPOINTMENT_COLUMNS, owner_column
        );
        let rows = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(owner_id)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.into_appointment()).collect())
    }
}

#[async_trait]
impl AppointmentRepository for PgAppointmentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppError> {
        let sql = format!("SELECT {} FROM appointments WHERE id = $1", APPOINTMENT_COLUMNS);
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_appointment()))
    }

    async fn find_by_user(&self, user_id: Uuid, range: DateRange) -> Result<Vec<Appointment>, AppError> {
        self.find_in_range("user_id", user_id, range).await
    }

    async fn find_by_business(
        &self,
        business_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<Appointment>, AppError> {
        self.find_in_range("business_id", business_id, range).await
    }

    async fn find_occupying(
        &self,
        business_id: Uuid,
        employee_id: Option<Uuid>,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM appointments
            WHERE business_id = $1
              AND scheduled_date >= $2 AND scheduled_date < $3
              AND status IN ('Pending', 'Confirmed')
              AND ($4::UUID IS NULL OR employee_id = $4)
            ORDER BY scheduled_date
            "#,
            APPOINTMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(business_id)
            .bind(day_start)
            .bind(day_end)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.into_appointment()).collect())
    }

    async fn create_if_free(
        &self,
        appointment: &Appointment,
        history: &AppointmentStatusHistory,
    ) -> Result<Option<Appointment>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Held until commit or rollback; a competing booking for the same
        // service or employee waits here and then sees our row.
        for key in booking_lock_keys(appointment.service_id, appointment.employee_id) {
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }

        let sql = format!(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM appointments
                WHERE (service_id = $1 OR ($2::UUID IS NOT NULL AND employee_id = $2))
                  AND status IN {}
                  AND scheduled_date < $4
                  AND end_date > $3
            )
            "#,
            BLOCKING_STATUSES
        );
        let taken = sqlx::query_scalar::<_, bool>(&sql)
            .bind(appointment.service_id)
            .bind(appointment.employee_id)
            .bind(appointment.scheduled_date)
            .bind(appointment.end_date)
            .fetch_one(&mut *tx)
            .await?;

        if taken {
            tx.rollback().await?;
            return Ok(None);
        }

        let sql = format!(
            r#"
            INSERT INTO appointments (id, reference_number, user_id, business_id, service_id,
                                      employee_id, scheduled_date, end_date, status,
                                      payment_status, total_amount, deposit_amount, deposit_paid,
                                      notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)
            RETURNING {}
            "#,
            APPOINTMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(appointment.id)
            .bind(&appointment.reference_number)
            .bind(appointment.user_id)
            .bind(appointment.business_id)
            .bind(appointment.service_id)
            .bind(appointment.employee_id)
            .bind(appointment.scheduled_date)
            .bind(appointment.end_date)
            .bind(appointment.status.as_str())
            .bind(appointment.payment_status.as_str())
            .bind(appointment.total_amount)
            .bind(appointment.deposit_amount)
            .bind(appointment.deposit_paid)
            .bind(&appointment.notes)
            .bind(appointment.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict("Appointment reference already in use".to_string())
                }
                _ => AppError::Database(e),
            })?;

        Self::insert_history(&mut tx, history).await?;
        tx.commit().await?;

        Ok(Some(row.into_appointment()))
    }

    async fn update_status(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
        history: &AppointmentStatusHistory,
        counter: Option<CustomerCounter>,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE appointments SET status = $2, updated_at = NOW() WHERE id = $1 AND status = $3",
        )
        .bind(appointment.id)
        .bind(appointment.status.as_str())
        .bind(expected.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some(counter) = counter {
            let column = counter.column();
            let sql = format!(
                "UPDATE users SET {col} = {col} + 1, updated_at = NOW() WHERE id = $1",
                col = column
            );
            sqlx::query(&sql)
                .bind(appointment.user_id)
                .execute(&mut *tx)
                .await?;
        }

        Self::insert_history(&mut tx, history).await?;
        tx.commit().await?;

        Ok(true)
    }

    async fn update_payment(
        &self,
        id: Uuid,
        payment_status: PaymentStatus,
        deposit_paid: bool,
        wompi_reference: Option<String>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE appointments
            SET payment_status = $2,
                deposit_paid = $3,
                wompi_reference = COALESCE($4, wompi_reference),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(payment_status.as_str())
        .bind(deposit_paid)
        .bind(wompi_reference)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Appointment with id {} not found", id)));
        }

        Ok(())
    }

    async fn history(&self, appointment_id: Uuid) -> Result<Vec<AppointmentStatusHistory>, AppError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, appointment_id, old_status, new_status, changed_by, reason, created_at
            FROM appointment_status_history
            WHERE appointment_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(appointment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_history()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_row_maps_initial_entry() {
        let row = HistoryRow {
            id: Uuid::now_v7(),
            appointment_id: Uuid::now_v7(),
            old_status: None,
            new_status: "Pending".into(),
            changed_by: "User".into(),
            reason: None,
            created_at: Utc::now(),
        };
        let history = row.into_history();
        assert_eq!(history.old_status, None);
        assert_eq!(history.new_status, AppointmentStatus::Pending);
        assert_eq!(history.changed_by, ChangedBy::User);
    }

    #[test]
    fn test_blocking_statuses_match_domain() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::NoShow,
        ] {
            assert!(status.blocks_booking());
            assert!(BLOCKING_STATUSES.contains(status.as_str()));
        }
        assert!(!BLOCKING_STATUSES.contains(AppointmentStatus::Cancelled.as_str()));
    }

    #[test]
    fn test_booking_lock_keys_are_sorted_and_unique() {
        let service = Uuid::now_v7();
        let employee = Uuid::now_v7();

        let keys = booking_lock_keys(service, Some(employee));
        assert_eq!(keys.len(), 2);
        assert!(keys[0] <= keys[1]);
        assert_eq!(keys, booking_lock_keys(service, Some(employee)));

        // Same pair in either role locks the same keys in the same order.
        assert_eq!(keys, booking_lock_keys(employee, Some(service)));

        assert_eq!(booking_lock_keys(service, None), vec![service.as_u128() as i64]);
        assert_eq!(booking_lock_keys(service, Some(service)).len(), 1);
    }

    #[test]
    fn test_customer_counter_columns() {
        assert_eq!(CustomerCounter::Completed.column(), "completed_appointments");
        assert_eq!(CustomerCounter::NoShow.column(), "no_show_count");
    }
}
