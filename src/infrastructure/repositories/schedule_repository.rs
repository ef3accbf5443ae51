//! Schedule Repository Implementation
//!
//! One PostgreSQL implementation serves both `business_schedules` and
//! `employee_schedules`; the [`ScheduleScope`] picks the table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Schedule, ScheduleRepository, ScheduleScope, WorkingDay};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct ScheduleRow {
    owner_id: Uuid,
    appointment_duration: i32,
    working_days: Json<Vec<WorkingDay>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ScheduleRow {
    fn into_schedule(self) -> Schedule {
        Schedule {
            owner_id: self.owner_id,
            appointment_duration: self.appointment_duration,
            working_days: self.working_days.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL schedule repository for one scope.
#[derive(Clone)]
pub struct PgScheduleRepository {
    pool: PgPool,
    scope: ScheduleScope,
}

impl PgScheduleRepository {
    pub fn new(pool: PgPool, scope: ScheduleScope) -> Self {
        Self { pool, scope }
    }

    pub fn business(pool: PgPool) -> Self {
        Self::new(pool, ScheduleScope::Business)
    }

    pub fn employee(pool: PgPool) -> Self {
        Self::new(pool, ScheduleScope::Employee)
    }

    fn returning(&self) -> String {
        format!(
            "{} AS owner_id, appointment_duration, working_days, created_at, updated_at",
            self.scope.owner_column()
        )
    }
}

#[async_trait]
impl ScheduleRepository for PgScheduleRepository {
    async fn find(&self, owner_id: Uuid) -> Result<Option<Schedule>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1",
            self.returning(),
            self.scope.table(),
            self.scope.owner_column()
        );
        let row = sqlx::query_as::<_, ScheduleRow>(&sql)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_schedule()))
    }

    async fn create(&self, schedule: &Schedule) -> Result<Schedule, AppError> {
        let sql = format!(
            r#"
            INSERT INTO {table} ({owner}, appointment_duration, working_days, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING {returning}
            "#,
            table = self.scope.table(),
            owner = self.scope.owner_column(),
            returning = self.returning()
        );
        let row = sqlx::query_as::<_, ScheduleRow>(&sql)
            .bind(schedule.owner_id)
            .bind(schedule.appointment_duration)
            .bind(Json(&schedule.working_days))
            .bind(schedule.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict("Ya existe un horario registrado".to_string())
                }
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::NotFound(self.scope.missing_message().to_string())
                }
                _ => AppError::Database(e),
            })?;

        Ok(row.into_schedule())
    }

    async fn update(&self, schedule: &Schedule) -> Result<Schedule, AppError> {
        let sql = format!(
            r#"
            UPDATE {table}
            SET appointment_duration = $2,
                working_days = $3,
                updated_at = NOW()
            WHERE {owner} = $1
            RETURNING {returning}
            "#,
            table = self.scope.table(),
            owner = self.scope.owner_column(),
            returning = self.returning()
        );
        let row = sqlx::query_as::<_, ScheduleRow>(&sql)
            .bind(schedule.owner_id)
            .bind(schedule.appointment_duration)
            .bind(Json(&schedule.working_days))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(self.scope.missing_message().to_string()))?;

        Ok(row.into_schedule())
    }

    async fn delete(&self, owner_id: Uuid) -> Result<(), AppError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            self.scope.table(),
            self.scope.owner_column()
        );
        sqlx::query(&sql).bind(owner_id).execute(&self.pool).await?;

        Ok(())
    }
}
