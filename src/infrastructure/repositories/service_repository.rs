//! Service Repository Implementation
//!
//! PostgreSQL implementation of the ServiceRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Service, ServiceRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: Uuid,
    business_id: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    duration_minutes: i32,
    requires_deposit: bool,
    deposit_amount: Option<Decimal>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ServiceRow {
    fn into_service(self) -> Service {
        Service {
            id: self.id,
            business_id: self.business_id,
            name: self.name,
            description: self.description,
            price: self.price,
            duration_minutes: self.duration_minutes,
            requires_deposit: self.requires_deposit,
            deposit_amount: self.deposit_amount,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL service repository implementation.
#[derive(Clone)]
pub struct PgServiceRepository {
    pool: PgPool,
}

impl PgServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceRepository for PgServiceRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Service>, AppError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT id, business_id, name, description, price, duration_minutes,
                   requires_deposit, deposit_amount, is_active, created_at, updated_at
            FROM services
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_service()))
    }

    async fn find_by_business(&self, business_id: Uuid) -> Result<Vec<Service>, AppError> {
        let rows = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT id, business_id, name, description, price, duration_minutes,
                   requires_deposit, deposit_amount, is_active, created_at, updated_at
            FROM services
            WHERE business_id = $1
            ORDER BY name
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_service()).collect())
    }

    async fn create(&self, service: &Service) -> Result<Service, AppError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            INSERT INTO services (id, business_id, name, description, price, duration_minutes,
                                  requires_deposit, deposit_amount, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING id, business_id, name, description, price, duration_minutes,
                      requires_deposit, deposit_amount, is_active, created_at, updated_at
            "#,
        )
        .bind(service.id)
        .bind(service.business_id)
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.price)
        .bind(service.duration_minutes)
        .bind(service.requires_deposit)
        .bind(service.deposit_amount)
        .bind(service.is_active)
        .bind(service.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_service())
    }

    async fn update(&self, service: &Service) -> Result<Service, AppError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            UPDATE services
            SET name = $2,
                description = $3,
                price = $4,
                duration_minutes = $5,
                requires_deposit = $6,
                deposit_amount = $7,
                is_active = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, business_id, name, description, price, duration_minutes,
                      requires_deposit, deposit_amount, is_active, created_at, updated_at
            "#,
        )
        .bind(service.id)
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.price)
        .bind(service.duration_minutes)
        .bind(service.requires_deposit)
        .bind(service.deposit_amount)
        .bind(service.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Service with id {} not found", service.id)))?;

        Ok(row.into_service())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict("El servicio tiene citas asociadas".to_string())
                }
                _ => AppError::Database(e),
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Service with id {} not found", id)));
        }

        Ok(())
    }
}
