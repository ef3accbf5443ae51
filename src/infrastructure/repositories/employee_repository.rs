//! Employee Repository Implementation
//!
//! PostgreSQL implementation of the EmployeeRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Employee, EmployeeRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    id: Uuid,
    business_id: Uuid,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    email: Option<String>,
    position: Option<String>,
    bio: Option<String>,
    profile_picture_url: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EmployeeRow {
    fn into_employee(self) -> Employee {
        Employee {
            id: self.id,
            business_id: self.business_id,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            email: self.email,
            position: self.position,
            bio: self.bio,
            profile_picture_url: self.profile_picture_url,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL employee repository implementation.
#[derive(Clone)]
pub struct PgEmployeeRepository {
    pool: PgPool,
}

impl PgEmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeRepository for PgEmployeeRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>, AppError> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, business_id, first_name, last_name, phone, email, position, bio,
                   profile_picture_url, is_active, created_at, updated_at
            FROM employees
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_employee()))
    }

    async fn find_by_business(&self, business_id: Uuid) -> Result<Vec<Employee>, AppError> {
        let rows = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, business_id, first_name, last_name, phone, email, position, bio,
                   profile_picture_url, is_active, created_at, updated_at
            FROM employees
            WHERE business_id = $1
            ORDER BY first_name, last_name
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_employee()).collect())
    }

    async fn create(&self, employee: &Employee) -> Result<Employee, AppError> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            INSERT INTO employees (id, business_id, first_name, last_name, phone, email, position,
                                   bio, profile_picture_url, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING id, business_id, first_name, last_name, phone, email, position, bio,
                      profile_picture_url, is_active, created_at, updated_at
            "#,
        )
        .bind(employee.id)
        .bind(employee.business_id)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.phone)
        .bind(&employee.email)
        .bind(&employee.position)
        .bind(&employee.bio)
        .bind(&employee.profile_picture_url)
        .bind(employee.is_active)
        .bind(employee.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_employee())
    }

    async fn update(&self, employee: &Employee) -> Result<Employee, AppError> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            UPDATE employees
            SET first_name = $2,
                last_name = $3,
                phone = $4,
                email = $5,
                position = $6,
                bio = $7,
                profile_picture_url = $8,
                is_active = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, business_id, first_name, last_name, phone, email, position, bio,
                      profile_picture_url, is_active, created_at, updated_at
            "#,
        )
        .bind(employee.id)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.phone)
        .bind(&employee.email)
        .bind(&employee.position)
        .bind(&employee.bio)
        .bind(&employee.profile_picture_url)
        .bind(employee.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee with id {} not found", employee.id)))?;

        Ok(row.into_employee())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM employee_schedules WHERE employee_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict("El empleado tiene citas asociadas".to_string())
                }
                _ => AppError::Database(e),
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Employee with id {} not found", id)));
        }

        tx.commit().await?;

        Ok(())
    }
}
