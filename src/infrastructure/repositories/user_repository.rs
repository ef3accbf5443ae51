//! User Repository Implementation
//!
//! PostgreSQL implementation of the UserRepository trait.
//! Maps between the database schema and domain User entity.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{User, UserRepository, UserRole, UserSearch};
use crate::shared::error::AppError;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone_number, phone, \
     photo_url, date_of_birth, gender, role, is_email_verified, is_active, is_blocked, \
     block_reason, block_until, average_rating, completed_appointments, no_show_count, \
     last_login, created_at, updated_at";

/// Database row representation matching the users table schema.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone_number: Option<String>,
    phone: Option<String>,
    photo_url: Option<String>,
    date_of_birth: Option<NaiveDate>,
    gender: Option<String>,
    role: String,
    is_email_verified: bool,
    is_active: bool,
    is_blocked: bool,
    block_reason: Option<String>,
    block_until: Option<DateTime<Utc>>,
    average_rating: Decimal,
    completed_appointments: i32,
    no_show_count: i32,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert database row to domain User entity.
    fn into_user(self) -> User {
        User {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            phone: self.phone,
            photo_url: self.photo_url,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            role: UserRole::from_str(&self.role),
            is_email_verified: self.is_email_verified,
            is_active: self.is_active,
            is_blocked: self.is_blocked,
            block_reason: self.block_reason,
            block_until: self.block_until,
            average_rating: self.average_rating,
            completed_appointments: self.completed_appointments,
            no_show_count: self.no_show_count,
            last_login: self.last_login,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escape LIKE wildcards in user input.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped.to_lowercase())
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_user()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_user()))
    }

    async fn create(&self, user: &User) -> Result<User, AppError> {
        let sql = format!(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, phone_number,
                               phone, role, is_email_verified, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone_number)
            .bind(&user.phone)
            .bind(user.role.as_str())
            .bind(user.is_email_verified)
            .bind(user.is_active)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict("El email ya está registrado".to_string())
                }
                _ => AppError::Database(e),
            })?;

        Ok(row.into_user())
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        let sql = format!(
            r#"
            UPDATE users
            SET first_name = $2,
                last_name = $3,
                phone_number = $4,
                phone = $5,
                photo_url = $6,
                date_of_birth = $7,
                gender = $8,
                role = $9,
                is_active = $10,
                is_blocked = $11,
                block_reason = $12,
                block_until = $13,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone_number)
            .bind(&user.phone)
            .bind(&user.photo_url)
            .bind(user.date_of_birth)
            .bind(&user.gender)
            .bind(user.role.as_str())
            .bind(user.is_active)
            .bind(user.is_blocked)
            .bind(&user.block_reason)
            .bind(user.block_until)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user.id)))?;

        Ok(row.into_user())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        Ok(())
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(email.trim().to_lowercase())
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn search(&self, search: &UserSearch) -> Result<(Vec<User>, i64), AppError> {
        let pattern = search
            .term
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(like_pattern);
        let role = search.role.map(|r| r.as_str());

        let filter = r#"
            WHERE ($1::TEXT IS NULL
                   OR LOWER(email) LIKE $1
                   OR LOWER(first_name) LIKE $1
                   OR LOWER(last_name) LIKE $1)
              AND ($2::TEXT IS NULL OR role = $2)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM users {}", filter))
            .bind(&pattern)
            .bind(role)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM users {} ORDER BY email LIMIT $3 OFFSET $4",
            USER_COLUMNS, filter
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&pattern)
            .bind(role)
            .bind(search.limit)
            .bind(search.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(|r| r.into_user()).collect(), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Ana"), "%ana%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_row_maps_role() {
        let now = Utc::now();
        let row = UserRow {
            id: Uuid::now_v7(),
            email: "owner@example.com".into(),
            password_hash: "h".into(),
            first_name: "Luis".into(),
            last_name: "Gómez".into(),
            phone_number: None,
            phone: None,
            photo_url: None,
            date_of_birth: None,
            gender: None,
            role: "BusinessOwner".into(),
            is_email_verified: false,
            is_active: true,
            is_blocked: false,
            block_reason: None,
            block_until: None,
            average_rating: Decimal::ZERO,
            completed_appointments: 3,
            no_show_count: 1,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        let user = row.into_user();
        assert_eq!(user.role, UserRole::BusinessOwner);
        assert_eq!(user.completed_appointments, 3);
    }
}
