//! Business Repository Implementation
//!
//! PostgreSQL implementation of the BusinessRepository trait, covering the
//! `businesses`, `business_settings` and `business_images` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Business, BusinessImage, BusinessRepository, BusinessSearch, BusinessSettings, NoShowPolicy,
};
use crate::infrastructure::repositories::user_repository::like_pattern;
use crate::shared::error::AppError;

const BUSINESS_COLUMNS: &str = "id, owner_id, name, description, category, address, city, \
     department, country, phone, email, website, latitude, longitude, is_active, is_verified, \
     average_rating, total_reviews, created_at, updated_at";

const SETTINGS_COLUMNS: &str = "business_id, no_show_policy, max_advance_booking_days, \
     min_advance_booking_minutes, free_cancellation_hours, slot_duration, buffer_time, \
     working_hours, created_at, updated_at";

/// Database row representation matching the businesses table schema.
#[derive(Debug, sqlx::FromRow)]
struct BusinessRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    description: Option<String>,
    category: String,
    address: String,
    city: String,
    department: String,
    country: String,
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    is_active: bool,
    is_verified: bool,
    average_rating: Decimal,
    total_reviews: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BusinessRow {
    fn into_business(self) -> Business {
        Business {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            description: self.description,
            category: self.category,
            address: self.address,
            city: self.city,
            department: self.department,
            country: self.country,
            phone: self.phone,
            email: self.email,
            website: self.website,
            latitude: self.latitude,
            longitude: self.longitude,
            is_active: self.is_active,
            is_verified: self.is_verified,
            average_rating: self.average_rating,
            total_reviews: self.total_reviews,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SettingsRow {
    business_id: Uuid,
    no_show_policy: String,
    max_advance_booking_days: i32,
    min_advance_booking_minutes: i32,
    free_cancellation_hours: i32,
    slot_duration: i32,
    buffer_time: i32,
    working_hours: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SettingsRow {
    fn into_settings(self) -> BusinessSettings {
        BusinessSettings {
            business_id: self.business_id,
            no_show_policy: NoShowPolicy::from_str(&self.no_show_policy),
            max_advance_booking_days: self.max_advance_booking_days,
            min_advance_booking_minutes: self.min_advance_booking_minutes,
            free_cancellation_hours: self.free_cancellation_hours,
            slot_duration: self.slot_duration,
            buffer_time: self.buffer_time,
            working_hours: self.working_hours,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: Uuid,
    business_id: Uuid,
    image_data: Vec<u8>,
    content_type: String,
    created_at: DateTime<Utc>,
}

impl ImageRow {
    fn into_image(self) -> BusinessImage {
        BusinessImage {
            id: self.id,
            business_id: self.business_id,
            image_data: self.image_data,
            content_type: self.content_type,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL business repository implementation.
#[derive(Clone)]
pub struct PgBusinessRepository {
    pool: PgPool,
}

impl PgBusinessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_businesses(&self, filter: &str, arg: Option<&str>) -> Result<Vec<Business>, AppError> {
        let sql = format!(
            "SELECT {} FROM businesses {} ORDER BY name",
            BUSINESS_COLUMNS, filter
        );
        let mut query = sqlx::query_as::<_, BusinessRow>(&sql);
        if let Some(arg) = arg {
            query = query.bind(arg.to_string());
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(|r| r.into_business()).collect())
    }
}

#[async_trait]
impl BusinessRepository for PgBusinessRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Business>, AppError> {
        let sql = format!("SELECT {} FROM businesses WHERE id = $1", BUSINESS_COLUMNS);
        let row = sqlx::query_as::<_, BusinessRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_business()))
    }

    async fn find_active(&self) -> Result<Vec<Business>, AppError> {
        self.fetch_businesses("WHERE is_active", None).await
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Business>, AppError> {
        let sql = format!(
            "SELECT {} FROM businesses WHERE owner_id = $1 ORDER BY created_at DESC",
            BUSINESS_COLUMNS
        );
        let rows = sqlx::query_as::<_, BusinessRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.into_business()).collect())
    }

    async fn find_by_category(&self, category: &str) -> Result<Vec<Business>, AppError> {
        self.fetch_businesses(
            "WHERE is_active AND LOWER(category) = LOWER($1)",
            Some(category.trim()),
        )
        .await
    }

    async fn find_active_with_location(&self) -> Result<Vec<Business>, AppError> {
        self.fetch_businesses(
            "WHERE is_active AND latitude IS NOT NULL AND longitude IS NOT NULL",
            None,
        )
        .await
    }

    async fn search(&self, search: &BusinessSearch) -> Result<Vec<Business>, AppError> {
        let normalize = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let pattern = normalize(&search.query).map(|q| like_pattern(&q));

        let sql = format!(
            r#"
            SELECT {} FROM businesses
            WHERE is_active
              AND ($1::TEXT IS NULL
                   OR LOWER(name) LIKE $1
                   OR LOWER(COALESCE(description, '')) LIKE $1)
              AND ($2::TEXT IS NULL OR LOWER(city) = LOWER($2))
              AND ($3::TEXT IS NULL OR LOWER(category) = LOWER($3))
            ORDER BY name
            "#,
            BUSINESS_COLUMNS
        );
        let rows = sqlx::query_as::<_, BusinessRow>(&sql)
            .bind(pattern)
            .bind(normalize(&search.city))
            .bind(normalize(&search.category))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.into_business()).collect())
    }

    async fn categories(&self) -> Result<Vec<String>, AppError> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM businesses WHERE is_active ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn create(&self, business: &Business) -> Result<Business, AppError> {
        let sql = format!(
            r#"
            INSERT INTO businesses (id, owner_id, name, description, category, address, city,
                                    department, country, phone, email, website, latitude,
                                    longitude, is_active, is_verified, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)
            RETURNING {}
            "#,
            BUSINESS_COLUMNS
        );
        let row = sqlx::query_as::<_, BusinessRow>(&sql)
            .bind(business.id)
            .bind(business.owner_id)
            .bind(&business.name)
            .bind(&business.description)
            .bind(&business.category)
            .bind(&business.address)
            .bind(&business.city)
            .bind(&business.department)
            .bind(&business.country)
            .bind(&business.phone)
            .bind(&business.email)
            .bind(&business.website)
            .bind(business.latitude)
            .bind(business.longitude)
            .bind(business.is_active)
            .bind(business.is_verified)
            .bind(business.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into_business())
    }

    async fn update(&self, business: &Business) -> Result<Business, AppError> {
        let sql = format!(
            r#"
            UPDATE businesses
            SET name = $2,
                description = $3,
                category = $4,
                address = $5,
                city = $6,
                department = $7,
                country = $8,
                phone = $9,
                email = $10,
                website = $11,
                latitude = $12,
                longitude = $13,
                is_active = $14,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BUSINESS_COLUMNS
        );
        let row = sqlx::query_as::<_, BusinessRow>(&sql)
            .bind(business.id)
            .bind(&business.name)
            .bind(&business.description)
            .bind(&business.category)
            .bind(&business.address)
            .bind(&business.city)
            .bind(&business.department)
            .bind(&business.country)
            .bind(&business.phone)
            .bind(&business.email)
            .bind(&business.website)
            .bind(business.latitude)
            .bind(business.longitude)
            .bind(business.is_active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Business with id {} not found", business.id)))?;

        Ok(row.into_business())
    }

    async fn delete_cascade(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Children first, in foreign-key order
        let statements = [
            "DELETE FROM appointment_status_history WHERE appointment_id IN \
             (SELECT id FROM appointments WHERE business_id = $1)",
            "DELETE FROM wompi_transactions WHERE appointment_id IN \
             (SELECT id FROM appointments WHERE business_id = $1)",
            "DELETE FROM appointments WHERE business_id = $1",
            "DELETE FROM business_settings WHERE business_id = $1",
            "DELETE FROM services WHERE business_id = $1",
            "DELETE FROM employee_schedules WHERE employee_id IN \
             (SELECT id FROM employees WHERE business_id = $1)",
            "DELETE FROM employees WHERE business_id = $1",
            "DELETE FROM business_images WHERE business_id = $1",
            "DELETE FROM business_schedules WHERE business_id = $1",
        ];
        for statement in statements {
            sqlx::query(statement).bind(id).execute(&mut *tx).await?;
        }

        let result = sqlx::query("DELETE FROM businesses WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Business with id {} not found", id)));
        }

        tx.commit().await?;

        Ok(())
    }

    async fn find_settings(&self, business_id: Uuid) -> Result<Option<BusinessSettings>, AppError> {
        let sql = format!(
            "SELECT {} FROM business_settings WHERE business_id = $1",
            SETTINGS_COLUMNS
        );
        let row = sqlx::query_as::<_, SettingsRow>(&sql)
            .bind(business_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_settings()))
    }

    async fn upsert_settings(&self, settings: &BusinessSettings) -> Result<BusinessSettings, AppError> {
        let sql = format!(
            r#"
            INSERT INTO business_settings (business_id, no_show_policy, max_advance_booking_days,
                                           min_advance_booking_minutes, free_cancellation_hours,
                                           slot_duration, buffer_time, working_hours)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (business_id) DO UPDATE
            SET no_show_policy = EXCLUDED.no_show_policy,
                max_advance_booking_days = EXCLUDED.max_advance_booking_days,
                min_advance_booking_minutes = EXCLUDED.min_advance_booking_minutes,
                free_cancellation_hours = EXCLUDED.free_cancellation_hours,
                slot_duration = EXCLUDED.slot_duration,
                buffer_time = EXCLUDED.buffer_time,
                working_hours = EXCLUDED.working_hours,
                updated_at = NOW()
            RETURNING {}
            "#,
            SETTINGS_COLUMNS
        );
        let row = sqlx::query_as::<_, SettingsRow>(&sql)
            .bind(settings.business_id)
            .bind(settings.no_show_policy.as_str())
            .bind(settings.max_advance_booking_days)
            .bind(settings.min_advance_booking_minutes)
            .bind(settings.free_cancellation_hours)
            .bind(settings.slot_duration)
            .bind(settings.buffer_time)
            .bind(&settings.working_hours)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into_settings())
    }

    async fn replace_images(
        &self,
        business_id: Uuid,
        images: Vec<BusinessImage>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM business_images WHERE business_id = $1")
            .bind(business_id)
            .execute(&mut *tx)
            .await?;

        for image in images {
            sqlx::query(
                r#"
                INSERT INTO business_images (id, business_id, image_data, content_type, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(image.id)
            .bind(business_id)
            .bind(image.image_data)
            .bind(image.content_type)
            .bind(image.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn first_images(&self, business_ids: Vec<Uuid>) -> Result<Vec<BusinessImage>, AppError> {
        if business_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT DISTINCT ON (business_id) id, business_id, image_data, content_type, created_at
            FROM business_images
            WHERE business_id = ANY($1)
            ORDER BY business_id, created_at, id
            "#,
        )
        .bind(&business_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_image()).collect())
    }
}
