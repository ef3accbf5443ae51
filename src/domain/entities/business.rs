//! Business entity, its settings and images, and the repository trait.
//!
//! Maps to the `businesses`, `business_settings` and `business_images` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{GeoPoint, WorkingHours};
use crate::shared::error::AppError;

/// A merchant offering bookable services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub address: String,
    pub city: String,
    pub department: String,
    /// ISO country code, "CO" unless stated otherwise
    pub country: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
    pub is_verified: bool,
    pub average_rating: Decimal,
    pub total_reviews: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Business {
    pub fn new(owner_id: Uuid, name: &str, category: &str) -> Self {
        Self {
            owner_id,
            name: name.trim().to_string(),
            category: category.trim().to_string(),
            ..Self::default()
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }
}

impl Default for Business {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            owner_id: Uuid::nil(),
            name: String::new(),
            description: None,
            category: String::new(),
            address: String::new(),
            city: String::new(),
            department: String::new(),
            country: "CO".to_string(),
            phone: None,
            email: None,
            website: None,
            latitude: None,
            longitude: None,
            is_active: true,
            is_verified: false,
            average_rating: Decimal::ZERO,
            total_reviews: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Picture attached to a business, stored inline.
#[derive(Debug, Clone)]
pub struct BusinessImage {
    pub id: Uuid,
    pub business_id: Uuid,
    pub image_data: Vec<u8>,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

impl BusinessImage {
    pub fn new(business_id: Uuid, image_data: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            business_id,
            image_data,
            content_type: content_type.into(),
            created_at: Utc::now(),
        }
    }
}

/// What happens when a customer does not show up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NoShowPolicy {
    #[default]
    None,
    Block,
    Deposit,
}

impl NoShowPolicy {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "block" => Self::Block,
            "deposit" => Self::Deposit,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Block => "Block",
            Self::Deposit => "Deposit",
        }
    }
}

impl std::fmt::Display for NoShowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Booking rules of a business (1:1 with `Business`).
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessSettings {
    pub business_id: Uuid,
    pub no_show_policy: NoShowPolicy,
    pub max_advance_booking_days: i32,
    pub min_advance_booking_minutes: i32,
    pub free_cancellation_hours: i32,
    pub slot_duration: i32,
    pub buffer_time: i32,
    /// Raw JSON document in the `WorkingHours` shape
    pub working_hours: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BusinessSettings {
    /// Settings a business gets before its owner saves any.
    pub fn defaults_for(business_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            business_id,
            no_show_policy: NoShowPolicy::None,
            max_advance_booking_days: 90,
            min_advance_booking_minutes: 60,
            free_cancellation_hours: 24,
            slot_duration: 30,
            buffer_time: 15,
            working_hours: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn requires_deposit(&self) -> bool {
        self.no_show_policy == NoShowPolicy::Deposit
    }

    /// Parsed working hours; `Ok(None)` when none were saved.
    pub fn parsed_working_hours(&self) -> Result<Option<WorkingHours>, serde_json::Error> {
        match self.working_hours.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(json) => WorkingHours::from_json(json).map(Some),
        }
    }
}

/// Free-text search over active businesses.
#[derive(Debug, Clone, Default)]
pub struct BusinessSearch {
    /// Contained in name or description, case-insensitive
    pub query: Option<String>,
    /// Exact city, case-insensitive
    pub city: Option<String>,
    /// Exact category, case-insensitive
    pub category: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BusinessRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Business>, AppError>;

    async fn find_active(&self) -> Result<Vec<Business>, AppError>;

    /// All businesses of an owner, inactive ones included.
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Business>, AppError>;

    async fn find_by_category(&self, category: &str) -> Result<Vec<Business>, AppError>;

    /// Active businesses that have coordinates.
    async fn find_active_with_location(&self) -> Result<Vec<Business>, AppError>;

    async fn search(&self, search: &BusinessSearch) -> Result<Vec<Business>, AppError>;

    /// Distinct categories of active businesses, sorted.
    async fn categories(&self) -> Result<Vec<String>, AppError>;

    async fn create(&self, business: &Business) -> Result<Business, AppError>;

    async fn update(&self, business: &Business) -> Result<Business, AppError>;

    /// Delete the business and everything hanging off it in one transaction.
    async fn delete_cascade(&self, id: Uuid) -> Result<(), AppError>;

    async fn find_settings(&self, business_id: Uuid) -> Result<Option<BusinessSettings>, AppError>;

    async fn upsert_settings(&self, settings: &BusinessSettings) -> Result<BusinessSettings, AppError>;

    /// Swap the image set of a business.
    async fn replace_images(
        &self,
        business_id: Uuid,
        images: Vec<BusinessImage>,
    ) -> Result<(), AppError>;

    /// Oldest image of each of the given businesses.
    async fn first_images(
        &self,
        business_ids: Vec<Uuid>,
    ) -> Result<Vec<BusinessImage>, AppError>;
}
