//! Employee entity and repository trait.
//!
//! Maps to the `employees` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// A staff member of one business who can be picked when booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub business_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn new(business_id: Uuid, first_name: &str, last_name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            business_id,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            phone: None,
            email: None,
            position: None,
            bio: None,
            profile_picture_url: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Whether this employee can take bookings for the business.
    pub fn works_for(&self, business_id: Uuid) -> bool {
        self.business_id == business_id && self.is_active
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>, AppError>;

    async fn find_by_business(&self, business_id: Uuid) -> Result<Vec<Employee>, AppError>;

    async fn create(&self, employee: &Employee) -> Result<Employee, AppError>;

    async fn update(&self, employee: &Employee) -> Result<Employee, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}
