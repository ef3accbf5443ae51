//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Account role matching the `users.role` VARCHAR column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserRole {
    #[default]
    Customer,
    BusinessOwner,
    Employee,
    Admin,
}

impl UserRole {
    /// Parse a role name. `Owner` is accepted as an alias of `BusinessOwner`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Some(Self::Customer),
            "businessowner" | "owner" => Some(Self::BusinessOwner),
            "employee" => Some(Self::Employee),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::BusinessOwner => "BusinessOwner",
            Self::Employee => "Employee",
            Self::Admin => "Admin",
        }
    }

    /// Roles a user may pick for themselves at registration.
    pub fn is_self_service(&self) -> bool {
        matches!(self, Self::Customer | Self::BusinessOwner)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a user account (customer, business owner, employee or admin).
///
/// Maps to the `users` table:
/// - id: UUID PRIMARY KEY
/// - email: VARCHAR(100) NOT NULL UNIQUE (stored lowercase)
/// - password_hash: VARCHAR(255) NOT NULL
/// - role: VARCHAR(20) NOT NULL DEFAULT 'Customer'
/// - is_blocked / block_reason / block_until: admin moderation
/// - average_rating, completed_appointments, no_show_count: booking reputation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    pub email: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,

    #[serde(default)]
    pub role: UserRole,

    pub is_email_verified: bool,
    pub is_active: bool,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub block_until: Option<DateTime<Utc>>,

    pub average_rating: Decimal,
    pub completed_appointments: i32,
    pub no_show_count: i32,

    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active account with the given credentials.
    pub fn new(
        email: &str,
        password_hash: String,
        first_name: &str,
        last_name: &str,
        role: UserRole,
    ) -> Self {
        Self {
            email: email.trim().to_lowercase(),
            password_hash,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            role,
            ..Self::default()
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// A block is in force when flagged and either open-ended or not yet lapsed.
    pub fn is_blocked_at(&self, now: DateTime<Utc>) -> bool {
        self.is_blocked && self.block_until.map_or(true, |until| until > now)
    }

    /// Whether the account may sign in.
    pub fn can_login(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_blocked_at(now)
    }
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email: String::new(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: None,
            phone: None,
            photo_url: None,
            date_of_birth: None,
            gender: None,
            role: UserRole::default(),
            is_email_verified: false,
            is_active: true,
            is_blocked: false,
            block_reason: None,
            block_until: None,
            average_rating: Decimal::ZERO,
            completed_appointments: 0,
            no_show_count: 0,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filters for the admin user search.
#[derive(Debug, Clone, Default)]
pub struct UserSearch {
    /// Case-insensitive match against email, first and last name
    pub term: Option<String>,
    pub role: Option<UserRole>,
    pub limit: i64,
    pub offset: i64,
}

/// Repository trait for User data access operations.
///
/// The trait is defined in the domain layer to maintain dependency inversion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Find a user by email (compared lowercase).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn create(&self, user: &User) -> Result<User, AppError>;

    /// Persist profile, role and moderation fields.
    async fn update(&self, user: &User) -> Result<User, AppError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError>;

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    /// Page of users plus the total number of matches.
    async fn search(&self, search: &UserSearch) -> Result<(Vec<User>, i64), AppError>;
}
