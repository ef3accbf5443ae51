//! Admin Service
//!
//! User management for administrators: search, moderation and roles.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::application::dto::request::{SearchUsersQuery, UpdateUserStatusRequest};
use crate::domain::{User, UserRepository, UserRole, UserSearch};
use crate::shared::error::AppError;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// One page of an admin user search
#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
}

impl UserPage {
    pub fn total_pages(&self) -> i64 {
        if self.page_size <= 0 {
            return 0;
        }
        (self.total_count + self.page_size - 1) / self.page_size
    }
}

/// Normalize requested paging: page below 1 becomes 1, a size outside
/// `1..=100` becomes the default.
pub fn normalize_paging(page: Option<i64>, page_size: Option<i64>) -> (i64, i64) {
    let page = page.filter(|p| *p >= 1).unwrap_or(1);
    let page_size = page_size
        .filter(|s| (1..=MAX_PAGE_SIZE).contains(s))
        .unwrap_or(DEFAULT_PAGE_SIZE);
    (page, page_size)
}

#[async_trait]
pub trait AdminService: Send + Sync {
    async fn list_users(&self, query: &SearchUsersQuery) -> Result<UserPage, AdminError>;

    async fn get_user(&self, user_id: Uuid) -> Result<User, AdminError>;

    /// Block or unblock an account
    async fn set_status(
        &self,
        user_id: Uuid,
        request: UpdateUserStatusRequest,
    ) -> Result<User, AdminError>;

    async fn set_role(&self, user_id: Uuid, role: &str) -> Result<User, AdminError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Usuario no encontrado")]
    NotFound,

    #[error("Rol inválido")]
    InvalidRole,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AdminError> for AppError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::NotFound => AppError::NotFound(err.to_string()),
            AdminError::InvalidRole => AppError::BadRequest(err.to_string()),
            AdminError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

pub struct AdminServiceImpl<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
}

impl<U> AdminServiceImpl<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }
}

#[async_trait]
impl<U> AdminService for AdminServiceImpl<U>
where
    U: UserRepository + 'static,
{
    async fn list_users(&self, query: &SearchUsersQuery) -> Result<UserPage, AdminError> {
        let (page, page_size) = normalize_paging(query.page, query.page_size);
        let role = match query.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(role) => Some(UserRole::parse(role).ok_or(AdminError::InvalidRole)?),
            None => None,
        };

        let search = UserSearch {
            term: query
                .search_term
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from),
            role,
            limit: page_size,
            offset: (page - 1) * page_size,
        };

        let (users, total_count) = self
            .user_repo
            .search(&search)
            .await
            .map_err(|e| AdminError::Internal(e.to_string()))?;

        Ok(UserPage {
            users,
            total_count,
            page,
            page_size,
        })
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User, AdminError> {
        self.user_repo
            .find_by_id(user_id)
            .await
            .map_err(|e| AdminError::Internal(e.to_string()))?
            .ok_or(AdminError::NotFound)
    }

    async fn set_status(
        &self,
        user_id: Uuid,
        request: UpdateUserStatusRequest,
    ) -> Result<User, AdminError> {
        let mut user = self.get_user(user_id).await?;

        user.is_blocked = request.is_blocked;
        if request.is_blocked {
            user.block_reason = request
                .block_reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());
            user.block_until = request.block_until;
        } else {
            user.block_reason = None;
            user.block_until = None;
        }
        user.updated_at = Utc::now();

        let updated = self
            .user_repo
            .update(&user)
            .await
            .map_err(|e| AdminError::Internal(e.to_string()))?;

        info!(user_id = %user_id, blocked = updated.is_blocked, "User status changed by admin");
        Ok(updated)
    }

    async fn set_role(&self, user_id: Uuid, role: &str) -> Result<User, AdminError> {
        let role = UserRole::parse(role).ok_or(AdminError::InvalidRole)?;
        let mut user = self.get_user(user_id).await?;
        user.role = role;
        user.updated_at = Utc::now();

        self.user_repo
            .update(&user)
            .await
            .map_err(|e| AdminError::Internal(e.to_string()))
    }
}
