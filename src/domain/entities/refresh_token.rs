//! Refresh token entity and repository trait.
//!
//! Maps to the `refresh_tokens` table. Only the SHA-256 hash of the opaque
//! token handed to clients is stored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// A long-lived token that lets a client obtain new access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,

    /// SHA-256 hex digest of the token value
    #[serde(skip_serializing)]
    pub token_hash: String,

    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn new(user_id: Uuid, token_hash: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            token_hash,
            expires_at,
            revoked_at: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn create(&self, token: &RefreshToken) -> Result<RefreshToken, AppError>;

    /// Spend a live token of `user_id` in one conditional update.
    ///
    /// Returns `false` when no unrevoked, unexpired token with this hash
    /// belongs to the user, including when a concurrent call spent it first.
    async fn consume(&self, token_hash: &str, user_id: Uuid) -> Result<bool, AppError>;

    /// Revoke every live token of a user, returning how many were revoked.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_token_starts_unrevoked() {
        let expires_at = Utc::now() + Duration::days(7);
        let token = RefreshToken::new(Uuid::now_v7(), "h".into(), expires_at);
        assert!(token.revoked_at.is_none());
        assert_eq!(token.expires_at, expires_at);
    }
}
