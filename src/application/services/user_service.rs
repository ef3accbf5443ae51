//! User Service
//!
//! Profile reads and edits for the signed-in user.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::auth_service::{hash_password, verify_password};
use crate::application::dto::request::{ChangePasswordRequest, UpdateProfileRequest};
use crate::domain::{User, UserRepository};
use crate::shared::error::AppError;

/// Minimum length accepted for a new password.
const MIN_PASSWORD_LENGTH: usize = 8;

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> Result<User, UserError>;

    /// Apply the non-blank fields of `update`
    async fn update_profile(
        &self,
        user_id: Uuid,
        update: UpdateProfileRequest,
    ) -> Result<User, UserError>;

    async fn change_password(
        &self,
        user_id: Uuid,
        request: &ChangePasswordRequest,
    ) -> Result<(), UserError>;
}

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Usuario no encontrado")]
    NotFound,

    #[error("Las contraseñas nuevas no coinciden")]
    PasswordMismatch,

    #[error("La nueva contraseña debe tener al menos 8 caracteres")]
    PasswordTooShort,

    #[error("La contraseña actual es incorrecta")]
    WrongCurrentPassword,

    #[error("La nueva contraseña debe ser diferente a la actual")]
    PasswordUnchanged,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => AppError::NotFound(err.to_string()),
            UserError::Internal(msg) => AppError::Internal(msg),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

/// Trimmed value, or `None` when blank.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// UserService implementation
pub struct UserServiceImpl<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
}

impl<U> UserServiceImpl<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }
}

#[async_trait]
impl<U> UserService for UserServiceImpl<U>
where
    U: UserRepository + 'static,
{
    async fn get_profile(&self, user_id: Uuid) -> Result<User, UserError> {
        self.user_repo
            .find_by_id(user_id)
            .await
            .map_err(|e| UserError::Internal(e.to_string()))?
            .ok_or(UserError::NotFound)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: UpdateProfileRequest,
    ) -> Result<User, UserError> {
        let mut user = self.get_profile(user_id).await?;

        if let Some(first_name) = non_blank(update.first_name) {
            user.first_name = first_name;
        }
        if let Some(last_name) = non_blank(update.last_name) {
            user.last_name = last_name;
        }
        if let Some(phone_number) = non_blank(update.phone_number) {
            user.phone_number = Some(phone_number);
        }
        if let Some(phone) = non_blank(update.phone) {
            user.phone = Some(phone);
        }
        if let Some(photo_url) = non_blank(update.photo_url) {
            user.photo_url = Some(photo_url);
        }
        if let Some(date_of_birth) = update.date_of_birth {
            user.date_of_birth = Some(date_of_birth);
        }
        if let Some(gender) = non_blank(update.gender) {
            user.gender = Some(gender);
        }
        user.updated_at = Utc::now();

        self.user_repo
            .update(&user)
            .await
            .map_err(|e| UserError::Internal(e.to_string()))
    }

    async fn change_password(
        &self,
        user_id: Uuid,
        request: &ChangePasswordRequest,
    ) -> Result<(), UserError> {
        if request.new_password != request.confirm_password {
            return Err(UserError::PasswordMismatch);
        }
        if request.new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(UserError::PasswordTooShort);
        }

        let user = self.get_profile(user_id).await?;
        if !verify_password(&request.current_password, &user.password_hash)
            .map_err(UserError::Internal)?
        {
            return Err(UserError::WrongCurrentPassword);
        }
        if request.current_password == request.new_password {
            return Err(UserError::PasswordUnchanged);
        }

        let hash = hash_password(&request.new_password).map_err(UserError::Internal)?;
        self.user_repo
            .update_password(user_id, &hash)
            .await
            .map_err(|e| UserError::Internal(e.to_string()))?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockUserRepository, UserRole};
    use chrono::NaiveDate;

    fn existing_user() -> User {
        let mut user = User::new(
            "ana@example.com",
            hash_password("Actual#2024").unwrap(),
            "Ana",
            "Pérez",
            UserRole::Customer,
        );
        user.phone = Some("3001234567".into());
        user
    }

    fn password_request(current: &str, new: &str, confirm: &str) -> ChangePasswordRequest {
        ChangePasswordRequest {
            current_password: current.into(),
            new_password: new.into(),
            confirm_password: confirm.into(),
        }
    }

    #[tokio::test]
    async fn test_update_profile_ignores_blank_fields() {
        let user = existing_user();
        let id = user.id;
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        repo.expect_update().returning(|u| Ok(u.clone()));

        let update = UpdateProfileRequest {
            first_name: Some("  Andrea ".into()),
            last_name: Some("   ".into()),
            phone: Some(String::new()),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 1),
            ..Default::default()
        };
        let updated = UserServiceImpl::new(Arc::new(repo))
            .update_profile(id, update)
            .await
            .unwrap();

        assert_eq!(updated.first_name, "Andrea");
        assert_eq!(updated.last_name, "Pérez");
        assert_eq!(updated.phone.as_deref(), Some("3001234567"));
        assert_eq!(updated.date_of_birth, NaiveDate::from_ymd_opt(1990, 5, 1));
    }

    #[tokio::test]
    async fn test_change_password_mismatch() {
        let err = UserServiceImpl::new(Arc::new(MockUserRepository::new()))
            .change_password(Uuid::now_v7(), &password_request("Actual#2024", "Nueva#2024", "Otra#2024"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Las contraseñas nuevas no coinciden");
    }

    #[tokio::test]
    async fn test_change_password_too_short() {
        let err = UserServiceImpl::new(Arc::new(MockUserRepository::new()))
            .change_password(Uuid::now_v7(), &password_request("Actual#2024", "Ab#1", "Ab#1"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::PasswordTooShort));
    }

    #[tokio::test]
    async fn test_change_password_wrong_current() {
        let user = existing_user();
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));

        let err = UserServiceImpl::new(Arc::new(repo))
            .change_password(Uuid::now_v7(), &password_request("Mala#2024", "Nueva#2024", "Nueva#2024"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "La contraseña actual es incorrecta");
    }

    #[tokio::test]
    async fn test_change_password_stores_new_hash() {
        let user = existing_user();
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        repo.expect_update_password()
            .withf(|_, hash| verify_password("Nueva#2024", hash).unwrap())
            .times(1)
            .returning(|_, _| Ok(()));

        UserServiceImpl::new(Arc::new(repo))
            .change_password(Uuid::now_v7(), &password_request("Actual#2024", "Nueva#2024", "Nueva#2024"))
            .await
            .unwrap();
    }
}
