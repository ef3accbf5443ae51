//! Authentication Service
//!
//! Handles registration, login, JWT issuing and refresh-token rotation.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use super::Actor;
use crate::application::dto::request::RegisterRequest;
use crate::config::JwtSettings;
use crate::domain::{RefreshToken, RefreshTokenRepository, User, UserRepository, UserRole};
use crate::shared::error::AppError;

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create a customer or business-owner account and sign it in
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResult, AuthError>;

    /// Authenticate with email and password
    async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AuthError>;

    /// Exchange an (possibly expired) access token plus its refresh token for new ones
    async fn refresh(&self, access_token: &str, refresh_token: &str) -> Result<AuthResult, AuthError>;

    /// Revoke every refresh token of `user_id`
    async fn revoke(&self, actor: Actor, user_id: Uuid) -> Result<(), AuthError>;

    /// Change the role of `user_id`
    async fn change_role(&self, actor: Actor, user_id: Uuid, role: &str) -> Result<User, AuthError>;
}

/// Issued token pair
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Tokens plus the user they were issued for
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub user: User,
    pub tokens: AuthTokens,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iss: String,
    pub aud: String,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// JWT ID
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidToken)
    }
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("El email ya está registrado")]
    EmailExists,

    #[error("Credenciales inválidas")]
    InvalidCredentials,

    #[error("Usuario inactivo")]
    Inactive,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Rol inválido")]
    InvalidRole,

    #[error("Solo se permite cambiar entre Cliente y Dueño de Negocio")]
    RoleChangeNotAllowed,

    #[error("No tienes permisos para esta acción")]
    Forbidden,

    #[error("Usuario no encontrado")]
    UserNotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmailExists | AuthError::InvalidRole | AuthError::RoleChangeNotAllowed => {
                AppError::BadRequest(err.to_string())
            }
            AuthError::InvalidCredentials
            | AuthError::Inactive
            | AuthError::TokenExpired
            | AuthError::InvalidToken
            | AuthError::InvalidRefreshToken => AppError::Unauthorized(err.to_string()),
            AuthError::Forbidden => AppError::Forbidden(err.to_string()),
            AuthError::UserNotFound => AppError::NotFound(err.to_string()),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| format!("Password hashing failed: {}", e))
}

/// Verify a password against its PHC-encoded hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| format!("Invalid password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Decode an access token.
///
/// Signature, issuer and audience are always checked; expiry only when
/// `validate_exp` is set, so refresh can accept an expired token.
pub fn decode_access_token(
    settings: &JwtSettings,
    token: &str,
    validate_exp: bool,
) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[settings.issuer.as_str()]);
    validation.set_audience(&[settings.audience.as_str()]);
    validation.validate_exp = validate_exp;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Hash refresh token for storage
fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// AuthService implementation
pub struct AuthServiceImpl<U, T>
where
    U: UserRepository,
    T: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    token_repo: Arc<T>,
    jwt_settings: JwtSettings,
}

impl<U, T> AuthServiceImpl<U, T>
where
    U: UserRepository,
    T: RefreshTokenRepository,
{
    pub fn new(user_repo: Arc<U>, token_repo: Arc<T>, jwt_settings: JwtSettings) -> Self {
        Self {
            user_repo,
            token_repo,
            jwt_settings,
        }
    }

    fn generate_access_token(&self, user: &User, now: DateTime<Utc>) -> Result<String, AuthError> {
        let expiry = now + Duration::minutes(self.jwt_settings.access_token_expiry_minutes);
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            iss: self.jwt_settings.issuer.clone(),
            aud: self.jwt_settings.audience.clone(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_settings.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Issue an access token and persist a fresh refresh token for `user`.
    async fn issue(&self, user: User) -> Result<AuthResult, AuthError> {
        let now = Utc::now();
        let access_token = self.generate_access_token(&user, now)?;

        // Opaque, carries no user data
        let refresh_token = format!("{}.{}", Uuid::new_v4(), Uuid::new_v4());
        let stored = RefreshToken::new(
            user.id,
            hash_refresh_token(&refresh_token),
            now + Duration::days(self.jwt_settings.refresh_token_expiry_days),
        );
        self.token_repo
            .create(&stored)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(AuthResult {
            user,
            tokens: AuthTokens {
                access_token,
                refresh_token,
                expires_in: self.jwt_settings.access_token_expiry_minutes * 60,
            },
        })
    }

    async fn load_user(&self, id: Uuid) -> Result<User, AuthError> {
        self.user_repo
            .find_by_id(id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::UserNotFound)
    }
}

#[async_trait]
impl<U, T> AuthService for AuthServiceImpl<U, T>
where
    U: UserRepository + 'static,
    T: RefreshTokenRepository + 'static,
{
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResult, AuthError> {
        let email = request.email.trim().to_lowercase();
        let role = UserRole::parse(&request.role)
            .filter(UserRole::is_self_service)
            .ok_or(AuthError::InvalidRole)?;

        if self
            .user_repo
            .email_exists(&email)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
        {
            return Err(AuthError::EmailExists);
        }

        let password_hash = hash_password(&request.password).map_err(AuthError::Internal)?;
        let mut user = User::new(
            &email,
            password_hash,
            &request.first_name,
            &request.last_name,
            role,
        );
        user.phone_number = request
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from);

        let created = self
            .user_repo
            .create(&user)
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => AuthError::EmailExists,
                e => AuthError::Internal(e.to_string()),
            })?;

        info!(user_id = %created.id, role = created.role.as_str(), "User registered");
        self.issue(created).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AuthError> {
        let user = self
            .user_repo
            .find_by_email(&email.trim().to_lowercase())
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).map_err(AuthError::Internal)? {
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        if !user.can_login(now) {
            warn!(user_id = %user.id, "Login rejected for inactive user");
            return Err(AuthError::Inactive);
        }

        // One live session per account
        self.token_repo
            .revoke_all_for_user(user.id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        self.user_repo
            .touch_last_login(user.id, now)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let mut user = user;
        user.last_login = Some(now);
        self.issue(user).await
    }

    async fn refresh(&self, access_token: &str, refresh_token: &str) -> Result<AuthResult, AuthError> {
        let claims = decode_access_token(&self.jwt_settings, access_token, false)?;
        let user_id = claims.user_id()?;

        // Rotation: spending the presented token is a single conditional
        // update, so only one concurrent refresh can win it.
        let spent = self
            .token_repo
            .consume(&hash_refresh_token(refresh_token), user_id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !spent {
            warn!(user_id = %user_id, "Refresh token rejected or already spent");
            return Err(AuthError::InvalidRefreshToken);
        }

        let user = self.load_user(user_id).await.map_err(|e| match e {
            AuthError::UserNotFound => AuthError::InvalidRefreshToken,
            e => e,
        })?;
        if !user.can_login(Utc::now()) {
            return Err(AuthError::Inactive);
        }

        self.issue(user).await
    }

    async fn revoke(&self, actor: Actor, user_id: Uuid) -> Result<(), AuthError> {
        if actor.user_id != user_id && !actor.is_admin() {
            return Err(AuthError::Forbidden);
        }

        let revoked = self
            .token_repo
            .revoke_all_for_user(user_id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        info!(user_id = %user_id, revoked, "Refresh tokens revoked");
        Ok(())
    }

    async fn change_role(&self, actor: Actor, user_id: Uuid, role: &str) -> Result<User, AuthError> {
        let new_role = UserRole::parse(role).ok_or(AuthError::InvalidRole)?;

        if !actor.is_admin() {
            if actor.user_id != user_id {
                return Err(AuthError::Forbidden);
            }
            if !new_role.is_self_service() {
                return Err(AuthError::RoleChangeNotAllowed);
            }
        }

        let mut user = self.load_user(user_id).await?;
        if !actor.is_admin() && !user.role.is_self_service() {
            return Err(AuthError::RoleChangeNotAllowed);
        }

        user.role = new_role;
        user.updated_at = Utc::now();
        let updated = self
            .user_repo
            .update(&user)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        info!(user_id = %user_id, role = new_role.as_str(), "User role changed");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockRefreshTokenRepository, MockUserRepository};

    // ========================================================================
    // Fixtures
    // ========================================================================

    fn jwt_settings() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-that-is-long-enough-for-hs256".into(),
            issuer: "TurnoYa".into(),
            audience: "TurnoYaUsers".into(),
            access_token_expiry_minutes: 60,
            refresh_token_expiry_days: 7,
        }
    }

    fn user_with_password(password: &str) -> User {
        User::new(
            "ana@example.com",
            hash_password(password).unwrap(),
            "Ana",
            "Pérez",
            UserRole::Customer,
        )
    }

    fn service(
        users: MockUserRepository,
        tokens: MockRefreshTokenRepository,
    ) -> AuthServiceImpl<MockUserRepository, MockRefreshTokenRepository> {
        AuthServiceImpl::new(Arc::new(users), Arc::new(tokens), jwt_settings())
    }

    fn register_request(role: &str) -> RegisterRequest {
        RegisterRequest {
            email: "Ana@Example.com".into(),
            password: "Secreta#2024".into(),
            confirm_password: "Secreta#2024".into(),
            first_name: "Ana".into(),
            last_name: "Pérez".into(),
            phone: None,
            role: role.into(),
        }
    }

    // ========================================================================
    // Passwords & Tokens
    // ========================================================================

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("Secreta#2024").unwrap();
        assert!(verify_password("Secreta#2024", &hash).unwrap());
        assert!(!verify_password("otra", &hash).unwrap());
    }

    #[test]
    fn test_refresh_token_hash_is_sha256_hex() {
        let hash = hash_refresh_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_access_token_claims() {
        let svc = service(MockUserRepository::new(), MockRefreshTokenRepository::new());
        let user = user_with_password("Secreta#2024");
        let token = svc.generate_access_token(&user, Utc::now()).unwrap();

        let claims = decode_access_token(&jwt_settings(), &token, true).unwrap();
        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(claims.role, "Customer");
        assert_eq!(claims.iss, "TurnoYa");
        assert_eq!(claims.aud, "TurnoYaUsers");
    }

    #[test]
    fn test_expired_token_accepted_only_without_exp_check() {
        let svc = service(MockUserRepository::new(), MockRefreshTokenRepository::new());
        let user = user_with_password("Secreta#2024");
        let token = svc
            .generate_access_token(&user, Utc::now() - Duration::hours(3))
            .unwrap();

        assert!(matches!(
            decode_access_token(&jwt_settings(), &token, true),
            Err(AuthError::TokenExpired)
        ));
        assert!(decode_access_token(&jwt_settings(), &token, false).is_ok());
    }

    #[test]
    fn test_token_with_wrong_audience_is_rejected() {
        let svc = service(MockUserRepository::new(), MockRefreshTokenRepository::new());
        let token = svc
            .generate_access_token(&user_with_password("Secreta#2024"), Utc::now())
            .unwrap();
        let mut other = jwt_settings();
        other.audience = "Someone".into();
        assert!(matches!(
            decode_access_token(&other, &token, true),
            Err(AuthError::InvalidToken)
        ));
    }

    // ========================================================================
    // Register & Login
    // ========================================================================

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let mut users = MockUserRepository::new();
        users
            .expect_email_exists()
            .withf(|email| email == "ana@example.com")
            .returning(|_| Ok(true));

        let err = service(users, MockRefreshTokenRepository::new())
            .register(&register_request("Customer"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailExists));
        assert_eq!(err.to_string(), "El email ya está registrado");
    }

    #[tokio::test]
    async fn test_register_issues_tokens() {
        let mut users = MockUserRepository::new();
        users.expect_email_exists().returning(|_| Ok(false));
        users.expect_create().returning(|u| Ok(u.clone()));
        let mut tokens = MockRefreshTokenRepository::new();
        tokens.expect_create().times(1).returning(|t| Ok(t.clone()));

        let result = service(users, tokens)
            .register(&register_request("Owner"))
            .await
            .unwrap();
        assert_eq!(result.user.email, "ana@example.com");
        assert_eq!(result.user.role, UserRole::BusinessOwner);
        assert_eq!(result.tokens.expires_in, 3600);
        assert!(result.tokens.refresh_token.contains('.'));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let user = user_with_password("Secreta#2024");
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let err = service(users, MockRefreshTokenRepository::new())
            .login("ana@example.com", "incorrecta")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Credenciales inválidas");
    }

    #[tokio::test]
    async fn test_login_rejects_inactive_user() {
        let mut user = user_with_password("Secreta#2024");
        user.is_active = false;
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let err = service(users, MockRefreshTokenRepository::new())
            .login("ana@example.com", "Secreta#2024")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Inactive));
    }

    #[tokio::test]
    async fn test_login_revokes_previous_tokens() {
        let user = user_with_password("Secreta#2024");
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        users.expect_touch_last_login().returning(|_, _| Ok(()));
        let mut tokens = MockRefreshTokenRepository::new();
        tokens.expect_revoke_all_for_user().times(1).returning(|_| Ok(2));
        tokens.expect_create().returning(|t| Ok(t.clone()));

        let result = service(users, tokens)
            .login("ANA@example.com ", "Secreta#2024")
            .await
            .unwrap();
        assert!(result.user.last_login.is_some());
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    #[tokio::test]
    async fn test_refresh_rejects_token_of_another_user() {
        let user = user_with_password("Secreta#2024");
        let access = service(MockUserRepository::new(), MockRefreshTokenRepository::new())
            .generate_access_token(&user, Utc::now())
            .unwrap();

        let mut tokens = MockRefreshTokenRepository::new();
        let expected_user = user.id;
        tokens
            .expect_consume()
            .withf(move |_, user_id| *user_id == expected_user)
            .returning(|_, _| Ok(false));
        tokens.expect_create().never();

        let err = service(MockUserRepository::new(), tokens)
            .refresh(&access, "a.b")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let user = user_with_password("Secreta#2024");
        let access = service(MockUserRepository::new(), MockRefreshTokenRepository::new())
            .generate_access_token(&user, Utc::now() - Duration::hours(2))
            .unwrap();

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        let mut tokens = MockRefreshTokenRepository::new();
        tokens
            .expect_consume()
            .withf(|hash, _| hash == hash_refresh_token("a.b"))
            .times(1)
            .returning(|_, _| Ok(true));
        tokens.expect_create().times(1).returning(|t| Ok(t.clone()));

        let result = service(users, tokens).refresh(&access, "a.b").await.unwrap();
        assert_ne!(result.tokens.refresh_token, "a.b");
    }

    #[tokio::test]
    async fn test_refresh_token_is_spent_only_once() {
        let user = user_with_password("Secreta#2024");
        let access = service(MockUserRepository::new(), MockRefreshTokenRepository::new())
            .generate_access_token(&user, Utc::now())
            .unwrap();

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        // The store hands the token out once; later attempts see it spent.
        let spent = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let mut tokens = MockRefreshTokenRepository::new();
        tokens.expect_consume().times(2).returning(move |_, _| {
            Ok(!spent.swap(true, std::sync::atomic::Ordering::SeqCst))
        });
        tokens.expect_create().times(1).returning(|t| Ok(t.clone()));

        let svc = service(users, tokens);
        let (first, second) = tokio::join!(svc.refresh(&access, "a.b"), svc.refresh(&access, "a.b"));

        let granted = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(granted, 1);
        assert!(matches!(
            first.err().or(second.err()),
            Some(AuthError::InvalidRefreshToken)
        ));
    }

    // ========================================================================
    // Revoke & Role
    // ========================================================================

    #[tokio::test]
    async fn test_revoke_other_user_requires_admin() {
        let actor = Actor::new(Uuid::now_v7(), UserRole::Customer);
        let err = service(MockUserRepository::new(), MockRefreshTokenRepository::new())
            .revoke(actor, Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden));
    }

    #[tokio::test]
    async fn test_customer_cannot_become_admin() {
        let id = Uuid::now_v7();
        let err = service(MockUserRepository::new(), MockRefreshTokenRepository::new())
            .change_role(Actor::new(id, UserRole::Customer), id, "Admin")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Solo se permite cambiar entre Cliente y Dueño de Negocio"
        );
    }

    #[tokio::test]
    async fn test_customer_switches_to_owner() {
        let user = user_with_password("Secreta#2024");
        let id = user.id;
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        users.expect_update().returning(|u| Ok(u.clone()));

        let updated = service(users, MockRefreshTokenRepository::new())
            .change_role(Actor::new(id, UserRole::Customer), id, "BusinessOwner")
            .await
            .unwrap();
        assert_eq!(updated.role, UserRole::BusinessOwner);
    }

    #[tokio::test]
    async fn test_admin_sets_any_role() {
        let user = user_with_password("Secreta#2024");
        let id = user.id;
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        users.expect_update().returning(|u| Ok(u.clone()));

        let updated = service(users, MockRefreshTokenRepository::new())
            .change_role(Actor::new(Uuid::now_v7(), UserRole::Admin), id, "Employee")
            .await
            .unwrap();
        assert_eq!(updated.role, UserRole::Employee);
    }
}
