//! Route guards
//!
//! Decide whether an app route may be shown, mirroring the mobile
//! navigation guards.

use chrono::{DateTime, Utc};

use super::error::ClientError;
use super::error_policy::LOGIN_ROUTE;
use super::session::{Session, SessionStore, SessionUser};

pub const HOME_ROUTE: &str = "/home";
const ROLE_LOGIN_ROUTE: &str = "/login";
const ADMIN_ROLE: &str = "Admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

fn login_with_return(url: &str) -> GuardDecision {
    GuardDecision::Redirect(format!(
        "{}?returnUrl={}",
        LOGIN_ROUTE,
        urlencoding::encode(url)
    ))
}

/// Any stored token is enough.
pub fn auth_guard(session: Option<&Session>, url: &str) -> GuardDecision {
    match session {
        Some(s) if !s.access_token.is_empty() => GuardDecision::Allow,
        _ => login_with_return(url),
    }
}

/// Requires a valid session whose user is an Admin. An invalid session is
/// cleared before redirecting to login.
pub async fn admin_guard<S>(
    store: &S,
    url: &str,
    now: DateTime<Utc>,
) -> Result<GuardDecision, ClientError>
where
    S: SessionStore + ?Sized,
{
    let session = store.load().await?;
    let Some(session) = session.filter(|s| s.is_valid(now)) else {
        store.clear().await?;
        return Ok(login_with_return(url));
    };

    if session.role() == Some(ADMIN_ROLE) {
        Ok(GuardDecision::Allow)
    } else {
        Ok(GuardDecision::Redirect(HOME_ROUTE.to_string()))
    }
}

pub fn role_guard(allowed: &[&str], user: Option<&SessionUser>) -> GuardDecision {
    match user {
        None => GuardDecision::Redirect(ROLE_LOGIN_ROUTE.to_string()),
        Some(u) if allowed.contains(&u.role.as_str()) => GuardDecision::Allow,
        Some(_) => GuardDecision::Redirect(HOME_ROUTE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session::MemorySessionStore;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn user(role: &str) -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            email: "ana@example.com".into(),
            role: role.into(),
        }
    }

    fn session(role: &str, expires_in: Duration) -> Session {
        Session {
            access_token: "token".into(),
            refresh_token: None,
            expires_at: Some(Utc::now() + expires_in),
            user: Some(user(role)),
        }
    }

    #[test]
    fn test_auth_guard_redirects_with_encoded_return_url() {
        assert_eq!(
            auth_guard(None, "/appointments?tab=next"),
            GuardDecision::Redirect("/auth/login?returnUrl=%2Fappointments%3Ftab%3Dnext".into())
        );
        let s = session("Customer", Duration::minutes(5));
        assert_eq!(auth_guard(Some(&s), "/home"), GuardDecision::Allow);
    }

    #[tokio::test]
    async fn test_admin_guard_allows_admin() {
        let store = MemorySessionStore::with_session(session("Admin", Duration::minutes(5)));
        let decision = admin_guard(&store, "/admin/users", Utc::now()).await.unwrap();
        assert_eq!(decision, GuardDecision::Allow);
    }

    #[tokio::test]
    async fn test_admin_guard_sends_others_home() {
        let store = MemorySessionStore::with_session(session("Customer", Duration::minutes(5)));
        let decision = admin_guard(&store, "/admin/users", Utc::now()).await.unwrap();
        assert_eq!(decision, GuardDecision::Redirect(HOME_ROUTE.into()));
    }

    #[tokio::test]
    async fn test_admin_guard_clears_expired_session() {
        let store = MemorySessionStore::with_session(session("Admin", -Duration::minutes(5)));
        let decision = admin_guard(&store, "/admin/users", Utc::now()).await.unwrap();

        assert_eq!(
            decision,
            GuardDecision::Redirect("/auth/login?returnUrl=%2Fadmin%2Fusers".into())
        );
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[test]
    fn test_role_guard() {
        let allowed = ["BusinessOwner", "Admin"];
        assert_eq!(
            role_guard(&allowed, None),
            GuardDecision::Redirect("/login".into())
        );
        assert_eq!(role_guard(&allowed, Some(&user("Admin"))), GuardDecision::Allow);
        assert_eq!(
            role_guard(&allowed, Some(&user("Customer"))),
            GuardDecision::Redirect(HOME_ROUTE.into())
        );
    }
}
