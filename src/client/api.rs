//! Typed HTTP client
//!
//! Attaches the stored bearer token to non-public calls and, on a 401,
//! refreshes the session once and repeats the request.

use std::sync::Arc;

use chrono::Utc;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::error::ClientError;
use super::error_policy::{is_public_endpoint, on_unauthorized, UnauthorizedAction};
use super::models::{
    AppointmentSummary, AuthPayload, AvailabilityParams, Credentials, NewAppointment,
    RefreshRequest, Registration, Slot,
};
use super::session::{Session, SessionStore};
use crate::application::services::CitySuggestion;
use crate::infrastructure::external::build_http_client;

const CLIENT_USER_AGENT: &str = concat!("turnoya-client/", env!("CARGO_PKG_VERSION"));
const REFRESH_PATH: &str = "/api/auth/refresh";

/// One logical request, replayable after a token refresh
struct Call<'a> {
    method: Method,
    path: &'a str,
    query: Vec<(&'static str, String)>,
    body: Option<Value>,
}

impl<'a> Call<'a> {
    fn new(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let http = build_http_client(CLIENT_USER_AGENT)?;
        Ok(Self::with_http(http, base_url, store))
    }

    pub fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        }
    }

    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    // ========================================================================
    // Auth
    // ========================================================================

    /// Sign in and persist the session
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, ClientError> {
        let call = Call::new(Method::POST, "/api/auth/login").json(credentials)?;
        let auth: AuthPayload = self.send(call).await?;
        self.store.save(&Session::from_auth(&auth, Utc::now())).await?;
        Ok(auth)
    }

    pub async fn register(&self, registration: &Registration) -> Result<AuthPayload, ClientError> {
        let call = Call::new(Method::POST, "/api/auth/register").json(registration)?;
        let auth: AuthPayload = self.send(call).await?;
        self.store.save(&Session::from_auth(&auth, Utc::now())).await?;
        Ok(auth)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.store.clear().await
    }

    // ========================================================================
    // Booking
    // ========================================================================

    pub async fn availability(&self, params: &AvailabilityParams) -> Result<Vec<Slot>, ClientError> {
        let mut call = Call::new(Method::GET, "/api/appointments/availability")
            .query("businessId", params.business_id)
            .query("serviceId", params.service_id)
            .query("date", params.date);
        if let Some(employee_id) = params.employee_id {
            call = call.query("employeeId", employee_id);
        }
        self.send(call).await
    }

    pub async fn book_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<AppointmentSummary, ClientError> {
        let call = Call::new(Method::POST, "/api/appointments").json(appointment)?;
        self.send(call).await
    }

    pub async fn my_appointments(&self) -> Result<Vec<AppointmentSummary>, ClientError> {
        self.send(Call::new(Method::GET, "/api/appointments/my")).await
    }

    pub async fn cancel_appointment(
        &self,
        id: Uuid,
        reason: Option<&str>,
    ) -> Result<AppointmentSummary, ClientError> {
        let path = format!("/api/appointments/{}/cancel", id);
        let call = Call::new(Method::PATCH, &path).json(&serde_json::json!({ "reason": reason }))?;
        self.send(call).await
    }

    // ========================================================================
    // Cities
    // ========================================================================

    pub async fn city_autocomplete(
        &self,
        query: &str,
        department: Option<&str>,
    ) -> Result<Vec<CitySuggestion>, ClientError> {
        let mut call = Call::new(Method::GET, "/api/cities/autocomplete").query("query", query);
        if let Some(department) = department {
            call = call.query("department", department);
        }
        self.send(call).await
    }

    // ========================================================================
    // Transport
    // ========================================================================

    async fn send<T: DeserializeOwned>(&self, call: Call<'_>) -> Result<T, ClientError> {
        let session = self.store.load().await?;
        let token = session.as_ref().map(|s| s.access_token.as_str());
        let response = self.execute(&call, token).await?;

        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return decode(response).await;
        }

        match on_unauthorized(call.path, session.as_ref(), Utc::now()) {
            None => decode(response).await,
            Some(UnauthorizedAction::ClearAndRedirect(_)) => {
                tracing::debug!(path = call.path, "No valid session for protected call");
                self.store.clear().await?;
                Err(ClientError::SessionExpired)
            }
            Some(UnauthorizedAction::RefreshAndRetry) => {
                let refreshed = match session {
                    Some(session) => self.refresh(&session).await?,
                    None => return Err(ClientError::SessionExpired),
                };
                let retry = self.execute(&call, Some(&refreshed.access_token)).await?;
                decode(retry).await
            }
        }
    }

    async fn execute(&self, call: &Call<'_>, token: Option<&str>) -> Result<Response, ClientError> {
        let url = format!("{}{}", self.base_url, call.path);
        let mut request = self.http.request(call.method.clone(), url);
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }
        if let Some(token) = token.filter(|_| !is_public_endpoint(call.path)) {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    /// Rotate the tokens. A rejected refresh clears the session.
    async fn refresh(&self, session: &Session) -> Result<Session, ClientError> {
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            self.store.clear().await?;
            return Err(ClientError::SessionExpired);
        };

        let call = Call::new(Method::POST, REFRESH_PATH).json(&RefreshRequest {
            token: &session.access_token,
            refresh_token,
        })?;
        let response = self.execute(&call, None).await?;

        match decode::<AuthPayload>(response).await {
            Ok(auth) => {
                let refreshed = Session::from_auth(&auth, Utc::now());
                self.store.save(&refreshed).await?;
                tracing::debug!("Session refreshed");
                Ok(refreshed)
            }
            Err(e) if e.status() == 401 => {
                tracing::info!("Refresh rejected, clearing session");
                self.store.clear().await?;
                Err(ClientError::SessionExpired)
            }
            Err(e) => Err(e),
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if status.is_success() {
        return Ok(serde_json::from_slice(&bytes)?);
    }

    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    Err(ClientError::Api {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session::MemorySessionStore;
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn auth_body(token: &str) -> Value {
        json!({
            "token": token,
            "refreshToken": format!("{}-refresh", token),
            "expiresIn": 3600,
            "user": {
                "id": Uuid::nil(),
                "email": "ana@example.com",
                "firstName": "Ana",
                "lastName": "Pérez",
                "role": "Customer"
            }
        })
    }

    fn bearer(headers: &HeaderMap) -> Option<String> {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_owned)
    }

    /// Accepts only the "fresh" token; refresh succeeds unless the refresh
    /// token is "revoked".
    async fn spawn_server() -> String {
        let app = Router::new()
            .route(
                "/api/auth/login",
                post(|headers: HeaderMap| async move {
                    assert!(bearer(&headers).is_none());
                    Json(auth_body("stale"))
                }),
            )
            .route(
                "/api/auth/refresh",
                post(|Json(body): Json<Value>| async move {
                    if body["refreshToken"] == "revoked" {
                        return Err((StatusCode::UNAUTHORIZED, Json(json!({"message": "Token inválido"}))));
                    }
                    Ok(Json(auth_body("fresh")))
                }),
            )
            .route(
                "/api/appointments/my",
                get(|headers: HeaderMap| async move {
                    match bearer(&headers).as_deref() {
                        Some("fresh") => Ok(Json(json!([]))),
                        _ => Err((StatusCode::UNAUTHORIZED, Json(json!({"message": "No autorizado"})))),
                    }
                }),
            )
            .route(
                "/api/cities/autocomplete",
                get(|| async { (StatusCode::BAD_REQUEST, Json(json!({"code": 400, "message": "Query is required."}))) }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn session(refresh_token: &str) -> Session {
        Session {
            access_token: "stale".into(),
            refresh_token: Some(refresh_token.into()),
            expires_at: Some(Utc::now() + Duration::minutes(10)),
            user: None,
        }
    }

    fn client(base: String, store: Arc<MemorySessionStore>) -> ApiClient {
        ApiClient::new(base, store).unwrap()
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let store = Arc::new(MemorySessionStore::new());
        let api = client(spawn_server().await, store.clone());

        let auth = api
            .login(&Credentials {
                email: "ana@example.com".into(),
                password: "Secreta1!".into(),
            })
            .await
            .unwrap();

        assert_eq!(auth.token, "stale");
        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved.refresh_token.as_deref(), Some("stale-refresh"));
        assert_eq!(saved.user.unwrap().role, "Customer");
    }

    #[tokio::test]
    async fn test_unauthorized_call_refreshes_and_retries_once() {
        let store = Arc::new(MemorySessionStore::with_session(session("stale-refresh")));
        let api = client(spawn_server().await, store.clone());

        let appointments = api.my_appointments().await.unwrap();

        assert!(appointments.is_empty());
        assert_eq!(store.load().await.unwrap().unwrap().access_token, "fresh");
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_session() {
        let store = Arc::new(MemorySessionStore::with_session(session("revoked")));
        let api = client(spawn_server().await, store.clone());

        let err = api.my_appointments().await.unwrap_err();

        assert!(matches!(err, ClientError::SessionExpired));
        assert_eq!(err.redirect_to(), Some("/auth/login"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_no_session_clears_and_redirects() {
        let store = Arc::new(MemorySessionStore::new());
        let api = client(spawn_server().await, store);

        let err = api.my_appointments().await.unwrap_err();
        assert!(matches!(err, ClientError::SessionExpired));
    }

    #[tokio::test]
    async fn test_error_body_message_is_surfaced() {
        let api = client(spawn_server().await, Arc::new(MemorySessionStore::new()));

        let err = api.city_autocomplete("", None).await.unwrap_err();

        assert_eq!(err.status(), 400);
        assert_eq!(err.notification(), "Query is required.");
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_offline() {
        let api = client("http://127.0.0.1:1".into(), Arc::new(MemorySessionStore::new()));

        let err = api.my_appointments().await.unwrap_err();

        assert_eq!(err.status(), 0);
        assert_eq!(err.notification(), "No se pudo conectar con el servidor.");
    }
}
