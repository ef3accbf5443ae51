//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Extension, Router,
};
use tower_http::compression::CompressionLayer;

use super::extractors::MAX_BUSINESS_BODY_BYTES;
use super::handlers;
use crate::domain::ScheduleScope;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{
    auth_middleware, create_trace_layer, rate_limit_auth, require_admin, track_metrics,
};
use crate::presentation::middleware::cors::create_cors_layer;
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let cors = create_cors_layer(&state.settings.cors);

    Router::new()
        .nest("/api", api_routes(state.clone()))
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(track_metrics))
        .layer(CompressionLayer::new())
        .layer(create_trace_layer())
        .layer(cors)
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::api_health))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .nest("/admin", admin_routes(state.clone()))
        .nest("/business", business_routes(state.clone()))
        .nest("/services", service_routes(state.clone()))
        .nest("/employees", employee_routes(state.clone()))
        .nest(
            "/business-schedules",
            schedule_routes(state.clone(), ScheduleScope::Business),
        )
        .nest(
            "/employee-schedules",
            schedule_routes(state.clone(), ScheduleScope::Employee),
        )
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/payments", payment_routes(state))
        .route(
            "/cities/autocomplete",
            get(handlers::cities::autocomplete),
        )
}

/// Public credential endpoints are rate limited; the rest need a token.
fn auth_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh_token))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_auth));

    let protected = Router::new()
        .route("/revoke/{userId}", post(handlers::auth::revoke))
        .route("/users/{userId}/role", patch(handlers::auth::change_role))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/me",
            get(handlers::users::get_me).put(handlers::users::update_me),
        )
        .route("/me/password", patch(handlers::users::change_password))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::admin::list_users))
        .route("/users/{userId}", get(handlers::admin::get_user))
        .route("/users/{userId}/status", patch(handlers::admin::update_status))
        .route("/users/{userId}/role", patch(handlers::admin::update_role))
        // Layers run bottom-up: authenticate first, then check the role
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn business_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::business::list_active))
        .route("/nearby", get(handlers::business::nearby))
        .route("/search", get(handlers::business::search))
        .route("/categories", get(handlers::business::categories))
        .route("/category/{category}", get(handlers::business::list_by_category))
        .route("/owner/{ownerId}", get(handlers::business::list_by_owner))
        .route("/{id}", get(handlers::business::get_business))
        .route("/{id}/settings", get(handlers::business::get_settings));

    let protected = Router::new()
        .route(
            "/",
            post(handlers::business::create_business)
                .layer(DefaultBodyLimit::max(MAX_BUSINESS_BODY_BYTES)),
        )
        .route(
            "/{id}",
            put(handlers::business::update_business)
                .layer(DefaultBodyLimit::max(MAX_BUSINESS_BODY_BYTES))
                .delete(handlers::business::delete_business),
        )
        .route("/{id}/settings", put(handlers::business::update_settings))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

fn service_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/business/{businessId}", get(handlers::services::list_by_business))
        .route("/{id}", get(handlers::services::get_service));

    let protected = Router::new()
        .route("/business/{businessId}", post(handlers::services::create_service))
        .route(
            "/{id}",
            put(handlers::services::update_service).delete(handlers::services::delete_service),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

fn employee_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/business/{businessId}", get(handlers::employees::list_by_business))
        .route("/{id}", get(handlers::employees::get_employee));

    let protected = Router::new()
        .route("/business/{businessId}", post(handlers::employees::create_employee))
        .route(
            "/{id}",
            put(handlers::employees::update_employee)
                .delete(handlers::employees::delete_employee),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

/// Business and employee schedules share handlers; the scope rides along
/// as a request extension.
fn schedule_routes(state: AppState, scope: ScheduleScope) -> Router<AppState> {
    let public = Router::new().route("/{id}", get(handlers::schedules::get_schedule));

    let protected = Router::new()
        .route("/", post(handlers::schedules::create_schedule))
        .route(
            "/{id}",
            put(handlers::schedules::update_schedule)
                .delete(handlers::schedules::delete_schedule),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected).layer(Extension(scope))
}

fn appointment_routes(state: AppState) -> Router<AppState> {
    let public = Router::new().route(
        "/availability",
        get(handlers::appointments::availability),
    );

    let protected = Router::new()
        .route("/", post(handlers::appointments::create_appointment))
        .route("/my", get(handlers::appointments::my_appointments))
        .route(
            "/business/{businessId}",
            get(handlers::appointments::business_appointments),
        )
        .route("/{id}", get(handlers::appointments::get_appointment))
        .route("/{id}/history", get(handlers::appointments::appointment_history))
        .route("/{id}/confirm", patch(handlers::appointments::confirm))
        .route("/{id}/complete", patch(handlers::appointments::complete))
        .route("/{id}/noshow", patch(handlers::appointments::no_show))
        .route("/{id}/cancel", patch(handlers::appointments::cancel))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

/// Webhooks are public; Wompi authenticates them with an HMAC header.
fn payment_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/webhook", post(handlers::payments::webhook))
        .route("/wompi/webhook", post(handlers::payments::webhook));

    let protected = Router::new()
        .route("/intent", post(handlers::payments::create_intent))
        .route(
            "/{appointmentId}/status",
            get(handlers::payments::payment_status),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}
