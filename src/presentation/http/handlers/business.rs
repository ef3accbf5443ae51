//! Business Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::request::{
    BusinessSearchQuery, BusinessSettingsRequest, CreateBusinessRequest, NearbyQuery,
    UpdateBusinessRequest,
};
use crate::application::dto::response::{
    BusinessDetailDto, BusinessDto, BusinessListDto, BusinessSettingsDto,
};
use crate::application::services::{BusinessService, BusinessServiceImpl};
use crate::domain::GeoPoint;
use crate::infrastructure::repositories::{
    PgBusinessRepository, PgEmployeeRepository, PgServiceRepository, PgUserRepository,
};
use crate::presentation::http::extractors::BusinessPayload;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

type PgBusinessService = BusinessServiceImpl<
    PgBusinessRepository,
    PgServiceRepository,
    PgEmployeeRepository,
    PgUserRepository,
>;

fn business_service(state: &AppState) -> PgBusinessService {
    BusinessServiceImpl::new(
        Arc::new(PgBusinessRepository::new(state.db.clone())),
        Arc::new(PgServiceRepository::new(state.db.clone())),
        Arc::new(PgEmployeeRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
    )
}

fn list<T: Into<BusinessListDto>>(items: Vec<T>) -> Json<Vec<BusinessListDto>> {
    Json(items.into_iter().map(Into::into).collect())
}

// ============================================================================
// Public reads
// ============================================================================

pub async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<Vec<BusinessListDto>>, AppError> {
    Ok(list(business_service(&state).list_active().await?))
}

pub async fn get_business(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BusinessDetailDto>, AppError> {
    let detail = business_service(&state).get_detail(id).await?;
    Ok(Json(BusinessDetailDto::from(detail)))
}

pub async fn list_by_owner(
    State(state): State<AppState>,
    Path(owner_id): Path<Uuid>,
) -> Result<Json<Vec<BusinessListDto>>, AppError> {
    Ok(list(business_service(&state).list_by_owner(owner_id).await?))
}

/// Active businesses around a point, nearest first
pub async fn nearby(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<BusinessListDto>>, AppError> {
    query.validate().map_err(validation_error)?;

    let origin = GeoPoint::new(query.latitude, query.longitude);
    Ok(list(
        business_service(&state)
            .nearby(origin, query.radius_km)
            .await?,
    ))
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<BusinessSearchQuery>,
) -> Result<Json<Vec<BusinessListDto>>, AppError> {
    Ok(list(business_service(&state).search(query.into()).await?))
}

pub async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<BusinessListDto>>, AppError> {
    Ok(list(
        business_service(&state)
            .list_by_category(&category)
            .await?,
    ))
}

pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(business_service(&state).categories().await?))
}

// ============================================================================
// Owner writes
// ============================================================================

/// Create a business owned by the caller
pub async fn create_business(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: BusinessPayload<CreateBusinessRequest>,
) -> Result<(StatusCode, Json<BusinessDto>), AppError> {
    let business = business_service(&state)
        .create(auth.actor(), payload.data, payload.images.unwrap_or_default())
        .await?;
    Ok((StatusCode::CREATED, Json(BusinessDto::from(business))))
}

pub async fn update_business(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: BusinessPayload<UpdateBusinessRequest>,
) -> Result<Json<BusinessDto>, AppError> {
    let business = business_service(&state)
        .update(auth.actor(), id, payload.data, payload.images)
        .await?;
    Ok(Json(BusinessDto::from(business)))
}

pub async fn delete_business(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    business_service(&state).delete(auth.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Settings
// ============================================================================

pub async fn get_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BusinessSettingsDto>, AppError> {
    let settings = business_service(&state).get_settings(id).await?;
    Ok(Json(BusinessSettingsDto::from(settings)))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<BusinessSettingsRequest>,
) -> Result<Json<BusinessSettingsDto>, AppError> {
    body.validate().map_err(validation_error)?;

    let settings = business_service(&state)
        .update_settings(auth.actor(), id, body)
        .await?;
    Ok(Json(BusinessSettingsDto::from(settings)))
}
