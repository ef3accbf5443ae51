//! Service Catalog Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::request::{CreateServiceRequest, UpdateServiceRequest};
use crate::application::dto::response::ServiceDto;
use crate::application::services::{CatalogService, CatalogServiceImpl};
use crate::infrastructure::repositories::{PgBusinessRepository, PgServiceRepository};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

fn catalog_service(state: &AppState) -> CatalogServiceImpl<PgBusinessRepository, PgServiceRepository> {
    CatalogServiceImpl::new(
        Arc::new(PgBusinessRepository::new(state.db.clone())),
        Arc::new(PgServiceRepository::new(state.db.clone())),
    )
}

pub async fn list_by_business(
    State(state): State<AppState>,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Vec<ServiceDto>>, AppError> {
    let services = catalog_service(&state).list_by_business(business_id).await?;
    Ok(Json(services.into_iter().map(ServiceDto::from).collect()))
}

pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceDto>, AppError> {
    let service = catalog_service(&state).get(id).await?;
    Ok(Json(ServiceDto::from(service)))
}

pub async fn create_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(business_id): Path<Uuid>,
    Json(body): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ServiceDto>), AppError> {
    body.validate().map_err(validation_error)?;

    let service = catalog_service(&state)
        .create(auth.actor(), business_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(ServiceDto::from(service))))
}

pub async fn update_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateServiceRequest>,
) -> Result<Json<ServiceDto>, AppError> {
    body.validate().map_err(validation_error)?;

    let service = catalog_service(&state).update(auth.actor(), id, body).await?;
    Ok(Json(ServiceDto::from(service)))
}

pub async fn delete_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    catalog_service(&state).delete(auth.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
