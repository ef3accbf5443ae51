//! Catalog Service
//!
//! The services a business offers. Writes are limited to the business owner.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::Actor;
use crate::application::dto::request::{CreateServiceRequest, UpdateServiceRequest};
use crate::domain::{BusinessRepository, Service, ServiceRepository};
use crate::shared::error::AppError;

#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Service>, CatalogError>;

    async fn get(&self, id: Uuid) -> Result<Service, CatalogError>;

    async fn create(
        &self,
        actor: Actor,
        business_id: Uuid,
        request: CreateServiceRequest,
    ) -> Result<Service, CatalogError>;

    async fn update(
        &self,
        actor: Actor,
        id: Uuid,
        request: UpdateServiceRequest,
    ) -> Result<Service, CatalogError>;

    async fn delete(&self, actor: Actor, id: Uuid) -> Result<(), CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Servicio no encontrado")]
    NotFound,

    #[error("Negocio no encontrado")]
    BusinessNotFound,

    #[error("No tienes permisos para modificar este negocio")]
    NotOwner,

    /// A pricing or duration rule was broken
    #[error("{0}")]
    InvalidService(String),

    #[error("{0}")]
    InUse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound | CatalogError::BusinessNotFound => {
                AppError::NotFound(err.to_string())
            }
            CatalogError::NotOwner => AppError::Forbidden(err.to_string()),
            CatalogError::InvalidService(msg) => AppError::validation(msg),
            CatalogError::InUse(msg) => AppError::Conflict(msg),
            CatalogError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

fn internal(e: AppError) -> CatalogError {
    CatalogError::Internal(e.to_string())
}

pub struct CatalogServiceImpl<B, S>
where
    B: BusinessRepository,
    S: ServiceRepository,
{
    business_repo: Arc<B>,
    service_repo: Arc<S>,
}

impl<B, S> CatalogServiceImpl<B, S>
where
    B: BusinessRepository,
    S: ServiceRepository,
{
    pub fn new(business_repo: Arc<B>, service_repo: Arc<S>) -> Self {
        Self {
            business_repo,
            service_repo,
        }
    }

    async fn ensure_owner(&self, actor: Actor, business_id: Uuid) -> Result<(), CatalogError> {
        let business = self
            .business_repo
            .find_by_id(business_id)
            .await
            .map_err(internal)?
            .ok_or(CatalogError::BusinessNotFound)?;
        if !business.is_owned_by(actor.user_id) {
            return Err(CatalogError::NotOwner);
        }
        Ok(())
    }
}

#[async_trait]
impl<B, S> CatalogService for CatalogServiceImpl<B, S>
where
    B: BusinessRepository + 'static,
    S: ServiceRepository + 'static,
{
    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Service>, CatalogError> {
        self.service_repo
            .find_by_business(business_id)
            .await
            .map_err(internal)
    }

    async fn get(&self, id: Uuid) -> Result<Service, CatalogError> {
        self.service_repo
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or(CatalogError::NotFound)
    }

    async fn create(
        &self,
        actor: Actor,
        business_id: Uuid,
        request: CreateServiceRequest,
    ) -> Result<Service, CatalogError> {
        self.ensure_owner(actor, business_id).await?;

        let mut service = Service::new(business_id, &request.name, request.price, request.duration);
        service.description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        service.requires_deposit = request.requires_deposit;
        service.deposit_amount = request.deposit_amount.filter(|_| request.requires_deposit);
        service.is_active = request.is_active;
        service.check_rules().map_err(CatalogError::InvalidService)?;

        let created = self.service_repo.create(&service).await.map_err(internal)?;
        info!(service_id = %created.id, business_id = %business_id, "Service created");
        Ok(created)
    }

    async fn update(
        &self,
        actor: Actor,
        id: Uuid,
        request: UpdateServiceRequest,
    ) -> Result<Service, CatalogError> {
        let mut service = self.get(id).await?;
        self.ensure_owner(actor, service.business_id).await?;

        if let Some(name) = request.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            service.name = name;
        }
        if let Some(description) = request.description {
            let description = description.trim().to_string();
            service.description = (!description.is_empty()).then_some(description);
        }
        if let Some(price) = request.price {
            service.price = price;
        }
        if let Some(duration) = request.duration {
            service.duration_minutes = duration;
        }
        if let Some(requires_deposit) = request.requires_deposit {
            service.requires_deposit = requires_deposit;
        }
        if request.deposit_amount.is_some() {
            service.deposit_amount = request.deposit_amount;
        }
        if !service.requires_deposit {
            service.deposit_amount = None;
        }
        if let Some(is_active) = request.is_active {
            service.is_active = is_active;
        }
        service.updated_at = Utc::now();
        service.check_rules().map_err(CatalogError::InvalidService)?;

        self.service_repo.update(&service).await.map_err(internal)
    }

    async fn delete(&self, actor: Actor, id: Uuid) -> Result<(), CatalogError> {
        let service = self.get(id).await?;
        self.ensure_owner(actor, service.business_id).await?;

        self.service_repo.delete(id).await.map_err(|e| match e {
            AppError::Conflict(msg) => CatalogError::InUse(msg),
            e => internal(e),
        })
    }
}
