//! Employee Service
//!
//! Staff of a business. Writes are limited to the business owner.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::Actor;
use crate::application::dto::request::{CreateEmployeeRequest, UpdateEmployeeRequest};
use crate::domain::{BusinessRepository, Employee, EmployeeRepository};
use crate::shared::error::AppError;

#[async_trait]
pub trait EmployeeService: Send + Sync {
    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Employee>, EmployeeError>;

    async fn get(&self, id: Uuid) -> Result<Employee, EmployeeError>;

    async fn create(
        &self,
        actor: Actor,
        business_id: Uuid,
        request: CreateEmployeeRequest,
    ) -> Result<Employee, EmployeeError>;

    async fn update(
        &self,
        actor: Actor,
        id: Uuid,
        request: UpdateEmployeeRequest,
    ) -> Result<Employee, EmployeeError>;

    async fn delete(&self, actor: Actor, id: Uuid) -> Result<(), EmployeeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EmployeeError {
    #[error("Empleado no encontrado")]
    NotFound,

    #[error("Negocio no encontrado")]
    BusinessNotFound,

    #[error("No tienes permisos para modificar este negocio")]
    NotOwner,

    #[error("{0}")]
    InUse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EmployeeError> for AppError {
    fn from(err: EmployeeError) -> Self {
        match err {
            EmployeeError::NotFound | EmployeeError::BusinessNotFound => {
                AppError::NotFound(err.to_string())
            }
            EmployeeError::NotOwner => AppError::Forbidden(err.to_string()),
            EmployeeError::InUse(msg) => AppError::Conflict(msg),
            EmployeeError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

fn internal(e: AppError) -> EmployeeError {
    EmployeeError::Internal(e.to_string())
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub struct EmployeeServiceImpl<B, E>
where
    B: BusinessRepository,
    E: EmployeeRepository,
{
    business_repo: Arc<B>,
    employee_repo: Arc<E>,
}

impl<B, E> EmployeeServiceImpl<B, E>
where
    B: BusinessRepository,
    E: EmployeeRepository,
{
    pub fn new(business_repo: Arc<B>, employee_repo: Arc<E>) -> Self {
        Self {
            business_repo,
            employee_repo,
        }
    }

    async fn ensure_owner(&self, actor: Actor, business_id: Uuid) -> Result<(), EmployeeError> {
        let business = self
            .business_repo
            .find_by_id(business_id)
            .await
            .map_err(internal)?
            .ok_or(EmployeeError::BusinessNotFound)?;
        if !business.is_owned_by(actor.user_id) {
            return Err(EmployeeError::NotOwner);
        }
        Ok(())
    }
}

#[async_trait]
impl<B, E> EmployeeService for EmployeeServiceImpl<B, E>
where
    B: BusinessRepository + 'static,
    E: EmployeeRepository + 'static,
{
    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Employee>, EmployeeError> {
        self.employee_repo
            .find_by_business(business_id)
            .await
            .map_err(internal)
    }

    async fn get(&self, id: Uuid) -> Result<Employee, EmployeeError> {
        self.employee_repo
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or(EmployeeError::NotFound)
    }

    async fn create(
        &self,
        actor: Actor,
        business_id: Uuid,
        request: CreateEmployeeRequest,
    ) -> Result<Employee, EmployeeError> {
        self.ensure_owner(actor, business_id).await?;

        let mut employee = Employee::new(business_id, &request.first_name, &request.last_name);
        employee.phone = clean(request.phone);
        employee.email = clean(request.email).map(|e| e.to_lowercase());
        employee.position = clean(request.position);
        employee.bio = clean(request.bio);
        employee.profile_picture_url = clean(request.profile_picture_url);
        employee.is_active = request.is_active;

        let created = self.employee_repo.create(&employee).await.map_err(internal)?;
        info!(employee_id = %created.id, business_id = %business_id, "Employee created");
        Ok(created)
    }

    async fn update(
        &self,
        actor: Actor,
        id: Uuid,
        request: UpdateEmployeeRequest,
    ) -> Result<Employee, EmployeeError> {
        let mut employee = self.get(id).await?;
        self.ensure_owner(actor, employee.business_id).await?;

        if let Some(first_name) = clean(request.first_name) {
            employee.first_name = first_name;
        }
        if let Some(last_name) = clean(request.last_name) {
            employee.last_name = last_name;
        }
        if request.phone.is_some() {
            employee.phone = clean(request.phone);
        }
        if request.email.is_some() {
            employee.email = clean(request.email).map(|e| e.to_lowercase());
        }
        if request.position.is_some() {
            employee.position = clean(request.position);
        }
        if request.bio.is_some() {
            employee.bio = clean(request.bio);
        }
        if request.profile_picture_url.is_some() {
            employee.profile_picture_url = clean(request.profile_picture_url);
        }
        if let Some(is_active) = request.is_active {
            employee.is_active = is_active;
        }
        employee.updated_at = Utc::now();

        self.employee_repo.update(&employee).await.map_err(internal)
    }

    async fn delete(&self, actor: Actor, id: Uuid) -> Result<(), EmployeeError> {
        let employee = self.get(id).await?;
        self.ensure_owner(actor, employee.business_id).await?;

        self.employee_repo.delete(id).await.map_err(|e| match e {
            AppError::Conflict(msg) => EmployeeError::InUse(msg),
            e => internal(e),
        })
    }
}
