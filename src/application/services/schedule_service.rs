//! Schedule Service
//!
//! Weekly schedules of businesses and employees. One implementation serves
//! both scopes; writes require the owner of the business the schedule
//! belongs to.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::Actor;
use crate::application::dto::request::{CreateScheduleRequest, UpdateScheduleRequest};
use crate::domain::{
    BusinessRepository, EmployeeRepository, Schedule, ScheduleRepository, ScheduleScope,
};
use crate::shared::error::AppError;

#[async_trait]
pub trait ScheduleService: Send + Sync {
    fn scope(&self) -> ScheduleScope;

    async fn get(&self, owner_id: Uuid) -> Result<Schedule, ScheduleError>;

    async fn create(
        &self,
        actor: Actor,
        request: CreateScheduleRequest,
    ) -> Result<Schedule, ScheduleError>;

    async fn update(
        &self,
        actor: Actor,
        owner_id: Uuid,
        request: UpdateScheduleRequest,
    ) -> Result<Schedule, ScheduleError>;

    /// Idempotent
    async fn delete(&self, actor: Actor, owner_id: Uuid) -> Result<(), ScheduleError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// Carries the scope-specific message
    #[error("{0}")]
    NotFound(&'static str),

    #[error("Negocio no encontrado")]
    BusinessNotFound,

    #[error("Empleado no encontrado")]
    EmployeeNotFound,

    #[error("Ya existe un horario registrado")]
    AlreadyExists,

    #[error("No tienes permisos para modificar este horario")]
    NotOwner,

    #[error("{0}")]
    Invalid(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::NotFound(_)
            | ScheduleError::BusinessNotFound
            | ScheduleError::EmployeeNotFound => AppError::NotFound(err.to_string()),
            ScheduleError::AlreadyExists => AppError::Conflict(err.to_string()),
            ScheduleError::NotOwner => AppError::Forbidden(err.to_string()),
            ScheduleError::Invalid(msg) => AppError::validation(msg),
            ScheduleError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

fn internal(e: AppError) -> ScheduleError {
    ScheduleError::Internal(e.to_string())
}

pub struct ScheduleServiceImpl<S, B, E>
where
    S: ScheduleRepository,
    B: BusinessRepository,
    E: EmployeeRepository,
{
    scope: ScheduleScope,
    schedule_repo: Arc<S>,
    business_repo: Arc<B>,
    employee_repo: Arc<E>,
}

impl<S, B, E> ScheduleServiceImpl<S, B, E>
where
    S: ScheduleRepository,
    B: BusinessRepository,
    E: EmployeeRepository,
{
    pub fn new(
        scope: ScheduleScope,
        schedule_repo: Arc<S>,
        business_repo: Arc<B>,
        employee_repo: Arc<E>,
    ) -> Self {
        Self {
            scope,
            schedule_repo,
            business_repo,
            employee_repo,
        }
    }

    /// The business an owner id resolves to in this scope.
    async fn business_of(&self, owner_id: Uuid) -> Result<Uuid, ScheduleError> {
        match self.scope {
            ScheduleScope::Business => Ok(owner_id),
            ScheduleScope::Employee => self
                .employee_repo
                .find_by_id(owner_id)
                .await
                .map_err(internal)?
                .map(|e| e.business_id)
                .ok_or(ScheduleError::EmployeeNotFound),
        }
    }

    async fn ensure_owner(&self, actor: Actor, owner_id: Uuid) -> Result<(), ScheduleError> {
        let business_id = self.business_of(owner_id).await?;
        let business = self
            .business_repo
            .find_by_id(business_id)
            .await
            .map_err(internal)?
            .ok_or(ScheduleError::BusinessNotFound)?;
        if !business.is_owned_by(actor.user_id) {
            return Err(ScheduleError::NotOwner);
        }
        Ok(())
    }
}

#[async_trait]
impl<S, B, E> ScheduleService for ScheduleServiceImpl<S, B, E>
where
    S: ScheduleRepository + 'static,
    B: BusinessRepository + 'static,
    E: EmployeeRepository + 'static,
{
    fn scope(&self) -> ScheduleScope {
        self.scope
    }

    async fn get(&self, owner_id: Uuid) -> Result<Schedule, ScheduleError> {
        self.schedule_repo
            .find(owner_id)
            .await
            .map_err(internal)?
            .ok_or(ScheduleError::NotFound(self.scope.missing_message()))
    }

    async fn create(
        &self,
        actor: Actor,
        request: CreateScheduleRequest,
    ) -> Result<Schedule, ScheduleError> {
        self.ensure_owner(actor, request.owner_id).await?;

        let schedule = Schedule::new(
            request.owner_id,
            request.appointment_duration,
            request.working_days,
        );
        schedule.check_rules().map_err(ScheduleError::Invalid)?;

        if self
            .schedule_repo
            .find(request.owner_id)
            .await
            .map_err(internal)?
            .is_some()
        {
            return Err(ScheduleError::AlreadyExists);
        }

        let created = self.schedule_repo.create(&schedule).await.map_err(|e| match e {
            AppError::Conflict(_) => ScheduleError::AlreadyExists,
            e => internal(e),
        })?;

        info!(owner_id = %created.owner_id, scope = ?self.scope, "Schedule created");
        Ok(created)
    }

    async fn update(
        &self,
        actor: Actor,
        owner_id: Uuid,
        request: UpdateScheduleRequest,
    ) -> Result<Schedule, ScheduleError> {
        self.ensure_owner(actor, owner_id).await?;
        let mut schedule = self.get(owner_id).await?;

        if let Some(duration) = request.appointment_duration {
            schedule.appointment_duration = duration;
        }
        schedule.working_days = request.working_days;
        schedule.updated_at = Utc::now();
        schedule.check_rules().map_err(ScheduleError::Invalid)?;

        self.schedule_repo.update(&schedule).await.map_err(|e| match e {
            AppError::NotFound(_) => ScheduleError::NotFound(self.scope.missing_message()),
            e => internal(e),
        })
    }

    async fn delete(&self, actor: Actor, owner_id: Uuid) -> Result<(), ScheduleError> {
        self.ensure_owner(actor, owner_id).await?;
        self.schedule_repo.delete(owner_id).await.map_err(internal)
    }
}
