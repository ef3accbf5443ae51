//! Business Service
//!
//! Business listings, geo search, owner-managed CRUD, images and booking
//! settings.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::Actor;
use crate::application::dto::request::{
    BusinessSettingsRequest, CreateBusinessRequest, UpdateBusinessRequest,
};
use crate::domain::{
    Business, BusinessImage, BusinessRepository, BusinessSearch, BusinessSettings, Employee,
    EmployeeRepository, GeoPoint, NoShowPolicy, Service, ServiceRepository, User, UserRepository,
    WorkingHours,
};
use crate::shared::error::AppError;

/// An uploaded image before it is attached to a business.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// A business as shown in lists
#[derive(Debug, Clone)]
pub struct BusinessSummary {
    pub business: Business,
    /// First image, if any
    pub image: Option<BusinessImage>,
    pub distance_km: Option<f64>,
}

/// A business with its owner, catalog and staff
#[derive(Debug, Clone)]
pub struct BusinessDetail {
    pub business: Business,
    pub owner: Option<User>,
    pub services: Vec<Service>,
    pub employees: Vec<Employee>,
}

#[async_trait]
pub trait BusinessService: Send + Sync {
    async fn list_active(&self) -> Result<Vec<BusinessSummary>, BusinessError>;

    async fn get_detail(&self, id: Uuid) -> Result<BusinessDetail, BusinessError>;

    /// Every business of an owner, inactive ones included
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<BusinessSummary>, BusinessError>;

    /// Active businesses within `radius_km`, nearest first
    async fn nearby(
        &self,
        origin: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<BusinessSummary>, BusinessError>;

    async fn search(&self, search: BusinessSearch) -> Result<Vec<BusinessSummary>, BusinessError>;

    async fn list_by_category(&self, category: &str) -> Result<Vec<BusinessSummary>, BusinessError>;

    async fn categories(&self) -> Result<Vec<String>, BusinessError>;

    async fn create(
        &self,
        actor: Actor,
        request: CreateBusinessRequest,
        images: Vec<ImageUpload>,
    ) -> Result<Business, BusinessError>;

    /// Partial update; `images`, when given, replace the current set
    async fn update(
        &self,
        actor: Actor,
        id: Uuid,
        request: UpdateBusinessRequest,
        images: Option<Vec<ImageUpload>>,
    ) -> Result<Business, BusinessError>;

    async fn delete(&self, actor: Actor, id: Uuid) -> Result<(), BusinessError>;

    /// Stored settings, or the defaults when none were saved
    async fn get_settings(&self, id: Uuid) -> Result<BusinessSettings, BusinessError>;

    async fn update_settings(
        &self,
        actor: Actor,
        id: Uuid,
        request: BusinessSettingsRequest,
    ) -> Result<BusinessSettings, BusinessError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BusinessError {
    #[error("Negocio no encontrado")]
    NotFound,

    #[error("No tienes permisos para modificar este negocio")]
    NotOwner,

    #[error("El formato de los horarios de trabajo no es válido")]
    InvalidWorkingHours,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BusinessError> for AppError {
    fn from(err: BusinessError) -> Self {
        match err {
            BusinessError::NotFound => AppError::NotFound(err.to_string()),
            BusinessError::NotOwner => AppError::Forbidden(err.to_string()),
            BusinessError::InvalidWorkingHours => AppError::validation(err.to_string()),
            BusinessError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

fn internal(e: AppError) -> BusinessError {
    BusinessError::Internal(e.to_string())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn to_images(business_id: Uuid, uploads: Vec<ImageUpload>) -> Vec<BusinessImage> {
    uploads
        .into_iter()
        .map(|u| BusinessImage::new(business_id, u.data, u.content_type))
        .collect()
}

/// Resolve the no-show policy from the settings form: an explicit deposit
/// flag wins over the policy name.
fn resolve_policy(requires_deposit: bool, policy: Option<&str>) -> NoShowPolicy {
    if requires_deposit {
        NoShowPolicy::Deposit
    } else {
        match policy.map(NoShowPolicy::from_str) {
            Some(NoShowPolicy::Deposit) | None => NoShowPolicy::None,
            Some(other) => other,
        }
    }
}

/// Businesses within `radius_km` of `origin`, nearest first.
pub fn within_radius(
    businesses: Vec<Business>,
    origin: &GeoPoint,
    radius_km: f64,
) -> Vec<(Business, f64)> {
    let mut found: Vec<(Business, f64)> = businesses
        .into_iter()
        .filter_map(|b| {
            let distance = b.location()?.distance_km(origin);
            (distance <= radius_km).then_some((b, distance))
        })
        .collect();
    found.sort_by(|a, b| a.1.total_cmp(&b.1));
    found
}

pub struct BusinessServiceImpl<B, S, E, U>
where
    B: BusinessRepository,
    S: ServiceRepository,
    E: EmployeeRepository,
    U: UserRepository,
{
    business_repo: Arc<B>,
    service_repo: Arc<S>,
    employee_repo: Arc<E>,
    user_repo: Arc<U>,
}

impl<B, S, E, U> BusinessServiceImpl<B, S, E, U>
where
    B: BusinessRepository,
    S: ServiceRepository,
    E: EmployeeRepository,
    U: UserRepository,
{
    pub fn new(
        business_repo: Arc<B>,
        service_repo: Arc<S>,
        employee_repo: Arc<E>,
        user_repo: Arc<U>,
    ) -> Self {
        Self {
            business_repo,
            service_repo,
            employee_repo,
            user_repo,
        }
    }

    async fn find(&self, id: Uuid) -> Result<Business, BusinessError> {
        self.business_repo
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or(BusinessError::NotFound)
    }

    async fn find_owned(&self, actor: Actor, id: Uuid) -> Result<Business, BusinessError> {
        let business = self.find(id).await?;
        if !business.is_owned_by(actor.user_id) {
            return Err(BusinessError::NotOwner);
        }
        Ok(business)
    }

    /// Attach the first image of each business.
    async fn summarize(
        &self,
        businesses: Vec<(Business, Option<f64>)>,
    ) -> Result<Vec<BusinessSummary>, BusinessError> {
        if businesses.is_empty() {
            return Ok(Vec::new());
        }

        let ids = businesses.iter().map(|(b, _)| b.id).collect();
        let mut images: HashMap<Uuid, BusinessImage> = self
            .business_repo
            .first_images(ids)
            .await
            .map_err(internal)?
            .into_iter()
            .map(|img| (img.business_id, img))
            .collect();

        Ok(businesses
            .into_iter()
            .map(|(business, distance_km)| BusinessSummary {
                image: images.remove(&business.id),
                business,
                distance_km,
            })
            .collect())
    }

    async fn summarize_plain(
        &self,
        businesses: Vec<Business>,
    ) -> Result<Vec<BusinessSummary>, BusinessError> {
        self.summarize(businesses.into_iter().map(|b| (b, None)).collect())
            .await
    }
}

#[async_trait]
impl<B, S, E, U> BusinessService for BusinessServiceImpl<B, S, E, U>
where
    B: BusinessRepository + 'static,
    S: ServiceRepository + 'static,
    E: EmployeeRepository + 'static,
    U: UserRepository + 'static,
{
    async fn list_active(&self) -> Result<Vec<BusinessSummary>, BusinessError> {
        let businesses = self.business_repo.find_active().await.map_err(internal)?;
        self.summarize_plain(businesses).await
    }

    async fn get_detail(&self, id: Uuid) -> Result<BusinessDetail, BusinessError> {
        let business = self.find(id).await?;

        let (owner, services, employees) = futures::try_join!(
            self.user_repo.find_by_id(business.owner_id),
            self.service_repo.find_by_business(id),
            self.employee_repo.find_by_business(id),
        )
        .map_err(internal)?;

        Ok(BusinessDetail {
            business,
            owner,
            services,
            employees,
        })
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<BusinessSummary>, BusinessError> {
        let businesses = self
            .business_repo
            .find_by_owner(owner_id)
            .await
            .map_err(internal)?;
        self.summarize_plain(businesses).await
    }

    #[instrument(skip(self))]
    async fn nearby(
        &self,
        origin: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<BusinessSummary>, BusinessError> {
        let candidates = self
            .business_repo
            .find_active_with_location()
            .await
            .map_err(internal)?;

        let found = within_radius(candidates, &origin, radius_km)
            .into_iter()
            .map(|(b, d)| (b, Some(d)))
            .collect();
        self.summarize(found).await
    }

    async fn search(&self, search: BusinessSearch) -> Result<Vec<BusinessSummary>, BusinessError> {
        let search = BusinessSearch {
            query: trimmed(search.query),
            city: trimmed(search.city),
            category: trimmed(search.category),
        };
        let businesses = self.business_repo.search(&search).await.map_err(internal)?;
        self.summarize_plain(businesses).await
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<BusinessSummary>, BusinessError> {
        let businesses = self
            .business_repo
            .find_by_category(category.trim())
            .await
            .map_err(internal)?;
        self.summarize_plain(businesses).await
    }

    async fn categories(&self) -> Result<Vec<String>, BusinessError> {
        self.business_repo.categories().await.map_err(internal)
    }

    async fn create(
        &self,
        actor: Actor,
        request: CreateBusinessRequest,
        images: Vec<ImageUpload>,
    ) -> Result<Business, BusinessError> {
        let mut business = Business::new(actor.user_id, &request.name, &request.category);
        business.description = trimmed(request.description);
        business.address = request.address.trim().to_string();
        business.city = request.city.trim().to_string();
        business.department = request.department.trim().to_string();
        business.phone = trimmed(request.phone);
        business.email = trimmed(request.email).map(|e| e.to_lowercase());
        business.website = trimmed(request.website);
        business.latitude = request.latitude;
        business.longitude = request.longitude;

        let created = self.business_repo.create(&business).await.map_err(internal)?;

        if !images.is_empty() {
            self.business_repo
                .replace_images(created.id, to_images(created.id, images))
                .await
                .map_err(internal)?;
        }

        info!(business_id = %created.id, owner_id = %actor.user_id, "Business created");
        Ok(created)
    }

    async fn update(
        &self,
        actor: Actor,
        id: Uuid,
        request: UpdateBusinessRequest,
        images: Option<Vec<ImageUpload>>,
    ) -> Result<Business, BusinessError> {
        let mut business = self.find_owned(actor, id).await?;

        if let Some(name) = trimmed(request.name) {
            business.name = name;
        }
        if let Some(description) = request.description {
            business.description = trimmed(Some(description));
        }
        if let Some(category) = trimmed(request.category) {
            business.category = category;
        }
        if let Some(address) = trimmed(request.address) {
            business.address = address;
        }
        if let Some(city) = trimmed(request.city) {
            business.city = city;
        }
        if let Some(department) = trimmed(request.department) {
            business.department = department;
        }
        if let Some(phone) = request.phone {
            business.phone = trimmed(Some(phone));
        }
        if let Some(email) = request.email {
            business.email = trimmed(Some(email)).map(|e| e.to_lowercase());
        }
        if let Some(website) = request.website {
            business.website = trimmed(Some(website));
        }
        if request.latitude.is_some() {
            business.latitude = request.latitude;
        }
        if request.longitude.is_some() {
            business.longitude = request.longitude;
        }
        if let Some(is_active) = request.is_active {
            business.is_active = is_active;
        }
        business.updated_at = Utc::now();

        let updated = self.business_repo.update(&business).await.map_err(internal)?;

        if let Some(images) = images {
            self.business_repo
                .replace_images(id, to_images(id, images))
                .await
                .map_err(internal)?;
        }

        Ok(updated)
    }

    async fn delete(&self, actor: Actor, id: Uuid) -> Result<(), BusinessError> {
        self.find_owned(actor, id).await?;
        self.business_repo.delete_cascade(id).await.map_err(internal)?;

        info!(business_id = %id, "Business deleted with its dependents");
        Ok(())
    }

    async fn get_settings(&self, id: Uuid) -> Result<BusinessSettings, BusinessError> {
        let settings = self.business_repo.find_settings(id).await.map_err(internal)?;
        match settings {
            Some(settings) => Ok(settings),
            None => {
                self.find(id).await?;
                Ok(BusinessSettings::defaults_for(id))
            }
        }
    }

    async fn update_settings(
        &self,
        actor: Actor,
        id: Uuid,
        request: BusinessSettingsRequest,
    ) -> Result<BusinessSettings, BusinessError> {
        self.find_owned(actor, id).await?;

        let working_hours = match trimmed(request.working_hours) {
            Some(json) => {
                let parsed =
                    WorkingHours::from_json(&json).map_err(|_| BusinessError::InvalidWorkingHours)?;
                Some(parsed.to_json())
            }
            None => None,
        };

        let mut settings = self
            .business_repo
            .find_settings(id)
            .await
            .map_err(internal)?
            .unwrap_or_else(|| BusinessSettings::defaults_for(id));

        settings.working_hours = working_hours;
        settings.max_advance_booking_days = request.booking_advance_days;
        settings.free_cancellation_hours = request.cancellation_hours;
        settings.no_show_policy =
            resolve_policy(request.requires_deposit, request.no_show_policy.as_deref());
        settings.slot_duration = request.default_slot_duration;
        settings.buffer_time = request.buffer_time_between_appointments;
        settings.updated_at = Utc::now();

        self.business_repo
            .upsert_settings(&settings)
            .await
            .map_err(internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        MockBusinessRepository, MockEmployeeRepository, MockServiceRepository, MockUserRepository,
        UserRole,
    };
    use pretty_assertions::assert_eq;

    type TestService = BusinessServiceImpl<
        MockBusinessRepository,
        MockServiceRepository,
        MockEmployeeRepository,
        MockUserRepository,
    >;

    fn service_with(business_repo: MockBusinessRepository) -> TestService {
        BusinessServiceImpl::new(
            Arc::new(business_repo),
            Arc::new(MockServiceRepository::new()),
            Arc::new(MockEmployeeRepository::new()),
            Arc::new(MockUserRepository::new()),
        )
    }

    fn located(name: &str, lat: f64, lon: f64) -> Business {
        let mut b = Business::new(Uuid::now_v7(), name, "Barbería");
        b.latitude = Some(lat);
        b.longitude = Some(lon);
        b
    }

    fn settings_request(requires_deposit: bool, policy: Option<&str>) -> BusinessSettingsRequest {
        BusinessSettingsRequest {
            working_hours: None,
            booking_advance_days: 30,
            cancellation_hours: 12,
            requires_deposit,
            no_show_policy: policy.map(String::from),
            default_slot_duration: 45,
            buffer_time_between_appointments: 10,
        }
    }

    // ========================================================================
    // Pure helpers
    // ========================================================================

    #[test]
    fn test_within_radius_sorts_by_distance() {
        // Bogotá center; Chapinero ~4 km, Chía ~25 km, Medellín ~240 km
        let origin = GeoPoint::new(4.6097, -74.0817);
        let businesses = vec![
            located("Chía", 4.8610, -74.0325),
            located("Chapinero", 4.6450, -74.0630),
            located("Medellín", 6.2442, -75.5812),
        ];

        let found = within_radius(businesses, &origin, 30.0);
        let names: Vec<_> = found.iter().map(|(b, _)| b.name.as_str()).collect();
        assert_eq!(names, vec!["Chapinero", "Chía"]);
        assert!(found[0].1 < found[1].1);
    }

    #[test]
    fn test_within_radius_skips_unlocated() {
        let origin = GeoPoint::new(4.6097, -74.0817);
        let unlocated = Business::new(Uuid::now_v7(), "Sin mapa", "Spa");
        assert!(within_radius(vec![unlocated], &origin, 100.0).is_empty());
    }

    #[test]
    fn test_resolve_policy() {
        assert_eq!(resolve_policy(true, Some("Block")), NoShowPolicy::Deposit);
        assert_eq!(resolve_policy(false, Some("Block")), NoShowPolicy::Block);
        assert_eq!(resolve_policy(false, Some("Deposit")), NoShowPolicy::None);
        assert_eq!(resolve_policy(false, None), NoShowPolicy::None);
    }

    // ========================================================================
    // Ownership & Settings
    // ========================================================================

    #[tokio::test]
    async fn test_update_by_non_owner_is_forbidden() {
        let business = Business::new(Uuid::now_v7(), "Spa Zen", "Spa");
        let id = business.id;
        let mut repo = MockBusinessRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(business.clone())));

        let err = service_with(repo)
            .update(
                Actor::new(Uuid::now_v7(), UserRole::BusinessOwner),
                id,
                UpdateBusinessRequest::default(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BusinessError::NotOwner));
    }

    #[tokio::test]
    async fn test_update_replaces_images_when_given() {
        let owner = Uuid::now_v7();
        let business = Business::new(owner, "Spa Zen", "Spa");
        let id = business.id;
        let mut repo = MockBusinessRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(business.clone())));
        repo.expect_update().returning(|b| Ok(b.clone()));
        repo.expect_replace_images()
            .withf(move |bid, images| *bid == id && images.len() == 2)
            .times(1)
            .returning(|_, _| Ok(()));

        let upload = ImageUpload {
            data: vec![0xFF, 0xD8],
            content_type: "image/jpeg".into(),
        };
        let updated = service_with(repo)
            .update(
                Actor::new(owner, UserRole::BusinessOwner),
                id,
                UpdateBusinessRequest {
                    name: Some("  Spa Zen Norte ".into()),
                    ..Default::default()
                },
                Some(vec![upload.clone(), upload]),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Spa Zen Norte");
    }

    #[tokio::test]
    async fn test_settings_default_when_absent() {
        let business = Business::new(Uuid::now_v7(), "Spa Zen", "Spa");
        let id = business.id;
        let mut repo = MockBusinessRepository::new();
        repo.expect_find_settings().returning(|_| Ok(None));
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(business.clone())));

        let settings = service_with(repo).get_settings(id).await.unwrap();
        assert_eq!(settings.max_advance_booking_days, 90);
        assert_eq!(settings.buffer_time, 15);
    }

    #[tokio::test]
    async fn test_settings_reject_malformed_working_hours() {
        let owner = Uuid::now_v7();
        let business = Business::new(owner, "Spa Zen", "Spa");
        let id = business.id;
        let mut repo = MockBusinessRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(business.clone())));

        let mut request = settings_request(false, None);
        request.working_hours = Some("{not json".into());
        let err = service_with(repo)
            .update_settings(Actor::new(owner, UserRole::BusinessOwner), id, request)
            .await
            .unwrap_err();
        assert!(matches!(err, BusinessError::InvalidWorkingHours));
    }

    #[tokio::test]
    async fn test_settings_upsert_maps_form() {
        let owner = Uuid::now_v7();
        let business = Business::new(owner, "Spa Zen", "Spa");
        let id = business.id;
        let mut repo = MockBusinessRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(business.clone())));
        repo.expect_find_settings().returning(|_| Ok(None));
        repo.expect_upsert_settings().returning(|s| Ok(s.clone()));

        let saved = service_with(repo)
            .update_settings(
                Actor::new(owner, UserRole::BusinessOwner),
                id,
                settings_request(true, None),
            )
            .await
            .unwrap();
        assert_eq!(saved.no_show_policy, NoShowPolicy::Deposit);
        assert_eq!(saved.slot_duration, 45);
        assert_eq!(saved.buffer_time, 10);
        assert_eq!(saved.free_cancellation_hours, 12);
    }
}
