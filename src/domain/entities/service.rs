//! Bookable service entity and repository trait.
//!
//! Maps to the `services` table.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Shortest bookable service, in minutes.
pub const MIN_SERVICE_DURATION: i32 = 5;

/// Longest bookable service, in minutes (8 hours).
pub const MAX_SERVICE_DURATION: i32 = 480;

/// Something a business sells by appointment: a haircut, a massage, a consult.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    /// Length in minutes
    pub duration_minutes: i32,
    pub requires_deposit: bool,
    pub deposit_amount: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Service {
    pub fn new(business_id: Uuid, name: &str, price: Decimal, duration_minutes: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            business_id,
            name: name.trim().to_string(),
            description: None,
            price,
            duration_minutes,
            requires_deposit: false,
            deposit_amount: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Deposit charged when booking, zero when none is required.
    pub fn booking_deposit(&self) -> Decimal {
        if self.requires_deposit {
            self.deposit_amount.unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }

    /// Check price, duration and deposit consistency, returning the first problem.
    pub fn check_rules(&self) -> Result<(), String> {
        if self.price <= Decimal::ZERO {
            return Err("El precio debe ser mayor a cero".into());
        }
        if !(MIN_SERVICE_DURATION..=MAX_SERVICE_DURATION).contains(&self.duration_minutes) {
            return Err(format!(
                "La duración debe estar entre {} y {} minutos",
                MIN_SERVICE_DURATION, MAX_SERVICE_DURATION
            ));
        }
        if self.requires_deposit {
            match self.deposit_amount {
                Some(deposit) if deposit > Decimal::ZERO && deposit <= self.price => {}
                _ => {
                    return Err(
                        "El depósito debe ser mayor a cero y no superar el precio".into(),
                    )
                }
            }
        }
        Ok(())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Service>, AppError>;

    async fn find_by_business(&self, business_id: Uuid) -> Result<Vec<Service>, AppError>;

    async fn create(&self, service: &Service) -> Result<Service, AppError>;

    async fn update(&self, service: &Service) -> Result<Service, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> Service {
        Service::new(Uuid::now_v7(), "Corte clásico", Decimal::new(25000, 0), 30)
    }

    #[test]
    fn test_valid_service_passes_rules() {
        assert!(create_test_service().check_rules().is_ok());
    }

    #[test]
    fn test_zero_price_is_rejected() {
        let mut service = create_test_service();
        service.price = Decimal::ZERO;
        assert!(service.check_rules().is_err());
    }

    #[test]
    fn test_duration_bounds() {
        let mut service = create_test_service();
        service.duration_minutes = 4;
        assert!(service.check_rules().is_err());
        service.duration_minutes = 481;
        assert!(service.check_rules().is_err());
        service.duration_minutes = 480;
        assert!(service.check_rules().is_ok());
    }

    #[test]
    fn test_deposit_must_not_exceed_price() {
        let mut service = create_test_service();
        service.requires_deposit = true;
        service.deposit_amount = None;
        assert!(service.check_rules().is_err());

        service.deposit_amount = Some(Decimal::new(30000, 0));
        assert!(service.check_rules().is_err());

        service.deposit_amount = Some(Decimal::new(10000, 0));
        assert!(service.check_rules().is_ok());
        assert_eq!(service.booking_deposit(), Decimal::new(10000, 0));
    }

    #[test]
    fn test_no_deposit_when_not_required() {
        let mut service = create_test_service();
        service.deposit_amount = Some(Decimal::new(5000, 0));
        assert_eq!(service.booking_deposit(), Decimal::ZERO);
    }

    #[test]
    fn test_duration() {
        assert_eq!(create_test_service().duration(), Duration::minutes(30));
    }
}
