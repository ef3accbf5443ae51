//! City Service
//!
//! Colombian city autocomplete backed by Nominatim, cached in Redis when
//! one is configured.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::infrastructure::cache::{keys, Cache};
use crate::infrastructure::external::{Geocoder, NominatimPlace};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Suggestions returned per query.
pub const MAX_SUGGESTIONS: usize = 10;

const SETTLEMENT_TYPES: [&str; 5] = ["city", "town", "village", "hamlet", "locality"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySuggestion {
    pub name: String,
    pub state: Option<String>,
    pub lat: String,
    pub lon: String,
}

#[async_trait]
pub trait CityService: Send + Sync {
    async fn autocomplete(
        &self,
        query: Option<&str>,
        department: Option<&str>,
    ) -> Result<Vec<CitySuggestion>, CityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CityError {
    #[error("Query is required.")]
    QueryRequired,

    #[error(transparent)]
    Upstream(AppError),
}

impl From<CityError> for AppError {
    fn from(err: CityError) -> Self {
        match err {
            CityError::QueryRequired => AppError::BadRequest(err.to_string()),
            CityError::Upstream(e) => e,
        }
    }
}

fn is_settlement(place: &NominatimPlace) -> bool {
    place.class == "place" && SETTLEMENT_TYPES.contains(&place.place_type.as_str())
}

fn place_name(place: &NominatimPlace) -> String {
    place
        .address
        .as_ref()
        .and_then(|a| {
            a.city
                .as_ref()
                .or(a.town.as_ref())
                .or(a.village.as_ref())
                .or(a.hamlet.as_ref())
                .or(a.locality.as_ref())
        })
        .cloned()
        .unwrap_or_else(|| {
            place
                .display_name
                .split(',')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        })
}

/// Settlements first, then by display name; one entry per name.
pub fn rank_places(mut places: Vec<NominatimPlace>) -> Vec<CitySuggestion> {
    // Stable sort keeps Nominatim's order among equal display names
    places.sort_by(|a, b| {
        is_settlement(b)
            .cmp(&is_settlement(a))
            .then_with(|| a.display_name.cmp(&b.display_name))
    });

    let mut seen = HashSet::new();
    places
        .into_iter()
        .filter_map(|place| {
            let name = place_name(&place);
            if !seen.insert(name.to_lowercase()) {
                return None;
            }
            Some(CitySuggestion {
                name,
                state: place.address.and_then(|a| a.state),
                lat: place.lat,
                lon: place.lon,
            })
        })
        .take(MAX_SUGGESTIONS)
        .collect()
}

pub struct CityServiceImpl<G, C>
where
    G: Geocoder + ?Sized,
    C: Cache,
{
    geocoder: Arc<G>,
    cache: Option<C>,
    country: String,
    cache_ttl_seconds: u64,
}

impl<G, C> CityServiceImpl<G, C>
where
    G: Geocoder + ?Sized,
    C: Cache,
{
    pub fn new(
        geocoder: Arc<G>,
        cache: Option<C>,
        country: impl Into<String>,
        cache_ttl_seconds: u64,
    ) -> Self {
        Self {
            geocoder,
            cache,
            country: country.into(),
            cache_ttl_seconds,
        }
    }

    fn search_text(&self, query: &str, department: Option<&str>) -> String {
        let mut parts = vec![query];
        if let Some(department) = department {
            parts.push(department);
        }
        if !self.country.is_empty() {
            parts.push(&self.country);
        }
        parts.join(", ")
    }

    async fn cached(&self, key: &str) -> Option<Vec<CitySuggestion>> {
        let cache = self.cache.as_ref()?;
        match cache.get::<Vec<CitySuggestion>>(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "City cache read failed");
                None
            }
        }
    }
}

#[async_trait]
impl<G, C> CityService for CityServiceImpl<G, C>
where
    G: Geocoder + ?Sized + 'static,
    C: Cache + 'static,
{
    async fn autocomplete(
        &self,
        query: Option<&str>,
        department: Option<&str>,
    ) -> Result<Vec<CitySuggestion>, CityError> {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(CityError::QueryRequired)?;
        let department = department.map(str::trim).filter(|d| !d.is_empty());

        let key = keys::city_search(query, department);
        if let Some(hit) = self.cached(&key).await {
            debug!(key = %key, "City cache hit");
            metrics::record_geocoding("cache");
            return Ok(hit);
        }

        let places = self
            .geocoder
            .search(&self.search_text(query, department))
            .await
            .map_err(CityError::Upstream)?;
        metrics::record_geocoding("nominatim");

        let suggestions = rank_places(places);
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set_ex(&key, &suggestions, self.cache_ttl_seconds).await {
                warn!(error = %e, "City cache write failed");
            }
        }
        Ok(suggestions)
    }
}
