//! City Autocomplete Handler

use axum::{
    extract::{Query, State},
    Json,
};

use crate::application::dto::request::CityAutocompleteQuery;
use crate::application::services::{CityService, CityServiceImpl, CitySuggestion};
use crate::infrastructure::cache::{RedisCache, KEY_PREFIX};
use crate::shared::error::AppError;
use crate::startup::AppState;

pub async fn autocomplete(
    State(state): State<AppState>,
    Query(query): Query<CityAutocompleteQuery>,
) -> Result<Json<Vec<CitySuggestion>>, AppError> {
    let nominatim = &state.settings.nominatim;
    let cache = state
        .redis
        .clone()
        .map(|conn| RedisCache::with_prefix(conn, KEY_PREFIX));

    let service = CityServiceImpl::new(
        state.geocoder.clone(),
        cache,
        nominatim.country.clone(),
        nominatim.cache_ttl_seconds,
    );
    let suggestions = service
        .autocomplete(query.query.as_deref(), query.department.as_deref())
        .await?;
    Ok(Json(suggestions))
}
