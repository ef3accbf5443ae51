//! Nominatim (OpenStreetMap) place search.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::config::NominatimSettings;
use crate::shared::error::AppError;

/// Result limit asked of Nominatim before ranking.
pub const SEARCH_LIMIT: u32 = 15;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NominatimAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub hamlet: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
}

/// One `/search` result, reduced to the fields we rank on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NominatimPlace {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub lat: String,
    #[serde(default)]
    pub lon: String,
    #[serde(rename = "class", default)]
    pub class: String,
    #[serde(rename = "type", default)]
    pub place_type: String,
    pub address: Option<NominatimAddress>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Free-text search; `query` is sent as-is.
    async fn search(&self, query: &str) -> Result<Vec<NominatimPlace>, AppError>;
}

/// reqwest-backed Nominatim client.
#[derive(Clone)]
pub struct NominatimClient {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    /// `http` should carry the configured User-Agent; Nominatim rejects
    /// anonymous clients.
    pub fn new(http: reqwest::Client, settings: &NominatimSettings) -> Self {
        Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<NominatimPlace>, AppError> {
        let limit = SEARCH_LIMIT.to_string();
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("addressdetails", "1"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Nominatim request failed");
                AppError::Upstream {
                    status: 502,
                    message: "Error contacting Nominatim".to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message: "Error contacting Nominatim".to_string(),
            });
        }

        response.json::<Vec<NominatimPlace>>().await.map_err(|e| {
            warn!(error = %e, "Unreadable Nominatim response");
            AppError::Upstream {
                status: 502,
                message: "Error contacting Nominatim".to_string(),
            }
        })
    }
}
