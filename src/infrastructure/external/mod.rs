//! Outbound HTTP integrations.
//!
//! - **wompi**: payment gateway transactions and webhook signatures
//! - **nominatim**: OpenStreetMap place search for city autocomplete

pub mod nominatim;
pub mod wompi;

pub use nominatim::{Geocoder, NominatimAddress, NominatimClient, NominatimPlace};
pub use wompi::{verify_signature, GatewayTransaction, PaymentGateway, WompiClient};

#[cfg(test)]
pub use nominatim::MockGeocoder;
#[cfg(test)]
pub use wompi::MockPaymentGateway;

use std::time::Duration;

/// Timeout applied to every outbound request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared reqwest client for outbound integrations.
pub fn build_http_client(user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(user_agent)
        .build()
}
