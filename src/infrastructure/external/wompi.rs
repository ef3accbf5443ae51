//! Wompi payment gateway client.
//!
//! Transactions are created with `POST {base}/v1/transactions`, authenticated
//! with the merchant private key. Event webhooks are authenticated with an
//! HMAC-SHA256 of the raw body keyed by the events secret.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, instrument, warn};

use crate::config::WompiSettings;
use crate::shared::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Body of a transaction creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayTransaction {
    pub amount_in_cents: i64,
    pub currency: String,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
struct TransactionEnvelope {
    data: Option<TransactionData>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    id: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register a transaction, returning the gateway id when one is assigned.
    async fn create_transaction(
        &self,
        transaction: &GatewayTransaction,
    ) -> Result<Option<String>, AppError>;
}

/// reqwest-backed Wompi client.
#[derive(Clone)]
pub struct WompiClient {
    http: reqwest::Client,
    base_url: String,
    private_key: String,
}

impl WompiClient {
    pub fn new(http: reqwest::Client, settings: &WompiSettings) -> Self {
        Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            private_key: settings.private_key.clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for WompiClient {
    #[instrument(skip(self, transaction), fields(reference = %transaction.reference))]
    async fn create_transaction(
        &self,
        transaction: &GatewayTransaction,
    ) -> Result<Option<String>, AppError> {
        let response = self
            .http
            .post(format!("{}/v1/transactions", self.base_url))
            .bearer_auth(&self.private_key)
            .json(transaction)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Wompi request failed");
                AppError::Upstream {
                    status: 502,
                    message: "Error contacting Wompi".to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Wompi rejected transaction");
            return Err(AppError::Upstream {
                status: 502,
                message: format!("Wompi rejected the transaction ({})", status.as_u16()),
            });
        }

        // The id is informative only; an unexpected body is not a failure
        let id = response
            .json::<TransactionEnvelope>()
            .await
            .ok()
            .and_then(|envelope| envelope.data)
            .and_then(|data| data.id);
        debug!(wompi_id = ?id, "Wompi transaction created");

        Ok(id)
    }
}

/// Check a webhook signature: lowercase hex HMAC-SHA256 of `body`.
///
/// Hex case is ignored. An empty secret or signature never verifies.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let signature = signature.trim();
    if secret.is_empty() || signature.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Signature the gateway would send for `body`.
pub fn sign(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}
