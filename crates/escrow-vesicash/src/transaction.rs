//! # Vesicash Transactions
//!
//! Server-to-server transaction creation and hosted checkout redirect.
//! One `POST transactions/create` per purchase, never retried. The endpoint
//! takes no idempotency key.

use crate::config::VesicashConfig;
use async_trait::async_trait;
use escrow_core::{
    join_checkout_url, EscrowGateway, GatewayDescriptor, GatewayError, GatewayResult, ItemId,
    PurchaseData, TransactionResult,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

/// Gateway id used in purchase data and the enabled gateway set
pub const VESICASH_GATEWAY_ID: &str = "Vesicash";

/// Endpoint path for transaction creation, relative to the API base
pub const CREATE_TRANSACTION_PATH: &str = "transactions/create";

/// Header carrying the private key
pub const PRIVATE_KEY_HEADER: &str = "V-PRIVATE-KEY";

/// Vesicash escrow gateway
///
/// Registers each purchase as a Vesicash transaction and sends the buyer to
/// the hosted checkout page for it.
pub struct VesicashGateway {
    config: VesicashConfig,
    client: Client,
}

impl VesicashGateway {
    /// Create a new gateway. Fails if either credential is missing.
    pub fn new(config: VesicashConfig) -> GatewayResult<Self> {
        if !config.is_complete() {
            return Err(GatewayError::Configuration(
                "Vesicash business id and secret key are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> GatewayResult<Self> {
        let config = VesicashConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &VesicashConfig {
        &self.config
    }

    /// Build the order-detail payload for the API
    fn build_request(&self, purchase: &PurchaseData, item: &ItemId) -> CreateTransactionRequest {
        let products = purchase
            .downloads
            .iter()
            .map(|line| TransactionProduct {
                title: line.name.clone(),
                quantity: line.quantity,
                amount: line.unit_price.as_decimal(),
            })
            .collect::<Vec<_>>();

        let primary = purchase.primary_download();
        let title = primary
            .map(|d| d.name.clone())
            .unwrap_or_else(|| format!("Purchase {}", purchase.purchase_key));
        let description = primary
            .map(|d| d.description.clone())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| title.clone());

        CreateTransactionRequest {
            business_id: self.config.business_id.clone(),
            item: item.to_string(),
            reference: purchase.purchase_key.clone(),
            title,
            description,
            transaction_type: "product".to_string(),
            quantity: purchase.item_count(),
            amount: purchase.total().as_decimal(),
            currency: purchase.currency.to_string(),
            buyer: TransactionBuyer {
                email: purchase.buyer.email.clone(),
                first_name: purchase.buyer.first_name.clone(),
                last_name: purchase.buyer.last_name.clone(),
            },
            products,
        }
    }
}

#[async_trait]
impl EscrowGateway for VesicashGateway {
    #[instrument(skip(self, purchase, item), fields(purchase_key = %purchase.purchase_key, item = %item))]
    async fn create_transaction(
        &self,
        purchase: &PurchaseData,
        item: &ItemId,
    ) -> GatewayResult<TransactionResult> {
        if purchase.downloads.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "Purchase has no downloads".to_string(),
            ));
        }

        let request = self.build_request(purchase, item);
        let url = self.config.endpoint(CREATE_TRANSACTION_PATH);

        debug!(
            "Creating Vesicash transaction: {} products, amount={} {}",
            request.products.len(),
            request.amount,
            request.currency
        );

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(PRIVATE_KEY_HEADER, &self.config.secret_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Vesicash request failed: {}", e);
                GatewayError::NetworkError(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

        let envelope: ApiEnvelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                error!("Unparseable Vesicash response: status={}, body={}", status, body);
                return Err(GatewayError::Serialization(format!(
                    "Failed to parse Vesicash response: {}",
                    e
                )));
            }
            Err(_) => {
                error!("Vesicash API error: status={}, body={}", status, body);
                return Err(GatewayError::ProviderError {
                    provider: VESICASH_GATEWAY_ID.to_string(),
                    message: format!("HTTP {}: {}", status, body),
                });
            }
        };

        if envelope.status != "ok" {
            error!(
                "Vesicash transaction rejected: http={}, status={}, message={:?}",
                status, envelope.status, envelope.message
            );
            return Err(GatewayError::ProviderError {
                provider: VESICASH_GATEWAY_ID.to_string(),
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("status {}", envelope.status)),
            });
        }

        let data: TransactionData = envelope
            .data
            .ok_or_else(|| GatewayError::Serialization("Missing transaction data".to_string()))
            .and_then(|data| {
                serde_json::from_value(data).map_err(|e| {
                    GatewayError::Serialization(format!("Malformed transaction data: {}", e))
                })
            })?;

        info!(
            "Created Vesicash transaction: id={}",
            data.transaction.transaction_id
        );

        Ok(TransactionResult::new(
            VESICASH_GATEWAY_ID,
            envelope.status,
            data.transaction.transaction_id,
            purchase.purchase_key.clone(),
        ))
    }

    fn checkout_url(&self, transaction_id: &str) -> GatewayResult<String> {
        join_checkout_url(self.config.checkout_base(), transaction_id)
    }

    fn gateway_id(&self) -> &'static str {
        VESICASH_GATEWAY_ID
    }

    fn descriptor(&self) -> GatewayDescriptor {
        vesicash_descriptor()
    }
}

/// Checkout listing for Vesicash
pub fn vesicash_descriptor() -> GatewayDescriptor {
    GatewayDescriptor::labelled("Vesicash").with_support("Pay With Vesicash Escrow")
}

// =============================================================================
// Vesicash API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct CreateTransactionRequest {
    business_id: String,
    item: String,
    reference: String,
    title: String,
    description: String,
    #[serde(rename = "type")]
    transaction_type: String,
    quantity: u32,
    amount: f64,
    currency: String,
    buyer: TransactionBuyer,
    products: Vec<TransactionProduct>,
}

#[derive(Debug, Serialize)]
struct TransactionBuyer {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct TransactionProduct {
    title: String,
    quantity: u32,
    amount: f64,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    transaction: TransactionRecord,
}

#[derive(Debug, Deserialize)]
struct TransactionRecord {
    transaction_id: String,
}
