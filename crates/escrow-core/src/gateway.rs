//! # Escrow Gateway Trait
//!
//! Seam between checkout and a hosted-checkout escrow provider.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    EscrowGateway (trait)                    │
//! │  ├── create_transaction()   POST to the provider            │
//! │  ├── checkout_url()         hosted checkout redirect        │
//! │  └── descriptor()           how checkout lists the gateway  │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                   ┌────────┴────────┐
//!                   │ VesicashGateway │
//!                   └─────────────────┘
//! ```

use crate::error::{GatewayError, GatewayResult};
use crate::item::ItemId;
use crate::purchase::{CheckoutRedirect, PurchaseData, TransactionResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// An escrow provider with a hosted checkout page.
#[async_trait]
pub trait EscrowGateway: Send + Sync {
    /// Register the purchase with the provider.
    ///
    /// Exactly one outbound call, never retried. Any non-success answer is an
    /// error.
    async fn create_transaction(
        &self,
        purchase: &PurchaseData,
        item: &ItemId,
    ) -> GatewayResult<TransactionResult>;

    /// Hosted checkout URL for a transaction.
    fn checkout_url(&self, transaction_id: &str) -> GatewayResult<String>;

    /// Gateway identifier used in purchase data (e.g. "Vesicash").
    fn gateway_id(&self) -> &'static str;

    /// How the gateway is listed among enabled gateways.
    fn descriptor(&self) -> GatewayDescriptor;

    /// Create the transaction and build the buyer redirect.
    async fn begin_checkout(
        &self,
        purchase: &PurchaseData,
        item: &ItemId,
    ) -> GatewayResult<CheckoutRedirect> {
        let result = self.create_transaction(purchase, item).await?;
        let url = self.checkout_url(&result.transaction_id)?;
        Ok(CheckoutRedirect {
            transaction_id: result.transaction_id,
            url,
        })
    }
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedEscrowGateway = Arc<dyn EscrowGateway>;

/// Labels and capabilities of a gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayDescriptor {
    pub admin_label: String,
    pub checkout_label: String,
    #[serde(default)]
    pub supports: Vec<String>,
}

impl GatewayDescriptor {
    /// Descriptor with the same admin and checkout label
    pub fn labelled(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            admin_label: label.clone(),
            checkout_label: label,
            supports: Vec::new(),
        }
    }

    /// Builder: add a supported feature
    pub fn with_support(mut self, feature: impl Into<String>) -> Self {
        self.supports.push(feature.into());
        self
    }
}

/// Gateways enabled for checkout.
///
/// The configured set is cloned per request; checkout stages mutate only
/// their clone.
#[derive(Debug, Clone, Serialize)]
pub struct GatewaySet {
    gateways: BTreeMap<String, GatewayDescriptor>,
    default_gateway: String,
}

impl GatewaySet {
    /// Create a set with a default gateway
    pub fn new(default_gateway: impl Into<String>) -> Self {
        Self {
            gateways: BTreeMap::new(),
            default_gateway: default_gateway.into(),
        }
    }

    /// Enable a gateway
    pub fn enable(&mut self, id: impl Into<String>, descriptor: GatewayDescriptor) {
        self.gateways.insert(id.into(), descriptor);
    }

    /// Builder: enable a gateway
    pub fn with_gateway(mut self, id: impl Into<String>, descriptor: GatewayDescriptor) -> Self {
        self.enable(id, descriptor);
        self
    }

    /// Check if a gateway is enabled
    pub fn is_enabled(&self, id: &str) -> bool {
        self.gateways.contains_key(id)
    }

    /// Get a gateway descriptor
    pub fn get(&self, id: &str) -> Option<&GatewayDescriptor> {
        self.gateways.get(id)
    }

    /// The default gateway id
    pub fn default_gateway(&self) -> &str {
        &self.default_gateway
    }

    /// Requested gateway if enabled, otherwise the default
    pub fn select(&self, requested: Option<&str>) -> String {
        match requested {
            Some(id) if self.is_enabled(id) => id.to_string(),
            _ => self.default_gateway.clone(),
        }
    }

    /// List enabled gateway ids
    pub fn ids(&self) -> Vec<&str> {
        self.gateways.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}

/// Join a checkout base and a provider transaction id.
///
/// The id must be a single URL path segment (ASCII alphanumerics, `-`, `_`).
pub fn join_checkout_url(base: &str, transaction_id: &str) -> GatewayResult<String> {
    let valid = !transaction_id.is_empty()
        && transaction_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !valid {
        return Err(GatewayError::InvalidRedirect(format!(
            "transaction id is not a valid path segment: {:?}",
            transaction_id
        )));
    }

    Ok(format!("{}/{}", base.trim_end_matches('/'), transaction_id))
}
