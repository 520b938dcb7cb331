//! # Vesicash Confirmation Callback
//!
//! Vesicash sends the buyer back with payment confirmation data in the query
//! string. All of [`REQUIRED_CONFIRMATION_PARAMS`] present and non-empty is the
//! trigger; anything less is not a confirmation.

use escrow_core::{GatewayError, GatewayResult, ItemId, ItemRegistry, ProductId};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// Query parameters that make up a confirmation callback
pub const REQUIRED_CONFIRMATION_PARAMS: &[&str] =
    &["item", "vesicash_receipt", "time", "cbpop", "cname", "cemail"];

/// Parsed confirmation callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationParams {
    pub item: ItemId,
    pub receipt: String,
    pub time: String,
    pub cbpop: String,
    pub customer_name: String,
    pub customer_email: String,
}

impl ConfirmationParams {
    /// True when every required parameter is present and non-empty
    pub fn is_triggered(query: &HashMap<String, String>) -> bool {
        missing_params(query).is_empty()
    }

    /// Parse from a query map
    pub fn from_query(query: &HashMap<String, String>) -> GatewayResult<Self> {
        let missing = missing_params(query);
        if !missing.is_empty() {
            return Err(GatewayError::IncompleteConfirmation {
                missing: missing.join(", "),
            });
        }

        let get = |key: &str| {
            query
                .get(key)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let item = ItemId::parse(get("item")).ok_or_else(|| GatewayError::IncompleteConfirmation {
            missing: "item".to_string(),
        })?;

        Ok(Self {
            item,
            receipt: get("vesicash_receipt"),
            time: get("time"),
            cbpop: get("cbpop"),
            customer_name: get("cname"),
            customer_email: get("cemail"),
        })
    }
}

fn missing_params(query: &HashMap<String, String>) -> Vec<&'static str> {
    REQUIRED_CONFIRMATION_PARAMS
        .iter()
        .copied()
        .filter(|key| query.get(*key).map_or(true, |v| v.trim().is_empty()))
        .collect()
}

/// A confirmation resolved back to a storefront product
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedPurchase {
    pub product_id: ProductId,
    /// Buyer's cart, reset to the confirmed product alone
    pub cart: Vec<ProductId>,
    pub params: ConfirmationParams,
}

/// Confirmation handler trait
///
/// Implement this to act on confirmed purchases (record the payment, email
/// the buyer, ...).
pub trait ConfirmationHandler: Send + Sync {
    fn on_confirmed(&self, purchase: &ConfirmedPurchase) -> GatewayResult<()> {
        info!(
            "Vesicash confirmation: product={}, receipt={}",
            purchase.product_id, purchase.params.receipt
        );
        Ok(())
    }
}

/// Default handler (just logs)
pub struct LoggingConfirmationHandler;

impl ConfirmationHandler for LoggingConfirmationHandler {}

/// Parse, resolve and dispatch a confirmation callback
#[instrument(skip_all)]
pub fn process_confirmation(
    registry: &ItemRegistry,
    handler: &dyn ConfirmationHandler,
    query: &HashMap<String, String>,
) -> GatewayResult<ConfirmedPurchase> {
    let params = ConfirmationParams::from_query(query)?;

    let product_id = registry.find_product_by_item(&params.item).ok_or_else(|| {
        warn!(item = %params.item, "Confirmation for unbound Vesicash item");
        GatewayError::ItemNotBound {
            item: params.item.to_string(),
        }
    })?;

    let confirmed = ConfirmedPurchase {
        product_id,
        cart: vec![product_id],
        params,
    };

    handler.on_confirmed(&confirmed)?;
    Ok(confirmed)
}
