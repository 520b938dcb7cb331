//! # Purchase Types
//!
//! Purchase data flowing through checkout, and the outcome of a provider
//! transaction call.

use crate::product::{Currency, Price, Product, ProductId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A download line in a purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadLine {
    /// Product ID
    pub id: ProductId,

    /// Product name (denormalized for the provider payload)
    pub name: String,

    /// Description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Unit price
    pub unit_price: Price,

    /// Quantity
    pub quantity: u32,
}

impl DownloadLine {
    /// Create a download line from a product
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            unit_price: product.price.clone(),
            quantity,
        }
    }

    /// Calculate the total price for this line
    pub fn total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Buyer details collected at checkout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuyerInfo {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Purchase data for a straight-to-gateway purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseData {
    /// Unique purchase key (generated)
    pub purchase_key: String,

    /// Downloads being bought; the first one is the primary download
    pub downloads: Vec<DownloadLine>,

    /// Selected gateway
    pub gateway: String,

    /// Skip cart review and go straight to the gateway
    #[serde(default)]
    pub buy_now: bool,

    /// Currency (same for all lines)
    pub currency: Currency,

    /// Buyer
    pub buyer: BuyerInfo,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl PurchaseData {
    /// Build purchase data for a single download, the way a "buy now" link
    /// does.
    pub fn straight_to_gateway(
        product: &Product,
        quantity: u32,
        gateway: impl Into<String>,
        buyer: BuyerInfo,
    ) -> Self {
        Self {
            purchase_key: Uuid::new_v4().simple().to_string(),
            downloads: vec![DownloadLine::from_product(product, quantity)],
            gateway: gateway.into(),
            buy_now: false,
            currency: product.price.currency,
            buyer,
            created_at: Utc::now(),
        }
    }

    /// The primary download (checkout routes on this one only)
    pub fn primary_download(&self) -> Option<&DownloadLine> {
        self.downloads.first()
    }

    /// Calculate purchase total
    pub fn total(&self) -> Price {
        let amount = self.downloads.iter().map(|d| d.total().amount).sum();
        Price::from_minor(amount, self.currency)
    }

    /// Get item count
    pub fn item_count(&self) -> u32 {
        self.downloads.iter().map(|d| d.quantity).sum()
    }
}

/// Purchase-link arguments for a product's buy button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLinkArgs {
    pub download_id: ProductId,
    /// Link posts straight to the gateway instead of adding to cart
    #[serde(default)]
    pub direct: bool,
    /// Shop accepts "buy now" purchases for this request
    #[serde(default)]
    pub buy_now_supported: bool,
}

impl PurchaseLinkArgs {
    pub fn new(download_id: ProductId) -> Self {
        Self {
            download_id,
            direct: false,
            buy_now_supported: false,
        }
    }
}

/// Successful outcome of a provider transaction call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResult {
    /// Provider name
    pub provider: String,

    /// Raw status reported by the provider ("ok")
    pub status: String,

    /// Provider-assigned transaction identifier
    pub transaction_id: String,

    /// Our purchase key
    pub purchase_key: String,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl TransactionResult {
    pub fn new(
        provider: impl Into<String>,
        status: impl Into<String>,
        transaction_id: impl Into<String>,
        purchase_key: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            status: status.into(),
            transaction_id: transaction_id.into(),
            purchase_key: purchase_key.into(),
            created_at: Utc::now(),
        }
    }
}

/// Buyer-facing redirect to the provider's hosted checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRedirect {
    pub transaction_id: String,
    pub url: String,
}
