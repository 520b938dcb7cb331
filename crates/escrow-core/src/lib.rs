//! # escrow-core
//!
//! Core types and traits for the vesicash-cart escrow checkout.
//!
//! This crate provides:
//! - `ItemRegistry` mapping storefront products to provider item ids
//! - `OptionStore` persistence for the item table
//! - `CheckoutPipeline` and `DirectToProviderStage` for the routing decision
//! - `EscrowGateway` trait for hosted-checkout providers
//! - `GatewayError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use escrow_core::{CheckoutPipeline, DirectToProviderStage, ItemRegistry, PurchaseData};
//!
//! // Bind a product to a provider item
//! registry.set(ProductId::new(42), Some("ABC-1"))?;
//!
//! // Decide routing for a purchase
//! let pipeline = CheckoutPipeline::new()
//!     .with_stage(Arc::new(DirectToProviderStage::for_gateway(registry, gateway.as_ref())));
//! let ctx = pipeline.run(purchase, &enabled_gateways);
//!
//! // Redirect the buyer when routed direct
//! if let Routing::DirectToProvider { item, .. } = ctx.routing() {
//!     let redirect = gateway.begin_checkout(&ctx.purchase, item).await?;
//! }
//! ```

pub mod checkout;
pub mod error;
pub mod gateway;
pub mod item;
pub mod product;
pub mod purchase;
pub mod registry;
pub mod store;

// Re-exports for convenience
pub use checkout::{CheckoutContext, CheckoutPipeline, DirectToProviderStage, PurchaseStage, Routing};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{
    join_checkout_url, BoxedEscrowGateway, EscrowGateway, GatewayDescriptor, GatewaySet,
};
pub use item::ItemId;
pub use product::{Currency, Price, Product, ProductCatalog, ProductDirectory, ProductId};
pub use purchase::{
    BuyerInfo, CheckoutRedirect, DownloadLine, PurchaseData, PurchaseLinkArgs, TransactionResult,
};
pub use registry::ItemRegistry;
pub use store::{ItemTable, JsonFileStore, MemoryOptionStore, OptionStore};
