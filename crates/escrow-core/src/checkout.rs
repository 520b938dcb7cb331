//! # Checkout Decision
//!
//! Decides whether a purchase skips the standard gateway selection and goes
//! straight to the escrow provider.
//!
//! Checkout runs an explicit, ordered list of named stages over a
//! request-scoped [`CheckoutContext`]. Each request starts from a fresh clone
//! of the configured [`GatewaySet`], so a stage that enables a gateway only
//! affects that request.
//!
//! Routing per purchase:
//!
//! ```text
//!   Standard ──(primary download has an item)──► DirectToProvider
//! ```
//!
//! The transition happens at most once and is never reversed.

use crate::gateway::{EscrowGateway, GatewayDescriptor, GatewaySet};
use crate::item::ItemId;
use crate::product::ProductId;
use crate::purchase::{PurchaseData, PurchaseLinkArgs};
use crate::registry::ItemRegistry;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Routing state of a purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "routing", rename_all = "snake_case")]
pub enum Routing {
    /// Default checkout, buyer picks among enabled gateways
    Standard,
    /// Straight to the provider's hosted checkout
    DirectToProvider { gateway: String, item: ItemId },
}

impl Routing {
    pub fn is_direct(&self) -> bool {
        matches!(self, Routing::DirectToProvider { .. })
    }
}

/// Request-scoped checkout state
#[derive(Debug, Clone)]
pub struct CheckoutContext {
    /// Purchase data, possibly rewritten by stages
    pub purchase: PurchaseData,
    /// Gateways enabled for this request only
    pub gateways: GatewaySet,
    routing: Routing,
    applied: Vec<&'static str>,
}

impl CheckoutContext {
    pub fn new(purchase: PurchaseData, gateways: GatewaySet) -> Self {
        Self {
            purchase,
            gateways,
            routing: Routing::Standard,
            applied: Vec::new(),
        }
    }

    pub fn routing(&self) -> &Routing {
        &self.routing
    }

    /// Names of the stages that ran, in order
    pub fn applied_stages(&self) -> &[&'static str] {
        &self.applied
    }

    /// Route the purchase to a provider. Returns false if already routed.
    pub fn route_direct(
        &mut self,
        gateway_id: &str,
        descriptor: GatewayDescriptor,
        item: ItemId,
    ) -> bool {
        if self.routing.is_direct() {
            return false;
        }

        self.purchase.buy_now = true;
        self.purchase.gateway = gateway_id.to_string();
        self.gateways.enable(gateway_id, descriptor);
        self.routing = Routing::DirectToProvider {
            gateway: gateway_id.to_string(),
            item,
        };
        true
    }
}

/// One named step of the checkout pipeline
pub trait PurchaseStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, ctx: &mut CheckoutContext);

    /// Adjust purchase-link arguments for a product's buy button
    fn link_defaults(&self, args: PurchaseLinkArgs) -> PurchaseLinkArgs {
        args
    }
}

/// Ordered list of checkout stages
#[derive(Clone, Default)]
pub struct CheckoutPipeline {
    stages: Vec<Arc<dyn PurchaseStage>>,
}

impl CheckoutPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a stage
    pub fn with_stage(mut self, stage: Arc<dyn PurchaseStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage over a fresh request context
    pub fn run(&self, purchase: PurchaseData, gateways: &GatewaySet) -> CheckoutContext {
        let mut ctx = CheckoutContext::new(purchase, gateways.clone());
        for stage in &self.stages {
            stage.apply(&mut ctx);
            ctx.applied.push(stage.name());
        }
        debug!(
            purchase_key = %ctx.purchase.purchase_key,
            gateway = %ctx.purchase.gateway,
            stages = ?ctx.applied,
            "Checkout pipeline finished"
        );
        ctx
    }

    /// Purchase-link arguments for a product after every stage
    pub fn link_defaults(&self, download_id: ProductId) -> PurchaseLinkArgs {
        self.stages
            .iter()
            .fold(PurchaseLinkArgs::new(download_id), |args, stage| {
                stage.link_defaults(args)
            })
    }
}

/// Routes purchases of item-bound products straight to the provider
pub struct DirectToProviderStage {
    registry: ItemRegistry,
    gateway_id: &'static str,
    descriptor: GatewayDescriptor,
}

impl DirectToProviderStage {
    pub const NAME: &'static str = "direct_to_provider";

    pub fn new(
        registry: ItemRegistry,
        gateway_id: &'static str,
        descriptor: GatewayDescriptor,
    ) -> Self {
        Self {
            registry,
            gateway_id,
            descriptor,
        }
    }

    /// Stage for a configured gateway
    pub fn for_gateway(registry: ItemRegistry, gateway: &dyn EscrowGateway) -> Self {
        Self::new(registry, gateway.gateway_id(), gateway.descriptor())
    }
}

impl PurchaseStage for DirectToProviderStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut CheckoutContext) {
        let Some(download) = ctx.purchase.primary_download() else {
            return;
        };
        let product_id = download.id;

        if let Some(item) = self.registry.get(product_id) {
            if ctx.route_direct(self.gateway_id, self.descriptor.clone(), item.clone()) {
                info!(
                    product_id = %product_id,
                    item = %item,
                    gateway = self.gateway_id,
                    "Routing purchase straight to provider"
                );
            }
        }
    }

    fn link_defaults(&self, mut args: PurchaseLinkArgs) -> PurchaseLinkArgs {
        if self.registry.get(args.download_id).is_some() {
            args.direct = true;
            args.buy_now_supported = true;
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{Currency, Price, Product, ProductCatalog};
    use crate::purchase::BuyerInfo;
    use crate::store::MemoryOptionStore;

    fn catalog() -> ProductCatalog {
        ProductCatalog::new()
            .with_product(Product::new(42, "Escrowed Ebook", Price::new(2500.0, Currency::NGN)))
            .with_product(Product::new(7, "Plain Ebook", Price::new(1000.0, Currency::NGN)))
    }

    fn base_gateways() -> GatewaySet {
        GatewaySet::new("manual").with_gateway("manual", GatewayDescriptor::labelled("Store Gateway"))
    }

    fn vesicash_descriptor() -> GatewayDescriptor {
        GatewayDescriptor::labelled("Vesicash").with_support("Pay With Vesicash Escrow")
    }

    fn pipeline() -> CheckoutPipeline {
        let catalog = catalog();
        let registry = ItemRegistry::new(Arc::new(MemoryOptionStore::new()), Arc::new(catalog));
        registry.set(ProductId::new(42), Some("ABC-1")).unwrap();

        CheckoutPipeline::new().with_stage(Arc::new(DirectToProviderStage::new(
            registry,
            "Vesicash",
            vesicash_descriptor(),
        )))
    }

    fn purchase_of(id: u64) -> PurchaseData {
        let catalog = catalog();
        let product = catalog.get(ProductId::new(id)).unwrap();
        PurchaseData::straight_to_gateway(product, 1, "manual", BuyerInfo::default())
    }

    #[test]
    fn test_bound_product_routes_direct() {
        let pipeline = pipeline();
        let gateways = base_gateways();

        let ctx = pipeline.run(purchase_of(42), &gateways);

        assert_eq!(ctx.purchase.gateway, "Vesicash");
        assert!(ctx.purchase.buy_now);
        assert_eq!(
            ctx.routing(),
            &Routing::DirectToProvider {
                gateway: "Vesicash".into(),
                item: ItemId::parse("ABC-1").unwrap()
            }
        );
        assert_eq!(ctx.gateways.get("Vesicash"), Some(&vesicash_descriptor()));
        assert_eq!(ctx.applied_stages(), &[DirectToProviderStage::NAME]);
    }

    #[test]
    fn test_unbound_product_is_untouched() {
        let pipeline = pipeline();
        let gateways = base_gateways();

        let ctx = pipeline.run(purchase_of(7), &gateways);

        assert_eq!(ctx.purchase.gateway, "manual");
        assert!(!ctx.purchase.buy_now);
        assert_eq!(ctx.routing(), &Routing::Standard);
        assert!(!ctx.gateways.is_enabled("Vesicash"));
    }

    #[test]
    fn test_enabled_gateways_do_not_leak_across_requests() {
        let pipeline = pipeline();
        let gateways = base_gateways();

        let direct = pipeline.run(purchase_of(42), &gateways);
        assert!(direct.gateways.is_enabled("Vesicash"));

        let next = pipeline.run(purchase_of(7), &gateways);
        assert!(!next.gateways.is_enabled("Vesicash"));
        assert!(!gateways.is_enabled("Vesicash"));
    }

    #[test]
    fn test_route_direct_happens_once() {
        let mut ctx = CheckoutContext::new(purchase_of(42), base_gateways());

        assert!(ctx.route_direct("Vesicash", vesicash_descriptor(), ItemId::parse("ABC-1").unwrap()));
        assert!(!ctx.route_direct("Other", GatewayDescriptor::labelled("Other"), ItemId::parse("X").unwrap()));
        assert_eq!(ctx.purchase.gateway, "Vesicash");
    }

    #[test]
    fn test_empty_pipeline_is_standard() {
        let ctx = CheckoutPipeline::new().run(purchase_of(42), &base_gateways());
        assert_eq!(ctx.routing(), &Routing::Standard);
        assert!(ctx.applied_stages().is_empty());
    }

    #[test]
    fn test_link_defaults() {
        let pipeline = pipeline();

        let bound = pipeline.link_defaults(ProductId::new(42));
        assert!(bound.direct);
        assert!(bound.buy_now_supported);

        let unbound = pipeline.link_defaults(ProductId::new(7));
        assert!(!unbound.direct);
        assert!(!unbound.buy_now_supported);
    }
}
