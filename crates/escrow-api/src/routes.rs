//! # Routes
//!
//! Axum router configuration for the checkout API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Storefront:
///   - GET  /api/v1/products - List products with item bindings
///   - GET  /api/v1/products/{id} - Get product by ID
///   - GET  /api/v1/products/{id}/purchase-link - Buy button arguments
///   - POST /api/v1/checkout - Straight-to-gateway checkout
///
/// - Product editor:
///   - GET  /api/v1/admin/products/{id}/item - Read the Vesicash item field
///   - PUT  /api/v1/admin/products/{id}/item - Save the Vesicash item field
///
/// - Settings:
///   - GET /api/v1/gateways - Enabled gateways
///   - GET /api/v1/settings/gateways - Vesicash settings fields
///
/// - Vesicash:
///   - GET /vesicash/confirm - Buyer return with confirmation data
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let storefront_routes = Router::new()
        .route("/checkout", post(handlers::create_checkout))
        .route("/products", get(handlers::list_products))
        .route("/products/{product_id}", get(handlers::get_product))
        .route(
            "/products/{product_id}/purchase-link",
            get(handlers::purchase_link),
        );

    let admin_routes = Router::new().route(
        "/products/{product_id}/item",
        get(handlers::get_product_item).put(handlers::put_product_item),
    );

    let settings_routes = Router::new()
        .route("/gateways", get(handlers::list_gateways))
        .route("/settings/gateways", get(handlers::gateway_settings));

    let api_routes = Router::new()
        .merge(storefront_routes)
        .merge(settings_routes)
        .nest("/admin", admin_routes);

    let vesicash_routes = Router::new().route("/confirm", get(handlers::vesicash_confirm));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .nest("/vesicash", vesicash_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use escrow_core::{
        join_checkout_url, BoxedEscrowGateway, Currency, EscrowGateway, GatewayDescriptor,
        GatewayError, GatewayResult, ItemId, MemoryOptionStore, OptionStore, Price, Product,
        ProductCatalog, ProductId, PurchaseData, TransactionResult,
    };
    use escrow_vesicash::{ConfirmationHandler, ConfirmedPurchase};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const SANDBOX_CHECKOUT: &str = "https://sandbox.vesicash.com/checkout";

    /// Stands in for Vesicash: answers with a fixed transaction id or fails.
    struct FakeVesicash {
        transaction_id: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl FakeVesicash {
        fn succeeding(transaction_id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                transaction_id: Some(transaction_id),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                transaction_id: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EscrowGateway for FakeVesicash {
        async fn create_transaction(
            &self,
            purchase: &PurchaseData,
            _item: &ItemId,
        ) -> GatewayResult<TransactionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.transaction_id {
                Some(id) => Ok(TransactionResult::new(
                    "Vesicash",
                    "ok",
                    id,
                    &purchase.purchase_key,
                )),
                None => Err(GatewayError::ProviderError {
                    provider: "Vesicash".to_string(),
                    message: "status error: invalid business".to_string(),
                }),
            }
        }

        fn checkout_url(&self, transaction_id: &str) -> GatewayResult<String> {
            join_checkout_url(SANDBOX_CHECKOUT, transaction_id)
        }

        fn gateway_id(&self) -> &'static str {
            "Vesicash"
        }

        fn descriptor(&self) -> GatewayDescriptor {
            GatewayDescriptor {
                admin_label: "Vesicash".to_string(),
                checkout_label: "Pay With Vesicash Escrow".to_string(),
                supports: vec!["buy_now".to_string()],
            }
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            item_store_path: "unused.json".to_string(),
            enabled_gateways: vec!["manual".to_string()],
            default_gateway: "manual".to_string(),
        }
    }

    fn catalog() -> ProductCatalog {
        ProductCatalog::new()
            .with_product(Product::new(42, "Escrowed Ebook", Price::new(2500.0, Currency::NGN)))
            .with_product(Product::new(43, "Audio Course", Price::new(1000.0, Currency::NGN)))
    }

    fn server_with(
        store: Arc<MemoryOptionStore>,
        vesicash: Option<BoxedEscrowGateway>,
    ) -> TestServer {
        let state = AppState::from_parts(test_config(), catalog(), store, vesicash);
        TestServer::new(create_router(state)).unwrap()
    }

    fn vesicash(fake: Arc<FakeVesicash>) -> Option<BoxedEscrowGateway> {
        Some(fake as BoxedEscrowGateway)
    }

    fn checkout_body(download_id: u64) -> Value {
        json!({
            "download_id": download_id,
            "customer_email": "buyer@example.com",
            "first_name": "Ada"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let server = server_with(Arc::new(MemoryOptionStore::new()), None);

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["vesicash_configured"], false);
    }

    #[tokio::test]
    async fn test_bound_product_redirects_to_hosted_checkout() {
        let fake = FakeVesicash::succeeding("TX-999");
        let server = server_with(Arc::new(MemoryOptionStore::new()), vesicash(fake.clone()));

        server
            .put("/api/v1/admin/products/42/item")
            .json(&json!({ "item": "ABC-1" }))
            .await
            .assert_status_ok();

        let response = server.post("/api/v1/checkout").json(&checkout_body(42)).await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.header("location"),
            "https://sandbox.vesicash.com/checkout/TX-999"
        );
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unbound_product_stays_standard() {
        let fake = FakeVesicash::succeeding("TX-999");
        let server = server_with(Arc::new(MemoryOptionStore::new()), vesicash(fake.clone()));

        let response = server.post("/api/v1/checkout").json(&checkout_body(43)).await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["routing"], "standard");
        assert_eq!(body["gateway"], "manual");
        assert_eq!(body["enabled_gateways"], json!(["manual"]));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_reported() {
        let store = Arc::new(MemoryOptionStore::new());
        let server = server_with(store, vesicash(FakeVesicash::failing()));

        server
            .put("/api/v1/admin/products/42/item")
            .json(&json!({ "item": "ABC-1" }))
            .await
            .assert_status_ok();

        let response = server.post("/api/v1/checkout").json(&checkout_body(42)).await;

        assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
        let body: Value = response.json();
        assert_eq!(body["code"], 502);
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_keeps_standard_checkout() {
        let store = Arc::new(MemoryOptionStore::new());
        let server = server_with(store, None);

        let response = server
            .put("/api/v1/admin/products/42/item")
            .json(&json!({ "item": "ABC-1" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["gateway_configured"], false);
        assert!(body["settings_hint"].is_string());

        let response = server.post("/api/v1/checkout").json(&checkout_body(42)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["routing"], "standard");
    }

    #[tokio::test]
    async fn test_duplicate_item_is_dropped() {
        let store = Arc::new(MemoryOptionStore::new());
        let server = server_with(store.clone(), vesicash(FakeVesicash::succeeding("TX-1")));

        server
            .put("/api/v1/admin/products/42/item")
            .json(&json!({ "item": "ABC-1" }))
            .await
            .assert_status_ok();

        let response = server
            .put("/api/v1/admin/products/43/item")
            .json(&json!({ "item": "ABC-1" }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["item"], Value::Null);

        let table = store.load().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&42).map(String::as_str), Some("ABC-1"));
    }

    #[tokio::test]
    async fn test_clear_item() {
        let store = Arc::new(MemoryOptionStore::new());
        let server = server_with(store.clone(), vesicash(FakeVesicash::succeeding("TX-1")));

        server
            .put("/api/v1/admin/products/42/item")
            .json(&json!({ "item": "ABC-1" }))
            .await
            .assert_status_ok();
        server
            .put("/api/v1/admin/products/42/item")
            .json(&json!({ "item": "" }))
            .await
            .assert_status_ok();

        let response = server.get("/api/v1/admin/products/42/item").await;
        let body: Value = response.json();
        assert_eq!(body["item"], Value::Null);
        assert_eq!(body["gateway_configured"], true);
    }

    #[tokio::test]
    async fn test_purchase_link_direct_for_bound_product() {
        let store = Arc::new(MemoryOptionStore::new());
        let server = server_with(store, vesicash(FakeVesicash::succeeding("TX-1")));

        server
            .put("/api/v1/admin/products/42/item")
            .json(&json!({ "item": "ABC-1" }))
            .await
            .assert_status_ok();

        let bound: Value = server.get("/api/v1/products/42/purchase-link").await.json();
        assert_eq!(bound["direct"], true);
        assert_eq!(bound["buy_now_supported"], true);

        let unbound: Value = server.get("/api/v1/products/43/purchase-link").await.json();
        assert_eq!(unbound["direct"], false);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let server = server_with(Arc::new(MemoryOptionStore::new()), None);

        let response = server.get("/api/v1/products/999").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

        let response = server.post("/api/v1/checkout").json(&checkout_body(999)).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_confirmation_callback() {
        let store = Arc::new(MemoryOptionStore::new());
        let server = server_with(store, vesicash(FakeVesicash::succeeding("TX-1")));

        server
            .put("/api/v1/admin/products/42/item")
            .json(&json!({ "item": "ABC-1" }))
            .await
            .assert_status_ok();

        let response = server
            .get("/vesicash/confirm")
            .add_query_param("item", "ABC-1")
            .add_query_param("vesicash_receipt", "RCPT-1")
            .add_query_param("time", "1700000000")
            .add_query_param("cbpop", "pop")
            .add_query_param("cname", "Ada Lovelace")
            .add_query_param("cemail", "ada@example.com")
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["product_id"], 42);
        assert_eq!(body["cart"], json!([42]));

        let response = server
            .get("/vesicash/confirm")
            .add_query_param("item", "ABC-1")
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_confirmation_reaches_custom_handler() {
        struct Recording(Mutex<Vec<String>>);

        impl ConfirmationHandler for Recording {
            fn on_confirmed(&self, purchase: &ConfirmedPurchase) -> GatewayResult<()> {
                self.0
                    .lock()
                    .unwrap()
                    .push(format!("{}:{}", purchase.product_id, purchase.params.receipt));
                Ok(())
            }
        }

        let store = Arc::new(MemoryOptionStore::new());
        let handler = Arc::new(Recording(Mutex::new(Vec::new())));
        let state = AppState::from_parts(test_config(), catalog(), store, None)
            .with_confirmation_handler(handler.clone());
        state.registry.set(ProductId::new(43), Some("AUDIO-7")).unwrap();
        let server = TestServer::new(create_router(state)).unwrap();

        server
            .get("/vesicash/confirm")
            .add_query_param("item", "AUDIO-7")
            .add_query_param("vesicash_receipt", "RCPT-9")
            .add_query_param("time", "1700000000")
            .add_query_param("cbpop", "pop")
            .add_query_param("cname", "Ada Lovelace")
            .add_query_param("cemail", "ada@example.com")
            .await
            .assert_status_ok();

        assert_eq!(*handler.0.lock().unwrap(), vec!["43:RCPT-9".to_string()]);
    }

    #[tokio::test]
    async fn test_settings_endpoints() {
        let server = server_with(
            Arc::new(MemoryOptionStore::new()),
            vesicash(FakeVesicash::succeeding("TX-1")),
        );

        let fields: Value = server.get("/api/v1/settings/gateways").await.json();
        assert_eq!(fields["fields"].as_array().map(Vec::len), Some(3));

        let gateways: Value = server.get("/api/v1/gateways").await.json();
        assert_eq!(gateways["count"], 1);
    }
}
