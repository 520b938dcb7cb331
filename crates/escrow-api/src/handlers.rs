//! # Request Handlers
//!
//! Axum request handlers for the checkout API.
//! Product editor endpoints read and write item bindings; checkout runs the
//! routing pipeline and redirects item-bound purchases to Vesicash.

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use escrow_core::{
    BuyerInfo, GatewayError, ItemId, Product, ProductId, PurchaseData, PurchaseLinkArgs, Routing,
};
use escrow_vesicash::{process_confirmation, settings_fields};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Straight-to-gateway checkout request
#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Product being bought
    pub download_id: ProductId,
    /// Quantity
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Buyer email
    pub customer_email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Gateway the buyer picked (optional, defaults to the store default)
    #[serde(default)]
    pub gateway: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

/// Checkout response when the purchase stays on standard routing
#[derive(Debug, Serialize)]
pub struct StandardCheckoutResponse {
    pub purchase_key: String,
    #[serde(flatten)]
    pub routing: Routing,
    pub gateway: String,
    pub enabled_gateways: Vec<String>,
    pub total: String,
}

/// Product editor save request
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub item: Option<String>,
}

/// Product editor view of one product's item field
#[derive(Debug, Serialize)]
pub struct ProductItemResponse {
    pub product_id: ProductId,
    pub item: Option<ItemId>,
    /// False when the field should not be offered yet
    pub gateway_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_hint: Option<String>,
}

/// Catalog entry with its item binding
#[derive(Debug, Serialize)]
pub struct ProductView<'a> {
    #[serde(flatten)]
    pub product: &'a Product,
    pub item: Option<ItemId>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn gateway_error_to_response(err: GatewayError) -> ApiError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    if err.is_provider_failure() {
        response = response
            .with_details("The payment provider could not start checkout. No payment was taken.");
    }
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn product_not_found(product_id: ProductId) -> ApiError {
    gateway_error_to_response(GatewayError::ProductNotFound {
        product_id: product_id.to_string(),
    })
}

const SETTINGS_HINT: &str = "Update your Vesicash payment gateway settings.";

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "vesicash-cart",
        "version": env!("CARGO_PKG_VERSION"),
        "vesicash_configured": state.gateway_configured(),
    }))
}

/// List products with their item bindings
pub async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let items = state.registry.items();
    let products: Vec<_> = state
        .catalog
        .active_products()
        .map(|product| ProductView {
            product,
            item: items.get(&product.id).cloned(),
        })
        .collect();
    Json(serde_json::json!({
        "products": products,
        "count": products.len()
    }))
}

/// Get single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<u64>,
) -> Result<Response, ApiError> {
    let product_id = ProductId::new(product_id);
    let product = state
        .catalog
        .get(product_id)
        .ok_or_else(|| product_not_found(product_id))?;

    let view = ProductView {
        product,
        item: state.registry.get(product_id),
    };
    Ok(Json(view).into_response())
}

/// Purchase-link arguments for a product's buy button
pub async fn purchase_link(
    State(state): State<AppState>,
    Path(product_id): Path<u64>,
) -> Result<Json<PurchaseLinkArgs>, ApiError> {
    let product_id = ProductId::new(product_id);
    if state.catalog.get(product_id).is_none() {
        return Err(product_not_found(product_id));
    }

    Ok(Json(state.pipeline.link_defaults(product_id)))
}

/// Product editor: read the item field
pub async fn get_product_item(
    State(state): State<AppState>,
    Path(product_id): Path<u64>,
) -> Result<Json<ProductItemResponse>, ApiError> {
    let product_id = ProductId::new(product_id);
    if state.catalog.get(product_id).is_none() {
        return Err(product_not_found(product_id));
    }

    Ok(Json(item_response(&state, product_id)))
}

/// Product editor: save the item field
///
/// A duplicate item is dropped silently; the response shows the binding as
/// it stands after the save.
#[instrument(skip_all, fields(product_id = product_id))]
pub async fn put_product_item(
    State(state): State<AppState>,
    Path(product_id): Path<u64>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<ProductItemResponse>, ApiError> {
    let product_id = ProductId::new(product_id);
    if state.catalog.get(product_id).is_none() {
        return Err(product_not_found(product_id));
    }

    state
        .registry
        .set(product_id, request.item.as_deref())
        .map_err(|e| {
            error!("Failed to save Vesicash item: {}", e);
            gateway_error_to_response(e)
        })?;

    Ok(Json(item_response(&state, product_id)))
}

fn item_response(state: &AppState, product_id: ProductId) -> ProductItemResponse {
    let configured = state.gateway_configured();
    ProductItemResponse {
        product_id,
        item: state.registry.get(product_id),
        gateway_configured: configured,
        settings_hint: (!configured).then(|| SETTINGS_HINT.to_string()),
    }
}

/// Gateways enabled in settings
pub async fn list_gateways(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "gateways": state.gateways,
        "count": state.gateways.len()
    }))
}

/// Vesicash settings fields
pub async fn gateway_settings() -> impl IntoResponse {
    Json(serde_json::json!({ "fields": settings_fields() }))
}

/// Straight-to-gateway checkout
///
/// Item-bound products are registered with Vesicash and the buyer is
/// redirected (303) to the hosted checkout. Everything else stays on the
/// standard gateway selection.
#[instrument(skip_all, fields(download_id = %request.download_id))]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<Response, ApiError> {
    if request.quantity == 0 {
        return Err(gateway_error_to_response(GatewayError::InvalidRequest(
            "quantity must be at least 1".to_string(),
        )));
    }
    if request.customer_email.trim().is_empty() {
        return Err(gateway_error_to_response(GatewayError::InvalidRequest(
            "customer_email is required".to_string(),
        )));
    }

    let product = state
        .catalog
        .get(request.download_id)
        .ok_or_else(|| product_not_found(request.download_id))?;

    if !product.active {
        return Err(gateway_error_to_response(GatewayError::InvalidRequest(format!(
            "Product is not available: {}",
            product.id
        ))));
    }

    let gateway = state.gateways.select(request.gateway.as_deref());
    let buyer = BuyerInfo {
        email: request.customer_email.trim().to_string(),
        first_name: request.first_name,
        last_name: request.last_name,
    };
    let purchase = PurchaseData::straight_to_gateway(product, request.quantity, gateway, buyer);

    let ctx = state.pipeline.run(purchase, &state.gateways);

    info!(
        "Checkout: product={}, total={}, gateway={}, direct={}",
        product.id,
        ctx.purchase.total().display(),
        ctx.purchase.gateway,
        ctx.routing().is_direct()
    );

    match ctx.routing() {
        Routing::Standard => Ok(Json(StandardCheckoutResponse {
            purchase_key: ctx.purchase.purchase_key.clone(),
            routing: Routing::Standard,
            gateway: ctx.purchase.gateway.clone(),
            enabled_gateways: ctx.gateways.ids().into_iter().map(String::from).collect(),
            total: ctx.purchase.total().display(),
        })
        .into_response()),
        Routing::DirectToProvider { item, .. } => {
            let gateway = state.vesicash.as_ref().ok_or_else(|| {
                gateway_error_to_response(GatewayError::Configuration(
                    "Vesicash is not configured".to_string(),
                ))
            })?;

            let redirect = gateway
                .begin_checkout(&ctx.purchase, item)
                .await
                .map_err(|e| {
                    error!(
                        purchase_key = %ctx.purchase.purchase_key,
                        item = %item,
                        "Vesicash checkout failed: {}",
                        e
                    );
                    gateway_error_to_response(e)
                })?;

            info!(
                "Redirecting to Vesicash: transaction={}, url={}",
                redirect.transaction_id, redirect.url
            );

            Ok(Redirect::to(&redirect.url).into_response())
        }
    }
}

/// Vesicash confirmation callback
pub async fn vesicash_confirm(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let confirmed = process_confirmation(&state.registry, state.confirmations.as_ref(), &params)
        .map_err(|e| {
            error!("Vesicash confirmation rejected: {}", e);
            gateway_error_to_response(e)
        })?;

    Ok(Json(confirmed).into_response())
}
