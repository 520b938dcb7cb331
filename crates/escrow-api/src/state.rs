//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the product catalog, item registry, enabled gateways and the
//! checkout pipeline built from them.

use escrow_core::{
    BoxedEscrowGateway, CheckoutPipeline, DirectToProviderStage, GatewayDescriptor, GatewaySet,
    ItemRegistry, JsonFileStore, OptionStore, ProductCatalog,
};
use escrow_vesicash::{ConfirmationHandler, LoggingConfirmationHandler, VesicashGateway};
use std::sync::Arc;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Where the item table is persisted
    pub item_store_path: String,
    /// Gateways enabled in store settings
    pub enabled_gateways: Vec<String>,
    /// Gateway selected when the buyer picks none
    pub default_gateway: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let enabled_gateways = parse_gateway_list(
            &std::env::var("ENABLED_GATEWAYS").unwrap_or_else(|_| "manual".to_string()),
        );
        let default_gateway = std::env::var("DEFAULT_GATEWAY")
            .ok()
            .filter(|g| !g.trim().is_empty())
            .or_else(|| enabled_gateways.first().cloned())
            .unwrap_or_else(|| "manual".to_string());

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            item_store_path: std::env::var("ITEM_STORE_PATH")
                .unwrap_or_else(|_| "data/vesicash_items.json".to_string()),
            enabled_gateways,
            default_gateway,
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Base gateway set from settings
    pub fn gateway_set(&self) -> GatewaySet {
        self.enabled_gateways
            .iter()
            .fold(GatewaySet::new(&self.default_gateway), |set, id| {
                set.with_gateway(id.clone(), GatewayDescriptor::labelled(id.clone()))
            })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_gateway_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Product catalog
    pub catalog: Arc<ProductCatalog>,
    /// Product → item bindings
    pub registry: ItemRegistry,
    /// Gateways enabled in settings (cloned per request)
    pub gateways: GatewaySet,
    /// Vesicash, when both credentials are configured
    pub vesicash: Option<BoxedEscrowGateway>,
    /// Checkout decision stages
    pub pipeline: CheckoutPipeline,
    /// Confirmation callback handler
    pub confirmations: Arc<dyn ConfirmationHandler>,
}

impl AppState {
    /// Create a new AppState from the environment
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        // Load product catalog
        let catalog = load_product_catalog()?;

        let file_store = JsonFileStore::new(&config.item_store_path);
        info!("Vesicash item store: {}", file_store.path().display());
        let store: Arc<dyn OptionStore> = Arc::new(file_store);

        // Missing credentials leave checkout on the standard gateways
        let vesicash = match VesicashGateway::from_env() {
            Ok(gateway) => {
                info!(
                    "Vesicash configured: environment={}",
                    gateway.config().environment
                );
                Some(Arc::new(gateway) as BoxedEscrowGateway)
            }
            Err(e) => {
                warn!("Vesicash not configured, direct checkout disabled: {}", e);
                None
            }
        };

        Ok(Self::from_parts(config, catalog, store, vesicash))
    }

    /// Assemble state from already-built parts
    pub fn from_parts(
        config: AppConfig,
        catalog: ProductCatalog,
        store: Arc<dyn OptionStore>,
        vesicash: Option<BoxedEscrowGateway>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let registry = ItemRegistry::new(store, catalog.clone());
        let gateways = config.gateway_set();

        let mut pipeline = CheckoutPipeline::new();
        if let Some(gateway) = &vesicash {
            pipeline = pipeline.with_stage(Arc::new(DirectToProviderStage::for_gateway(
                registry.clone(),
                gateway.as_ref(),
            )));
        }

        Self {
            config,
            catalog,
            registry,
            gateways,
            vesicash,
            pipeline,
            confirmations: Arc::new(LoggingConfirmationHandler),
        }
    }

    /// Builder: replace the confirmation handler
    pub fn with_confirmation_handler(mut self, handler: Arc<dyn ConfirmationHandler>) -> Self {
        self.confirmations = handler;
        self
    }

    /// Whether Vesicash credentials are configured
    pub fn gateway_configured(&self) -> bool {
        self.vesicash.is_some()
    }
}

/// Load product catalog from config file
fn load_product_catalog() -> anyhow::Result<ProductCatalog> {
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded {} products from {}", catalog.products.len(), path);
            return Ok(catalog);
        }
    }

    // Return empty catalog if no config found
    warn!("No product catalog found, using empty catalog");
    Ok(ProductCatalog::new())
}
