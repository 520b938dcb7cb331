//! # vesicash-cart
//!
//! Digital-goods checkout with Vesicash escrow.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export VESICASH_BUSINESS_ID=...
//! export VESICASH_SECRET_KEY=v_private_...
//! export VESICASH_ENVIRONMENT=sandbox
//!
//! # Run the server
//! vesicash-cart
//! ```

use escrow_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Products loaded: {}", state.catalog.products.len());
    info!("Enabled gateways: {:?}", state.gateways.ids());
    info!("Checkout stages: {:?}", state.pipeline.stage_names());

    let app = routes::create_router(state);

    info!("vesicash-cart starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Checkout: POST http://{}/api/v1/checkout", addr);
        info!("Confirmation: GET http://{}/vesicash/confirm", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

fn print_banner() {
    println!(
        r#"
  vesicash-cart
  ━━━━━━━━━━━━━━━━━━━━━━━
  Escrow checkout for digital goods
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
