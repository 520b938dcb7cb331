//! # escrow-api
//!
//! HTTP API layer for vesicash-cart.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Product editor endpoints for Vesicash item bindings
//! - Straight-to-gateway checkout and the Vesicash confirmation callback
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/products` | List products |
//! | GET | `/api/v1/products/{id}` | Get product |
//! | GET | `/api/v1/products/{id}/purchase-link` | Buy button arguments |
//! | POST | `/api/v1/checkout` | Checkout (303 to Vesicash for bound products) |
//! | GET/PUT | `/api/v1/admin/products/{id}/item` | Vesicash item field |
//! | GET | `/api/v1/gateways` | Enabled gateways |
//! | GET | `/api/v1/settings/gateways` | Vesicash settings fields |
//! | GET | `/vesicash/confirm` | Confirmation callback |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
