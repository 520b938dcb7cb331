//! # escrow-vesicash
//!
//! Vesicash escrow gateway for vesicash-cart-rs.
//!
//! This crate provides:
//!
//! 1. **VesicashGateway** - `EscrowGateway` implementation
//!    - `POST transactions/create` with the private key header
//!    - Hosted checkout redirect for the created transaction
//!    - Sandbox or production, chosen once in `VesicashConfig`
//!
//! 2. **Confirmation callback** - buyer return handling
//!    - Trigger detection on the required query parameters
//!    - Item → product resolution through the `ItemRegistry`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use escrow_core::EscrowGateway;
//! use escrow_vesicash::VesicashGateway;
//!
//! // Create gateway from environment
//! let gateway = VesicashGateway::from_env()?;
//!
//! // Register the purchase and get the redirect
//! let redirect = gateway.begin_checkout(&purchase, &item).await?;
//!
//! // Redirect buyer to redirect.url
//! ```
//!
//! ## Confirmation Handling
//!
//! ```rust,ignore
//! use escrow_vesicash::{process_confirmation, LoggingConfirmationHandler};
//!
//! // In your callback endpoint:
//! let confirmed = process_confirmation(&registry, &LoggingConfirmationHandler, &query)?;
//! ```

pub mod config;
pub mod confirmation;
pub mod transaction;

// Re-exports
pub use config::{settings_fields, SettingField, VesicashConfig, VesicashEnvironment};
pub use confirmation::{
    process_confirmation, ConfirmationHandler, ConfirmationParams, ConfirmedPurchase,
    LoggingConfirmationHandler, REQUIRED_CONFIRMATION_PARAMS,
};
pub use transaction::{vesicash_descriptor, VesicashGateway, VESICASH_GATEWAY_ID};
