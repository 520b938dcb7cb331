//! # Gateway Error Types
//!
//! Typed error handling for the vesicash-cart checkout.
//! Registry, checkout and gateway operations return `Result<T, GatewayError>`.

use thiserror::Error;

/// Core error type for checkout and gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration errors (missing credentials, invalid environment)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// No product is bound to the given item identifier
    #[error("No product bound to item: {item}")]
    ItemNotBound { item: String },

    /// The provider answered with a non-"ok" status
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Redirect target could not be built from the provider response
    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),

    /// Confirmation callback missing one or more required parameters
    #[error("Incomplete confirmation: missing {missing}")]
    IncompleteConfirmation { missing: String },

    /// Option store read/write failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Configuration(_) => 500,
            GatewayError::InvalidRequest(_) => 400,
            GatewayError::ProductNotFound { .. } => 404,
            GatewayError::ItemNotBound { .. } => 404,
            GatewayError::ProviderError { .. } => 502,
            GatewayError::NetworkError(_) => 503,
            GatewayError::InvalidRedirect(_) => 502,
            GatewayError::IncompleteConfirmation { .. } => 400,
            GatewayError::Storage(_) => 500,
            GatewayError::Serialization(_) => 500,
            GatewayError::Internal(_) => 500,
        }
    }

    /// Returns true if the failure came from the provider side of the call
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::ProviderError { .. }
                | GatewayError::NetworkError(_)
                | GatewayError::InvalidRedirect(_)
        )
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization(err.to_string())
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
