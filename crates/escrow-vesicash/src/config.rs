//! # Vesicash Configuration
//!
//! Configuration management for the Vesicash integration.
//! Credentials are loaded from environment variables. The environment
//! (sandbox or production) is chosen here once and drives both the API base
//! and the hosted checkout base.

use escrow_core::GatewayError;
use serde::Serialize;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default outbound request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Vesicash deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VesicashEnvironment {
    Sandbox,
    Production,
}

impl VesicashEnvironment {
    /// API base URL for this environment
    pub fn api_base_url(&self) -> &'static str {
        match self {
            VesicashEnvironment::Sandbox => "https://sandbox.api.vesicash.com/v1",
            VesicashEnvironment::Production => "https://api.vesicash.com/v1",
        }
    }

    /// Hosted checkout base for this environment
    pub fn checkout_base(&self) -> &'static str {
        match self {
            VesicashEnvironment::Sandbox => "https://sandbox.vesicash.com/checkout",
            VesicashEnvironment::Production => "https://vesicash.com/checkout",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VesicashEnvironment::Sandbox => "sandbox",
            VesicashEnvironment::Production => "production",
        }
    }
}

impl Default for VesicashEnvironment {
    fn default() -> Self {
        VesicashEnvironment::Sandbox
    }
}

impl fmt::Display for VesicashEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VesicashEnvironment {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "test" => Ok(VesicashEnvironment::Sandbox),
            "production" | "live" => Ok(VesicashEnvironment::Production),
            other => Err(GatewayError::Configuration(format!(
                "VESICASH_ENVIRONMENT must be sandbox or production, got {:?}",
                other
            ))),
        }
    }
}

/// Vesicash API configuration
#[derive(Clone)]
pub struct VesicashConfig {
    /// Business identifier
    pub business_id: String,

    /// Private key, sent as `V-PRIVATE-KEY`
    pub secret_key: String,

    /// Active environment
    pub environment: VesicashEnvironment,

    /// API base URL (defaults to the environment's; override for testing/mocking)
    pub api_base_url: String,

    /// Outbound request timeout
    pub timeout: Duration,
}

impl VesicashConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `VESICASH_BUSINESS_ID`
    /// - `VESICASH_SECRET_KEY`
    ///
    /// Optional:
    /// - `VESICASH_ENVIRONMENT` (`sandbox` | `production`, default `sandbox`)
    /// - `VESICASH_API_BASE_URL`
    /// - `VESICASH_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from a variable lookup (the process environment in `from_env`)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| match lookup(name) {
            Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            _ => Err(GatewayError::Configuration(format!("{} not set", name))),
        };

        let business_id = required("VESICASH_BUSINESS_ID")?;
        let secret_key = required("VESICASH_SECRET_KEY")?;

        let environment = match lookup("VESICASH_ENVIRONMENT") {
            Some(value) => value.parse()?,
            None => VesicashEnvironment::default(),
        };

        let mut config = Self::new(business_id, secret_key, environment);

        if let Some(url) = lookup("VESICASH_API_BASE_URL") {
            if !url.trim().is_empty() {
                config = config.with_api_base_url(url.trim());
            }
        }

        if let Some(secs) = lookup("VESICASH_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(
        business_id: impl Into<String>,
        secret_key: impl Into<String>,
        environment: VesicashEnvironment,
    ) -> Self {
        Self {
            business_id: business_id.into(),
            secret_key: secret_key.into(),
            environment,
            api_base_url: environment.api_base_url().to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Both credentials present
    pub fn is_complete(&self) -> bool {
        !self.business_id.trim().is_empty() && !self.secret_key.trim().is_empty()
    }

    /// Hosted checkout base, from the configured environment only
    pub fn checkout_base(&self) -> &'static str {
        self.environment.checkout_base()
    }

    /// Full URL of an API endpoint
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for VesicashConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VesicashConfig")
            .field("business_id", &self.business_id)
            .field("secret_key", &"<redacted>")
            .field("environment", &self.environment)
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// One field of the gateway settings section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingField {
    pub id: &'static str,
    pub name: &'static str,
    pub desc: &'static str,
    #[serde(rename = "type")]
    pub field_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<&'static str>,
}

/// Settings the administrator fills in for Vesicash
pub fn settings_fields() -> Vec<SettingField> {
    vec![
        SettingField {
            id: "vesicash_settings",
            name: "Vesicash Settings",
            desc: "Configure the gateway settings",
            field_type: "header",
            size: None,
        },
        SettingField {
            id: "vesicash_business_id",
            name: "Business ID",
            desc: "",
            field_type: "text",
            size: Some("regular"),
        },
        SettingField {
            id: "vesicash_secret_key",
            name: "Secret Key",
            desc: "",
            field_type: "text",
            size: Some("regular"),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_environment_bases_agree() {
        let sandbox = VesicashConfig::new("biz", "key", VesicashEnvironment::Sandbox);
        assert_eq!(sandbox.api_base_url, "https://sandbox.api.vesicash.com/v1");
        assert_eq!(sandbox.checkout_base(), "https://sandbox.vesicash.com/checkout");

        let production = VesicashConfig::new("biz", "key", VesicashEnvironment::Production);
        assert_eq!(production.api_base_url, "https://api.vesicash.com/v1");
        assert_eq!(production.checkout_base(), "https://vesicash.com/checkout");
    }

    #[test]
    fn test_api_override_keeps_checkout_base() {
        let config = VesicashConfig::new("biz", "key", VesicashEnvironment::Production)
            .with_api_base_url("http://127.0.0.1:9999/");

        assert_eq!(
            config.endpoint("transactions/create"),
            "http://127.0.0.1:9999/transactions/create"
        );
        assert_eq!(config.checkout_base(), "https://vesicash.com/checkout");
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("sandbox".parse::<VesicashEnvironment>().unwrap(), VesicashEnvironment::Sandbox);
        assert_eq!("LIVE".parse::<VesicashEnvironment>().unwrap(), VesicashEnvironment::Production);
        assert!("staging".parse::<VesicashEnvironment>().is_err());
    }

    #[test]
    fn test_is_complete() {
        assert!(VesicashConfig::new("biz", "key", VesicashEnvironment::Sandbox).is_complete());
        assert!(!VesicashConfig::new("", "key", VesicashEnvironment::Sandbox).is_complete());
        assert!(!VesicashConfig::new("biz", "  ", VesicashEnvironment::Sandbox).is_complete());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = VesicashConfig::new("biz", "v_private_abc", VesicashEnvironment::Sandbox);
        let debug = format!("{:?}", config);
        assert!(!debug.contains("v_private_abc"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_settings_fields() {
        let fields = settings_fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].field_type, "header");
        assert!(fields.iter().any(|f| f.id == "vesicash_secret_key"));
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_missing_key() {
        let result = VesicashConfig::from_lookup(lookup(&[("VESICASH_BUSINESS_ID", "biz")]));
        assert!(matches!(result, Err(GatewayError::Configuration(msg)) if msg.contains("VESICASH_SECRET_KEY")));

        let result = VesicashConfig::from_lookup(lookup(&[
            ("VESICASH_BUSINESS_ID", "  "),
            ("VESICASH_SECRET_KEY", "v_private_abc"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_lookup_full() {
        let config = VesicashConfig::from_lookup(lookup(&[
            ("VESICASH_BUSINESS_ID", " biz "),
            ("VESICASH_SECRET_KEY", "v_private_abc"),
            ("VESICASH_ENVIRONMENT", "production"),
            ("VESICASH_API_BASE_URL", "http://127.0.0.1:9999"),
            ("VESICASH_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.business_id, "biz");
        assert_eq!(config.environment, VesicashEnvironment::Production);
        assert_eq!(config.api_base_url, "http://127.0.0.1:9999");
        assert_eq!(config.checkout_base(), "https://vesicash.com/checkout");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_lookup_defaults_to_sandbox() {
        let config = VesicashConfig::from_lookup(lookup(&[
            ("VESICASH_BUSINESS_ID", "biz"),
            ("VESICASH_SECRET_KEY", "v_private_abc"),
        ]))
        .unwrap();

        assert_eq!(config.environment, VesicashEnvironment::Sandbox);
        assert_eq!(config.api_base_url, "https://sandbox.api.vesicash.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
