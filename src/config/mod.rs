//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub quota: QuotaConfig,
    pub billing: BillingConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Whether to expose the OpenAPI document. Should be false in hardened production.
    pub enable_docs: bool,
    /// Global request timeout in seconds applied at the HTTP layer.
    pub request_timeout_seconds: u64,
    /// Allowed CORS origins. Use ["*"] to allow any (development only).
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_docs: true,
            request_timeout_seconds: 30,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Token verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer signing secret, provisioned out of band. Empty means
    /// misconfigured; startup must refuse to serve traffic.
    pub jwt_secret: String,
    /// Expected `iss` claim of inbound tokens.
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "metergate-idp".to_string(),
        }
    }
}

/// Short-window rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Fixed window length in seconds.
    pub window_seconds: u64,
    /// Requests allowed per caller per window.
    pub max_requests: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            max_requests: 100,
        }
    }
}

/// Monthly quota configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Monthly request quota for free-tier callers. Pro is unlimited.
    pub free_monthly_limit: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free_monthly_limit: 5,
        }
    }
}

/// Billing webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Shared secret used to verify webhook signatures. Empty means
    /// misconfigured; startup must refuse to serve traffic.
    pub webhook_secret: String,
    /// Maximum age in seconds of a signed event before it is rejected as a
    /// replay.
    pub signature_tolerance_seconds: u64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            signature_tolerance_seconds: 300,
        }
    }
}

/// Counter store backend selection
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Single-process in-memory store; also the test backend.
    #[default]
    Memory,
    /// Networked key-value store reached over its REST interface.
    Rest,
}

/// Counter store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Base URL of the REST store; required when `backend = "rest"`.
    pub base_url: String,
    /// Bearer token for the REST store, if the deployment requires one.
    pub api_token: Option<String>,
    /// Per-operation timeout in milliseconds. Checks fail closed on timeout.
    pub timeout_ms: u64,
    /// Delay before the single internal retry of a failed store operation.
    pub retry_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            base_url: String::new(),
            api_token: None,
            timeout_ms: 2000,
            retry_backoff_ms: 100,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Add local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("METERGATE").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;

        // Validate the loaded configuration
        config.validate()?;

        Ok(config)
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.auth.validate()?;
        self.rate_limit.validate()?;
        self.quota.validate()?;
        self.billing.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
