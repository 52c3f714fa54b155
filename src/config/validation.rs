//! Configuration validation module
//!
//! Every required value is checked here once at startup; a missing secret or
//! zero limit is a fatal error, never a deferred per-request failure.

use crate::config::{
    AuthConfig, BillingConfig, QuotaConfig, RateLimitConfig, ServerConfig, StoreBackend,
    StoreConfig,
};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Server configuration error: {message}")]
    Server { message: String },

    #[error("Authentication configuration error: {message}")]
    Auth { message: String },

    #[error("Rate limit configuration error: {message}")]
    RateLimit { message: String },

    #[error("Quota configuration error: {message}")]
    Quota { message: String },

    #[error("Billing configuration error: {message}")]
    Billing { message: String },

    #[error("Store configuration error: {message}")]
    Store { message: String },
}

impl ValidationError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }

    pub fn quota(message: impl Into<String>) -> Self {
        Self::Quota {
            message: message.into(),
        }
    }

    pub fn billing(message: impl Into<String>) -> Self {
        Self::Billing {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::server("Port must be in range 1-65535"));
        }
        if self.host.is_empty() {
            return Err(ValidationError::server("Host cannot be empty"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(ValidationError::server(
                "Request timeout must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Validate for AuthConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.jwt_secret.is_empty() {
            return Err(ValidationError::auth(
                "JWT secret is not configured (set METERGATE__AUTH__JWT_SECRET)",
            ));
        }
        if self.jwt_secret.len() < 32 {
            return Err(ValidationError::auth(
                "JWT secret must be at least 32 characters",
            ));
        }
        if self.issuer.is_empty() {
            return Err(ValidationError::auth("Token issuer cannot be empty"));
        }
        Ok(())
    }
}

impl Validate for RateLimitConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.window_seconds == 0 {
            return Err(ValidationError::rate_limit(
                "Window length must be greater than 0 seconds",
            ));
        }
        if self.max_requests == 0 {
            return Err(ValidationError::rate_limit(
                "Request ceiling must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Validate for QuotaConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.free_monthly_limit == 0 {
            return Err(ValidationError::quota(
                "Free tier monthly limit must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Validate for BillingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::billing(
                "Webhook secret is not configured (set METERGATE__BILLING__WEBHOOK_SECRET)",
            ));
        }
        if self.signature_tolerance_seconds == 0 {
            return Err(ValidationError::billing(
                "Signature tolerance must be greater than 0 seconds",
            ));
        }
        Ok(())
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_ms == 0 {
            return Err(ValidationError::store(
                "Store timeout must be greater than 0 ms",
            ));
        }
        if self.backend == StoreBackend::Rest && self.base_url.is_empty() {
            return Err(ValidationError::store(
                "REST store backend requires store.base_url",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.auth.jwt_secret = "test-secret-key-at-least-32-characters-long".to_string();
        config.billing.webhook_secret = "whsec_test".to_string();
        config
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn missing_jwt_secret_is_fatal() {
        let mut config = valid_config();
        config.auth.jwt_secret.clear();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Auth { .. })
        ));
    }

    #[test]
    fn missing_webhook_secret_is_fatal() {
        let mut config = valid_config();
        config.billing.webhook_secret.clear();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Billing { .. })
        ));
    }

    #[test]
    fn rest_backend_requires_base_url() {
        let mut config = valid_config();
        config.store.backend = StoreBackend::Rest;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Store { .. })
        ));
        config.store.base_url = "https://kv.example.com".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_rate_window_is_fatal() {
        let mut config = valid_config();
        config.rate_limit.window_seconds = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::RateLimit { .. })
        ));
    }
}
