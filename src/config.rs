//! Shell-facing bridge configuration.
//!
//! The shell reads simple key-value configuration and hands it to the
//! bridge: the platform API endpoint, the names of the environment variables
//! holding secrets, and the table mapping merchant-side price lookup aliases
//! to platform price identifiers. Secrets themselves never appear in
//! configuration files - only the env-var names do, resolved at the moment a
//! client or verifier is built.

use std::collections::HashMap;

use serde::Deserialize;

use crate::{
    error::{ConfigError, PlanningError},
    platform::{RestPlatform, validate_base_url},
    subscription::PriceRef,
    webhook::{DEFAULT_TOLERANCE_SECS, SignatureVerifier},
};

/// Root bridge configuration.
///
/// # Examples
///
/// ```
/// use billing_bridge::config::BridgeConfig;
///
/// let toml = r#"
///     [platform]
///     base_url = "https://api.billing.example.com"
///     api_key_env = "BILLING_API_KEY"
///
///     [webhook]
///     secret_env = "BILLING_WEBHOOK_SECRET"
///     tolerance_secs = 300
///
///     [prices]
///     BASIC = "price_basic_1"
///     PREMIUM = "price_premium_1"
/// "#;
///
/// let config = BridgeConfig::from_toml_str(toml)?;
/// assert!(config.price_for("basic").is_ok());
/// # Ok::<(), billing_bridge::error::ConfigError>(())
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Billing-platform endpoint and credentials.
    pub platform: PlatformConfig,
    /// Webhook delivery verification.
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// Merchant-side price lookup alias → platform price identifier.
    #[serde(default)]
    pub prices: HashMap<String, String>,
}

/// Platform endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// API base URL. Must be HTTPS and must not point at a loopback host.
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

/// Webhook verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Name of the environment variable holding the shared webhook secret.
    /// When omitted, deliveries are accepted unverified - unsafe for
    /// production.
    #[serde(default)]
    pub secret_env: Option<String>,
    /// Allowed clock skew for delivery timestamps, in seconds.
    #[serde(default = "default_tolerance")]
    pub tolerance_secs: i64,
}

fn default_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { secret_env: None, tolerance_secs: DEFAULT_TOLERANCE_SECS }
    }
}

impl BridgeConfig {
    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML, or any error from
    /// [`validate`](Self::validate).
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - base URL is HTTPS and not a loopback host
    /// - env-var names are non-empty and contain only alphanumerics and
    ///   underscores
    /// - the tolerance is positive
    /// - every configured price identifier is a valid price reference
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first failing rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.platform.base_url)?;
        validate_env_name(&self.platform.api_key_env)?;

        if let Some(secret_env) = &self.webhook.secret_env {
            validate_env_name(secret_env)?;
        }
        if self.webhook.tolerance_secs <= 0 {
            return Err(ConfigError::Invalid(format!(
                "webhook tolerance must be positive, got {}",
                self.webhook.tolerance_secs
            )));
        }

        for (alias, price) in &self.prices {
            if alias.is_empty() {
                return Err(ConfigError::Invalid("empty price alias".to_owned()));
            }
            PriceRef::new(price.clone()).map_err(|e| {
                ConfigError::Invalid(format!("price alias {alias} maps to invalid price: {e}"))
            })?;
        }

        Ok(())
    }

    /// Resolves the platform API key from the configured env var.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingEnv`] when the variable is unset.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.platform.api_key_env)
            .map_err(|_| ConfigError::MissingEnv(self.platform.api_key_env.clone()))
    }

    /// Builds the production platform client from this configuration.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from key resolution or client construction.
    pub fn rest_platform(&self) -> Result<RestPlatform, ConfigError> {
        RestPlatform::new(&self.platform.base_url, self.resolve_api_key()?)
    }

    /// Builds the delivery verifier from this configuration.
    ///
    /// No configured secret env yields an unauthenticated verifier; a
    /// configured but unset env var is an error rather than a silent
    /// downgrade to unauthenticated mode.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingEnv`] when `secret_env` names an unset
    /// variable.
    pub fn webhook_verifier(&self) -> Result<SignatureVerifier, ConfigError> {
        let secret = match &self.webhook.secret_env {
            Some(name) => Some(
                std::env::var(name).map_err(|_| ConfigError::MissingEnv(name.clone()))?,
            ),
            None => None,
        };
        Ok(SignatureVerifier::new(secret, self.webhook.tolerance_secs))
    }

    /// Resolves a merchant-side lookup alias to a platform price.
    ///
    /// Lookup is case-insensitive: the merchant frontends in this system
    /// historically sent lowercase aliases against uppercase configuration
    /// keys.
    ///
    /// # Errors
    ///
    /// [`PlanningError::MissingPrice`] when the alias is not configured -
    /// the same failure mode a mutation plan hits for an unknown price, so
    /// the shell reports both identically before any platform call.
    pub fn price_for(&self, alias: &str) -> Result<PriceRef, PlanningError> {
        let price = self
            .prices
            .get(alias)
            .or_else(|| {
                self.prices.iter().find(|(key, _)| key.eq_ignore_ascii_case(alias)).map(|(_, v)| v)
            })
            .ok_or_else(|| PlanningError::MissingPrice(alias.to_owned()))?;
        PriceRef::new(price.clone())
    }
}

/// Env-var names: non-empty, alphanumerics and underscores only.
fn validate_env_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Invalid("empty environment variable name".to_owned()));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::Invalid(format!("invalid environment variable name: {name}")));
    }
    Ok(())
}
