//! Client configuration

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::{PaymentError, Result};

/// Default server origin
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default resource path of the payment API
pub const DEFAULT_BASE_PATH: &str = "/payment";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the server origin
pub const ENV_BASE_URL: &str = "PAYMENT_API_URL";
/// Environment variable holding the resource path
pub const ENV_BASE_PATH: &str = "PAYMENT_BASE_PATH";
/// Environment variable holding the timeout in whole seconds
pub const ENV_TIMEOUT_SECS: &str = "PAYMENT_TIMEOUT_SECS";

/// Configuration for a [`PaymentClient`](crate::PaymentClient) and its transport
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Server origin, e.g. `https://shop.example.com`
    pub base_url: String,
    /// Resource path of the payment API
    pub base_path: String,
    /// Request timeout, `None` disables it
    pub timeout: Option<Duration>,
    /// Headers sent with every request
    pub headers: HashMap<String, String>,
}

impl ClientConfig {
    /// Create a config for the given server origin
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
            headers: HashMap::new(),
        }
    }

    /// Load the config from `PAYMENT_API_URL`, `PAYMENT_BASE_PATH` and
    /// `PAYMENT_TIMEOUT_SECS`, falling back to the defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(lookup(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.into()));

        if let Some(base_path) = lookup(ENV_BASE_PATH) {
            config.base_path = base_path;
        }

        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = timeout.trim().parse().map_err(|_| {
                PaymentError::config(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_TIMEOUT_SECS, timeout
                ))
            })?;
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(PaymentError::config("Base URL cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(PaymentError::config(
                "Base URL must start with http:// or https://",
            ));
        }

        url::Url::parse(&self.base_url)
            .map_err(|e| PaymentError::config(format!("Invalid base URL: {}", e)))?;

        if !self.base_path.starts_with('/') {
            return Err(PaymentError::config("Base path must start with '/'"));
        }

        Ok(())
    }

    /// Set the resource path
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the request timeout
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Add a header sent with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Base path without a trailing slash (`/` becomes empty)
    pub fn normalized_base_path(&self) -> &str {
        self.base_path.trim_end_matches('/')
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.base_path, "/payment");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = ClientConfig::new("https://shop.example.com")
            .with_base_path("/api/payments/")
            .with_timeout(Duration::from_secs(5))
            .with_header("X-Request-Source", "checkout");

        assert_eq!(config.normalized_base_path(), "/api/payments");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.headers["X-Request-Source"], "checkout");
        assert_eq!(config.without_timeout().timeout, None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ClientConfig::new("").validate().is_err());
        assert!(ClientConfig::new("ftp://example.com").validate().is_err());
        assert!(ClientConfig::new("http://")
            .validate()
            .unwrap_err()
            .to_string()
            .contains("Invalid base URL"));
        assert!(ClientConfig::new("https://example.com")
            .with_base_path("payment")
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "https://payments.example.com"),
            (ENV_BASE_PATH, "/v2/payment"),
            (ENV_TIMEOUT_SECS, "10"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://payments.example.com");
        assert_eq!(config.base_path, "/v2/payment");
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));

        let config = ClientConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "0")])).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_from_lookup_rejects_bad_timeout() {
        let error = ClientConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert!(error.to_string().contains(ENV_TIMEOUT_SECS));
    }
}
