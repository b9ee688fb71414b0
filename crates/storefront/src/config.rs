//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_DATA_PATH` - Durable store file (default: data/store.json,
//!   `:memory:` keeps everything in process memory)
//! - `PAYMENT_DELAY_MS` - Simulated payment latency (default: 2000)
//! - `PAYMENT_SUCCESS_RATE` - Simulated approval probability (default: 0.9)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Value of `STOREFRONT_DATA_PATH` that selects the in-memory store.
pub const MEMORY_STORE: &str = ":memory:";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where durable key-value data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLocation {
    /// Lost on restart. Used by tests and demos.
    Memory,
    /// A JSON file on disk.
    File(PathBuf),
}

/// Simulated payment gateway settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentConfig {
    /// How long a payment takes to "process".
    pub delay: Duration,
    /// Probability in `0.0..=1.0` that a payment is approved.
    pub success_rate: f64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(2000),
            success_rate: 0.9,
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: Url,
    /// Durable store location
    pub data: DataLocation,
    /// Payment simulation
    pub payment: PaymentConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let host = env
            .or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| invalid("STOREFRONT_HOST", e))?;
        let port = env
            .or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| invalid("STOREFRONT_PORT", e))?;
        let base_url = Url::parse(&env.required("STOREFRONT_BASE_URL")?)
            .map_err(|e| invalid("STOREFRONT_BASE_URL", e))?;
        if base_url.host_str().is_none() {
            return Err(invalid("STOREFRONT_BASE_URL", "must have a host"));
        }

        let data_path = env.or_default("STOREFRONT_DATA_PATH", "data/store.json");
        let data = if data_path == MEMORY_STORE {
            DataLocation::Memory
        } else {
            DataLocation::File(PathBuf::from(data_path))
        };

        let delay_ms = env
            .or_default("PAYMENT_DELAY_MS", "2000")
            .parse::<u64>()
            .map_err(|e| invalid("PAYMENT_DELAY_MS", e))?;
        let success_rate = env
            .or_default("PAYMENT_SUCCESS_RATE", "0.9")
            .parse::<f64>()
            .map_err(|e| invalid("PAYMENT_SUCCESS_RATE", e))?;
        if !(0.0..=1.0).contains(&success_rate) {
            return Err(invalid(
                "PAYMENT_SUCCESS_RATE",
                "must be between 0 and 1",
            ));
        }

        Ok(Self {
            host,
            port,
            base_url,
            data,
            payment: PaymentConfig {
                delay: Duration::from_millis(delay_ms),
                success_rate,
            },
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` flag.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable. Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}

fn invalid(key: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("STOREFRONT_BASE_URL", "http://localhost:3000")]).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(
            config.data,
            DataLocation::File(PathBuf::from("data/store.json"))
        );
        assert_eq!(config.payment, PaymentConfig::default());
        assert!(!config.secure_cookies());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_missing_base_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "STOREFRONT_BASE_URL"));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = load(&[("STOREFRONT_BASE_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_https_enables_secure_cookies() {
        let config = load(&[("STOREFRONT_BASE_URL", "https://mocktails.example")]).unwrap();
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_memory_store_and_payment_overrides() {
        let config = load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_DATA_PATH", ":memory:"),
            ("PAYMENT_DELAY_MS", "0"),
            ("PAYMENT_SUCCESS_RATE", "1"),
            ("STOREFRONT_PORT", "8080"),
        ])
        .unwrap();

        assert_eq!(config.data, DataLocation::Memory);
        assert_eq!(config.payment.delay, Duration::ZERO);
        assert!((config.payment.success_rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_success_rate_out_of_range() {
        let err = load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("PAYMENT_SUCCESS_RATE", "1.5"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "PAYMENT_SUCCESS_RATE"));
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_PORT", "seventy"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }
}
