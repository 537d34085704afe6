//! Configuration types for store connections.
//!
//! This module provides the `ConnectionConfig` type passed to every
//! connection: socket timeout, name-resolution retry policy, TLS toggle and
//! the service domain used to derive host names.

use crate::error::{ConfigurationError, LumberyardError};
use std::time::Duration;

/// Environment variable holding the socket timeout in seconds.
pub const ENV_CONNECTION_TIMEOUT: &str = "LUMBERYARD_CONNECTION_TIMEOUT";
/// Environment variable holding the total number of name-resolution attempts.
pub const ENV_DNS_ATTEMPTS: &str = "LUMBERYARD_DNS_ATTEMPTS";
/// Environment variable holding the delay between name-resolution retries.
pub const ENV_DNS_RETRY_DELAY: &str = "LUMBERYARD_DNS_RETRY_DELAY";
/// Environment variable toggling TLS.
pub const ENV_USE_TLS: &str = "LUMBERYARD_USE_TLS";
/// Environment variable overriding the port.
pub const ENV_PORT: &str = "LUMBERYARD_PORT";
/// Environment variable holding the wire debug level.
pub const ENV_DEBUG_LEVEL: &str = "LUMBERYARD_DEBUG_LEVEL";
/// Environment variable holding the service domain.
pub const ENV_SERVICE_DOMAIN: &str = "NIMBUS_IO_SERVICE_DOMAIN";

/// Default service domain.
pub const DEFAULT_SERVICE_DOMAIN: &str = "nimbus.io";

/// Configuration for a store connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// Socket timeout applied to connect, read and write. `None` blocks indefinitely.
    pub timeout: Option<Duration>,

    /// Total name-resolution attempts, the first included, before a failure surfaces.
    pub dns_attempts: u32,

    /// Fixed delay between name-resolution attempts.
    pub dns_retry_delay: Duration,

    /// Connect with TLS.
    pub use_tls: bool,

    /// Explicit port; defaults to 443 with TLS and 80 without.
    pub port: Option<u16>,

    /// Domain under which the store publishes its hosts.
    pub service_domain: String,

    /// Wire debug level; above zero request and response heads are logged.
    pub debug_level: u8,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            dns_attempts: 5,
            dns_retry_delay: Duration::from_secs(15),
            use_tls: true,
            port: None,
            service_domain: DEFAULT_SERVICE_DOMAIN.to_string(),
            debug_level: 0,
        }
    }
}

impl ConnectionConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, LumberyardError> {
        ConnectionConfigBuilder::new().from_env().build()
    }

    /// Port to connect to.
    pub fn effective_port(&self) -> u16 {
        match self.port {
            Some(port) => port,
            None if self.use_tls => 443,
            None => 80,
        }
    }
}

/// Builder for connection configuration.
#[derive(Debug, Default)]
pub struct ConnectionConfigBuilder {
    timeout: Option<Duration>,
    dns_attempts: Option<u32>,
    dns_retry_delay: Option<Duration>,
    use_tls: Option<bool>,
    port: Option<u16>,
    service_domain: Option<String>,
    debug_level: Option<u8>,
}

impl ConnectionConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the socket timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the total number of name-resolution attempts.
    pub fn dns_attempts(mut self, attempts: u32) -> Self {
        self.dns_attempts = Some(attempts);
        self
    }

    /// Set the delay between name-resolution attempts.
    pub fn dns_retry_delay(mut self, delay: Duration) -> Self {
        self.dns_retry_delay = Some(delay);
        self
    }

    /// Enable or disable TLS.
    pub fn use_tls(mut self, enabled: bool) -> Self {
        self.use_tls = Some(enabled);
        self
    }

    /// Set an explicit port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the service domain.
    pub fn service_domain(mut self, domain: impl Into<String>) -> Self {
        self.service_domain = Some(domain.into());
        self
    }

    /// Set the wire debug level.
    pub fn debug_level(mut self, level: u8) -> Self {
        self.debug_level = Some(level);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Values that fail to parse are ignored.
    pub fn from_env(mut self) -> Self {
        if let Some(seconds) = env_seconds(ENV_CONNECTION_TIMEOUT) {
            self.timeout = Some(seconds);
        }
        if let Ok(val) = std::env::var(ENV_DNS_ATTEMPTS) {
            if let Ok(attempts) = val.trim().parse() {
                self.dns_attempts = Some(attempts);
            }
        }
        if let Some(delay) = env_seconds(ENV_DNS_RETRY_DELAY) {
            self.dns_retry_delay = Some(delay);
        }
        if let Ok(val) = std::env::var(ENV_USE_TLS) {
            self.use_tls = Some(!matches!(
                val.trim().to_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            ));
        }
        if let Ok(val) = std::env::var(ENV_PORT) {
            if let Ok(port) = val.trim().parse() {
                self.port = Some(port);
            }
        }
        if let Ok(domain) = std::env::var(ENV_SERVICE_DOMAIN) {
            if !domain.trim().is_empty() {
                self.service_domain = Some(domain.trim().to_string());
            }
        }
        if let Ok(val) = std::env::var(ENV_DEBUG_LEVEL) {
            if let Ok(level) = val.trim().parse() {
                self.debug_level = Some(level);
            }
        }

        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<ConnectionConfig, LumberyardError> {
        let defaults = ConnectionConfig::default();

        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(ConfigurationError::InvalidConfiguration {
                    field: "timeout".to_string(),
                    message: "timeout must be greater than zero".to_string(),
                }
                .into());
            }
        }

        if self.dns_attempts == Some(0) {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "dns_attempts".to_string(),
                message: "at least one name-resolution attempt is required".to_string(),
            }
            .into());
        }

        let service_domain = self.service_domain.unwrap_or(defaults.service_domain);
        if service_domain.is_empty() {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "service_domain".to_string(),
                message: "service domain must not be empty".to_string(),
            }
            .into());
        }

        Ok(ConnectionConfig {
            timeout: self.timeout.or(defaults.timeout),
            dns_attempts: self.dns_attempts.unwrap_or(defaults.dns_attempts),
            dns_retry_delay: self.dns_retry_delay.unwrap_or(defaults.dns_retry_delay),
            use_tls: self.use_tls.unwrap_or(defaults.use_tls),
            port: self.port.or(defaults.port),
            service_domain,
            debug_level: self.debug_level.unwrap_or(defaults.debug_level),
        })
    }
}

fn env_seconds(name: &str) -> Option<Duration> {
    let val = std::env::var(name).ok()?;
    let seconds: f64 = val.trim().parse().ok()?;
    if seconds.is_finite() && seconds > 0.0 {
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.timeout, None);
        assert_eq!(config.dns_attempts, 5);
        assert_eq!(config.dns_retry_delay, Duration::from_secs(15));
        assert!(config.use_tls);
        assert_eq!(config.effective_port(), 443);
        assert_eq!(config.service_domain, "nimbus.io");
    }

    #[test]
    fn test_builder() {
        let config = ConnectionConfig::builder()
            .timeout(Duration::from_secs(10))
            .dns_attempts(2)
            .dns_retry_delay(Duration::ZERO)
            .use_tls(false)
            .service_domain("example.test")
            .build()
            .unwrap();

        assert_eq!(config.timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.dns_attempts, 2);
        assert_eq!(config.dns_retry_delay, Duration::ZERO);
        assert_eq!(config.effective_port(), 80);
        assert_eq!(config.service_domain, "example.test");
    }

    #[test]
    fn test_explicit_port_wins() {
        let config = ConnectionConfig::builder().port(8088).build().unwrap();
        assert_eq!(config.effective_port(), 8088);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = ConnectionConfig::builder().timeout(Duration::ZERO).build();
        assert!(matches!(
            result,
            Err(LumberyardError::Configuration(
                ConfigurationError::InvalidConfiguration { .. }
            ))
        ));
    }

    #[test]
    fn test_zero_dns_attempts_rejected() {
        assert!(ConnectionConfig::builder().dns_attempts(0).build().is_err());
    }

    #[test]
    fn test_empty_service_domain_rejected() {
        let result = ConnectionConfig::builder().service_domain("").build();
        assert!(result.is_err());
    }
}
