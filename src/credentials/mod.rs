//! Store identities.
//!
//! A user proves who they are with three items: the user name, the id of one
//! of their authorization keys, and that key itself. Identities can come from
//! environment variables or from a small identity file.

mod chain;
mod env;
mod file;

pub use chain::ChainIdentityProvider;
pub use env::{
    EnvIdentityProvider, NIMBUSIO_AUTH_KEY, NIMBUSIO_AUTH_KEY_ID, NIMBUSIO_USER_NAME,
};
pub use file::{FileIdentityProvider, DEFAULT_IDENTITY_FILE, NIMBUSIO_IDENTITY};

use crate::error::LumberyardError;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// User credentials for signing requests.
///
/// Immutable once loaded.
#[derive(Clone)]
pub struct Credentials {
    user_name: String,
    auth_key_id: String,
    auth_key: SecretString,
}

impl Credentials {
    /// Create new credentials.
    pub fn new(
        user_name: impl Into<String>,
        auth_key_id: impl Into<String>,
        auth_key: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            auth_key_id: auth_key_id.into(),
            auth_key: SecretString::new(auth_key.into()),
        }
    }

    /// Get the user name.
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Get the authorization key id.
    pub fn auth_key_id(&self) -> &str {
        &self.auth_key_id
    }

    /// Get the raw authorization key bytes.
    ///
    /// Note: This exposes the secret. Use carefully and avoid logging.
    pub fn auth_key(&self) -> &[u8] {
        self.auth_key.expose_secret().as_bytes()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("auth_key_id", &self.auth_key_id)
            .field("auth_key", &"[REDACTED]")
            .finish()
    }
}

/// Trait for identity sources.
pub trait IdentityProvider: Send + Sync {
    /// Load credentials from this source.
    fn identity(&self) -> Result<Credentials, LumberyardError>;

    /// Provider name for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Identity provider returning fixed credentials.
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    credentials: Credentials,
}

impl StaticIdentityProvider {
    /// Create a new static identity provider.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn identity(&self) -> Result<Credentials, LumberyardError> {
        Ok(self.credentials.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_new() {
        let creds = Credentials::new("alice", "7", "secret");
        assert_eq!(creds.user_name(), "alice");
        assert_eq!(creds.auth_key_id(), "7");
        assert_eq!(creds.auth_key(), b"secret");
    }

    #[test]
    fn test_credentials_debug_redacts_key() {
        let creds = Credentials::new("alice", "7", "hunter2");
        let debug = format!("{:?}", creds);

        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_static_provider() {
        let provider = StaticIdentityProvider::new(Credentials::new("alice", "7", "secret"));
        let creds = provider.identity().unwrap();
        assert_eq!(creds.user_name(), "alice");
        assert_eq!(provider.name(), "static");
    }
}
