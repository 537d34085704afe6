//! Environment variable identity provider.

use super::{Credentials, IdentityProvider};
use crate::error::{IdentityError, LumberyardError};
use std::env;

/// Environment variable names for the identity.
pub const NIMBUSIO_USER_NAME: &str = "NIMBUSIO_USER_NAME";
pub const NIMBUSIO_AUTH_KEY_ID: &str = "NIMBUSIO_AUTH_KEY_ID";
pub const NIMBUSIO_AUTH_KEY: &str = "NIMBUSIO_AUTH_KEY";

/// Identity provider that reads from environment variables.
///
/// All three of `NIMBUSIO_USER_NAME`, `NIMBUSIO_AUTH_KEY_ID` and
/// `NIMBUSIO_AUTH_KEY` must be set and non-empty.
#[derive(Debug, Clone, Default)]
pub struct EnvIdentityProvider;

impl EnvIdentityProvider {
    /// Create a new environment identity provider.
    pub fn new() -> Self {
        Self
    }

    fn read(name: &str) -> Result<String, LumberyardError> {
        match env::var(name) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Err(IdentityError::NotFound {
                message: format!("{} is not set", name),
            }
            .into()),
        }
    }
}

impl IdentityProvider for EnvIdentityProvider {
    fn identity(&self) -> Result<Credentials, LumberyardError> {
        let user_name = Self::read(NIMBUSIO_USER_NAME)?;
        let auth_key_id = Self::read(NIMBUSIO_AUTH_KEY_ID)?;
        let auth_key = Self::read(NIMBUSIO_AUTH_KEY)?;

        Ok(Credentials::new(user_name, auth_key_id, auth_key))
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}
