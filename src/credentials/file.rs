//! Identity file provider.
//!
//! An identity file holds one `key value` pair per line:
//!
//! ```text
//! # my nimbus.io identity
//! Username motoboto-test-01
//! AuthKeyId 43
//! AuthKey oMDMm54A4F5+ukVSSoZTOlDVAIhlywJI+x4lsLjLWfA
//! ```

use super::{Credentials, IdentityProvider};
use crate::error::{IdentityError, LumberyardError};
use std::path::PathBuf;
use std::{env, fs};
use tracing::debug;

/// Environment variable naming the identity file.
pub const NIMBUSIO_IDENTITY: &str = "NIMBUSIO_IDENTITY";

/// Identity file name under the home directory.
pub const DEFAULT_IDENTITY_FILE: &str = ".nimbus.io";

/// Identity provider that reads a flat key-value identity file.
///
/// The file is determined by:
/// - Constructor parameter
/// - `NIMBUSIO_IDENTITY` environment variable
/// - Falls back to `$HOME/.nimbus.io`
#[derive(Debug, Clone, Default)]
pub struct FileIdentityProvider {
    path: Option<PathBuf>,
}

impl FileIdentityProvider {
    /// Create a provider using `NIMBUSIO_IDENTITY` or the home directory default.
    pub fn new() -> Self {
        Self { path: None }
    }

    /// Create a provider for a specific file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// The file this provider reads.
    pub fn identity_file_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }

        if let Ok(path) = env::var(NIMBUSIO_IDENTITY) {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .map(|home| home.join(DEFAULT_IDENTITY_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_IDENTITY_FILE))
    }

    /// Parse identity file content.
    pub fn parse_identity(content: &str, path: &str) -> Result<Credentials, LumberyardError> {
        let mut user_name = None;
        let mut auth_key_id = None;
        let mut auth_key = None;

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let (key, value) = match (tokens.next(), tokens.next(), tokens.next()) {
                (Some(key), Some(value), None) => (key, value),
                _ => {
                    return Err(IdentityError::Malformed {
                        line: line.to_string(),
                    }
                    .into())
                }
            };

            match key.to_lowercase().as_str() {
                "user_name" | "username" => user_name = Some(value.to_string()),
                "auth_key_id" | "authkeyid" => auth_key_id = Some(value.to_string()),
                "auth_key" | "authkey" => auth_key = Some(value.to_string()),
                other => debug!(key = other, "Ignoring unknown identity entry"),
            }
        }

        let incomplete = |missing| IdentityError::Incomplete {
            path: path.to_string(),
            missing,
        };

        let user_name = user_name.ok_or_else(|| incomplete("user name"))?;
        let auth_key_id = auth_key_id.ok_or_else(|| incomplete("auth key id"))?;
        let auth_key = auth_key.ok_or_else(|| incomplete("auth key"))?;

        Ok(Credentials::new(user_name, auth_key_id, auth_key))
    }
}

impl IdentityProvider for FileIdentityProvider {
    fn identity(&self) -> Result<Credentials, LumberyardError> {
        let path = self.identity_file_path();
        let display = path.display().to_string();

        let content = fs::read_to_string(&path).map_err(|e| IdentityError::Io {
            path: display.clone(),
            source: e,
        })?;

        Self::parse_identity(&content, &display)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
