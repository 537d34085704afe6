//! Chain identity provider that tries multiple sources.

use super::{Credentials, EnvIdentityProvider, FileIdentityProvider, IdentityProvider};
use crate::error::{IdentityError, LumberyardError};
use std::sync::Arc;
use tracing::{debug, trace};

/// Identity provider that chains multiple providers.
///
/// The chain tries each provider in order until one succeeds.
/// By default, the chain includes:
/// 1. Environment variables (`NIMBUSIO_USER_NAME`, etc.)
/// 2. Identity file (`$HOME/.nimbus.io`)
pub struct ChainIdentityProvider {
    providers: Vec<Arc<dyn IdentityProvider>>,
}

impl ChainIdentityProvider {
    /// Create a new chain with the default providers.
    pub fn new() -> Self {
        Self {
            providers: vec![
                Arc::new(EnvIdentityProvider::new()),
                Arc::new(FileIdentityProvider::new()),
            ],
        }
    }

    /// Create a chain with custom providers.
    pub fn with_providers(providers: Vec<Arc<dyn IdentityProvider>>) -> Self {
        Self { providers }
    }

    /// Add a provider to the end of the chain.
    pub fn add_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.push(provider);
        self
    }
}

impl Default for ChainIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for ChainIdentityProvider {
    fn identity(&self) -> Result<Credentials, LumberyardError> {
        let mut tried = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            trace!(provider = provider.name(), "Trying identity provider");
            match provider.identity() {
                Ok(credentials) => {
                    debug!(provider = provider.name(), "Identity loaded");
                    return Ok(credentials);
                }
                Err(e) => {
                    debug!(provider = provider.name(), error = %e, "Identity provider failed");
                    tried.push(provider.name());
                }
            }
        }

        Err(IdentityError::NotFound {
            message: format!("no identity from [{}]", tried.join(", ")),
        }
        .into())
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

impl std::fmt::Debug for ChainIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("ChainIdentityProvider")
            .field("providers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticIdentityProvider;

    struct Failing;

    impl IdentityProvider for Failing {
        fn identity(&self) -> Result<Credentials, LumberyardError> {
            Err(IdentityError::NotFound {
                message: "nothing here".to_string(),
            }
            .into())
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_chain_first_success_wins() {
        let chain = ChainIdentityProvider::with_providers(vec![
            Arc::new(Failing),
            Arc::new(StaticIdentityProvider::new(Credentials::new("a", "1", "k1"))),
            Arc::new(StaticIdentityProvider::new(Credentials::new("b", "2", "k2"))),
        ]);

        let creds = chain.identity().unwrap();
        assert_eq!(creds.user_name(), "a");
    }

    #[test]
    fn test_chain_all_fail() {
        let chain = ChainIdentityProvider::with_providers(vec![Arc::new(Failing)]);
        let err = chain.identity().unwrap_err();
        assert!(err.to_string().contains("failing"));
    }
}
