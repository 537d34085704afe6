//! Mock implementations for testing.

mod transport;

pub use transport::{ConnectAttempt, ConnectFailure, MockResponse, MockTransport, RecordedRequest};

use crate::config::ConnectionConfig;
use crate::credentials::Credentials;
use std::time::Duration;

/// Test fixtures.
pub struct TestFixtures;

impl TestFixtures {
    /// The `alice` identity used across tests.
    pub fn credentials() -> Credentials {
        Credentials::new("alice", "7", "secret")
    }

    /// A configuration that never sleeps between name-resolution retries.
    pub fn config() -> ConnectionConfig {
        ConnectionConfig {
            dns_retry_delay: Duration::ZERO,
            ..ConnectionConfig::default()
        }
    }

    /// Identity file content for `alice`.
    pub fn identity_file() -> &'static str {
        "# test identity\nUsername alice\nAuthKeyId 7\nAuthKey secret\n"
    }
}
