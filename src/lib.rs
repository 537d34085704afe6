//! Client library for the nimbus.io object store.
//!
//! Provides the pieces needed to talk to the store over its signed REST
//! interface:
//!
//! - **Connections**: [`HttpConnection`] sends one request at a time over a
//!   persistent HTTP/1.1 connection, signing it when an identity is present
//! - **Identities**: loaded from the environment or an identity file
//! - **Signing**: HMAC-SHA256 over user, method, timestamp and decoded URI
//! - **Upload progress**: [`ReadReporter`] reports every read from a body
//! - **NCL**: the command language used by the `ncl` binary
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lumberyard::{ConnectionConfig, EnvIdentityProvider, HttpConnection, HttpRequest, IdentityProvider};
//!
//! fn main() -> Result<(), lumberyard::LumberyardError> {
//!     let credentials = EnvIdentityProvider::new().identity()?;
//!     let config = ConnectionConfig::default();
//!     let host = lumberyard::uri::default_hostname(&config);
//!     let uri = format!("/customers/{}/collections", credentials.user_name());
//!
//!     let mut connection = HttpConnection::authenticated(host, credentials, config);
//!     let collections: serde_json::Value = connection.request(HttpRequest::get(uri))?.read_json()?;
//!     println!("{}", collections);
//!
//!     connection.close();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod command;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod mocks;
pub mod observability;
pub mod reporter;
pub mod signing;
pub mod transport;
pub mod uri;

// Re-export main types at crate root
pub use command::{parse, route, NclCommand, Route};
pub use config::{ConnectionConfig, ConnectionConfigBuilder};
pub use connection::{ConnectionState, HttpConnection, Response};
pub use credentials::{
    ChainIdentityProvider, Credentials, EnvIdentityProvider, FileIdentityProvider,
    IdentityProvider, StaticIdentityProvider,
};
pub use error::{
    CommandError, ConfigurationError, IdentityError, LumberyardError, ProtocolError,
    TransportError,
};
pub use reporter::ReadReporter;
pub use signing::{sign, RequestSigner};
pub use transport::{Body, Headers, HttpRequest, HttpTransport, ResponseHead, UreqTransport};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, LumberyardError>;
