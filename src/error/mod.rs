//! Error types for the lumberyard client.
//!
//! Errors are grouped by where they arise: the transport, malformed
//! responses, the store's status codes, identity loading, the command
//! language and configuration. Every failure raised by a connection leaves that
//! connection disconnected; the variant tells the caller whether the store
//! sanctioned a retry.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Reason text reported for a response whose status line could not be parsed.
pub const BAD_STATUS_LINE: &str = "BadStatusLine";

/// Top-level error type for the lumberyard client.
#[derive(Debug, Error)]
pub enum LumberyardError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Identity loading errors.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Socket and connect-level failures.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The store answered with something that is not HTTP.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// HTTP 503 carrying a positive `Retry-After` hint.
    #[error("(503) service unavailable, retry after {retry_after}s")]
    Retryable {
        /// Delay suggested by the store, in seconds.
        retry_after: u64,
    },

    /// Any other unexpected status.
    #[error("({status}) {reason}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Reason phrase, verbatim from the response.
        reason: String,
    },

    /// Command language errors.
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Response body could not be decoded.
    #[error("Response error: {message}")]
    Response {
        /// Details about the decoding failure.
        message: String,
    },
}

impl LumberyardError {
    /// Returns true if the store sanctioned a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LumberyardError::Retryable { .. })
    }

    /// Returns the retry delay hint if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LumberyardError::Retryable { retry_after } => Some(Duration::from_secs(*retry_after)),
            _ => None,
        }
    }

    /// Returns the HTTP status code if applicable.
    ///
    /// An unparsable status line is reported as an internal error (500).
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LumberyardError::Retryable { .. } => Some(503),
            LumberyardError::Http { status, .. } => Some(*status),
            LumberyardError::Protocol(ProtocolError::BadStatusLine { .. }) => Some(500),
            _ => None,
        }
    }

    /// Returns true if raising this error closed the connection.
    pub fn closes_connection(&self) -> bool {
        matches!(
            self,
            LumberyardError::Transport(_)
                | LumberyardError::Protocol(_)
                | LumberyardError::Retryable { .. }
                | LumberyardError::Http { .. }
        )
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfiguration {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// Target host is unusable.
    #[error("Invalid host '{host}': {message}")]
    InvalidHost {
        /// The offending host string.
        host: String,
        /// Error message.
        message: String,
    },
}

/// Identity loading errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No identity could be found.
    #[error("Identity not found: {message}")]
    NotFound {
        /// Where the identity was looked for.
        message: String,
    },

    /// Identity file lacks one of the required entries.
    #[error("Identity file {path} is incomplete: missing {missing}")]
    Incomplete {
        /// Path of the identity file.
        path: String,
        /// Name of the missing entry.
        missing: &'static str,
    },

    /// Identity file contains a line that is not `key value`.
    #[error("Malformed identity line: '{line}'")]
    Malformed {
        /// The offending line.
        line: String,
    },

    /// Identity file could not be read.
    #[error("Unable to read identity file {path}: {source}")]
    Io {
        /// Path of the identity file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Socket-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Host name could not be resolved.
    #[error("Unable to resolve {host}: {message}")]
    NameResolution {
        /// The host being resolved.
        host: String,
        /// Resolver message.
        message: String,
    },

    /// TCP connect failed.
    #[error("Connection to {address} failed: {source}")]
    Connect {
        /// Address being connected to.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Operation timed out.
    #[error("Timed out after {duration:?}")]
    Timeout {
        /// The configured timeout.
        duration: Duration,
    },

    /// TLS setup or handshake failed.
    #[error("TLS error: {message}")]
    Tls {
        /// Details about the TLS failure.
        message: String,
    },

    /// Read or write on an established connection failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The request target or a header cannot be sent as-is.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What was rejected.
        message: String,
    },

    /// The transport was used before connecting.
    #[error("Not connected")]
    NotConnected,
}

impl TransportError {
    /// Returns true if this failure came from host name resolution.
    pub fn is_name_resolution(&self) -> bool {
        matches!(self, TransportError::NameResolution { .. })
    }
}

/// Malformed responses.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The response did not start with a valid status line.
    #[error("{}: {line:?}", BAD_STATUS_LINE)]
    BadStatusLine {
        /// The raw line received (empty at end of stream).
        line: String,
    },

    /// A header could not be parsed.
    #[error("Malformed response: {message}")]
    Malformed {
        /// What was wrong with the response.
        message: String,
    },
}

/// Command language errors.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Input matched no command template.
    #[error("Unable to recognize a command: '{input}'")]
    Unrecognized {
        /// The input line.
        input: String,
    },

    /// Collection name violates the naming rules.
    #[error("Invalid collection name {name}")]
    InvalidCollectionName {
        /// The rejected name.
        name: String,
    },

    /// Trailing option is unknown or has a bad value.
    #[error("Invalid option '{option}': {message}")]
    InvalidOption {
        /// The offending option token.
        option: String,
        /// Error message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_error() {
        let error = LumberyardError::Retryable { retry_after: 30 };
        assert!(error.is_retryable());
        assert_eq!(error.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(error.status_code(), Some(503));
        assert!(error.closes_connection());
    }

    #[test]
    fn test_http_error() {
        let error = LumberyardError::Http {
            status: 500,
            reason: "Internal Server Error".to_string(),
        };
        assert!(!error.is_retryable());
        assert_eq!(error.retry_after(), None);
        assert_eq!(error.status_code(), Some(500));
        assert_eq!(error.to_string(), "(500) Internal Server Error");
    }

    #[test]
    fn test_bad_status_line_is_internal_error() {
        let error = LumberyardError::from(ProtocolError::BadStatusLine {
            line: "garbage".to_string(),
        });
        assert_eq!(error.status_code(), Some(500));
        assert!(error.to_string().contains(BAD_STATUS_LINE));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_identity_error_keeps_connection() {
        let error = LumberyardError::from(IdentityError::NotFound {
            message: "environment".to_string(),
        });
        assert!(!error.closes_connection());
        assert_eq!(error.status_code(), None);
    }

    #[test]
    fn test_name_resolution_classification() {
        let error = TransportError::NameResolution {
            host: "nowhere.invalid".to_string(),
            message: "no such host".to_string(),
        };
        assert!(error.is_name_resolution());
        assert!(!TransportError::NotConnected.is_name_resolution());
    }
}
