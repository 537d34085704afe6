//! Connections to the store.
//!
//! An [`HttpConnection`] owns one transport to one host and runs the
//! request protocol over it: connect if needed, sign, fix up
//! `Content-Length`, transmit, read the response head and classify the
//! status. Any failure closes the connection; the next request reconnects.
//!
//! Authenticated and unauthenticated connections differ only in whether a
//! [`RequestSigner`] is present.

mod response;

pub use response::Response;

use crate::config::ConnectionConfig;
use crate::credentials::Credentials;
use crate::error::{ConfigurationError, LumberyardError};
use crate::signing::RequestSigner;
use crate::transport::{Headers, HttpRequest, HttpTransport, ResponseHead, UreqTransport};
use http::header::{AUTHORIZATION, CONTENT_LENGTH, RETRY_AFTER};
use http::Method;
use std::fmt;
use std::thread;
use tracing::{debug, error, warn};

/// Lifecycle of a connection's transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No open socket.
    Disconnected,
    /// A connect attempt is in progress.
    Connecting,
    /// Socket open and ready for a request.
    Connected,
}

/// A connection to one store host.
///
/// Single owner, one request in flight: [`HttpConnection::request`] returns a
/// [`Response`] that borrows the connection until it is dropped.
pub struct HttpConnection {
    host: String,
    config: ConnectionConfig,
    signer: Option<RequestSigner>,
    transport: Box<dyn HttpTransport>,
    state: ConnectionState,
}

impl HttpConnection {
    /// Create an authenticated connection. Connects on the first request.
    pub fn authenticated(
        host: impl Into<String>,
        credentials: Credentials,
        config: ConnectionConfig,
    ) -> Self {
        Self::with_transport(
            host,
            Some(RequestSigner::new(credentials)),
            config,
            UreqTransport::new(),
        )
    }

    /// Create an unauthenticated connection and connect immediately.
    pub fn unauthenticated(
        host: impl Into<String>,
        config: ConnectionConfig,
    ) -> Result<Self, LumberyardError> {
        let mut connection = Self::with_transport(host, None, config, UreqTransport::new());
        connection.connect()?;
        Ok(connection)
    }

    /// Create a connection over a caller-supplied transport.
    ///
    /// No connect is attempted.
    pub fn with_transport(
        host: impl Into<String>,
        signer: Option<RequestSigner>,
        config: ConnectionConfig,
        transport: impl HttpTransport + 'static,
    ) -> Self {
        Self {
            host: host.into(),
            config,
            signer,
            transport: Box::new(transport),
            state: ConnectionState::Disconnected,
        }
    }

    /// Target host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns true if requests are signed.
    pub fn is_authenticated(&self) -> bool {
        self.signer.is_some()
    }

    /// Current lifecycle state.
    ///
    /// Reports `Disconnected` once the transport has dropped its connection.
    pub fn state(&self) -> ConnectionState {
        match self.state {
            ConnectionState::Connected if !self.transport.is_connected() => {
                ConnectionState::Disconnected
            }
            state => state,
        }
    }

    /// Open the transport.
    ///
    /// Name resolution is tried at most `dns_attempts` times in total,
    /// sleeping `dns_retry_delay` between attempts. Any other failure is
    /// returned at once.
    pub fn connect(&mut self) -> Result<(), LumberyardError> {
        if self.host.trim().is_empty() {
            return Err(ConfigurationError::InvalidHost {
                host: self.host.clone(),
                message: "host is empty".to_string(),
            }
            .into());
        }

        self.state = ConnectionState::Connecting;
        let port = self.config.effective_port();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let result = self.transport.connect(
                &self.host,
                port,
                self.config.use_tls,
                self.config.timeout,
            );

            match result {
                Ok(()) => {
                    if attempts > 1 {
                        debug!(host = %self.host, attempts = attempts, "Connected after retry");
                    }
                    debug!(host = %self.host, port = port, tls = self.config.use_tls, "Connected");
                    self.state = ConnectionState::Connected;
                    return Ok(());
                }
                Err(e) if e.is_name_resolution() && attempts < self.config.dns_attempts => {
                    warn!(
                        host = %self.host,
                        attempt = attempts,
                        max_attempts = self.config.dns_attempts,
                        delay_ms = self.config.dns_retry_delay.as_millis() as u64,
                        error = %e,
                        "Name resolution failed, retrying"
                    );
                    thread::sleep(self.config.dns_retry_delay);
                }
                Err(e) => {
                    error!(host = %self.host, port = port, error = %e, "Connect failed");
                    self.close();
                    return Err(e.into());
                }
            }
        }
    }

    /// Issue a request and classify the response.
    ///
    /// Returns the response when its status equals the request's expected
    /// status. Otherwise the body is drained, the connection closed, and a
    /// 503 with a positive `Retry-After` becomes [`LumberyardError::Retryable`];
    /// every other status becomes [`LumberyardError::Http`].
    pub fn request(&mut self, request: HttpRequest<'_>) -> Result<Response<'_>, LumberyardError> {
        let HttpRequest {
            method,
            uri,
            mut headers,
            mut body,
            expected_status,
        } = request;

        if self.state() != ConnectionState::Connected {
            self.connect()?;
        }

        if let Some(signer) = &self.signer {
            signer.sign_headers(method.as_str(), &uri, &mut headers);
        }

        if method == Method::PUT {
            if let Some(length) = body.len() {
                headers.set_if_absent(CONTENT_LENGTH.as_str(), length.to_string());
            }
        }

        if self.config.debug_level > 0 {
            self.log_request_head(&method, &uri, &headers);
        }

        if let Err(e) = self
            .transport
            .send_request(&method, &uri, &headers, &mut body)
        {
            error!(method = %method, uri = %uri, error = %e, "Request transmission failed");
            self.close();
            return Err(e.into());
        }
        drop(body);

        let head = match self.transport.read_response_head() {
            Ok(head) => head,
            Err(e) => {
                error!(method = %method, uri = %uri, error = %e, "Unable to read response");
                self.close();
                return Err(e);
            }
        };

        debug!(
            method = %method,
            uri = %uri,
            status = head.status,
            reason = %head.reason,
            "Response received"
        );

        if head.status == expected_status {
            return Ok(Response::new(self, method, head));
        }

        self.drain_body();
        self.close();
        Err(classify_unexpected(&method, &uri, head))
    }

    /// Close the transport. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.state != ConnectionState::Disconnected || self.transport.is_connected() {
            debug!(host = %self.host, "Closing connection");
        }
        self.transport.close();
        self.state = ConnectionState::Disconnected;
    }

    /// Read and discard whatever remains of the current response body.
    fn drain_body(&mut self) {
        let mut buf = [0u8; 8192];
        loop {
            match self.transport.read_body(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!(error = %e, "Ignoring error while draining body");
                    break;
                }
            }
        }
    }

    fn log_request_head(&self, method: &Method, uri: &str, headers: &Headers) {
        debug!(host = %self.host, "{} {} HTTP/1.1", method, uri);
        for (name, value) in headers.iter() {
            if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                debug!("{}: [REDACTED]", name);
            } else {
                debug!("{}: {}", name, value);
            }
        }
    }
}

impl fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnection")
            .field("host", &self.host)
            .field("authenticated", &self.signer.is_some())
            .field("state", &self.state())
            .field("transport", &self.transport)
            .finish()
    }
}

/// Turn an unexpected response head into an error.
fn classify_unexpected(method: &Method, uri: &str, head: ResponseHead) -> LumberyardError {
    if head.status == 503 {
        let retry_after = head
            .headers
            .get(RETRY_AFTER.as_str())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|seconds| *seconds > 0);

        if let Some(retry_after) = retry_after {
            warn!(
                method = %method,
                uri = %uri,
                retry_after = retry_after,
                "Service unavailable, retry sanctioned"
            );
            return LumberyardError::Retryable { retry_after };
        }
    }

    warn!(
        method = %method,
        uri = %uri,
        status = head.status,
        reason = %head.reason,
        "Unexpected response status"
    );
    LumberyardError::Http {
        status: head.status,
        reason: head.reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(status: u16, reason: &str, headers: &[(&str, &str)]) -> ResponseHead {
        ResponseHead {
            status,
            reason: reason.to_string(),
            headers: headers.iter().copied().collect(),
        }
    }

    #[test]
    fn test_classify_retry_after() {
        let err = classify_unexpected(
            &Method::GET,
            "/",
            head(503, "Service Unavailable", &[("Retry-After", "30")]),
        );
        assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(30)));
    }

    #[test]
    fn test_classify_retry_after_case_insensitive() {
        let err = classify_unexpected(
            &Method::GET,
            "/",
            head(503, "Service Unavailable", &[("RETRY-AFTER", "5")]),
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_503_without_hint_is_http_error() {
        let err = classify_unexpected(&Method::GET, "/", head(503, "Service Unavailable", &[]));
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), Some(503));
    }

    #[test]
    fn test_classify_503_with_unusable_hint() {
        for value in ["0", "-3", "soon", "Wed, 21 Oct 2015 07:28:00 GMT"] {
            let err = classify_unexpected(
                &Method::GET,
                "/",
                head(503, "Service Unavailable", &[("Retry-After", value)]),
            );
            assert!(!err.is_retryable(), "value {:?}", value);
        }
    }

    #[test]
    fn test_classify_retry_after_ignored_for_other_status() {
        let err = classify_unexpected(
            &Method::GET,
            "/",
            head(500, "Internal Server Error", &[("Retry-After", "30")]),
        );
        assert!(matches!(
            err,
            LumberyardError::Http { status: 500, ref reason } if reason == "Internal Server Error"
        ));
    }

    #[test]
    fn test_empty_host_is_rejected() {
        let mut connection = HttpConnection::with_transport(
            "",
            None,
            ConnectionConfig::default(),
            UreqTransport::new(),
        );
        assert!(matches!(
            connection.connect(),
            Err(LumberyardError::Configuration(ConfigurationError::InvalidHost { .. }))
        ));
    }
}
