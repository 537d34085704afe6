//! Mock HTTP transport for testing.

use crate::error::{LumberyardError, ProtocolError, TransportError};
use crate::transport::{Body, Headers, HttpTransport, ResponseHead};
use bytes::Bytes;
use http::Method;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted outcome of a connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    /// Host name lookup fails.
    NameResolution,
    /// The peer refuses the connection.
    Refused,
}

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase.
    pub reason: String,
    /// Response headers.
    pub headers: Headers,
    /// Response body.
    pub body: Bytes,
    /// Unparsable status line reported instead of a response.
    pub status_line: Option<String>,
    /// Fail while sending the request instead of responding.
    pub send_error: Option<io::ErrorKind>,
}

impl MockResponse {
    /// Create a response with the given status and reason and an empty body.
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            headers: std::iter::once(("Content-Length", "0")).collect(),
            body: Bytes::new(),
            status_line: None,
            send_error: None,
        }
    }

    /// Create a successful response with empty body.
    pub fn ok() -> Self {
        Self::new(200, "OK")
    }

    /// Create a successful response with body.
    pub fn ok_with_body(body: impl Into<Bytes>) -> Self {
        Self::ok().with_body(body)
    }

    /// Create a 201 Created response.
    pub fn created() -> Self {
        Self::new(201, "Created")
    }

    /// Create an error response.
    pub fn error(status: u16, reason: impl Into<String>) -> Self {
        Self::new(status, reason)
    }

    /// A 503 carrying a `Retry-After` header.
    pub fn unavailable(retry_after: impl Into<String>) -> Self {
        Self::new(503, "Service Unavailable").with_header("Retry-After", retry_after)
    }

    /// A response whose status line cannot be parsed.
    pub fn bad_status_line(line: impl Into<String>) -> Self {
        Self {
            status_line: Some(line.into()),
            ..Self::ok()
        }
    }

    /// Fail the send with an I/O error of this kind.
    pub fn send_failure(kind: io::ErrorKind) -> Self {
        Self {
            send_error: Some(kind),
            ..Self::ok()
        }
    }

    /// Set a response header, replacing any of the same name.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(key, value);
        self
    }

    /// Set the response body. A matching `Content-Length` is added.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.headers.set("Content-Length", self.body.len().to_string());
        self
    }
}

/// A request as received by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: Method,
    /// Request target.
    pub uri: String,
    /// Headers as handed to the transport.
    pub headers: Headers,
    /// Body bytes.
    pub body: Bytes,
}

/// A connect call as received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectAttempt {
    /// Host name.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Whether TLS was requested.
    pub tls: bool,
    /// Timeout requested.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    connect_failures: VecDeque<ConnectFailure>,
    connect_attempts: Vec<ConnectAttempt>,
    responses: VecDeque<MockResponse>,
    requests: Vec<RecordedRequest>,
    pending_body: Bytes,
    last_method: Option<Method>,
    disconnects: usize,
}

/// Mock HTTP transport for testing.
///
/// Clones share state, so a test can keep a handle after moving the
/// transport into a connection.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new mock transport with no responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock transport with queued responses.
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        let transport = Self::new();
        for response in responses {
            transport.queue_response(response);
        }
        transport
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: MockResponse) {
        self.state.lock().unwrap().responses.push_back(response);
    }

    /// Make the next connect attempt fail.
    pub fn fail_next_connect(&self, failure: ConnectFailure) {
        self.state.lock().unwrap().connect_failures.push_back(failure);
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    /// Get the last request made.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state.lock().unwrap().requests.last().cloned()
    }

    /// All connect calls, failed ones included.
    pub fn connect_attempts(&self) -> Vec<ConnectAttempt> {
        self.state.lock().unwrap().connect_attempts.clone()
    }

    /// Number of connect calls, failed ones included.
    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connect_attempts.len()
    }

    /// Number of times an open connection was closed.
    pub fn disconnect_count(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }

    /// Number of responses still queued.
    pub fn pending_responses(&self) -> usize {
        self.state.lock().unwrap().responses.len()
    }

    /// Simulate the server dropping the socket.
    pub fn drop_connection(&self) {
        let mut state = self.state.lock().unwrap();
        if state.connected {
            state.connected = false;
            state.disconnects += 1;
        }
    }
}

impl HttpTransport for MockTransport {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        tls: bool,
        timeout: Option<Duration>,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.connect_attempts.push(ConnectAttempt {
            host: host.to_string(),
            port,
            tls,
            timeout,
        });

        match state.connect_failures.pop_front() {
            Some(ConnectFailure::NameResolution) => Err(TransportError::NameResolution {
                host: host.to_string(),
                message: "mock lookup failure".to_string(),
            }),
            Some(ConnectFailure::Refused) => Err(TransportError::Connect {
                address: format!("{}:{}", host, port),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
            None => {
                state.connected = true;
                Ok(())
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    fn send_request(
        &mut self,
        method: &Method,
        uri: &str,
        headers: &Headers,
        body: &mut Body<'_>,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }

        let mut bytes = Vec::new();
        body.write_to(&mut bytes).map_err(TransportError::Io)?;
        state.requests.push(RecordedRequest {
            method: method.clone(),
            uri: uri.to_string(),
            headers: headers.clone(),
            body: Bytes::from(bytes),
        });
        state.last_method = Some(method.clone());

        let failure = state.responses.front().and_then(|r| r.send_error);
        if let Some(kind) = failure {
            state.responses.pop_front();
            return Err(TransportError::Io(io::Error::from(kind)));
        }
        Ok(())
    }

    fn read_response_head(&mut self) -> Result<ResponseHead, LumberyardError> {
        let mut state = self.state.lock().unwrap();
        let response = state.responses.pop_front().ok_or_else(|| {
            LumberyardError::from(ProtocolError::BadStatusLine {
                line: String::new(),
            })
        })?;

        if let Some(line) = response.status_line {
            return Err(ProtocolError::BadStatusLine { line }.into());
        }

        state.pending_body = if matches!(state.last_method, Some(Method::HEAD)) {
            Bytes::new()
        } else {
            response.body.clone()
        };

        Ok(ResponseHead {
            status: response.status,
            reason: response.reason,
            headers: response.headers,
        })
    }

    fn read_body(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        let n = buf.len().min(state.pending_body.len());
        let chunk = state.pending_body.split_to(n);
        buf[..n].copy_from_slice(&chunk);
        Ok(n)
    }

    fn close(&mut self) {
        let mut state = self.state.lock().unwrap();
        if state.connected {
            state.connected = false;
            state.disconnects += 1;
        }
        state.pending_body = Bytes::new();
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("MockTransport")
            .field("connected", &state.connected)
            .field("queued_responses", &state.responses.len())
            .field("recorded_requests", &state.requests.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_transport_basic() {
        let mut transport = MockTransport::with_responses(vec![MockResponse::ok_with_body("hi")]);
        transport.connect("example.com", 80, false, None).unwrap();
        transport
            .send_request(&Method::GET, "/", &Headers::new(), &mut Body::Empty)
            .unwrap();

        let head = transport.read_response_head().unwrap();
        assert_eq!(head.status, 200);
        assert_eq!(head.headers.get("content-length"), Some("2"));

        let mut buf = [0u8; 8];
        assert_eq!(transport.read_body(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"hi");
        assert_eq!(transport.read_body(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_mock_transport_records_requests() {
        let mut transport = MockTransport::with_responses(vec![MockResponse::ok()]);
        let handle = transport.clone();
        transport.connect("example.com", 443, true, None).unwrap();
        transport
            .send_request(
                &Method::PUT,
                "/data/k",
                &Headers::new(),
                &mut Body::from("payload"),
            )
            .unwrap();

        let request = handle.last_request().unwrap();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.uri, "/data/k");
        assert_eq!(request.body, Bytes::from_static(b"payload"));
        assert_eq!(handle.connect_attempts()[0].port, 443);
    }

    #[test]
    fn test_mock_transport_scripted_connect_failure() {
        let mut transport = MockTransport::new();
        transport.fail_next_connect(ConnectFailure::NameResolution);

        let err = transport.connect("nowhere", 80, false, None).unwrap_err();
        assert!(err.is_name_resolution());
        assert!(!transport.is_connected());
        assert!(transport.connect("nowhere", 80, false, None).is_ok());
    }

    #[test]
    fn test_mock_transport_send_requires_connection() {
        let mut transport = MockTransport::new();
        let err = transport
            .send_request(&Method::GET, "/", &Headers::new(), &mut Body::Empty)
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[test]
    fn test_mock_transport_bad_status_line() {
        let mut transport =
            MockTransport::with_responses(vec![MockResponse::bad_status_line("garbage")]);
        transport.connect("example.com", 80, false, None).unwrap();
        transport
            .send_request(&Method::GET, "/", &Headers::new(), &mut Body::Empty)
            .unwrap();

        assert!(matches!(
            transport.read_response_head(),
            Err(LumberyardError::Protocol(ProtocolError::BadStatusLine { .. }))
        ));
    }
}
