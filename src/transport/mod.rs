//! HTTP transport layer.
//!
//! A transport carries HTTP/1.1 exchanges to one host, one request at a
//! time. Message framing is left to the HTTP client behind it; status
//! classification lives in the connection.

mod client;

pub use client::UreqTransport;

use crate::error::{LumberyardError, TransportError};
use bytes::Bytes;
use http::Method;
use std::fmt;
use std::io::{self, Read};
use std::time::Duration;

/// Ordered, case-insensitive header list.
///
/// Names keep the spelling they were inserted with; lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of the first header matching `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if a header named `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set a header, replacing every existing header of the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(index) => {
                self.entries[index] = (name, value);
                let mut i = index + 1;
                while i < self.entries.len() {
                    if self.entries[i].0.eq_ignore_ascii_case(&self.entries[index].0) {
                        self.entries.remove(i);
                    } else {
                        i += 1;
                    }
                }
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Set a header only if none of that name exists yet.
    pub fn set_if_absent(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.entries.push((name, value.into()));
        }
    }

    /// Append a header without touching existing ones.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Remove every header named `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Iterate over headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.append(k, v);
        }
        headers
    }
}

/// Request body.
pub enum Body<'a> {
    /// No body.
    Empty,
    /// In-memory body.
    Bytes(Bytes),
    /// Streamed body. Without a known length it is sent chunked.
    Reader {
        /// Source of body bytes.
        reader: Box<dyn Read + Send + 'a>,
        /// Total length, if known.
        length: Option<u64>,
    },
}

impl<'a> Body<'a> {
    /// Stream the body from a reader.
    pub fn from_reader(reader: impl Read + Send + 'a, length: Option<u64>) -> Self {
        Body::Reader {
            reader: Box::new(reader),
            length,
        }
    }

    /// Length in bytes, if known.
    pub fn len(&self) -> Option<u64> {
        match self {
            Body::Empty => Some(0),
            Body::Bytes(bytes) => Some(bytes.len() as u64),
            Body::Reader { length, .. } => *length,
        }
    }

    /// Returns true for a body known to be empty.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Copy the whole body into `writer`, returning the byte count.
    pub fn write_to(&mut self, writer: &mut dyn io::Write) -> io::Result<u64> {
        match self {
            Body::Empty => Ok(0),
            Body::Bytes(bytes) => {
                writer.write_all(bytes)?;
                Ok(bytes.len() as u64)
            }
            Body::Reader { reader, .. } => io::copy(reader, writer),
        }
    }
}

impl Default for Body<'_> {
    fn default() -> Self {
        Body::Empty
    }
}

impl fmt::Debug for Body<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Body::Reader { length, .. } => f
                .debug_struct("Reader")
                .field("length", length)
                .finish_non_exhaustive(),
        }
    }
}

impl From<Bytes> for Body<'_> {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body<'_> {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Body<'_> {
    fn from(bytes: &'static [u8]) -> Self {
        Body::Bytes(Bytes::from_static(bytes))
    }
}

impl From<String> for Body<'_> {
    fn from(text: String) -> Self {
        Body::Bytes(Bytes::from(text))
    }
}

impl From<&'static str> for Body<'_> {
    fn from(text: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

/// A request to be issued on a connection.
#[derive(Debug)]
pub struct HttpRequest<'a> {
    /// HTTP method.
    pub method: Method,
    /// Request target, already encoded.
    pub uri: String,
    /// Caller headers.
    pub headers: Headers,
    /// Request body.
    pub body: Body<'a>,
    /// Status that counts as success.
    pub expected_status: u16,
}

impl<'a> HttpRequest<'a> {
    /// Create a request expecting `200 OK`.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Headers::new(),
            body: Body::Empty,
            expected_status: 200,
        }
    }

    /// `GET` request.
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    /// `POST` request.
    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(Method::POST, uri)
    }

    /// `PUT` request.
    pub fn put(uri: impl Into<String>) -> Self {
        Self::new(Method::PUT, uri)
    }

    /// `DELETE` request.
    pub fn delete(uri: impl Into<String>) -> Self {
        Self::new(Method::DELETE, uri)
    }

    /// `HEAD` request.
    pub fn head(uri: impl Into<String>) -> Self {
        Self::new(Method::HEAD, uri)
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Body<'a>>) -> Self {
        self.body = body.into();
        self
    }

    /// Stream the request body from a reader.
    pub fn with_reader(mut self, reader: impl Read + Send + 'a, length: Option<u64>) -> Self {
        self.body = Body::from_reader(reader, length);
        self
    }

    /// Set the status that counts as success.
    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }
}

/// Status line and headers of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase, verbatim.
    pub reason: String,
    /// Response headers.
    pub headers: Headers,
}

impl ResponseHead {
    /// Parsed `Content-Length`, if present and valid.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("content-length")
            .and_then(|v| v.trim().parse().ok())
    }
}

/// Transport for HTTP/1.1 exchanges with a single host.
///
/// Calls follow a strict cycle: `send_request`, `read_response_head`, then
/// `read_body` until it returns 0. Errors leave the transport in an
/// unspecified state; callers must `close` it.
pub trait HttpTransport: Send + fmt::Debug {
    /// Prepare exchanges with `host:port`, replacing any existing connection.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        tls: bool,
        timeout: Option<Duration>,
    ) -> Result<(), TransportError>;

    /// Returns true between `connect` and `close`.
    fn is_connected(&self) -> bool;

    /// Send a request line, headers and body.
    fn send_request(
        &mut self,
        method: &Method,
        uri: &str,
        headers: &Headers,
        body: &mut Body<'_>,
    ) -> Result<(), TransportError>;

    /// Read the status line and headers of the next response.
    ///
    /// An unparsable status line yields [`crate::error::ProtocolError::BadStatusLine`].
    fn read_response_head(&mut self) -> Result<ResponseHead, LumberyardError>;

    /// Read response body bytes. Returns 0 once the body is complete.
    fn read_body(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Close the connection. Safe to call when already closed.
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_case_insensitive() {
        let mut headers = Headers::new();
        headers.set("Content-Length", "10");
        assert_eq!(headers.get("content-length"), Some("10"));
        assert!(headers.contains("CONTENT-LENGTH"));
    }

    #[test]
    fn test_headers_set_overwrites_all() {
        let mut headers = Headers::new();
        headers.append("X-Tag", "a");
        headers.append("Other", "o");
        headers.append("x-tag", "b");
        headers.set("X-TAG", "c");

        let collected: Vec<_> = headers.iter().collect();
        assert_eq!(collected, vec![("X-TAG", "c"), ("Other", "o")]);
    }

    #[test]
    fn test_headers_set_if_absent() {
        let mut headers = Headers::new();
        headers.set("content-length", "5");
        headers.set_if_absent("Content-Length", "0");
        headers.set_if_absent("Host", "example.com");
        assert_eq!(headers.get("content-length"), Some("5"));
        assert_eq!(headers.get("host"), Some("example.com"));
    }

    #[test]
    fn test_headers_remove() {
        let mut headers: Headers = vec![("A", "1"), ("a", "2"), ("B", "3")].into_iter().collect();
        headers.remove("a");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("b"), Some("3"));
    }

    #[test]
    fn test_body_lengths() {
        assert_eq!(Body::Empty.len(), Some(0));
        assert_eq!(Body::from("hello").len(), Some(5));
        assert_eq!(Body::from_reader(&b"abc"[..], None).len(), None);
        assert_eq!(Body::from_reader(&b"abc"[..], Some(3)).len(), Some(3));
    }

    #[test]
    fn test_body_write_to() {
        let mut out = Vec::new();
        let mut body = Body::from_reader(&b"streamed"[..], None);
        assert_eq!(body.write_to(&mut out).unwrap(), 8);
        assert_eq!(out, b"streamed");
    }

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::post("/data/key")
            .with_header("X-Test", "1")
            .with_body("payload")
            .expect_status(201);

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.uri, "/data/key");
        assert_eq!(request.headers.get("x-test"), Some("1"));
        assert_eq!(request.body.len(), Some(7));
        assert_eq!(request.expected_status, 201);
    }

    #[test]
    fn test_request_default_expected_status() {
        assert_eq!(HttpRequest::get("/").expected_status, 200);
    }
}
