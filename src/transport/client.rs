//! Blocking transport backed by a `ureq` agent.

use super::{Body, Headers, HttpTransport, ResponseHead};
use crate::error::{LumberyardError, ProtocolError, TransportError};
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH};
use http::uri::PathAndQuery;
use http::Method;
use std::error::Error as StdError;
use std::fmt;
use std::io::{self, Read};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace};

/// Outcome of the last exchange, held until `read_response_head`.
enum Exchange {
    Head(ResponseHead),
    Failed(ProtocolError),
}

/// HTTP/1.1 transport over a `ureq::Agent` bound to one host.
///
/// `connect` resolves the host and builds the agent; sockets are opened by
/// the agent on the first request and kept alive between requests. Non-2xx
/// statuses are returned as responses, and redirects are not followed.
pub struct UreqTransport {
    agent: Option<ureq::Agent>,
    host: String,
    port: u16,
    tls: bool,
    timeout: Option<Duration>,
    exchange: Option<Exchange>,
    body: Option<Box<dyn Read + Send + Sync>>,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("connected", &self.agent.is_some())
            .finish()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    /// Create an unconnected transport.
    pub fn new() -> Self {
        Self {
            agent: None,
            host: String::new(),
            port: 0,
            tls: false,
            timeout: None,
            exchange: None,
            body: None,
        }
    }

    /// Resolve `host:port`, mapping failures to name-resolution errors.
    fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, TransportError> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| TransportError::NameResolution {
                host: host.to_string(),
                message: e.to_string(),
            })?
            .collect();

        if addrs.is_empty() {
            return Err(TransportError::NameResolution {
                host: host.to_string(),
                message: "no addresses returned".to_string(),
            });
        }
        Ok(addrs)
    }

    fn build_agent(timeout: Option<Duration>) -> ureq::Agent {
        let mut builder = ureq::AgentBuilder::new()
            .redirects(0)
            .max_idle_connections_per_host(1);
        if let Some(timeout) = timeout {
            builder = builder
                .timeout_connect(timeout)
                .timeout_read(timeout)
                .timeout_write(timeout);
        }
        builder.build()
    }

    fn url(&self, uri: &str) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        if self.host.contains(':') {
            format!("{}://[{}]:{}{}", scheme, self.host, self.port, uri)
        } else {
            format!("{}://{}:{}{}", scheme, self.host, self.port, uri)
        }
    }

    /// First I/O error in the source chain of a ureq failure.
    fn io_kind(error: &ureq::Error) -> Option<io::ErrorKind> {
        let mut source: Option<&(dyn StdError + 'static)> = error.source();
        while let Some(err) = source {
            if let Some(io) = err.downcast_ref::<io::Error>() {
                return Some(io.kind());
            }
            source = err.source();
        }
        None
    }

    fn timed_out(&self, kind: Option<io::ErrorKind>) -> Option<TransportError> {
        match (kind, self.timeout) {
            (Some(io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock), Some(duration)) => {
                Some(TransportError::Timeout { duration })
            }
            _ => None,
        }
    }

    /// Sort a failed exchange into a transport error or a protocol error
    /// to be surfaced by `read_response_head`.
    fn classify(&self, error: ureq::Error) -> Result<Exchange, TransportError> {
        use ureq::ErrorKind;

        let kind = Self::io_kind(&error);
        if let Some(timeout) = self.timed_out(kind) {
            return Err(timeout);
        }

        let message = error.to_string();
        match error.kind() {
            ErrorKind::Dns => Err(TransportError::NameResolution {
                host: self.host.clone(),
                message,
            }),
            ErrorKind::ConnectionFailed => Err(TransportError::Connect {
                address: format!("{}:{}", self.host, self.port),
                source: io::Error::new(kind.unwrap_or(io::ErrorKind::Other), message),
            }),
            ErrorKind::UnknownScheme => Err(TransportError::Tls {
                message: "TLS support is not compiled in".to_string(),
            }),
            ErrorKind::BadStatus => Ok(Exchange::Failed(ProtocolError::BadStatusLine {
                line: message,
            })),
            ErrorKind::BadHeader => Ok(Exchange::Failed(ProtocolError::Malformed { message })),
            ErrorKind::Io
                if matches!(
                    kind,
                    Some(io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionAborted)
                ) =>
            {
                Ok(Exchange::Failed(ProtocolError::BadStatusLine {
                    line: String::new(),
                }))
            }
            _ => Err(TransportError::Io(io::Error::new(
                kind.unwrap_or(io::ErrorKind::Other),
                message,
            ))),
        }
    }

    fn head_of(response: &ureq::Response) -> ResponseHead {
        let mut headers = Headers::new();
        let mut seen: Vec<String> = Vec::new();
        for name in response.headers_names() {
            if seen.iter().any(|s| s.eq_ignore_ascii_case(&name)) {
                continue;
            }
            for value in response.all(&name) {
                headers.append(name.as_str(), value);
            }
            seen.push(name);
        }

        ResponseHead {
            status: response.status(),
            reason: response.status_text().to_string(),
            headers,
        }
    }
}

/// Reject request targets and headers that cannot be sent as-is.
///
/// Header values and targets holding CR, LF or other control bytes would
/// otherwise split the request on the wire.
fn validate_request(uri: &str, headers: &Headers) -> Result<(), TransportError> {
    if !uri.starts_with('/') || uri.parse::<PathAndQuery>().is_err() {
        return Err(TransportError::InvalidRequest {
            message: format!("invalid request target {:?}", uri),
        });
    }
    for (name, value) in headers.iter() {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(TransportError::InvalidRequest {
                message: format!("invalid header name {:?}", name),
            });
        }
        if HeaderValue::from_str(value).is_err() {
            return Err(TransportError::InvalidRequest {
                message: format!("invalid value for header {}", name),
            });
        }
    }
    Ok(())
}

impl HttpTransport for UreqTransport {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        tls: bool,
        timeout: Option<Duration>,
    ) -> Result<(), TransportError> {
        self.close();
        self.host = host.to_string();
        self.port = port;
        self.tls = tls;
        self.timeout = timeout;

        let addrs = Self::resolve(host, port)?;
        trace!(host = %host, addresses = addrs.len(), "Resolved");

        self.agent = Some(Self::build_agent(timeout));
        debug!(host = %host, port = port, tls = tls, "Connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.agent.is_some()
    }

    fn send_request(
        &mut self,
        method: &Method,
        uri: &str,
        headers: &Headers,
        body: &mut Body<'_>,
    ) -> Result<(), TransportError> {
        validate_request(uri, headers)?;

        let agent = self.agent.as_ref().ok_or(TransportError::NotConnected)?;
        let mut request = agent.request(method.as_str(), &self.url(uri));
        for (name, value) in headers.iter() {
            request = request.set(name, value);
        }

        self.exchange = None;
        self.body = None;

        let carries_body = matches!(*method, Method::POST | Method::PUT | Method::PATCH);
        let result = match body {
            Body::Empty if carries_body => request.send_bytes(&[]),
            Body::Empty => request.call(),
            Body::Bytes(bytes) => request.send_bytes(&bytes[..]),
            Body::Reader { reader, length } => {
                if let Some(length) = length {
                    if !headers.contains(CONTENT_LENGTH.as_str()) {
                        request = request.set(CONTENT_LENGTH.as_str(), &length.to_string());
                    }
                }
                request.send(reader)
            }
        };

        let response = match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(error) => {
                debug!(method = %method, uri = %uri, error = %error, "Exchange failed");
                let exchange = self.classify(error)?;
                self.exchange = Some(exchange);
                return Ok(());
            }
        };

        trace!(method = %method, uri = %uri, status = response.status(), "Request sent");
        self.exchange = Some(Exchange::Head(Self::head_of(&response)));
        self.body = Some(response.into_reader());
        Ok(())
    }

    fn read_response_head(&mut self) -> Result<ResponseHead, LumberyardError> {
        match self.exchange.take() {
            Some(Exchange::Head(head)) => Ok(head),
            Some(Exchange::Failed(error)) => Err(error.into()),
            None => Err(TransportError::NotConnected.into()),
        }
    }

    fn read_body(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match self.body.as_mut() {
            Some(reader) => reader.read(buf)?,
            None => return Ok(0),
        };
        if n == 0 && !buf.is_empty() {
            self.body = None;
        }
        Ok(n)
    }

    fn close(&mut self) {
        self.body = None;
        self.exchange = None;
        if self.agent.take().is_some() {
            trace!(host = %self.host, "Closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_encoded_targets() {
        let headers: Headers = vec![("Agent", "lumberyard/0.1.0")].into_iter().collect();
        assert!(validate_request("/data/a%2Fb?action=stat&x=1+2", &headers).is_ok());
    }

    #[test]
    fn test_validate_rejects_line_breaks() {
        let empty = Headers::new();
        assert!(validate_request("/data/k HTTP/1.1\r\nX-Injected: 1", &empty).is_err());
        assert!(validate_request("data/k", &empty).is_err());

        let value: Headers = vec![("X-Tag", "a\r\nX-Injected: 1")].into_iter().collect();
        assert!(validate_request("/data/k", &value).is_err());

        let name: Headers = vec![("X Tag", "a")].into_iter().collect();
        assert!(matches!(
            validate_request("/data/k", &name),
            Err(TransportError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_url_brackets_ipv6_hosts() {
        let mut transport = UreqTransport::new();
        transport.host = "::1".to_string();
        transport.port = 8080;
        assert_eq!(transport.url("/data/k"), "http://[::1]:8080/data/k");

        transport.host = "photos.nimbus.io".to_string();
        transport.tls = true;
        transport.port = 443;
        assert_eq!(transport.url("/"), "https://photos.nimbus.io:443/");
    }

    #[test]
    fn test_send_without_connect() {
        let mut transport = UreqTransport::new();
        let err = transport
            .send_request(&Method::GET, "/", &Headers::new(), &mut Body::Empty)
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }
}
