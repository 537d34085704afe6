//! Successful responses.

use super::HttpConnection;
use crate::error::{LumberyardError, TransportError};
use crate::transport::{Headers, ResponseHead};
use bytes::Bytes;
use http::Method;
use serde::de::DeserializeOwned;
use std::fmt;
use std::io::{self, Read};
use tracing::debug;

/// A response whose status matched the expected one.
///
/// The body is read through [`Read`]. Dropping a response before its body is
/// exhausted closes the connection, since a half-read socket cannot carry
/// the next request.
pub struct Response<'c> {
    connection: &'c mut HttpConnection,
    head: ResponseHead,
    complete: bool,
}

impl<'c> Response<'c> {
    pub(super) fn new(connection: &'c mut HttpConnection, method: Method, head: ResponseHead) -> Self {
        let complete = method == Method::HEAD
            || head.status == 204
            || head.status == 304
            || head.content_length() == Some(0);
        Self {
            connection,
            head,
            complete,
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.head.status
    }

    /// Reason phrase.
    pub fn reason(&self) -> &str {
        &self.head.reason
    }

    /// Response headers.
    pub fn headers(&self) -> &Headers {
        &self.head.headers
    }

    /// Value of a response header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name)
    }

    /// Declared body length, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.head.content_length()
    }

    /// Returns true once the whole body has been read.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Read the whole body into memory.
    pub fn read_to_bytes(mut self) -> Result<Bytes, LumberyardError> {
        let mut body = match self.content_length() {
            Some(length) => Vec::with_capacity(length.min(16 * 1024 * 1024) as usize),
            None => Vec::new(),
        };
        self.read_to_end(&mut body)
            .map_err(|e| LumberyardError::Transport(TransportError::Io(e)))?;
        Ok(Bytes::from(body))
    }

    /// Read the whole body as UTF-8 text.
    pub fn read_to_text(self) -> Result<String, LumberyardError> {
        let body = self.read_to_bytes()?;
        String::from_utf8(body.to_vec()).map_err(|e| LumberyardError::Response {
            message: format!("body is not UTF-8: {}", e),
        })
    }

    /// Read the whole body and decode it as JSON.
    pub fn read_json<T: DeserializeOwned>(self) -> Result<T, LumberyardError> {
        let body = self.read_to_bytes()?;
        serde_json::from_slice(&body).map_err(|e| LumberyardError::Response {
            message: format!("invalid JSON body: {}", e),
        })
    }
}

impl Read for Response<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.complete || buf.is_empty() {
            return Ok(0);
        }
        match self.connection.transport.read_body(buf) {
            Ok(0) => {
                self.complete = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                debug!(error = %e, "Response body read failed");
                self.complete = true;
                self.connection.close();
                Err(e)
            }
        }
    }
}

impl Drop for Response<'_> {
    fn drop(&mut self) {
        if !self.complete {
            debug!(status = self.head.status, "Response dropped before body was read");
            self.connection.close();
        }
    }
}

impl fmt::Debug for Response<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.head.status)
            .field("reason", &self.head.reason)
            .field("headers", &self.head.headers)
            .field("complete", &self.complete)
            .finish()
    }
}
