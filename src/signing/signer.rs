//! Header signer used by authenticated connections.

use super::{sign, AGENT, AGENT_HEADER, TIMESTAMP_HEADER};
use crate::credentials::Credentials;
use crate::transport::Headers;
use chrono::Utc;
use http::header::AUTHORIZATION;

/// Adds authentication headers to outgoing requests.
///
/// Headers set here overwrite anything the caller supplied under the same
/// names.
#[derive(Clone)]
pub struct RequestSigner {
    credentials: Credentials,
}

impl RequestSigner {
    /// Create a signer for the given identity.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// The identity requests are signed with.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sign a request using the current time.
    pub fn sign_headers(&self, method: &str, uri: &str, headers: &mut Headers) {
        self.sign_headers_at(method, uri, Utc::now().timestamp(), headers);
    }

    /// Sign a request with an explicit Unix timestamp.
    pub fn sign_headers_at(&self, method: &str, uri: &str, timestamp: i64, headers: &mut Headers) {
        let authorization = sign(&self.credentials, method, uri, timestamp);
        headers.set(AUTHORIZATION.as_str(), authorization);
        headers.set(TIMESTAMP_HEADER, timestamp.to_string());
        headers.set(AGENT_HEADER, AGENT);
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("user_name", &self.credentials.user_name())
            .field("auth_key_id", &self.credentials.auth_key_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::hmac_sha256_hex;

    fn signer() -> RequestSigner {
        RequestSigner::new(Credentials::new("alice", "7", "secret"))
    }

    #[test]
    fn test_sign_headers_sets_all_three() {
        let mut headers = Headers::new();
        signer().sign_headers_at("GET", "/data/foo", 1_000_000_000, &mut headers);

        let expected_digest = hmac_sha256_hex(b"secret", b"alice\nGET\n1000000000\n/data/foo");
        assert_eq!(
            headers.get("authorization"),
            Some(format!("NIMBUS.IO 7:{}", expected_digest).as_str())
        );
        assert_eq!(headers.get(TIMESTAMP_HEADER), Some("1000000000"));
        assert_eq!(headers.get(AGENT_HEADER), Some(AGENT));
    }

    #[test]
    fn test_sign_headers_overwrites_caller_values() {
        let mut headers = Headers::new();
        headers.set("Authorization", "forged");
        headers.set("x-nimbus-io-timestamp", "1");
        signer().sign_headers_at("GET", "/", 5, &mut headers);

        assert_eq!(headers.len(), 3);
        assert_ne!(headers.get("authorization"), Some("forged"));
        assert_eq!(headers.get(TIMESTAMP_HEADER), Some("5"));
    }

    #[test]
    fn test_sign_headers_uses_current_time() {
        let before = Utc::now().timestamp();
        let mut headers = Headers::new();
        signer().sign_headers("GET", "/", &mut headers);
        let after = Utc::now().timestamp();

        let stamp: i64 = headers.get(TIMESTAMP_HEADER).unwrap().parse().unwrap();
        assert!(stamp >= before && stamp <= after);
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", signer());
        assert!(debug.contains("alice"));
        assert!(!debug.contains("secret"));
    }
}
