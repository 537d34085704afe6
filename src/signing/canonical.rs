//! Canonical message building.

use crate::uri::unquote_plus;

/// Build the canonical message that is HMAC-signed.
///
/// Format: `{user_name}\n{method}\n{timestamp}\n{decoded uri}`
///
/// The URI is percent-decoded (with `+` as space) because the store signs
/// what it reconstructs, not the bytes on the wire.
pub fn build_canonical_message(user_name: &str, method: &str, timestamp: i64, uri: &str) -> String {
    let decoded = unquote_plus(uri);
    let mut message =
        String::with_capacity(user_name.len() + method.len() + decoded.len() + 24);
    message.push_str(user_name);
    message.push('\n');
    message.push_str(method);
    message.push('\n');
    message.push_str(&timestamp.to_string());
    message.push('\n');
    message.push_str(&decoded);
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_message() {
        assert_eq!(
            build_canonical_message("alice", "GET", 1_000_000_000, "/data/foo"),
            "alice\nGET\n1000000000\n/data/foo"
        );
    }

    #[test]
    fn test_canonical_message_decodes_uri() {
        assert_eq!(
            build_canonical_message("bob", "DELETE", 5, "/data/my+file%21"),
            "bob\nDELETE\n5\n/data/my file!"
        );
    }
}
