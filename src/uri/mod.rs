//! REST URI construction.
//!
//! Keys are quote-plus encoded (space becomes `+`, reserved characters are
//! percent-escaped) and query strings are form-encoded. The signer works on
//! the decoded form, so [`unquote_plus`] must invert [`quote_plus`].

use crate::config::ConnectionConfig;
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use url::form_urlencoded;

/// Quote-plus encode a string.
pub fn quote_plus(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Decode a quote-plus encoded string: `+` becomes space, `%XX` escapes are decoded.
///
/// Invalid UTF-8 produced by escapes is replaced rather than rejected.
pub fn unquote_plus(value: &str) -> Cow<'_, str> {
    if !value.contains('+') && !value.contains('%') {
        return Cow::Borrowed(value);
    }
    let spaced = value.replace('+', " ");
    Cow::Owned(percent_decode_str(&spaced).decode_utf8_lossy().into_owned())
}

/// Build the REST URI for a resource path, an optional key and query parameters.
///
/// The base path always gets exactly one leading `/`. Parameters are encoded
/// in the order given.
pub fn build_uri<K, V>(base_path: &str, key: Option<&str>, query: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut uri = String::with_capacity(base_path.len() + 1);
    uri.push('/');
    uri.push_str(base_path.trim_start_matches('/'));

    if let Some(key) = key {
        if !uri.ends_with('/') {
            uri.push('/');
        }
        uri.push_str(&quote_plus(key));
    }

    if !query.is_empty() {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
            .finish();
        uri.push('?');
        uri.push_str(&encoded);
    }

    uri
}

/// Build a URI without query parameters.
pub fn build_path(base_path: &str, key: Option<&str>) -> String {
    build_uri::<&str, &str>(base_path, key, &[])
}

/// Host serving account-level requests.
pub fn default_hostname(config: &ConnectionConfig) -> String {
    config.service_domain.clone()
}

/// Host serving requests for one collection.
pub fn collection_hostname(config: &ConnectionConfig, collection_name: &str) -> String {
    format!("{}.{}", collection_name, config.service_domain)
}

/// Name of the collection every user owns by default.
pub fn default_collection_name(user_name: &str) -> String {
    format!("dd-{}", user_name)
}
