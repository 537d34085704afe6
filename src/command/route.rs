//! Mapping of NCL commands onto the store's REST interface.

use super::{ListKeysOptions, ListVersionsOptions, NclCommand};
use crate::config::ConnectionConfig;
use crate::error::{CommandError, IdentityError, LumberyardError};
use crate::transport::HttpRequest;
use crate::uri::{build_path, build_uri, collection_hostname, default_hostname};
use http::Method;

/// Most keys requested by one listing.
pub const MAX_KEYS: u32 = 1000;

/// Which host a command is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostTarget {
    /// The service domain itself, for account-level operations.
    Default,
    /// The collection's own host, for key-level operations.
    Collection(String),
}

/// A command resolved to a REST call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Host to connect to.
    pub target: HostTarget,
    /// HTTP method.
    pub method: Method,
    /// Encoded request target.
    pub uri: String,
    /// Status that counts as success.
    pub expected_status: u16,
}

impl Route {
    fn new(target: HostTarget, method: Method, uri: String) -> Self {
        Self {
            target,
            method,
            uri,
            expected_status: 200,
        }
    }

    fn expecting(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Host name for this route under `config`.
    pub fn host(&self, config: &ConnectionConfig) -> String {
        match &self.target {
            HostTarget::Default => default_hostname(config),
            HostTarget::Collection(name) => collection_hostname(config, name),
        }
    }

    /// Build the request without a body.
    pub fn to_request<'a>(&self) -> HttpRequest<'a> {
        HttpRequest::new(self.method.clone(), self.uri.clone()).expect_status(self.expected_status)
    }
}

/// Resolve a command to its REST call.
///
/// Account-level commands need the user name and fail with
/// [`IdentityError::NotFound`] without one. Key-level commands work
/// anonymously.
pub fn route(command: &NclCommand, user_name: Option<&str>) -> Result<Route, LumberyardError> {
    let customer_path = || {
        user_name
            .map(|user| format!("customers/{}/collections", user))
            .ok_or_else(|| -> LumberyardError {
                IdentityError::NotFound {
                    message: format!("must have identity to {}", command.name()),
                }
                .into()
            })
    };

    let route = match command {
        NclCommand::ListCollections => {
            Route::new(HostTarget::Default, Method::GET, build_path(&customer_path()?, None))
        }
        NclCommand::ListCollection { collection_name } => Route::new(
            HostTarget::Default,
            Method::GET,
            build_path(&customer_path()?, Some(collection_name.as_str())),
        ),
        NclCommand::CreateCollection {
            collection_name,
            versioning,
        } => {
            let mut query = vec![("action", "create".to_string()), ("name", collection_name.clone())];
            if let Some(versioning) = versioning {
                query.push(("versioning", versioning.to_string()));
            }
            Route::new(
                HostTarget::Default,
                Method::POST,
                build_uri(&customer_path()?, None, &query),
            )
            .expecting(201)
        }
        NclCommand::SetCollection {
            collection_name,
            versioning,
        } => {
            let versioning = versioning.ok_or_else(|| CommandError::InvalidOption {
                option: "versioning".to_string(),
                message: "set collection requires versioning=true|false".to_string(),
            })?;
            let query = [
                ("action", "set_versioning".to_string()),
                ("versioning", versioning.to_string()),
            ];
            Route::new(
                HostTarget::Default,
                Method::PUT,
                build_uri(&customer_path()?, Some(collection_name.as_str()), &query),
            )
        }
        NclCommand::DeleteCollection { collection_name } => Route::new(
            HostTarget::Default,
            Method::DELETE,
            build_path(&customer_path()?, Some(collection_name.as_str())),
        ),
        NclCommand::ListKeys {
            collection_name,
            options,
        } => Route::new(
            HostTarget::Collection(collection_name.clone()),
            Method::GET,
            build_uri("data/", None, &list_keys_query(options)),
        ),
        NclCommand::ListKeyVersions {
            collection_name,
            options,
        } => Route::new(
            HostTarget::Collection(collection_name.clone()),
            Method::GET,
            build_uri("data/", None, &list_versions_query(options)),
        ),
        NclCommand::ListKey {
            collection_name,
            key,
        } => Route::new(
            HostTarget::Collection(collection_name.clone()),
            Method::GET,
            build_uri("data", Some(key.as_str()), &[("action", "stat")]),
        ),
        NclCommand::ArchiveKey {
            collection_name,
            key,
            ..
        } => Route::new(
            HostTarget::Collection(collection_name.clone()),
            Method::POST,
            build_path("data", Some(key.as_str())),
        )
        .expecting(201),
        NclCommand::RetrieveKey {
            collection_name,
            key,
        } => Route::new(
            HostTarget::Collection(collection_name.clone()),
            Method::GET,
            build_path("data", Some(key.as_str())),
        ),
        NclCommand::DeleteKey {
            collection_name,
            key,
        } => Route::new(
            HostTarget::Collection(collection_name.clone()),
            Method::DELETE,
            build_path("data", Some(key.as_str())),
        ),
        NclCommand::SpaceUsage {
            collection_name,
            days,
        } => {
            let mut query = vec![("action", "space_usage".to_string())];
            if let Some(days) = days {
                query.push(("days_of_history", days.to_string()));
            }
            Route::new(
                HostTarget::Default,
                Method::GET,
                build_uri(&customer_path()?, Some(collection_name.as_str()), &query),
            )
        }
    };

    Ok(route)
}

fn push_option(query: &mut Vec<(&'static str, String)>, name: &'static str, value: &Option<String>) {
    if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
        query.push((name, value.to_string()));
    }
}

fn list_keys_query(options: &ListKeysOptions) -> Vec<(&'static str, String)> {
    let mut query = vec![("max_keys", MAX_KEYS.to_string())];
    push_option(&mut query, "prefix", &options.prefix);
    push_option(&mut query, "marker", &options.marker);
    push_option(&mut query, "delimiter", &options.delimiter);
    query
}

fn list_versions_query(options: &ListVersionsOptions) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("action", "list_versions".to_string()),
        ("max_keys", MAX_KEYS.to_string()),
    ];
    push_option(&mut query, "prefix", &options.prefix);
    push_option(&mut query, "key_marker", &options.key_marker);
    push_option(&mut query, "version_id_marker", &options.version_id_marker);
    push_option(&mut query, "delimiter", &options.delimiter);
    query
}
