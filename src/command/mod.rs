//! The nimbus.io command language (NCL).
//!
//! One line of text names one operation on the store, e.g.
//! `create collection photos versioning=true` or
//! `photos retrieve key 2024/beach.jpg`. [`parse`] turns a line into an
//! [`NclCommand`], and [`route`] maps that onto a REST call.

mod parser;
mod route;

pub use parser::{is_valid_collection_name, parse, MAX_COLLECTION_NAME_LENGTH};
pub use route::{route, HostTarget, Route, MAX_KEYS};

use std::path::PathBuf;

/// Filters for listing keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListKeysOptions {
    /// Only keys starting with this prefix.
    pub prefix: Option<String>,
    /// Start listing after this key.
    pub marker: Option<String>,
    /// Roll keys up to the first occurrence of this delimiter.
    pub delimiter: Option<String>,
}

/// Filters for listing key versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListVersionsOptions {
    /// Only keys starting with this prefix.
    pub prefix: Option<String>,
    /// Start listing after this key.
    pub key_marker: Option<String>,
    /// Start listing after this version.
    pub version_id_marker: Option<String>,
    /// Roll keys up to the first occurrence of this delimiter.
    pub delimiter: Option<String>,
}

/// A parsed NCL command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NclCommand {
    /// `list collections`
    ListCollections,
    /// `list collection <c>`
    ListCollection {
        /// Collection to describe.
        collection_name: String,
    },
    /// `create collection <c> [versioning=true|false]`
    CreateCollection {
        /// Collection to create.
        collection_name: String,
        /// Requested versioning state.
        versioning: Option<bool>,
    },
    /// `set collection <c> [versioning=true|false]`
    SetCollection {
        /// Collection to change.
        collection_name: String,
        /// New versioning state.
        versioning: Option<bool>,
    },
    /// `delete collection <c>`
    DeleteCollection {
        /// Collection to delete.
        collection_name: String,
    },
    /// `<c> list keys [prefix=] [marker=] [delimiter=]`
    ListKeys {
        /// Collection to list.
        collection_name: String,
        /// Listing filters.
        options: ListKeysOptions,
    },
    /// `<c> list key versions [prefix=] [key_marker=] [version_id_marker=] [delimiter=]`
    ListKeyVersions {
        /// Collection to list.
        collection_name: String,
        /// Listing filters.
        options: ListVersionsOptions,
    },
    /// `<c> list key <key>`
    ListKey {
        /// Collection holding the key.
        collection_name: String,
        /// Key to describe.
        key: String,
    },
    /// `<c> archive key <key> <path>`
    ArchiveKey {
        /// Destination collection.
        collection_name: String,
        /// Key to store under.
        key: String,
        /// Local file to upload.
        path: PathBuf,
    },
    /// `<c> retrieve key <key>`
    RetrieveKey {
        /// Collection holding the key.
        collection_name: String,
        /// Key to fetch.
        key: String,
    },
    /// `<c> delete key <key>`
    DeleteKey {
        /// Collection holding the key.
        collection_name: String,
        /// Key to delete.
        key: String,
    },
    /// `<c> space usage [days=N]`
    SpaceUsage {
        /// Collection to report on.
        collection_name: String,
        /// Days of history to include.
        days: Option<u32>,
    },
}

impl NclCommand {
    /// Short command name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            NclCommand::ListCollections => "list-collections",
            NclCommand::ListCollection { .. } => "list-collection",
            NclCommand::CreateCollection { .. } => "create-collection",
            NclCommand::SetCollection { .. } => "set-collection",
            NclCommand::DeleteCollection { .. } => "delete-collection",
            NclCommand::ListKeys { .. } => "list-keys",
            NclCommand::ListKeyVersions { .. } => "list-key-versions",
            NclCommand::ListKey { .. } => "list-key",
            NclCommand::ArchiveKey { .. } => "archive-key",
            NclCommand::RetrieveKey { .. } => "retrieve-key",
            NclCommand::DeleteKey { .. } => "delete-key",
            NclCommand::SpaceUsage { .. } => "space-usage",
        }
    }

    /// Collection the command targets, if any.
    pub fn collection_name(&self) -> Option<&str> {
        match self {
            NclCommand::ListCollections => None,
            NclCommand::ListCollection { collection_name }
            | NclCommand::CreateCollection {
                collection_name, ..
            }
            | NclCommand::SetCollection {
                collection_name, ..
            }
            | NclCommand::DeleteCollection { collection_name }
            | NclCommand::ListKeys {
                collection_name, ..
            }
            | NclCommand::ListKeyVersions {
                collection_name, ..
            }
            | NclCommand::ListKey {
                collection_name, ..
            }
            | NclCommand::ArchiveKey {
                collection_name, ..
            }
            | NclCommand::RetrieveKey {
                collection_name, ..
            }
            | NclCommand::DeleteKey {
                collection_name, ..
            }
            | NclCommand::SpaceUsage {
                collection_name, ..
            } => Some(collection_name),
        }
    }

    /// Key the command targets, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            NclCommand::ListKey { key, .. }
            | NclCommand::ArchiveKey { key, .. }
            | NclCommand::RetrieveKey { key, .. }
            | NclCommand::DeleteKey { key, .. } => Some(key),
            _ => None,
        }
    }
}
