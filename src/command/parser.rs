//! NCL line parser.

use super::{ListKeysOptions, ListVersionsOptions, NclCommand};
use crate::error::{CommandError, LumberyardError};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::PathBuf;

/// Longest collection name the store accepts.
pub const MAX_COLLECTION_NAME_LENGTH: usize = 63;

static COLLECTION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$").expect("valid regex"));

#[derive(Debug, Clone, Copy)]
enum Template {
    ListCollections,
    ListCollection,
    CreateCollection,
    SetCollection,
    DeleteCollection,
    ListKeys,
    ListKeyVersions,
    ListKey,
    ArchiveKey,
    RetrieveKey,
    DeleteKey,
    SpaceUsage,
}

// Order matters: `list key versions` must be tried before `list key <key>`.
static TEMPLATES: Lazy<Vec<(Template, Regex)>> = Lazy::new(|| {
    [
        (Template::ListCollections, r"^list collections$"),
        (Template::ListCollection, r"^list collection (?P<c>\S+)$"),
        (
            Template::CreateCollection,
            r"^create collection (?P<c>\S+)(?P<opts>(?: \S+)*)$",
        ),
        (
            Template::SetCollection,
            r"^set collection (?P<c>\S+)(?P<opts>(?: \S+)*)$",
        ),
        (Template::DeleteCollection, r"^delete collection (?P<c>\S+)$"),
        (Template::ListKeys, r"^(?P<c>\S+) list keys(?P<opts>(?: \S+)*)$"),
        (
            Template::ListKeyVersions,
            r"^(?P<c>\S+) list key versions(?P<opts>(?: \S+)*)$",
        ),
        (Template::ListKey, r"^(?P<c>\S+) list key (?P<k>\S+)$"),
        (
            Template::ArchiveKey,
            r"^(?P<c>\S+) archive key (?P<k>\S+) (?P<p>\S+)$",
        ),
        (Template::RetrieveKey, r"^(?P<c>\S+) retrieve key (?P<k>\S+)$"),
        (Template::DeleteKey, r"^(?P<c>\S+) delete key (?P<k>\S+)$"),
        (Template::SpaceUsage, r"^(?P<c>\S+) space usage(?P<opts>(?: \S+)*)$"),
    ]
    .into_iter()
    .map(|(template, pattern)| (template, Regex::new(pattern).expect("valid regex")))
    .collect()
});

/// Returns true if `name` is an acceptable collection name.
///
/// Lowercase letters, digits and single hyphens, not starting or ending with
/// a hyphen, at most 63 characters.
pub fn is_valid_collection_name(name: &str) -> bool {
    name.len() <= MAX_COLLECTION_NAME_LENGTH
        && !name.contains("--")
        && COLLECTION_NAME.is_match(name)
}

/// Parse one line of NCL.
pub fn parse(line: &str) -> Result<NclCommand, LumberyardError> {
    let normalized = line.split_whitespace().collect::<Vec<_>>().join(" ");

    let (template, captures) = TEMPLATES
        .iter()
        .find_map(|(template, regex)| regex.captures(&normalized).map(|c| (*template, c)))
        .ok_or_else(|| CommandError::Unrecognized {
            input: line.trim().to_string(),
        })?;

    let command = match template {
        Template::ListCollections => NclCommand::ListCollections,
        Template::ListCollection => NclCommand::ListCollection {
            collection_name: collection(&captures)?,
        },
        Template::CreateCollection => NclCommand::CreateCollection {
            collection_name: collection(&captures)?,
            versioning: versioning_option(&captures)?,
        },
        Template::SetCollection => NclCommand::SetCollection {
            collection_name: collection(&captures)?,
            versioning: versioning_option(&captures)?,
        },
        Template::DeleteCollection => NclCommand::DeleteCollection {
            collection_name: collection(&captures)?,
        },
        Template::ListKeys => {
            let collection_name = collection(&captures)?;
            let mut options = ListKeysOptions::default();
            for (name, value) in options_of(&captures)? {
                match name {
                    "prefix" => options.prefix = Some(value.to_string()),
                    "marker" => options.marker = Some(value.to_string()),
                    "delimiter" => options.delimiter = Some(value.to_string()),
                    other => return Err(unknown_option(other)),
                }
            }
            NclCommand::ListKeys {
                collection_name,
                options,
            }
        }
        Template::ListKeyVersions => {
            let collection_name = collection(&captures)?;
            let mut options = ListVersionsOptions::default();
            for (name, value) in options_of(&captures)? {
                match name {
                    "prefix" => options.prefix = Some(value.to_string()),
                    "key_marker" => options.key_marker = Some(value.to_string()),
                    "version_id_marker" => options.version_id_marker = Some(value.to_string()),
                    "delimiter" => options.delimiter = Some(value.to_string()),
                    other => return Err(unknown_option(other)),
                }
            }
            NclCommand::ListKeyVersions {
                collection_name,
                options,
            }
        }
        Template::ListKey => NclCommand::ListKey {
            collection_name: collection(&captures)?,
            key: captures["k"].to_string(),
        },
        Template::ArchiveKey => NclCommand::ArchiveKey {
            collection_name: collection(&captures)?,
            key: captures["k"].to_string(),
            path: PathBuf::from(&captures["p"]),
        },
        Template::RetrieveKey => NclCommand::RetrieveKey {
            collection_name: collection(&captures)?,
            key: captures["k"].to_string(),
        },
        Template::DeleteKey => NclCommand::DeleteKey {
            collection_name: collection(&captures)?,
            key: captures["k"].to_string(),
        },
        Template::SpaceUsage => {
            let collection_name = collection(&captures)?;
            let mut days = None;
            for (name, value) in options_of(&captures)? {
                match name {
                    "days" => {
                        days = Some(value.parse::<u32>().map_err(|_| {
                            CommandError::InvalidOption {
                                option: format!("{}={}", name, value),
                                message: "expected a whole number of days".to_string(),
                            }
                        })?)
                    }
                    other => return Err(unknown_option(other)),
                }
            }
            NclCommand::SpaceUsage {
                collection_name,
                days,
            }
        }
    };

    Ok(command)
}

fn collection(captures: &Captures<'_>) -> Result<String, LumberyardError> {
    let name = &captures["c"];
    if !is_valid_collection_name(name) {
        return Err(CommandError::InvalidCollectionName {
            name: name.to_string(),
        }
        .into());
    }
    Ok(name.to_string())
}

/// Split the trailing `name=value` tokens.
fn options_of<'t>(captures: &Captures<'t>) -> Result<Vec<(&'t str, &'t str)>, LumberyardError> {
    let Some(raw) = captures.name("opts") else {
        return Ok(Vec::new());
    };

    raw.as_str()
        .split_whitespace()
        .map(|token| {
            token.split_once('=').ok_or_else(|| {
                CommandError::InvalidOption {
                    option: token.to_string(),
                    message: "expected name=value".to_string(),
                }
                .into()
            })
        })
        .collect()
}

fn versioning_option(captures: &Captures<'_>) -> Result<Option<bool>, LumberyardError> {
    let mut versioning = None;
    for (name, value) in options_of(captures)? {
        if name != "versioning" {
            return Err(unknown_option(name));
        }
        versioning = Some(match value.to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => {
                return Err(CommandError::InvalidOption {
                    option: format!("{}={}", name, value),
                    message: "expected true or false".to_string(),
                }
                .into())
            }
        });
    }
    Ok(versioning)
}

fn unknown_option(name: &str) -> LumberyardError {
    CommandError::InvalidOption {
        option: name.to_string(),
        message: "unknown option".to_string(),
    }
    .into()
}
