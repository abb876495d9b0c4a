// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Hierarchical typed key registry.
//!
//! The __registry__ is the legacy storage format for context-menu actions.
//! It is a tree of directories addressed by absolute slash-separated paths,
//! e.g., `/apps/fm-actions/configurations/<id>`. Each directory holds typed
//! leaf entries and further sub-directories.
//!
//! # Implementations
//!
//! - [`FsRegistry`] maps registry directories onto filesystem directories,
//!   keeping the entries of each in a small TOML file.
//! - [`MemoryRegistry`] keeps everything in memory. It can lock keys and
//!   inject failures, which makes it handy to exercise error paths.
//!
//! # Errors
//!
//! Every operation reports failures through [`RegistryError`]. The codec
//! layer wraps them into [`CodecError`] so providers can report them as
//! write messages.

mod fs;
mod memory;

pub use fs::{FsRegistry, ENTRIES_FILE};
pub use memory::{MemoryRegistry, RegistryOp};

use crate::{
    codec::{CodecError, EntryStore, Result as CodecResult},
    model::{DataType, DataValue, EntryDialect},
};

use std::path::PathBuf;

/// Typed key registry.
pub trait Registry {
    /// Value of a key, if present.
    ///
    /// # Errors
    ///
    /// - Return [`RegistryError`] if backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<DataValue>>;

    /// Set value of a key, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// - Return [`RegistryError::ReadOnly`] if key is locked.
    /// - Return [`RegistryError`] if backing storage cannot be written.
    fn set(&mut self, key: &str, value: &DataValue) -> Result<()>;

    /// Remove a key. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// - Return [`RegistryError::ReadOnly`] if key is locked.
    /// - Return [`RegistryError`] if backing storage cannot be written.
    fn unset(&mut self, key: &str) -> Result<()>;

    /// Remove a directory with everything below it.
    ///
    /// # Errors
    ///
    /// - Return [`RegistryError`] if any part cannot be removed.
    fn recursive_unset(&mut self, dir: &str) -> Result<()>;

    /// Absolute paths of the immediate sub-directories of a directory.
    ///
    /// # Errors
    ///
    /// - Return [`RegistryError`] if backing storage cannot be read.
    fn all_dirs(&self, dir: &str) -> Result<Vec<String>>;

    /// Entry names held directly by a directory.
    ///
    /// # Errors
    ///
    /// - Return [`RegistryError`] if backing storage cannot be read.
    fn all_entries(&self, dir: &str) -> Result<Vec<String>>;

    fn dir_exists(&self, dir: &str) -> bool;

    /// Check if a key can be written right now.
    fn is_key_writable(&self, key: &str) -> bool;

    /// Filesystem directory to watch for external changes, if any.
    fn watch_root(&self) -> Option<PathBuf> {
        None
    }
}

/// Join directory and entry name into an absolute key.
pub fn join_key(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    format!("{dir}/{name}")
}

/// Last component of a key.
pub fn key_basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Split a key into its parent directory and entry name.
///
/// # Errors
///
/// - Return [`RegistryError::InvalidKey`] if key is not a valid absolute
///   path naming an entry.
pub fn split_key(key: &str) -> Result<(&str, &str)> {
    let segments = key_segments(key)?;
    if segments.is_empty() {
        return Err(RegistryError::InvalidKey { key: key.into() });
    }

    let key = key.trim_end_matches('/');
    let (dir, name) = key.rsplit_once('/').unwrap_or(("", key));
    let dir = if dir.is_empty() { "/" } else { dir };
    Ok((dir, name))
}

/// Validated path segments of a key or directory.
///
/// # Errors
///
/// - Return [`RegistryError::InvalidKey`] if key is not absolute, or holds
///   empty, `.`, or `..` segments.
pub(crate) fn key_segments(key: &str) -> Result<Vec<&str>> {
    let rest = key
        .strip_prefix('/')
        .ok_or_else(|| RegistryError::InvalidKey { key: key.into() })?;

    if rest.is_empty() {
        return Ok(Vec::new());
    }

    let segments = rest.trim_end_matches('/').split('/').collect::<Vec<_>>();
    if segments
        .iter()
        .any(|segment| segment.is_empty() || *segment == "." || *segment == "..")
    {
        return Err(RegistryError::InvalidKey { key: key.into() });
    }

    Ok(segments)
}

/// Check if key is `dir` itself or lies below it.
pub(crate) fn is_under(key: &str, dir: &str) -> bool {
    let dir = dir.trim_end_matches('/');
    key == dir || dir.is_empty() || key.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

impl<'r> EntryStore for dyn Registry + 'r {
    fn dialect(&self) -> EntryDialect {
        EntryDialect::Registry
    }

    fn read_value(
        &self,
        location: &str,
        entry: &str,
        data_type: DataType,
    ) -> CodecResult<Option<DataValue>> {
        let key = join_key(location, entry);
        let Some(value) = self.get(&key)? else {
            return Ok(None);
        };

        let found = value.data_type();
        value
            .coerce(data_type)
            .map(Some)
            .ok_or(CodecError::TypeMismatch {
                location: location.into(),
                entry: entry.into(),
                expected: data_type,
                found,
            })
    }

    fn write_value(&mut self, location: &str, entry: &str, value: &DataValue) -> CodecResult<()> {
        self.set(&join_key(location, entry), value)?;
        Ok(())
    }

    fn remove_value(&mut self, location: &str, entry: &str) -> CodecResult<()> {
        self.unset(&join_key(location, entry))?;
        Ok(())
    }

    fn is_entry_writable(&self, location: &str, entry: &str) -> bool {
        self.is_key_writable(&join_key(location, entry))
    }
}

/// Registry error types.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Key is not a valid absolute registry path.
    #[error("invalid registry key {key:?}")]
    InvalidKey { key: String },

    /// Key or directory is locked against modification.
    #[error("registry key {key:?} is read-only")]
    ReadOnly { key: String },

    /// Stored value cannot be represented as a typed value.
    #[error("registry key {key:?} holds an unsupported value")]
    UnsupportedValue { key: String },

    /// Backend refused the operation.
    #[error("registry backend failed on {key:?}: {reason}")]
    Backend { key: String, reason: String },

    /// Filesystem access failed.
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Entries file cannot be parsed.
    #[error("failed to parse {path:?}: {source}")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Entries cannot be serialized.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),
}

/// Friendly result alias :3
pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codec::read_group,
        model::{data::ITEM_GROUP, Attributes},
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn key_helpers() -> anyhow::Result<()> {
        assert_eq!(join_key("/apps/x/", "label"), "/apps/x/label");
        assert_eq!(key_basename("/apps/x/label"), "label");
        assert_eq!(split_key("/apps/x/label")?, ("/apps/x", "label"));
        assert_eq!(split_key("/label")?, ("/", "label"));
        assert!(split_key("/").is_err());
        assert!(split_key("relative/key").is_err());
        assert!(split_key("/apps/../etc").is_err());
        assert!(split_key("/apps//x").is_err());
        assert!(is_under("/apps/x/label", "/apps/x"));
        assert!(is_under("/apps/x", "/apps/x"));
        assert!(!is_under("/apps/xy", "/apps/x"));
        assert!(is_under("/apps", "/"));

        Ok(())
    }

    #[test]
    fn entry_store_reports_type_mismatch() -> anyhow::Result<()> {
        let mut registry = MemoryRegistry::new();
        registry.insert("/a/enabled", DataValue::Str("yes".into()));
        registry.insert("/a/label", DataValue::Str("Open".into()));

        let store: &dyn Registry = &registry;
        assert!(store.read_value("/a", "enabled", DataType::Boolean).is_err());
        assert_eq!(
            store.read_value("/a", "label", DataType::LocaleString)?,
            Some(DataValue::LocaleStr("Open".into()))
        );
        assert_eq!(store.read_value("/a", "icon", DataType::LocaleString)?, None);

        let mut attrs = Attributes::new();
        read_group(store, "/a", ITEM_GROUP, &mut attrs);
        assert_eq!(attrs.string(&crate::model::data::LABEL), "Open");
        assert!(attrs.boolean(&crate::model::data::ENABLED));

        Ok(())
    }
}
