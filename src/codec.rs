// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Key and entry codec.
//!
//! Translates between the typed attribute bags of the object model and the
//! native entries of a storage backend. Backends expose their storage through
//! the [`EntryStore`] trait. The codec then walks attribute definition tables
//! to read or write a whole group of attributes at once, so no backend needs
//! its own per-attribute field list.
//!
//! # Locations
//!
//! A __location__ is the backend-native name of a container of entries. For
//! the registry backend it is a directory path, e.g.,
//! `/apps/fm-actions/configurations/<id>/<profile-id>`. For the desktop
//! backend it is a key file group, e.g., `X-Action-Profile <profile-id>`.
//!
//! # Errors
//!
//! Reading is forgiving: malformed values are logged and replaced by their
//! default, and a missing mandatory value is logged and defaulted. Writing
//! tries every entry, collecting one message per failure instead of stopping
//! at the first one.
//!
//! # See Also
//!
//! 1. [`keyfile`] for the desktop-entry format.
//! 2. [`crate::registry`] for the registry format.

pub mod keyfile;

use crate::{
    codec::keyfile::KeyFileError,
    model::{Attributes, DataDef, DataType, DataValue, EntryDialect},
    registry::RegistryError,
};

use tracing::{debug, warn};

/// Backend storage handle the codec reads from and writes to.
pub trait EntryStore {
    /// Dialect used to look up native entry names.
    fn dialect(&self) -> EntryDialect;

    /// Read typed value of an entry.
    ///
    /// `Ok(None)` means the entry does not exist, which is distinct from an
    /// entry explicitly holding the type default.
    ///
    /// # Errors
    ///
    /// - Return [`CodecError`] if the stored value cannot be interpreted as
    ///   `data_type`, or the backend fails.
    fn read_value(&self, location: &str, entry: &str, data_type: DataType)
        -> Result<Option<DataValue>>;

    /// Write typed value of an entry, creating it if needed.
    ///
    /// # Errors
    ///
    /// - Return [`CodecError`] if the backend refuses the write.
    fn write_value(&mut self, location: &str, entry: &str, value: &DataValue) -> Result<()>;

    /// Remove an entry. Removing an absent entry succeeds.
    ///
    /// # Errors
    ///
    /// - Return [`CodecError`] if the backend refuses the removal.
    fn remove_value(&mut self, location: &str, entry: &str) -> Result<()>;

    /// Check if an entry can be written right now.
    fn is_entry_writable(&self, location: &str, entry: &str) -> bool;
}

/// Read every attribute of a definition group into an attribute bag.
///
/// Definitions without an entry name in the store's dialect are skipped.
/// Absent `write_if_default` attributes are set to their default, and absent
/// mandatory ones are set to their default with a warning. Malformed values
/// keep their default with a warning.
///
/// Returns true if every entry actually found in storage is writable.
pub fn read_group<S>(store: &S, location: &str, defs: &[&DataDef], attrs: &mut Attributes) -> bool
where
    S: EntryStore + ?Sized,
{
    let mut writable = true;

    for def in defs {
        let Some(entry) = def.entry(store.dialect()) else {
            continue;
        };

        match store.read_value(location, entry, def.data_type) {
            Ok(Some(value)) => {
                writable &= store.is_entry_writable(location, entry);
                attrs.set(def, value);
            }
            Ok(None) if def.mandatory => {
                warn!("{location}: mandatory entry {entry:?} not found, using default");
                attrs.set(def, def.default_value());
            }
            Ok(None) if def.write_if_default => attrs.set(def, def.default_value()),
            Ok(None) => {}
            Err(error) => {
                warn!("{location}: {error}, using default for {entry:?}");
                writable &= store.is_entry_writable(location, entry);
            }
        }
    }

    writable
}

/// Write every attribute of a definition group from an attribute bag.
///
/// Explicitly set attributes are written, as are `write_if_default` ones even
/// when unset. Other entries are removed so that a later read yields the
/// default again. Every entry is attempted. Each failure appends a message.
///
/// Returns true if every entry was written or removed.
pub fn write_group<S>(
    store: &mut S,
    location: &str,
    defs: &[&DataDef],
    attrs: &Attributes,
    messages: &mut Vec<String>,
) -> bool
where
    S: EntryStore + ?Sized,
{
    let mut ok = true;

    for def in defs {
        let Some(entry) = def.entry(store.dialect()) else {
            continue;
        };

        let result = if attrs.is_set(def) || def.write_if_default {
            store.write_value(location, entry, &attrs.value(def))
        } else {
            store.remove_value(location, entry)
        };

        if let Err(error) = result {
            debug!("{location}: failed to store {entry:?}: {error}");
            messages.push(format!("{location}: {entry}: {error}"));
            ok = false;
        }
    }

    ok
}

/// Codec error types.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Desktop-entry backend failure.
    #[error(transparent)]
    KeyFile(#[from] KeyFileError),

    /// Registry backend failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Stored value has a different type than its definition.
    #[error("entry {entry:?} at {location:?} holds a {found}, expected a {expected}")]
    TypeMismatch {
        location: String,
        entry: String,
        expected: DataType,
        found: DataType,
    },

    /// Entry cannot be modified.
    #[error("entry {entry:?} at {location:?} is not writable")]
    ReadOnly { location: String, entry: String },
}

/// Friendly result alias :3
pub type Result<T, E = CodecError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::data::{BASENAMES, ENABLED, ICON, LABEL, PROFILE_GROUP, TOOLTIP};

    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, BTreeSet};

    #[derive(Default)]
    struct FakeStore {
        values: BTreeMap<String, DataValue>,
        locked: BTreeSet<String>,
        malformed: BTreeSet<String>,
    }

    impl FakeStore {
        fn key(location: &str, entry: &str) -> String {
            format!("{location}/{entry}")
        }
    }

    impl EntryStore for FakeStore {
        fn dialect(&self) -> EntryDialect {
            EntryDialect::Registry
        }

        fn read_value(
            &self,
            location: &str,
            entry: &str,
            data_type: DataType,
        ) -> Result<Option<DataValue>> {
            let key = Self::key(location, entry);
            if self.malformed.contains(&key) {
                return Err(CodecError::TypeMismatch {
                    location: location.into(),
                    entry: entry.into(),
                    expected: data_type,
                    found: DataType::UInt,
                });
            }
            Ok(self.values.get(&key).cloned())
        }

        fn write_value(&mut self, location: &str, entry: &str, value: &DataValue) -> Result<()> {
            let key = Self::key(location, entry);
            if self.locked.contains(&key) {
                return Err(CodecError::ReadOnly {
                    location: location.into(),
                    entry: entry.into(),
                });
            }
            self.values.insert(key, value.clone());
            Ok(())
        }

        fn remove_value(&mut self, location: &str, entry: &str) -> Result<()> {
            self.values.remove(&Self::key(location, entry));
            Ok(())
        }

        fn is_entry_writable(&self, location: &str, entry: &str) -> bool {
            !self.locked.contains(&Self::key(location, entry))
        }
    }

    const GROUP: &[&DataDef] = &[&LABEL, &TOOLTIP, &ICON, &ENABLED];

    #[test]
    fn read_group_applies_defaults_and_tracks_writability() {
        let mut store = FakeStore::default();
        store
            .values
            .insert("/a/tooltip".into(), DataValue::Str("tip".into()));
        store.values.insert("/a/icon".into(), DataValue::Str("".into()));

        let mut attrs = Attributes::new();
        assert!(read_group(&store, "/a", GROUP, &mut attrs));

        // Missing mandatory label is substituted.
        assert_eq!(attrs.get(&LABEL), Some(&DataValue::LocaleStr("".into())));
        assert_eq!(attrs.string(&TOOLTIP), "tip");
        // Explicit empty value is kept as set.
        assert!(attrs.is_set(&ICON));
        // Absent write-if-default value is materialized.
        assert_eq!(attrs.get(&ENABLED), Some(&DataValue::Bool(true)));

        store.locked.insert("/a/icon".into());
        let mut attrs = Attributes::new();
        assert!(!read_group(&store, "/a", GROUP, &mut attrs));
    }

    #[test]
    fn read_group_ignores_locks_on_absent_entries() {
        let mut store = FakeStore::default();
        store.locked.insert("/a/tooltip".into());

        let mut attrs = Attributes::new();
        assert!(read_group(&store, "/a", GROUP, &mut attrs));
    }

    #[test]
    fn malformed_value_keeps_default() {
        let mut store = FakeStore::default();
        store.malformed.insert("/p/basenames".into());

        let mut attrs = Attributes::new();
        read_group(&store, "/p", PROFILE_GROUP, &mut attrs);
        assert!(!attrs.is_set(&BASENAMES));
        assert_eq!(attrs.list(&BASENAMES), vec!["*".to_string()]);
    }

    #[test]
    fn write_group_tries_every_entry() {
        let mut store = FakeStore::default();
        store.locked.insert("/a/label".into());
        store.locked.insert("/a/icon".into());
        store
            .values
            .insert("/a/tooltip".into(), DataValue::Str("stale".into()));

        let mut attrs = Attributes::new();
        attrs.set_string(&LABEL, "Open");
        attrs.set_string(&ICON, "terminal");

        let mut messages = Vec::new();
        assert!(!write_group(&mut store, "/a", GROUP, &attrs, &mut messages));
        assert_eq!(messages.len(), 2);
        assert!(!store.values.contains_key("/a/tooltip"));
        assert_eq!(store.values.get("/a/enabled"), Some(&DataValue::Bool(true)));
    }

    #[test]
    fn write_then_read_reproduces_attributes() {
        let mut store = FakeStore::default();
        let mut attrs = Attributes::new();
        attrs.set_string(&LABEL, "Open");
        attrs.set_boolean(&ENABLED, false);
        attrs.set_string(&ICON, "");

        let mut messages = Vec::new();
        assert!(write_group(&mut store, "/a", GROUP, &attrs, &mut messages));

        let mut reread = Attributes::new();
        read_group(&store, "/a", GROUP, &mut reread);
        assert_eq!(reread, attrs);
    }
}
