// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{
    model::DataValue,
    registry::{key_segments, split_key, Registry, RegistryError, Result},
};

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Name of the file holding the entries of one registry directory.
pub const ENTRIES_FILE: &str = "%entries.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
enum StoredValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl StoredValue {
    fn into_data_value(self, key: &str) -> Result<DataValue> {
        match self {
            Self::Bool(value) => Ok(DataValue::Bool(value)),
            Self::Int(value) => u32::try_from(value)
                .map(DataValue::UInt)
                .map_err(|_| RegistryError::UnsupportedValue { key: key.into() }),
            Self::Str(value) => Ok(DataValue::Str(value)),
            Self::List(value) => Ok(DataValue::StrList(value)),
        }
    }
}

impl From<&DataValue> for StoredValue {
    fn from(value: &DataValue) -> Self {
        match value {
            DataValue::Str(value) | DataValue::LocaleStr(value) => Self::Str(value.clone()),
            DataValue::Bool(value) => Self::Bool(*value),
            DataValue::StrList(value) => Self::List(value.clone()),
            DataValue::UInt(value) => Self::Int(i64::from(*value)),
        }
    }
}

type Entries = BTreeMap<String, StoredValue>;

/// Registry stored as a directory tree.
///
/// Registry directory `/a/b` maps onto filesystem directory `<root>/a/b`,
/// whose entries live in its [`ENTRIES_FILE`]:
///
/// ```toml
/// label = "Open"
/// target-selection = true
/// items-list = ["profile-1"]
/// ```
///
/// A key is writable when its entries file, or its nearest existing
/// ancestor directory if the file does not exist yet, is not read-only.
#[derive(Debug, Clone)]
pub struct FsRegistry {
    root: PathBuf,
}

impl FsRegistry {
    /// Construct registry rooted at a filesystem directory.
    ///
    /// The directory does not need to exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn dir_path(&self, dir: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        path.extend(key_segments(dir)?);
        Ok(path)
    }

    fn load(&self, dir: &str) -> Result<Entries> {
        let path = self.dir_path(dir)?.join(ENTRIES_FILE);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(source) => return Err(RegistryError::Io { path, source }),
        };

        toml::from_str(&data).map_err(|source| RegistryError::Deserialize { path, source })
    }

    fn store(&self, dir: &str, key: &str, entries: &Entries) -> Result<()> {
        let dir_path = self.dir_path(dir)?;
        let path = dir_path.join(ENTRIES_FILE);

        if entries.is_empty() {
            return match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
                Err(source) => Err(RegistryError::Io { path, source }),
            };
        }

        fs::create_dir_all(&dir_path).map_err(|source| RegistryError::Io {
            path: dir_path.clone(),
            source,
        })?;
        let data = toml::to_string(entries)?;
        debug!("write registry entries {key:?} to {path:?}");
        fs::write(&path, data).map_err(|source| RegistryError::Io { path, source })
    }

    fn check_modifiable(&self, key: &str) -> Result<()> {
        if self.is_key_writable(key) {
            Ok(())
        } else {
            Err(RegistryError::ReadOnly { key: key.into() })
        }
    }
}

impl Registry for FsRegistry {
    fn get(&self, key: &str) -> Result<Option<DataValue>> {
        let (dir, name) = split_key(key)?;
        self.load(dir)?
            .remove(name)
            .map(|value| value.into_data_value(key))
            .transpose()
    }

    fn set(&mut self, key: &str, value: &DataValue) -> Result<()> {
        let (dir, name) = split_key(key)?;
        self.check_modifiable(key)?;
        let mut entries = self.load(dir)?;
        entries.insert(name.into(), StoredValue::from(value));
        self.store(dir, key, &entries)
    }

    fn unset(&mut self, key: &str) -> Result<()> {
        let (dir, name) = split_key(key)?;
        let mut entries = self.load(dir)?;
        if entries.remove(name).is_none() {
            return Ok(());
        }

        self.check_modifiable(key)?;
        self.store(dir, key, &entries)
    }

    fn recursive_unset(&mut self, dir: &str) -> Result<()> {
        let path = self.dir_path(dir)?;
        if !path.exists() {
            return Ok(());
        }

        let parent_locked = path
            .parent()
            .and_then(|parent| fs::metadata(parent).ok())
            .is_some_and(|meta| meta.permissions().readonly());
        if parent_locked {
            return Err(RegistryError::ReadOnly { key: dir.into() });
        }

        debug!("remove registry directory {dir:?} at {path:?}");
        fs::remove_dir_all(&path).map_err(|source| RegistryError::Io { path, source })
    }

    fn all_dirs(&self, dir: &str) -> Result<Vec<String>> {
        let path = self.dir_path(dir)?;
        let reader = match fs::read_dir(&path) {
            Ok(reader) => reader,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(RegistryError::Io { path, source }),
        };

        let mut dirs = Vec::new();
        for entry in reader {
            let entry = entry.map_err(|source| RegistryError::Io {
                path: path.clone(),
                source,
            })?;
            if !entry.path().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('%') {
                dirs.push(super::join_key(dir, &name));
            }
        }
        dirs.sort();

        Ok(dirs)
    }

    fn all_entries(&self, dir: &str) -> Result<Vec<String>> {
        Ok(self.load(dir)?.into_keys().collect())
    }

    fn dir_exists(&self, dir: &str) -> bool {
        self.dir_path(dir).is_ok_and(|path| path.is_dir())
    }

    fn is_key_writable(&self, key: &str) -> bool {
        let Ok((dir, _)) = split_key(key) else {
            return false;
        };
        let Ok(dir_path) = self.dir_path(dir) else {
            return false;
        };

        let entries = dir_path.join(ENTRIES_FILE);
        let probe = if entries.exists() {
            Some(entries.as_path())
        } else {
            dir_path.ancestors().find(|path| path.exists())
        };

        probe
            .and_then(|path| fs::metadata(path).ok())
            .is_some_and(|meta| !meta.permissions().readonly())
    }

    fn watch_root(&self) -> Option<PathBuf> {
        Some(self.root.clone())
    }
}
