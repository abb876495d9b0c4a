// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{
    model::DataValue,
    registry::{is_under, key_segments, split_key, Registry, RegistryError, Result},
};

use std::collections::{BTreeMap, BTreeSet};

/// Operation attempted on a [`MemoryRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryOp {
    Set(String),
    Unset(String),
    RecursiveUnset(String),
}

impl RegistryOp {
    /// Key or directory the operation targeted.
    pub fn key(&self) -> &str {
        match self {
            Self::Set(key) | Self::Unset(key) | Self::RecursiveUnset(key) => key.as_str(),
        }
    }
}

/// In-memory registry.
///
/// Directories exist implicitly while any key lies below them. Every
/// modifying operation is recorded in an operation log, whether it succeeds
/// or not.
#[derive(Debug, Default, Clone)]
pub struct MemoryRegistry {
    values: BTreeMap<String, DataValue>,
    locked: BTreeSet<String>,
    failing: BTreeSet<String>,
    log: Vec<RegistryOp>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without going through locks, failures, or the log.
    pub fn insert(&mut self, key: impl Into<String>, value: DataValue) {
        self.values.insert(key.into(), value);
    }

    /// Lock a key, or every key below a directory, against modification.
    pub fn lock(&mut self, key: impl Into<String>) {
        self.locked.insert(key.into());
    }

    /// Make every modification at or below `prefix` fail.
    pub fn fail_writes_under(&mut self, prefix: impl Into<String>) {
        self.failing.insert(prefix.into());
    }

    /// Modifying operations attempted so far.
    pub fn log(&self) -> &[RegistryOp] {
        self.log.as_slice()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// All keys currently holding a value.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    fn check_modifiable(&self, key: &str) -> Result<()> {
        if self.locked.iter().any(|locked| is_under(key, locked)) {
            return Err(RegistryError::ReadOnly { key: key.into() });
        }

        if self.failing.iter().any(|prefix| is_under(key, prefix)) {
            return Err(RegistryError::Backend {
                key: key.into(),
                reason: "write refused".into(),
            });
        }

        Ok(())
    }
}

impl Registry for MemoryRegistry {
    fn get(&self, key: &str) -> Result<Option<DataValue>> {
        split_key(key)?;
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &DataValue) -> Result<()> {
        self.log.push(RegistryOp::Set(key.into()));
        split_key(key)?;
        self.check_modifiable(key)?;
        let value = match value {
            DataValue::LocaleStr(value) => DataValue::Str(value.clone()),
            value => value.clone(),
        };
        self.values.insert(key.into(), value);
        Ok(())
    }

    fn unset(&mut self, key: &str) -> Result<()> {
        self.log.push(RegistryOp::Unset(key.into()));
        split_key(key)?;
        self.check_modifiable(key)?;
        self.values.remove(key);
        Ok(())
    }

    fn recursive_unset(&mut self, dir: &str) -> Result<()> {
        self.log.push(RegistryOp::RecursiveUnset(dir.into()));
        key_segments(dir)?;
        self.check_modifiable(dir)?;

        let doomed = self
            .values
            .keys()
            .filter(|key| is_under(key, dir))
            .cloned()
            .collect::<Vec<_>>();
        if let Some(key) = doomed.iter().find(|key| self.check_modifiable(key).is_err()) {
            return Err(RegistryError::ReadOnly { key: key.clone() });
        }

        for key in doomed {
            self.values.remove(&key);
        }

        Ok(())
    }

    fn all_dirs(&self, dir: &str) -> Result<Vec<String>> {
        let depth = key_segments(dir)?.len();
        let mut dirs = BTreeSet::new();

        for key in self.values.keys().filter(|key| is_under(key, dir)) {
            let segments = key_segments(key)?;
            if segments.len() > depth + 1 {
                dirs.insert(format!("/{}", segments[..=depth].join("/")));
            }
        }

        Ok(dirs.into_iter().collect())
    }

    fn all_entries(&self, dir: &str) -> Result<Vec<String>> {
        let depth = key_segments(dir)?.len();
        let mut entries = Vec::new();

        for key in self.values.keys().filter(|key| is_under(key, dir)) {
            let segments = key_segments(key)?;
            if segments.len() == depth + 1 {
                entries.push(segments[depth].to_string());
            }
        }

        Ok(entries)
    }

    fn dir_exists(&self, dir: &str) -> bool {
        let dir = dir.trim_end_matches('/');
        self.values
            .keys()
            .any(|key| key.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/')))
    }

    fn is_key_writable(&self, key: &str) -> bool {
        self.check_modifiable(key).is_ok()
    }
}
