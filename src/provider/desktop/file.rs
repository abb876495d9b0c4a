// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{
    codec::{
        keyfile::{locale_variants, KeyFile},
        CodecError, EntryStore, Result as CodecResult,
    },
    model::{DataType, DataValue, EntryDialect},
    provider::desktop::{DesktopError, Result},
};

use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// One desktop file loaded in memory.
///
/// Every entry shares the writability of the file itself.
#[derive(Debug, Clone)]
pub struct DesktopFile {
    path: PathBuf,
    keyfile: KeyFile,
    locales: Vec<String>,
    writable: bool,
}

impl DesktopFile {
    /// Construct empty desktop file that does not exist on disk yet.
    pub fn new(path: impl Into<PathBuf>, locales: Vec<String>) -> Self {
        Self {
            path: path.into(),
            keyfile: KeyFile::new(),
            locales,
            writable: true,
        }
    }

    /// Load and parse desktop file.
    ///
    /// # Errors
    ///
    /// - Return [`DesktopError::Io`] if file cannot be read.
    /// - Return [`DesktopError::KeyFile`] if file cannot be parsed.
    pub fn load(path: impl Into<PathBuf>, locales: Vec<String>) -> Result<Self> {
        let path = path.into();
        let data = fs::read_to_string(&path).map_err(|source| DesktopError::Io {
            path: path.clone(),
            source,
        })?;
        let keyfile = data.parse::<KeyFile>().map_err(|source| DesktopError::KeyFile {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            keyfile,
            locales,
            writable: true,
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Move file to another location, keeping its content.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    pub fn keyfile(&self) -> &KeyFile {
        &self.keyfile
    }

    pub fn keyfile_mut(&mut self) -> &mut KeyFile {
        &mut self.keyfile
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    /// Write file content to disk, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// - Return [`DesktopError::NotWritable`] if file is read-only.
    /// - Return [`DesktopError::Io`] if file cannot be written.
    pub fn save(&self) -> Result<()> {
        if !self.writable || is_readonly(&self.path) {
            return Err(DesktopError::NotWritable {
                path: self.path.clone(),
            });
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| DesktopError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        debug!("save desktop file {:?}", self.path);
        fs::write(&self.path, self.keyfile.to_string()).map_err(|source| DesktopError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn write_locale_string(&mut self, group: &str, key: &str, value: &str) {
        let variant = self
            .locales
            .first()
            .and_then(|locale| locale_variants(locale).into_iter().next());

        match variant {
            Some(variant) => {
                self.keyfile
                    .set_locale_string(group, key, Some(variant.as_str()), value);
                if self.keyfile.raw_value(group, key).is_none() {
                    self.keyfile.set_string(group, key, value);
                }
            }
            None => self.keyfile.set_string(group, key, value),
        }
    }
}

impl EntryStore for DesktopFile {
    fn dialect(&self) -> EntryDialect {
        EntryDialect::Desktop
    }

    fn read_value(
        &self,
        location: &str,
        entry: &str,
        data_type: DataType,
    ) -> CodecResult<Option<DataValue>> {
        let keyfile = &self.keyfile;
        let value = match data_type {
            DataType::String => keyfile.string(location, entry)?.map(DataValue::Str),
            DataType::LocaleString => keyfile
                .locale_string(location, entry, &self.locales)?
                .map(DataValue::LocaleStr),
            DataType::Boolean => keyfile.boolean(location, entry)?.map(DataValue::Bool),
            DataType::StringList => keyfile
                .string_list(location, entry)?
                .map(DataValue::StrList),
            DataType::UInt => keyfile.uint(location, entry)?.map(DataValue::UInt),
        };

        Ok(value)
    }

    fn write_value(&mut self, location: &str, entry: &str, value: &DataValue) -> CodecResult<()> {
        if !self.writable {
            return Err(CodecError::ReadOnly {
                location: location.into(),
                entry: entry.into(),
            });
        }

        match value {
            DataValue::Str(value) => self.keyfile.set_string(location, entry, value),
            DataValue::LocaleStr(value) => self.write_locale_string(location, entry, value),
            DataValue::Bool(value) => self.keyfile.set_boolean(location, entry, *value),
            DataValue::StrList(value) => self.keyfile.set_string_list(location, entry, value),
            DataValue::UInt(value) => self.keyfile.set_uint(location, entry, *value),
        }

        Ok(())
    }

    fn remove_value(&mut self, location: &str, entry: &str) -> CodecResult<()> {
        if !self.writable {
            return Err(CodecError::ReadOnly {
                location: location.into(),
                entry: entry.into(),
            });
        }

        self.keyfile.remove_key(location, entry);
        Ok(())
    }

    fn is_entry_writable(&self, _location: &str, _entry: &str) -> bool {
        self.writable
    }
}

/// Check if an existing path carries read-only permissions.
pub(crate) fn is_readonly(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.permissions().readonly())
}

/// Join command path and parameters into an `Exec` value.
///
/// An empty path, or one holding whitespace or quotes, is double-quoted.
pub fn join_exec(path: &str, parameters: &str) -> String {
    let needs_quotes = path.is_empty() || path.chars().any(|ch| ch.is_whitespace() || ch == '"');
    let mut exec = if needs_quotes {
        let escaped = path.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        path.to_string()
    };

    if !parameters.is_empty() {
        exec.push(' ');
        exec.push_str(parameters);
    }

    exec
}

/// Split an `Exec` value into command path and parameters.
pub fn split_exec(exec: &str) -> (String, String) {
    let exec = exec.trim_start();

    if let Some(quoted) = exec.strip_prefix('"') {
        let mut path = String::new();
        let mut chars = quoted.char_indices();
        while let Some((index, ch)) = chars.next() {
            match ch {
                '\\' => {
                    if let Some((_, next)) = chars.next() {
                        path.push(next);
                    }
                }
                '"' => {
                    let rest = &quoted[index + 1..];
                    return (path, rest.trim_start().to_string());
                }
                _ => path.push(ch),
            }
        }
        return (path, String::new());
    }

    match exec.split_once(char::is_whitespace) {
        Some((path, rest)) => (path.to_string(), rest.trim_start().to_string()),
        None => (exec.to_string(), String::new()),
    }
}
