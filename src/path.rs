// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where items and preferences live on disk, following the XDG
//! Base Directory layout. Nothing here checks that returned paths exist.
//!
//! # See Also
//!
//! - [XDG Base Directory](https://specifications.freedesktop.org/basedir-spec/latest/)

use crate::provider::desktop::DESKTOP_SUBDIR;

use std::{env, path::PathBuf};

const APP_DIR: &str = "fmactions";
const SETTINGS_FILE: &str = "settings.toml";

/// User data directory, `$XDG_DATA_HOME` or `~/.local/share`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn user_data_dir() -> Result<PathBuf> {
    dirs::data_dir().ok_or(NoWayHome)
}

/// System data directories from `$XDG_DATA_DIRS`, in priority order.
pub fn system_data_dirs() -> Vec<PathBuf> {
    split_dirs(env::var("XDG_DATA_DIRS").ok().as_deref(), &["/usr/local/share", "/usr/share"])
}

/// Desktop backend search directories, in priority order.
///
/// The user directory comes first and is the write target. Extra
/// directories follow, then every system data directory. Duplicates are
/// dropped, keeping the first occurrence.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn desktop_search_dirs(extra: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let user = user_data_dir()?.join(DESKTOP_SUBDIR);
    let system = system_data_dirs()
        .into_iter()
        .map(|dir| dir.join(DESKTOP_SUBDIR));

    let mut dirs: Vec<PathBuf> = Vec::new();
    for dir in std::iter::once(user).chain(extra.iter().cloned()).chain(system) {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }

    Ok(dirs)
}

/// Default user preference file, `$XDG_CONFIG_HOME/fmactions/settings.toml`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_settings_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join(APP_DIR).join(SETTINGS_FILE))
        .ok_or(NoWayHome)
}

/// Mandatory preference file in the first `$XDG_CONFIG_DIRS` directory.
pub fn mandatory_settings_path() -> PathBuf {
    let dirs = split_dirs(env::var("XDG_CONFIG_DIRS").ok().as_deref(), &["/etc/xdg"]);
    dirs.into_iter()
        .next()
        .unwrap_or_else(|| PathBuf::from("/etc/xdg"))
        .join(APP_DIR)
        .join(SETTINGS_FILE)
}

/// Default root of the filesystem-backed registry.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_registry_root() -> Result<PathBuf> {
    user_data_dir().map(|path| path.join(APP_DIR).join("registry"))
}

/// Split a colon separated directory list, keeping absolute entries only.
fn split_dirs(value: Option<&str>, fallback: &[&str]) -> Vec<PathBuf> {
    let dirs = value
        .unwrap_or_default()
        .split(':')
        .map(PathBuf::from)
        .filter(|dir| dir.is_absolute())
        .collect::<Vec<_>>();

    if dirs.is_empty() {
        return fallback.iter().map(PathBuf::from).collect();
    }

    dirs
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::data_dir`](https://docs.rs/dirs/latest/dirs/fn.data_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
