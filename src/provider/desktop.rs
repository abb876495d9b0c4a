// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Desktop-entry file backend.
//!
//! Stores every item as one `<id>.desktop` key file inside a search
//! directory. Search directories come in priority order: the first one is the
//! user directory, the only one ever written to. When the same identifier
//! exists in several directories, the first directory wins, so user files
//! shadow system files.
//!
//! # File Layout
//!
//! ```text
//! [Desktop Entry]
//! Type=Action
//! Name=Open with foo
//! Profiles=profile-1;
//!
//! [X-Action-Profile profile-1]
//! Exec=/usr/bin/foo %f
//! MimeTypes=text/plain;
//! ```
//!
//! Items stored outside of the user directory are written back as a
//! shadowing copy inside the user directory. Files with `Hidden=true` are
//! skipped entirely, which lets a user file hide a system file. Deleting an
//! item that also exists below the user directory writes such a mask
//! instead of touching the lower file.
//!
//! # See Also
//!
//! 1. [Desktop Entry Specification](https://specifications.freedesktop.org/desktop-entry-spec/latest/)

mod file;
mod reader;
mod writer;

pub use file::{join_exec, split_exec, DesktopFile};

use crate::{
    codec::keyfile::{system_locales, KeyFileError},
    model::{Item, ProviderId},
    monitor::{DirMonitor, MonitorHandle, Result as MonitorResult, WatchSpec},
    provider::{program_error, IoProvider, Outcome, ProviderNotice, WriteStatus},
};

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

/// Identifier of the desktop-entry provider.
pub const DESKTOP_PROVIDER_ID: &str = "io-desktop";

/// Directory below each XDG data directory holding action files.
pub const DESKTOP_SUBDIR: &str = "file-manager/actions";

/// Extension of action files, without the dot.
pub const DESKTOP_EXTENSION: &str = "desktop";

pub(crate) const DESKTOP_GROUP: &str = "Desktop Entry";
pub(crate) const PROFILE_GROUP_PREFIX: &str = "X-Action-Profile ";
pub(crate) const TYPE_KEY: &str = "Type";
pub(crate) const HIDDEN_KEY: &str = "Hidden";
pub(crate) const EXEC_KEY: &str = "Exec";

/// Key file group holding a profile.
pub(crate) fn profile_group(profile_id: &str) -> String {
    format!("{PROFILE_GROUP_PREFIX}{profile_id}")
}

/// Desktop-entry file provider.
#[derive(Debug)]
pub struct DesktopProvider {
    id: ProviderId,
    dirs: Vec<PathBuf>,
    locales: Vec<String>,
    paths: HashMap<String, PathBuf>,
}

impl DesktopProvider {
    /// Construct provider over search directories in priority order.
    ///
    /// The first directory is the user directory. Preferred locales are taken
    /// from the process environment.
    pub fn new(dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            id: ProviderId::new(DESKTOP_PROVIDER_ID),
            dirs: dirs.into_iter().map(Into::into).collect(),
            locales: system_locales(),
            paths: HashMap::new(),
        }
    }

    /// Replace preferred locales used for localized values.
    pub fn with_locales(mut self, locales: Vec<String>) -> Self {
        self.locales = locales;
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        self.dirs.as_slice()
    }

    /// Directory new and edited items are written to.
    pub fn user_dir(&self) -> Option<&Path> {
        self.dirs.first().map(PathBuf::as_path)
    }

    /// File an item was last read from or written to.
    pub fn path_of(&self, id: &str) -> Option<&Path> {
        self.paths.get(id).map(PathBuf::as_path)
    }

    fn user_path(&self, id: &str) -> Option<PathBuf> {
        self.user_dir()
            .map(|dir| dir.join(format!("{id}.{DESKTOP_EXTENSION}")))
    }

    fn in_user_dir(&self, path: &Path) -> bool {
        self.user_dir().is_some_and(|dir| path.parent() == Some(dir))
    }

    /// File a write of the item would go to.
    fn target_path(&self, id: &str) -> Option<PathBuf> {
        match self.paths.get(id) {
            Some(path) if self.in_user_dir(path) => Some(path.clone()),
            _ => self.user_path(id),
        }
    }

    /// Check if a write to `target` can succeed.
    fn target_writable(&self, target: &Path) -> bool {
        if target.exists() {
            return !file::is_readonly(target);
        }

        target
            .ancestors()
            .skip(1)
            .find(|dir| dir.is_dir())
            .is_some_and(|dir| !file::is_readonly(dir))
    }

    fn read_dir(
        &mut self,
        dir: &Path,
        seen: &mut HashSet<String>,
        messages: &mut Vec<String>,
    ) -> Vec<Item> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(error) => {
                debug!("skip search directory {dir:?}: {error}");
                return Vec::new();
            }
        };

        let mut paths = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext == DESKTOP_EXTENSION)
            })
            .collect::<Vec<_>>();
        paths.sort();

        let mut items = Vec::new();
        for path in paths {
            let Some(id) = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
            else {
                continue;
            };

            // INVARIANT: First directory holding an identifier wins.
            if !seen.insert(id.clone()) {
                debug!("{path:?} is shadowed by a higher priority file");
                continue;
            }

            let mut file = match DesktopFile::load(&path, self.locales.clone()) {
                Ok(file) => file,
                Err(error) => {
                    warn!("{error}");
                    messages.push(error.to_string());
                    continue;
                }
            };
            let writable = self.target_writable(&self.target_for_read(&id, &path));
            file.set_writable(writable);

            if let Some(mut item) = reader::read_item(&id, &file, messages) {
                item.set_provider(Some(self.id.clone()));
                self.paths.insert(id, path);
                items.push(item);
            }
        }

        items
    }

    /// Check if a directory after the user directory holds the identifier.
    fn has_lower_copy(&self, id: &str) -> bool {
        let name = format!("{id}.{DESKTOP_EXTENSION}");
        self.dirs.iter().skip(1).any(|dir| dir.join(&name).is_file())
    }

    /// Hide lower copies of an item behind a `Hidden=true` user file.
    fn mask(&self, id: &str) -> Result<()> {
        let target = self
            .user_path(id)
            .ok_or_else(|| DesktopError::NotWritable {
                path: PathBuf::from(format!("{id}.{DESKTOP_EXTENSION}")),
            })?;

        let mut file = DesktopFile::new(&target, self.locales.clone());
        file.set_writable(self.target_writable(&target));
        file.keyfile_mut().set_boolean(DESKTOP_GROUP, HIDDEN_KEY, true);
        file.save()?;

        info!("masked {id:?} with {target:?}");
        Ok(())
    }

    fn target_for_read(&self, id: &str, path: &Path) -> PathBuf {
        if self.in_user_dir(path) {
            return path.to_path_buf();
        }

        self.user_path(id).unwrap_or_else(|| path.to_path_buf())
    }
}

impl IoProvider for DesktopProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    #[instrument(skip(self, messages), level = "debug")]
    fn read_items(&mut self, messages: &mut Vec<String>) -> Vec<Item> {
        self.paths.clear();

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for dir in self.dirs.clone() {
            items.extend(self.read_dir(&dir, &mut seen, messages));
        }

        info!("read {} items from desktop files", items.len());
        items
    }

    fn is_willing_to_write(&mut self) -> bool {
        let Some(dir) = self.user_dir() else {
            return false;
        };

        if !dir.is_dir() {
            return self.target_writable(dir);
        }

        match tempfile::Builder::new()
            .prefix(".fmactions-probe")
            .tempfile_in(dir)
        {
            Ok(_probe) => true,
            Err(error) => {
                debug!("desktop provider not willing to write: {error}");
                false
            }
        }
    }

    fn is_writable(&self, item: &Item) -> bool {
        if item.provider().is_some_and(|provider| provider != &self.id) {
            return false;
        }

        self.target_path(item.id())
            .is_some_and(|target| self.target_writable(&target))
    }

    #[instrument(skip(self, item), fields(item = item.id()), level = "debug")]
    fn write_item(&mut self, item: &Item) -> Outcome {
        if let Some(outcome) = program_error(item) {
            return outcome;
        }

        let Some(target) = self.target_path(item.id()) else {
            return Outcome::new(
                WriteStatus::NotWilling,
                vec!["no user directory to write to".into()],
            );
        };

        let mut messages = Vec::new();
        let mut file = match self.paths.get(item.id()).filter(|path| path.exists()) {
            Some(source) => match DesktopFile::load(source, self.locales.clone()) {
                Ok(file) => file,
                Err(error) => {
                    warn!("{error}, rewriting from scratch");
                    messages.push(error.to_string());
                    DesktopFile::new(&target, self.locales.clone())
                }
            },
            None => DesktopFile::new(&target, self.locales.clone()),
        };

        // INVARIANT: Items outside the user directory get a shadowing copy.
        if file.path() != target {
            debug!("shadow {:?} with {target:?}", file.path());
            file.set_path(&target);
        }
        file.set_writable(self.target_writable(&target));

        let stored = writer::write_item(&mut file, item, &mut messages);
        if let Err(error) = file.save() {
            warn!("{error}");
            messages.push(error.to_string());
            return Outcome::new(WriteStatus::WriteError, messages);
        }

        self.paths.insert(item.id().to_string(), target);
        Outcome::from_success(stored, messages)
    }

    #[instrument(skip(self, item), fields(item = item.id()), level = "debug")]
    fn delete_item(&mut self, item: &Item) -> Outcome {
        if item.id().trim().is_empty() {
            return Outcome::new(
                WriteStatus::ProgramError,
                vec!["item has an empty identifier".into()],
            );
        }

        let Some(path) = self.paths.get(item.id()).cloned() else {
            debug!("item {:?} was never stored", item.id());
            return Outcome::ok();
        };

        if self.in_user_dir(&path) {
            match fs::remove_file(&path) {
                Ok(()) => info!("deleted {path:?}"),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => {
                    let message = format!("cannot remove {}: {error}", path.display());
                    warn!("{message}");
                    return Outcome::new(WriteStatus::WriteError, vec![message]);
                }
            }
        }

        // INVARIANT: Files below the user directory are masked, never removed.
        if self.has_lower_copy(item.id()) {
            if let Err(error) = self.mask(item.id()) {
                warn!("{error}");
                return Outcome::new(WriteStatus::WriteError, vec![error.to_string()]);
            }
        }

        self.paths.remove(item.id());
        Outcome::ok()
    }

    fn watch(
        &self,
        sink: UnboundedSender<ProviderNotice>,
        delay: Duration,
    ) -> MonitorResult<Option<MonitorHandle>> {
        let spec = WatchSpec::new(self.dirs.clone()).extension(DESKTOP_EXTENSION);
        let id = self.id.clone();
        let handle = DirMonitor::start(spec, delay, move || {
            let _ = sink.send(ProviderNotice::ItemsChanged(id.clone()));
        })?;

        Ok(Some(handle))
    }
}

/// Desktop backend error types.
#[derive(Debug, thiserror::Error)]
pub enum DesktopError {
    /// Filesystem access failed.
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Desktop file cannot be parsed.
    #[error("failed to parse {path:?}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: KeyFileError,
    },

    /// Desktop file cannot be written.
    #[error("{path:?} is not writable")]
    NotWritable { path: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = DesktopError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Profile;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn provider(user: &Path, system: &Path) -> DesktopProvider {
        DesktopProvider::new([user, system]).with_locales(Vec::new())
    }

    fn action(id: &str, label: &str) -> Item {
        let mut item = Item::new_action(id);
        item.set_label(label);
        let mut profile = Profile::new("profile-1");
        profile.set_path("/usr/bin/true");
        item.attach_profile(profile);
        item
    }

    #[test]
    fn user_files_shadow_system_files() -> anyhow::Result<()> {
        let user = tempfile::tempdir()?;
        let system = tempfile::tempdir()?;
        fs::write(
            user.path().join("a.desktop"),
            "[Desktop Entry]\nName=User\n\n[X-Action-Profile p]\nExec=/bin/a\n",
        )?;
        fs::write(
            system.path().join("a.desktop"),
            "[Desktop Entry]\nName=System\n\n[X-Action-Profile p]\nExec=/bin/a\n",
        )?;
        fs::write(system.path().join("b.desktop"), "[Desktop Entry]\nHidden=true\n")?;
        fs::write(system.path().join("c.desktop"), "not a key file\n")?;
        fs::write(system.path().join("notes.txt"), "ignored\n")?;

        let mut provider = provider(user.path(), system.path());
        let mut messages = Vec::new();
        let items = provider.read_items(&mut messages);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label(), "User");
        assert_eq!(items[0].provider(), Some(&ProviderId::new(DESKTOP_PROVIDER_ID)));
        assert_eq!(messages.len(), 1);
        assert_eq!(provider.path_of("a"), Some(user.path().join("a.desktop").as_path()));

        Ok(())
    }

    #[test]
    fn write_read_delete_cycle() -> anyhow::Result<()> {
        let user = tempfile::tempdir()?;
        let system = tempfile::tempdir()?;
        let mut provider = provider(&user.path().join("actions"), system.path());

        assert!(provider.is_willing_to_write());
        let item = action("new", "Fresh");
        assert!(provider.is_writable(&item));
        assert_eq!(provider.write_item(&item).status, WriteStatus::Ok);

        let data = fs::read_to_string(user.path().join("actions/new.desktop"))?;
        let expect = indoc! {r#"
            [Desktop Entry]
            Type=Action
            Name=Fresh
            Enabled=true
            Profiles=profile-1;

            [X-Action-Profile profile-1]
            Exec=/usr/bin/true
        "#};
        assert_eq!(data, expect);

        let mut messages = Vec::new();
        let items = provider.read_items(&mut messages);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label(), "Fresh");

        assert_eq!(provider.delete_item(&items[0]).status, WriteStatus::Ok);
        assert!(!user.path().join("actions/new.desktop").exists());
        assert_eq!(provider.read_items(&mut messages), Vec::new());

        Ok(())
    }

    #[test]
    fn writing_system_item_creates_user_shadow() -> anyhow::Result<()> {
        let user = tempfile::tempdir()?;
        let system = tempfile::tempdir()?;
        let system_file = system.path().join("a.desktop");
        fs::write(
            &system_file,
            "[Desktop Entry]\nName=System\nX-Vendor=kept\n\n[X-Action-Profile p]\nExec=/bin/a\n",
        )?;

        let mut provider = provider(user.path(), system.path());
        let mut messages = Vec::new();
        let mut item = provider
            .read_items(&mut messages)
            .pop()
            .ok_or(anyhow::anyhow!("no item"))?;
        item.set_label("Edited");

        assert_eq!(provider.write_item(&item).status, WriteStatus::Ok);
        let shadow = fs::read_to_string(user.path().join("a.desktop"))?;
        assert!(shadow.contains("Name=Edited\n"));
        assert!(shadow.contains("X-Vendor=kept\n"));
        assert!(fs::read_to_string(&system_file)?.contains("Name=System\n"));

        let items = provider.read_items(&mut messages);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label(), "Edited");

        Ok(())
    }

    #[test]
    fn deleting_lower_copies_masks_them() -> anyhow::Result<()> {
        let user = tempfile::tempdir()?;
        let system = tempfile::tempdir()?;
        let data = "[Desktop Entry]\nName=System\n\n[X-Action-Profile p]\nExec=/bin/a\n";
        fs::write(system.path().join("a.desktop"), data)?;
        fs::write(system.path().join("b.desktop"), data)?;
        fs::write(user.path().join("b.desktop"), data.replace("System", "User"))?;

        let mut provider = provider(user.path(), system.path());
        let items = provider.read_items(&mut Vec::new());
        assert_eq!(items.len(), 2);

        for item in &items {
            assert!(provider.is_writable(item));
            assert_eq!(provider.delete_item(item).status, WriteStatus::Ok);
        }

        assert_eq!(fs::read_to_string(system.path().join("a.desktop"))?, data);
        assert_eq!(fs::read_to_string(system.path().join("b.desktop"))?, data);
        for id in ["a", "b"] {
            let mask = fs::read_to_string(user.path().join(format!("{id}.desktop")))?;
            assert_eq!(mask, "[Desktop Entry]\nHidden=true\n");
        }
        assert_eq!(provider.read_items(&mut Vec::new()), Vec::new());

        Ok(())
    }

    #[test]
    fn foreign_items_and_program_errors() -> anyhow::Result<()> {
        let user = tempfile::tempdir()?;
        let system = tempfile::tempdir()?;
        let mut provider = provider(user.path(), system.path());

        let mut foreign = action("x", "X");
        foreign.set_provider(Some(ProviderId::new("io-registry")));
        assert!(!provider.is_writable(&foreign));

        let empty = Item::new_action("no-profiles");
        assert_eq!(provider.write_item(&empty).status, WriteStatus::ProgramError);
        assert_eq!(provider.delete_item(&Item::new_menu("")).status, WriteStatus::ProgramError);

        Ok(())
    }
}
