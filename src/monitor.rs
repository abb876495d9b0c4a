// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Storage change monitor.
//!
//! Watches the directories a provider reads from and calls back once per
//! burst of relevant changes. Raw filesystem events arrive on the `notify`
//! backend thread, are forwarded over a channel, and are handled by a Tokio
//! task that owns the watcher and a [`Debouncer`].
//!
//! # Deferred Watches
//!
//! A target directory that does not exist yet cannot be watched. Instead, the
//! monitor watches its nearest existing ancestor. Once the target appears, the
//! monitor watches the target itself and reports a change. A target removed
//! later falls back to a deferred watch again.
//!
//! # Errors
//!
//! Installing watches may fail with [`MonitorError`]. Errors reported by the
//! watcher after startup are only logged.

use crate::timer::Debouncer;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{sync::mpsc, task::AbortHandle};
use tracing::{debug, info, warn};

/// What to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSpec {
    /// Directories to watch.
    pub targets: Vec<PathBuf>,

    /// Watch below the targets too.
    pub recursive: bool,

    /// Only report files with this extension, e.g., `desktop`.
    pub extension: Option<String>,
}

impl WatchSpec {
    pub fn new(targets: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            recursive: false,
            extension: None,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    fn mode(&self) -> RecursiveMode {
        if self.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        }
    }

    /// Check if raw event concerns watched data.
    pub fn is_relevant(&self, event: &Event) -> bool {
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
        ) {
            return false;
        }

        event.paths.iter().any(|path| self.matches_path(path))
    }

    fn matches_path(&self, path: &Path) -> bool {
        self.targets.iter().any(|target| {
            if path == target {
                return true;
            }

            let inside = if self.recursive {
                path.starts_with(target)
            } else {
                path.parent() == Some(target.as_path())
            };

            inside
                && match &self.extension {
                    Some(extension) => path
                        .extension()
                        .is_some_and(|ext| ext == extension.as_str()),
                    None => true,
                }
        })
    }
}

/// Handle keeping a monitor alive. Dropping it stops the monitor.
#[derive(Debug)]
pub struct MonitorHandle {
    task: AbortHandle,
}

impl MonitorHandle {
    /// Stop monitoring now.
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Deferred {
    target: PathBuf,
    anchor: PathBuf,
}

/// Directory monitor.
pub struct DirMonitor {
    spec: WatchSpec,
    watcher: RecommendedWatcher,
    deferred: Vec<Deferred>,
}

impl DirMonitor {
    /// Install watches and start the monitor task.
    ///
    /// Calls `on_burst` once per burst of relevant events, after `delay`
    /// without further events.
    ///
    /// # Errors
    ///
    /// - Return [`MonitorError::Notify`] if the watcher cannot be created, or
    ///   a watch cannot be installed.
    /// - Return [`MonitorError::NoAnchor`] if a missing target has no existing
    ///   ancestor to watch.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start(
        spec: WatchSpec,
        delay: Duration,
        on_burst: impl Fn() + Send + Sync + 'static,
    ) -> Result<MonitorHandle> {
        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let watcher = recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;

        let mut monitor = DirMonitor {
            spec,
            watcher,
            deferred: Vec::new(),
        };
        for target in monitor.spec.targets.clone() {
            monitor.arm(&target)?;
        }
        info!("watching {:?}", monitor.spec.targets);

        let mut debouncer = Debouncer::new(delay, on_burst);
        let task = tokio::spawn(async move {
            while let Some(res) = rx.recv().await {
                match res {
                    Ok(event) => {
                        if monitor.handle(&event) {
                            debouncer.touch();
                        }
                    }
                    Err(error) => warn!("watch error: {error}"),
                }
            }
        });

        Ok(MonitorHandle {
            task: task.abort_handle(),
        })
    }

    /// Process raw event. Returns true if it should restart the debouncer.
    fn handle(&mut self, event: &Event) -> bool {
        let mut changed = self.refresh_deferred();

        if self.spec.is_relevant(event) {
            debug!("relevant change {:?} on {:?}", event.kind, event.paths);
            changed = true;

            // INVARIANT: Removed target falls back to a deferred watch.
            let lost = self
                .spec
                .targets
                .iter()
                .filter(|target| event.paths.contains(target) && !target.exists())
                .filter(|target| !self.deferred.iter().any(|d| &d.target == *target))
                .cloned()
                .collect::<Vec<_>>();
            for target in lost {
                if let Err(error) = self.arm(&target) {
                    warn!("cannot re-arm watch on {target:?}: {error}");
                }
            }
        }

        changed
    }

    fn arm(&mut self, target: &Path) -> Result<()> {
        if target.is_dir() {
            self.watcher.watch(target, self.spec.mode())?;
            return Ok(());
        }

        let anchor = nearest_ancestor(target).ok_or_else(|| MonitorError::NoAnchor {
            path: target.to_path_buf(),
        })?;
        debug!("defer watch on {target:?} to {anchor:?}");
        self.watcher.watch(&anchor, RecursiveMode::NonRecursive)?;
        self.deferred.push(Deferred {
            target: target.to_path_buf(),
            anchor,
        });

        Ok(())
    }

    /// Move deferred watches closer to their targets. Returns true if any
    /// target appeared.
    fn refresh_deferred(&mut self) -> bool {
        let mut appeared = false;

        for index in (0..self.deferred.len()).rev() {
            let Deferred { target, anchor } = self.deferred[index].clone();

            if target.is_dir() {
                self.deferred.remove(index);
                self.release_anchor(&anchor);
                match self.watcher.watch(&target, self.spec.mode()) {
                    Ok(()) => {
                        info!("watch target {target:?} appeared");
                        appeared = true;
                    }
                    Err(error) => warn!("cannot watch {target:?}: {error}"),
                }
                continue;
            }

            let Some(current) = nearest_ancestor(&target) else {
                continue;
            };
            if current != anchor {
                self.deferred[index].anchor = current.clone();
                self.release_anchor(&anchor);
                if let Err(error) = self.watcher.watch(&current, RecursiveMode::NonRecursive) {
                    warn!("cannot watch {current:?}: {error}");
                }
            }
        }

        appeared
    }

    fn release_anchor(&mut self, anchor: &Path) {
        let still_used = self.deferred.iter().any(|d| d.anchor == anchor)
            || self.spec.targets.iter().any(|t| t == anchor && t.is_dir());
        if !still_used {
            let _ = self.watcher.unwatch(anchor);
        }
    }
}

/// Nearest existing strict ancestor directory of a path.
fn nearest_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .skip(1)
        .find(|ancestor| ancestor.is_dir())
        .map(Path::to_path_buf)
}

/// Monitor error types.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Watch backend failure.
    #[error(transparent)]
    Notify(#[from] notify::Error),

    /// Missing target without any existing ancestor.
    #[error("no existing ancestor to watch for {path:?}")]
    NoAnchor { path: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = MonitorError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, RemoveKind};
    use std::fs;
    use tokio::time::timeout;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn relevance_filters_kind_location_and_extension() {
        let spec = WatchSpec::new(["/data/actions"]).extension("desktop");

        assert!(spec.is_relevant(&event(
            EventKind::Create(CreateKind::File),
            "/data/actions/a.desktop"
        )));
        assert!(spec.is_relevant(&event(
            EventKind::Remove(RemoveKind::Folder),
            "/data/actions"
        )));
        assert!(!spec.is_relevant(&event(
            EventKind::Create(CreateKind::File),
            "/data/actions/a.txt"
        )));
        assert!(!spec.is_relevant(&event(
            EventKind::Create(CreateKind::File),
            "/data/actions/sub/a.desktop"
        )));
        assert!(!spec.is_relevant(&event(
            EventKind::Access(AccessKind::Any),
            "/data/actions/a.desktop"
        )));
        assert!(!spec.is_relevant(&event(
            EventKind::Create(CreateKind::File),
            "/data/other.desktop"
        )));
    }

    #[test]
    fn recursive_spec_accepts_nested_paths() {
        let spec = WatchSpec::new(["/registry"]).recursive(true);

        assert!(spec.is_relevant(&event(
            EventKind::Create(CreateKind::File),
            "/registry/apps/a/%entries.toml"
        )));
    }

    #[test]
    fn nearest_ancestor_skips_missing_levels() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let target = root.path().join("a/b/c");

        assert_eq!(nearest_ancestor(&target), Some(root.path().to_path_buf()));
        fs::create_dir_all(root.path().join("a"))?;
        assert_eq!(nearest_ancestor(&target), Some(root.path().join("a")));

        Ok(())
    }

    #[tokio::test]
    async fn reports_change_in_watched_directory() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let spec = WatchSpec::new([root.path()]).extension("desktop");
        let _handle = DirMonitor::start(spec, Duration::from_millis(50), move || {
            let _ = tx.send(());
        })?;

        fs::write(root.path().join("a.desktop"), "[Desktop Entry]\n")?;
        timeout(Duration::from_secs(5), rx.recv()).await?;

        Ok(())
    }

    #[tokio::test]
    async fn deferred_target_is_armed_once_created() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let target = root.path().join("share/actions");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let spec = WatchSpec::new([target.clone()]).extension("desktop");
        let _handle = DirMonitor::start(spec, Duration::from_millis(50), move || {
            let _ = tx.send(());
        })?;

        fs::create_dir(root.path().join("share"))?;
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::create_dir(&target)?;
        timeout(Duration::from_secs(5), rx.recv()).await?;

        Ok(())
    }
}
