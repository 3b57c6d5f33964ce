//! Directory change notifications.
//!
//! The pipeline only sees [`DirectoryWatch`]; [`DirWatcher`] backs it with
//! `notify`'s platform watcher (inotify, FSEvents, ReadDirectoryChangesW or
//! polling). Notifications are produced on the backend's thread and queued;
//! they are consumed on the owning thread through
//! [`DirectoryWatch::poll_changed`].

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

/// Watches at most one directory at a time.
pub trait DirectoryWatch {
    /// Drops the current registration, if any, then watches `dir`.
    ///
    /// On error no registration is active.
    fn set_target(&mut self, dir: &Path) -> Result<()>;

    fn clear(&mut self);

    /// Drains queued notifications; true if any belongs to the current target.
    fn poll_changed(&mut self) -> bool;
}

struct ChangeNotice {
    generation: u64,
    paths: Vec<PathBuf>,
}

struct WatchTarget {
    path: PathBuf,
    canonical: PathBuf,
}

impl WatchTarget {
    fn covers(&self, paths: &[PathBuf]) -> bool {
        paths.is_empty()
            || paths
                .iter()
                .any(|p| p.starts_with(&self.path) || p.starts_with(&self.canonical))
    }
}

pub struct DirWatcher {
    watcher: RecommendedWatcher,
    target: Option<WatchTarget>,
    generation: u64,
    shared_generation: Arc<AtomicU64>,
    notice_rx: Receiver<ChangeNotice>,
}

fn is_content_change(kind: &EventKind) -> bool {
    !matches!(kind, EventKind::Access(_))
}

impl DirWatcher {
    pub fn new() -> Result<Self> {
        Self::with_waker(|| {})
    }

    /// `waker` runs on the backend thread after each queued notification.
    pub fn with_waker<F>(waker: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, notice_rx) = mpsc::channel::<ChangeNotice>();
        let shared_generation = Arc::new(AtomicU64::new(0));
        let callback_generation = Arc::clone(&shared_generation);

        let watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if !is_content_change(&event.kind) {
                        return;
                    }
                    let notice = ChangeNotice {
                        generation: callback_generation.load(Ordering::Acquire),
                        paths: event.paths,
                    };
                    if tx.send(notice).is_ok() {
                        waker();
                    }
                }
                Err(err) => tracing::warn!(error = %err, "directory watch error"),
            })
            .context("failed to initialise directory watcher")?;

        Ok(Self {
            watcher,
            target: None,
            generation: 0,
            shared_generation,
            notice_rx,
        })
    }

    #[cfg(test)]
    fn target(&self) -> Option<&Path> {
        self.target.as_ref().map(|t| t.path.as_path())
    }

    fn drain(&mut self) {
        while self.notice_rx.try_recv().is_ok() {}
    }
}

impl DirectoryWatch for DirWatcher {
    fn set_target(&mut self, dir: &Path) -> Result<()> {
        self.clear();
        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;
        let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        self.target = Some(WatchTarget {
            path: dir.to_path_buf(),
            canonical,
        });
        tracing::info!(dir = %dir.display(), generation = self.generation, "watching directory");
        Ok(())
    }

    fn clear(&mut self) {
        if let Some(prev) = self.target.take() {
            if let Err(err) = self.watcher.unwatch(&prev.path) {
                tracing::debug!(dir = %prev.path.display(), error = %err, "unwatch failed");
            }
        }
        // Notices tagged with an older generation are stale from here on.
        self.generation = self.generation.saturating_add(1);
        self.shared_generation
            .store(self.generation, Ordering::Release);
        self.drain();
    }

    fn poll_changed(&mut self) -> bool {
        let Some(target) = &self.target else {
            self.drain();
            return false;
        };
        let mut changed = false;
        while let Ok(notice) = self.notice_rx.try_recv() {
            if notice.generation == self.generation && target.covers(&notice.paths) {
                changed = true;
            }
        }
        changed
    }
}
