//! Recombines the browsed directory, the search keyword and directory change
//! ticks into the visible file list.
//!
//! All inputs go through [`FileListPipeline`]'s entry points on one thread.
//! The list is recomputed whenever the (directory, settled keyword, tick)
//! combination differs from the last one seen. Keystrokes are deduplicated
//! and debounced; directory changes and ticks apply immediately.

use crate::debounce::Debouncer;
use crate::listing::{entries_or_empty, DirectorySource, FileEntry};
use crate::search::filter_entries;
use crate::ui_model::{size_label, status_text};
use crate::watcher::DirectoryWatch;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub debounce: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Combination {
    directory: PathBuf,
    keyword: String,
    tick: u64,
}

type Listener = Box<dyn FnMut(&[FileEntry])>;

pub struct FileListPipeline<S, W> {
    source: S,
    watcher: W,
    directory: PathBuf,
    keyword: String,
    keyword_input: Debouncer<String>,
    tick: u64,
    last_seen: Option<Combination>,
    files: Vec<FileEntry>,
    listeners: Vec<Listener>,
}

impl<S: DirectorySource, W: DirectoryWatch> FileListPipeline<S, W> {
    /// Registers the watch for `directory` and computes the initial list.
    pub fn new(
        source: S,
        watcher: W,
        directory: PathBuf,
        keyword: &str,
        config: PipelineConfig,
    ) -> Self {
        let mut pipeline = Self {
            source,
            watcher,
            directory,
            keyword: keyword.to_string(),
            keyword_input: Debouncer::with_initial(config.debounce, keyword.to_string()),
            tick: 0,
            last_seen: None,
            files: Vec::new(),
            listeners: Vec::new(),
        };
        pipeline.rebind_watch();
        pipeline.reevaluate();
        pipeline
    }

    /// Called with the new list after every publish.
    pub fn subscribe(&mut self, listener: impl FnMut(&[FileEntry]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The settled keyword the current list was filtered with.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn debounce(&self) -> Duration {
        self.keyword_input.delay()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn watcher(&self) -> &W {
        &self.watcher
    }

    pub fn status_text(&self) -> String {
        status_text(self.files.len())
    }

    /// Size label for a listed entry, looked up by its OS file name.
    pub fn size_label(&self, entry: &FileEntry) -> Option<String> {
        size_label(&self.source, &self.directory, entry.file_name())
    }

    /// When the pending keyword settles, if one is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.keyword_input.deadline()
    }

    /// Moves the watch to `directory` and re-evaluates. Returns true if a new
    /// list was published.
    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) -> bool {
        let directory = directory.into();
        if directory == self.directory {
            return false;
        }
        self.directory = directory;
        self.rebind_watch();
        self.reevaluate()
    }

    /// Records a keystroke. Returns false when the text equals the previous
    /// input and nothing was scheduled.
    pub fn set_keyword(&mut self, keyword: &str, now: Instant) -> bool {
        self.keyword_input.push(keyword.to_string(), now)
    }

    /// Applies the pending keyword without waiting for the debounce.
    pub fn commit_keyword(&mut self) -> bool {
        match self.keyword_input.flush() {
            Some(keyword) => {
                self.keyword = keyword;
                self.reevaluate()
            }
            None => false,
        }
    }

    /// Consumes change notifications and a settled keyword, re-evaluating at
    /// most once.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.watcher.poll_changed() {
            self.tick = self.tick.wrapping_add(1);
        }
        if let Some(keyword) = self.keyword_input.poll(now) {
            self.keyword = keyword;
        }
        self.reevaluate()
    }

    /// Re-reads the current directory as if it had changed on disk.
    pub fn refresh(&mut self) -> bool {
        self.tick = self.tick.wrapping_add(1);
        self.reevaluate()
    }

    fn rebind_watch(&mut self) {
        if self.directory.as_os_str().is_empty() {
            self.watcher.clear();
            return;
        }
        if let Err(err) = self.watcher.set_target(&self.directory) {
            tracing::warn!(
                dir = %self.directory.display(),
                error = %format!("{err:#}"),
                "directory will not refresh on changes"
            );
        }
    }

    fn reevaluate(&mut self) -> bool {
        let combination = Combination {
            directory: self.directory.clone(),
            keyword: self.keyword.clone(),
            tick: self.tick,
        };
        if self.last_seen.as_ref() == Some(&combination) {
            return false;
        }
        self.last_seen = Some(combination);

        if self.directory.as_os_str().is_empty() {
            tracing::debug!("no directory selected");
            return false;
        }

        let entries = entries_or_empty(&self.source, &self.directory);
        self.files = filter_entries(entries, &self.keyword);
        tracing::debug!(
            dir = %self.directory.display(),
            keyword = %self.keyword,
            tick = self.tick,
            count = self.files.len(),
            "file list published"
        );
        for listener in self.listeners.iter_mut() {
            listener(&self.files);
        }
        true
    }
}
