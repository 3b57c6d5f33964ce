use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;

/// A direct child of the browsed directory.
///
/// `name` is for display and filtering. `file_name` is the name as the OS
/// returned it and is what size lookups join onto the directory, so names that
/// are not valid UTF-8 still resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    file_name: OsString,
}

impl FileEntry {
    pub fn new(file_name: impl Into<OsString>) -> Self {
        let file_name = file_name.into();
        Self {
            name: file_name.to_string_lossy().into_owned(),
            file_name,
        }
    }

    pub fn file_name(&self) -> &OsStr {
        &self.file_name
    }
}

impl PartialEq<&str> for FileEntry {
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}

/// Filesystem access used by the pipeline.
pub trait DirectorySource {
    /// Direct children of `dir`, in the order the OS returns them.
    fn list_immediate_entries(&self, dir: &Path) -> Result<Vec<FileEntry>>;
    fn size_of(&self, path: &Path) -> Result<u64>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl DirectorySource for LocalFs {
    fn list_immediate_entries(&self, dir: &Path) -> Result<Vec<FileEntry>> {
        list_immediate_entries(dir)
    }

    fn size_of(&self, path: &Path) -> Result<u64> {
        size_of(path)
    }
}

pub fn list_immediate_entries(dir: &Path) -> Result<Vec<FileEntry>> {
    let iter = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    let mut out = Vec::new();
    for entry in iter {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        out.push(FileEntry::new(entry.file_name()));
    }
    Ok(out)
}

pub fn size_of(path: &Path) -> Result<u64> {
    let metadata =
        fs::metadata(path).with_context(|| format!("failed to stat {}", path.display()))?;
    Ok(metadata.len())
}

/// Lists `dir`, substituting an empty list for any enumeration failure.
pub fn entries_or_empty<S: DirectorySource + ?Sized>(source: &S, dir: &Path) -> Vec<FileEntry> {
    match source.list_immediate_entries(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %format!("{err:#}"), "listing failed");
            Vec::new()
        }
    }
}
