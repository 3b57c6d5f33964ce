use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Source of user-chosen directories.
pub trait DirectoryPicker {
    /// `Ok(None)` when the user cancels.
    fn pick_directory(&self, start: &Path) -> Result<Option<PathBuf>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDirectoryPicker;

impl DirectoryPicker for NativeDirectoryPicker {
    fn pick_directory(&self, start: &Path) -> Result<Option<PathBuf>> {
        native_dialog::FileDialog::new()
            .set_title("Choose a folder")
            .set_location(start)
            .show_open_single_dir()
            .context("failed to show folder dialog")
    }
}
