use crate::listing::DirectorySource;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

const SIZE_UNITS: [&str; 9] = ["bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Human-readable byte count with two decimals, e.g. `4.02 KB`.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit + 1 < SIZE_UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, SIZE_UNITS[unit])
}

/// Size label for `file_name` inside `dir`; `None` when the lookup fails.
pub fn size_label<S: DirectorySource + ?Sized>(
    source: &S,
    dir: &Path,
    file_name: &OsStr,
) -> Option<String> {
    let path = dir.join(file_name);
    match source.size_of(&path) {
        Ok(bytes) => Some(format_size(bytes)),
        Err(err) => {
            tracing::debug!(
                path = %path.display(),
                error = %format!("{err:#}"),
                "size lookup failed"
            );
            None
        }
    }
}

pub fn status_text(count: usize) -> String {
    format!("found {count} records")
}

fn normalize_windows_path(path: &Path) -> PathBuf {
    #[cfg(windows)]
    {
        let raw = path.to_string_lossy();
        if let Some(rest) = raw.strip_prefix(r"\\?\UNC\") {
            return PathBuf::from(format!(r"\\{}", rest));
        }
        if let Some(rest) = raw.strip_prefix(r"\\?\") {
            return PathBuf::from(rest);
        }
    }
    path.to_path_buf()
}

/// Drops the extended-length prefix `canonicalize` adds on Windows.
pub fn normalize_dir(path: PathBuf) -> PathBuf {
    normalize_windows_path(&path)
}

pub fn display_dir(path: &Path) -> String {
    normalize_windows_path(path).to_string_lossy().to_string()
}

/// One listing row as printed by the command line modes.
pub fn row_text(name: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{name}\t{label}"),
        None => name.to_string(),
    }
}
