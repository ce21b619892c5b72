//! Input segment discovery.
//!
//! Walks an input directory recursively and orders the matching files by
//! natural sort on their file names, ignoring which subdirectory they live in.

use crate::error::{BinderyError, Result};
use crate::sort::{sort_key, SortKey};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

/// A discovered input segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    path: PathBuf,
    stem_key: SortKey,
    name_key: SortKey,
}

impl MediaFile {
    /// Create a media file entry, deriving its sort keys from the file name.
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            stem_key: sort_key(&stem),
            name_key: sort_key(&name),
            path,
        }
    }

    /// Path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Ord for MediaFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.stem_key
            .cmp(&other.stem_key)
            .then_with(|| self.name_key.cmp(&other.name_key))
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for MediaFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Check whether a file name ends with `suffix` (lowercase, dot included),
/// ignoring case. A bare `.mp3` name matches too.
fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().to_lowercase().ends_with(suffix))
}

/// Regular files, and symlinks that resolve to one.
fn is_file_entry(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

/// Recursively collect files with the given extension under `root`.
///
/// Returns an empty list when nothing matches; the caller decides whether
/// that is fatal.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn discover(root: &Path, extension: &str) -> Result<Vec<MediaFile>> {
    if !root.exists() {
        return Err(BinderyError::InvalidInput(format!(
            "Input directory not found: {}",
            root.display()
        )));
    }

    if !root.is_dir() {
        return Err(BinderyError::InvalidInput(format!(
            "Not a directory: {}",
            root.display()
        )));
    }

    let extension = extension.trim_start_matches('.');
    let suffix = format!(".{}", extension.to_lowercase());
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if is_file_entry(&entry) && has_suffix(entry.path(), &suffix) {
            files.push(MediaFile::new(entry.into_path()));
        }
    }

    files.sort();
    debug!("Discovered {} .{} files", files.len(), extension);

    Ok(files)
}
