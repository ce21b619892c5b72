//! Book metadata from the Hardcover catalog.
//!
//! Metadata is optional and independent of the audio pipeline: every failure
//! is logged and turned into "no metadata".

mod hardcover;

pub use hardcover::HardcoverClient;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// A book record as returned by the catalog.
///
/// The record is passed through unchanged: whatever fields and value types
/// the catalog sends are written back as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookMetadata(Map<String, Value>);

impl BookMetadata {
    /// Raw value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field value when it is a string.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.text("title")
    }

    /// True when the record carries no information at all.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Value::is_null)
    }
}

/// Location of the metadata sidecar for an output file:
/// `<parent>/<stem>_metadata.json`.
pub fn sidecar_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let name = format!("{}_metadata.json", stem);

    match output.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Write the metadata record next to the output file and return its path.
pub async fn write_sidecar(output: &Path, metadata: &BookMetadata) -> Result<PathBuf> {
    let path = sidecar_path(output);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(metadata)?;
    tokio::fs::write(&path, json).await?;
    Ok(path)
}
