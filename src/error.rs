//! Error types for Bindery.

use crate::pipeline::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Library-level error type for Bindery operations.
#[derive(Error, Debug)]
pub enum BinderyError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No input files found under {0}")]
    NoInputFiles(PathBuf),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("{stage} stage failed: {message}")]
    StageFailed { stage: Stage, message: String },

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Bindery operations.
pub type Result<T> = std::result::Result<T, BinderyError>;
