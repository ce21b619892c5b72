//! Bindery - Audiobook segment binder
//!
//! Turns a directory of audio segments into one audiobook file.
//!
//! # Overview
//!
//! Bindery:
//! - Finds the segments under an input directory and orders them by natural sort
//! - Concatenates them, normalizes loudness and reduces noise with ffmpeg
//! - Reuses embedded chapter markers, or builds one chapter per segment
//! - Optionally saves the book's Hardcover metadata next to the output
//!
//! # Architecture
//!
//! - `sort` - Natural sort keys for file names
//! - `discovery` - Recursive input file discovery
//! - `chapters` - Chapter marker derivation
//! - `media` - External media tool abstraction (ffmpeg/ffprobe)
//! - `pipeline` - Stage sequencing and scratch file cleanup
//! - `metadata` - Hardcover catalog client and metadata sidecar
//! - `config` - Configuration management
//!
//! # Example
//!
//! ```rust,no_run
//! use bindery::config::Settings;
//! use bindery::discovery::discover;
//! use bindery::media::Ffmpeg;
//! use bindery::pipeline::Pipeline;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load_or_default(Path::new("config.yaml"));
//!     let files = discover(Path::new("segments"), &settings.input.extension)?;
//!
//!     let tool = Ffmpeg::from_settings(&settings);
//!     let report = Pipeline::new(&settings, &tool)
//!         .run(&files, Path::new("book.mp3"))
//!         .await?;
//!     println!("Bound {} segments, {} chapters", report.files, report.chapters);
//!
//!     Ok(())
//! }
//! ```

pub mod chapters;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod media;
pub mod metadata;
pub mod pipeline;
pub mod sort;

pub use error::{BinderyError, Result};
