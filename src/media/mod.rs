//! External media tool abstraction.
//!
//! All decoding, filtering and encoding is delegated to an external binary.
//! The [`MediaTool`] trait is the seam between the pipeline and that binary;
//! [`Ffmpeg`] drives the real ffmpeg/ffprobe pair.

mod ffmpeg;

pub use ffmpeg::{denoise_filter, loudnorm_filter, Ffmpeg};

use crate::chapters::Chapter;
use crate::config::{LoudnessSettings, NoiseFilterSettings};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Operations the pipeline needs from the external media tool.
///
/// Every method blocks until the tool exits. A non-zero exit is an error.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Read chapter markers embedded in a file. Empty when there are none.
    async fn probe_chapters(&self, path: &Path) -> Result<Vec<Chapter>>;

    /// Read the container duration of a file, in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Concatenate the files named in a concat list into one stream.
    async fn concatenate(&self, list_file: &Path, bitrate: &str, output: &Path) -> Result<()>;

    /// Normalize loudness to the given targets.
    async fn normalize_loudness(
        &self,
        input: &Path,
        output: &Path,
        params: &LoudnessSettings,
    ) -> Result<()>;

    /// Apply the noise reduction filter.
    async fn reduce_noise(
        &self,
        input: &Path,
        output: &Path,
        params: &NoiseFilterSettings,
    ) -> Result<()>;

    /// Mux a chapter description file into the audio stream.
    async fn embed_chapters(&self, input: &Path, chapter_file: &Path, output: &Path) -> Result<()>;
}
