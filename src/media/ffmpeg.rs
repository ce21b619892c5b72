//! ffmpeg/ffprobe implementation of [`MediaTool`].

use super::MediaTool;
use crate::chapters::Chapter;
use crate::config::{LoudnessSettings, NoiseFilterSettings, Settings};
use crate::error::{BinderyError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Build the loudnorm filter expression.
pub fn loudnorm_filter(params: &LoudnessSettings) -> String {
    format!(
        "loudnorm=I={}:TP={}:LRA={}:print_format=json",
        params.integrated, params.true_peak, params.loudness_range
    )
}

/// Build the noise reduction filter expression.
pub fn denoise_filter(params: &NoiseFilterSettings) -> String {
    format!(
        "afftnoise={}:{}:{}",
        params.noise_reduction, params.noise_floor, params.noise_profile
    )
}

/// Media tool backed by the ffmpeg and ffprobe binaries.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Ffmpeg {
    /// Use explicit binary locations.
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Use the binaries named in the tool settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.ffmpeg_path(), settings.ffprobe_path())
    }

    fn tool_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    }

    /// An ffmpeg invocation that overwrites outputs and only logs errors.
    fn ffmpeg_command(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-y").arg("-loglevel").arg("error");
        cmd
    }

    /// Run a prepared ffmpeg command to completion.
    async fn run_ffmpeg(&self, mut cmd: Command) -> Result<()> {
        let name = Self::tool_name(&self.ffmpeg);
        debug!("Running {:?}", cmd.as_std());

        let result = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => {
                let err = String::from_utf8_lossy(&out.stderr);
                Err(BinderyError::ToolFailed(format!(
                    "{} exited with {}: {}",
                    name,
                    out.status,
                    err.trim()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BinderyError::ToolNotFound(name))
            }
            Err(e) => Err(BinderyError::ToolFailed(format!("{} error: {e}", name))),
        }
    }

    /// Run ffprobe with JSON output and return stdout.
    async fn probe(&self, path: &Path, section: &str) -> Result<String> {
        let name = Self::tool_name(&self.ffprobe);

        let result = Command::new(&self.ffprobe)
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg(section)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BinderyError::ToolNotFound(name));
            }
            Err(e) => {
                return Err(BinderyError::Probe(format!("{} failed: {e}", name)));
            }
        };

        if !output.status.success() {
            return Err(BinderyError::Probe(format!(
                "{} returned {} for {}",
                name,
                output.status,
                path.display()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl MediaTool for Ffmpeg {
    #[instrument(skip_all, fields(path = %path.display()))]
    async fn probe_chapters(&self, path: &Path) -> Result<Vec<Chapter>> {
        let json = self.probe(path, "-show_chapters").await?;
        parse_chapters(&json)
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let json = self.probe(path, "-show_format").await?;
        parse_duration(&json)
    }

    async fn concatenate(&self, list_file: &Path, bitrate: &str, output: &Path) -> Result<()> {
        let mut cmd = self.ffmpeg_command();
        cmd.arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(list_file)
            .arg("-c:a")
            .arg("mp3")
            .arg("-b:a")
            .arg(bitrate)
            .arg(output);
        self.run_ffmpeg(cmd).await
    }

    async fn normalize_loudness(
        &self,
        input: &Path,
        output: &Path,
        params: &LoudnessSettings,
    ) -> Result<()> {
        let mut cmd = self.ffmpeg_command();
        cmd.arg("-i")
            .arg(input)
            .arg("-af")
            .arg(loudnorm_filter(params))
            .arg("-f")
            .arg("mp3")
            .arg(output);
        self.run_ffmpeg(cmd).await
    }

    async fn reduce_noise(
        &self,
        input: &Path,
        output: &Path,
        params: &NoiseFilterSettings,
    ) -> Result<()> {
        let mut cmd = self.ffmpeg_command();
        cmd.arg("-i")
            .arg(input)
            .arg("-af")
            .arg(denoise_filter(params))
            .arg(output);
        self.run_ffmpeg(cmd).await
    }

    async fn embed_chapters(&self, input: &Path, chapter_file: &Path, output: &Path) -> Result<()> {
        let mut cmd = self.ffmpeg_command();
        cmd.arg("-i")
            .arg(input)
            .arg("-i")
            .arg(chapter_file)
            .arg("-map")
            .arg("0:a")
            .arg("-map")
            .arg("1:t:0")
            .arg("-c")
            .arg("copy")
            .arg("-f")
            .arg("mp3")
            .arg(output);
        self.run_ffmpeg(cmd).await
    }
}

/// ffprobe `-show_chapters` output.
#[derive(Debug, Deserialize)]
struct ChapterProbe {
    chapters: Option<Vec<ChapterProbeEntry>>,
}

#[derive(Debug, Deserialize)]
struct ChapterProbeEntry {
    start_time: String,
    end_time: String,
    tags: Option<HashMap<String, String>>,
}

/// ffprobe `-show_format` output.
#[derive(Debug, Deserialize)]
struct FormatProbe {
    format: FormatProbeEntry,
}

#[derive(Debug, Deserialize)]
struct FormatProbeEntry {
    duration: Option<String>,
}

fn parse_seconds(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| BinderyError::Probe(format!("Invalid timestamp: {value}")))
}

/// Parse chapter markers from ffprobe JSON, keeping their order.
///
/// Chapters are indexed by position; the container's own chapter ids are
/// not carried over, since they need not be dense or start at zero.
fn parse_chapters(json: &str) -> Result<Vec<Chapter>> {
    let probe: ChapterProbe = serde_json::from_str(json)
        .map_err(|e| BinderyError::Probe(format!("Invalid ffprobe chapter output: {e}")))?;

    probe
        .chapters
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, c)| -> Result<Chapter> {
            let title = c
                .tags
                .and_then(|mut t| t.remove("title"))
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("Chapter {}", index + 1));

            Ok(Chapter {
                index,
                start: parse_seconds(&c.start_time)?,
                end: parse_seconds(&c.end_time)?,
                title,
            })
        })
        .collect()
}

/// Parse the container duration from ffprobe JSON.
fn parse_duration(json: &str) -> Result<f64> {
    let probe: FormatProbe = serde_json::from_str(json)
        .map_err(|e| BinderyError::Probe(format!("Invalid ffprobe format output: {e}")))?;

    let duration = probe
        .format
        .duration
        .ok_or_else(|| BinderyError::Probe("Could not determine audio duration".into()))?;

    parse_seconds(&duration)
}
