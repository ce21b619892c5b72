//! Configuration settings for Bindery.

use crate::error::{BinderyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub audio_processing: AudioProcessingSettings,
    pub input: InputSettings,
    pub tools: ToolSettings,
}

/// Remote catalog API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Bearer token for the Hardcover API.
    pub hardcover_api_key: String,
    /// GraphQL endpoint.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            hardcover_api_key: "YOUR_HARDCOVER_API_KEY_HERE".to_string(),
            endpoint: "https://api.hardcover.app/v1/graphql".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Parameters handed to the media tool's filters and encoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioProcessingSettings {
    pub loudness_normalization: LoudnessSettings,
    pub noise_filter: NoiseFilterSettings,
    pub output: OutputSettings,
}

/// Loudness normalization targets (EBU R128 style).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoudnessSettings {
    /// Integrated loudness target (LUFS).
    #[serde(rename = "I")]
    pub integrated: f64,
    /// True-peak ceiling (dBTP).
    #[serde(rename = "TP")]
    pub true_peak: f64,
    /// Loudness range target (LU).
    #[serde(rename = "LRA")]
    pub loudness_range: f64,
}

impl Default for LoudnessSettings {
    fn default() -> Self {
        Self {
            integrated: -16.0,
            true_peak: -1.5,
            loudness_range: 11.0,
        }
    }
}

/// Noise reduction filter parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseFilterSettings {
    pub noise_reduction: f64,
    pub noise_floor: f64,
    pub noise_profile: f64,
}

impl Default for NoiseFilterSettings {
    fn default() -> Self {
        Self {
            noise_reduction: 0.5,
            noise_floor: 0.3,
            noise_profile: 0.2,
        }
    }
}

/// Output encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Audio bitrate passed to the encoder (e.g. "192k").
    pub bitrate: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            bitrate: "192k".to_string(),
        }
    }
}

/// Input discovery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// File extension of the segments to collect, without the dot.
    pub extension: String,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            extension: "mp3".to_string(),
        }
    }
}

/// Locations of the external media binaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

/// Document format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from the file extension; anything unknown is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref()
        {
            Some("toml") => ConfigFormat::Toml,
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

impl Settings {
    /// Load settings from a specific path.
    ///
    /// Fails if the file is missing or cannot be parsed. An empty document
    /// yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, ConfigFormat::from_path(path))
    }

    /// Parse settings from a document in the given format.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        let settings = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        Ok(settings)
    }

    /// Load settings, falling back to the defaults when the file is missing
    /// or malformed. Never fails; the reason for a fallback is logged.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(settings) => {
                debug!("Loaded configuration from {}", path.display());
                settings
            }
            Err(BinderyError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found. Using defaults.", path.display());
                Settings::default()
            }
            Err(e) => {
                warn!("Invalid config file {}: {}. Using defaults.", path.display(), e);
                Settings::default()
            }
        }
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded ffmpeg path.
    pub fn ffmpeg_path(&self) -> PathBuf {
        Self::expand_path(&self.tools.ffmpeg)
    }

    /// Get the expanded ffprobe path.
    pub fn ffprobe_path(&self) -> PathBuf {
        Self::expand_path(&self.tools.ffprobe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("config.yaml"));

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.audio_processing.output.bitrate, "192k");
        assert_eq!(settings.audio_processing.loudness_normalization.integrated, -16.0);
        assert_eq!(settings.audio_processing.loudness_normalization.true_peak, -1.5);
        assert_eq!(settings.audio_processing.loudness_normalization.loudness_range, 11.0);
        assert_eq!(settings.audio_processing.noise_filter.noise_reduction, 0.5);
        assert_eq!(settings.audio_processing.noise_filter.noise_floor, 0.3);
        assert_eq!(settings.audio_processing.noise_filter.noise_profile, 0.2);
        assert_eq!(settings.api.hardcover_api_key, "YOUR_HARDCOVER_API_KEY_HERE");
    }

    #[test]
    fn test_yaml_bitrate_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "audio_processing:\n  output:\n    bitrate: \"256k\"\n").unwrap();

        let settings = Settings::load_or_default(&path);
        assert_eq!(settings.audio_processing.output.bitrate, "256k");
        // Untouched sections keep their defaults
        assert_eq!(settings.audio_processing.noise_filter, NoiseFilterSettings::default());
    }

    #[test]
    fn test_full_yaml_document() {
        let yaml = r#"
api:
  hardcover_api_key: test_key_123
audio_processing:
  loudness_normalization:
    I: -14
    TP: -1.0
    LRA: 10
  noise_filter:
    noise_reduction: 0.3
    noise_floor: 0.2
    noise_profile: 0.1
  output:
    bitrate: "256k"
"#;
        let settings = Settings::parse(yaml, ConfigFormat::Yaml).unwrap();

        assert_eq!(settings.api.hardcover_api_key, "test_key_123");
        assert_eq!(settings.api.endpoint, ApiSettings::default().endpoint);
        assert_eq!(settings.audio_processing.loudness_normalization.integrated, -14.0);
        assert_eq!(settings.audio_processing.loudness_normalization.true_peak, -1.0);
        assert_eq!(settings.audio_processing.loudness_normalization.loudness_range, 10.0);
        assert_eq!(settings.audio_processing.noise_filter.noise_profile, 0.1);
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "audio_processing: [unclosed\n  : :").unwrap();

        assert!(Settings::load_from(&path).is_err());
        assert_eq!(Settings::load_or_default(&path), Settings::default());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "\n").unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), Settings::default());
    }

    #[test]
    fn test_toml_and_json_formats() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("config.toml");
        std::fs::write(&toml_path, "[audio_processing.output]\nbitrate = \"128k\"\n").unwrap();
        assert_eq!(
            Settings::load_or_default(&toml_path).audio_processing.output.bitrate,
            "128k"
        );

        let json_path = dir.path().join("config.json");
        std::fs::write(&json_path, r#"{"tools": {"ffmpeg": "/opt/ffmpeg/bin/ffmpeg"}}"#).unwrap();
        let settings = Settings::load_or_default(&json_path);
        assert_eq!(settings.tools.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(settings.tools.ffprobe, "ffprobe");
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("config.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("config.YML")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("config.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("config.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Yaml);
    }
}
