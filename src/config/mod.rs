//! Configuration module for Bindery.
//!
//! Handles loading the processing settings from YAML, TOML or JSON documents.

mod settings;

pub use settings::{
    ApiSettings, AudioProcessingSettings, ConfigFormat, InputSettings, LoudnessSettings,
    NoiseFilterSettings, OutputSettings, Settings, ToolSettings,
};
