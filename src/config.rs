use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration problems caught before any audio is opened.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be a positive integer")]
    NonPositiveInteger(&'static str),
    #[error("{0} must be a positive number")]
    NonPositiveNumber(&'static str),
    #[error("invalid color stop {0:?}: expected exactly 6 hex digits")]
    InvalidColorStop(String),
    #[error("at least two color stops are required")]
    NotEnoughColorStops,
    #[error("invalid channel selection {0:?}: expected \"all\" or comma-separated indices")]
    InvalidChannels(String),
    #[error("duplicate channel index {0}")]
    DuplicateChannel(usize),
    #[error("channel index {index} out of range: the source has {available} channel(s)")]
    ChannelOutOfRange { index: usize, available: usize },
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    pub window: Option<usize>,
    pub step: Option<usize>,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_channels")]
    pub channels: String,
    #[serde(default)]
    pub full_magnitude: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: None,
            step: None,
            fps: default_fps(),
            channels: default_channels(),
            full_magnitude: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_brightness")]
    pub brightness: f64,
    #[serde(default = "default_prepend_width")]
    pub prepend_width: u32,
    #[serde(default = "default_crop_height")]
    pub crop_height: u32,
    #[serde(default = "default_color_stops")]
    pub color_stops: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            brightness: default_brightness(),
            prepend_width: default_prepend_width(),
            crop_height: default_crop_height(),
            color_stops: default_color_stops(),
        }
    }
}

fn default_fps() -> f64 { 30.0 }
fn default_channels() -> String { "all".into() }
fn default_brightness() -> f64 { 8.0 }
fn default_prepend_width() -> u32 { 1920 }
fn default_crop_height() -> u32 { 1080 }

pub fn default_color_stops() -> Vec<String> {
    ["#000000", "#0000ff", "#00ffff", "#00ff00", "#ffffff"]
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_yields_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.output.crop_height, 1080);
        assert_eq!(cfg.output.prepend_width, 1920);
        assert_eq!(cfg.output.brightness, 8.0);
        assert_eq!(cfg.analysis.fps, 30.0);
        assert_eq!(cfg.analysis.channels, "all");
        assert!(cfg.analysis.window.is_none());
        assert!(!cfg.analysis.full_magnitude);
        assert_eq!(cfg.output.color_stops.len(), 5);
    }

    #[test]
    fn partial_sections_override_only_their_keys() {
        let cfg: Config = toml::from_str(
            "[analysis]\nwindow = 4096\n\n[output]\ncrop_height = 720\n",
        )
        .unwrap();
        assert_eq!(cfg.analysis.window, Some(4096));
        assert_eq!(cfg.analysis.fps, 30.0);
        assert_eq!(cfg.output.crop_height, 720);
        assert_eq!(cfg.output.prepend_width, 1920);
    }

    #[test]
    fn missing_analysis_section_keeps_field_defaults() {
        // An [output]-only file must not zero out the analysis defaults.
        let cfg: Config = toml::from_str("[output]\ncrop_height = 720\n").unwrap();
        assert_eq!(cfg.analysis.fps, 30.0);
        assert_eq!(cfg.analysis.channels, "all");
        assert!(cfg.analysis.window.is_none());
        assert!(cfg.analysis.step.is_none());
        assert!(!cfg.analysis.full_magnitude);
        assert_eq!(cfg.output.crop_height, 720);
    }

    #[test]
    fn missing_output_section_keeps_field_defaults() {
        let cfg: Config = toml::from_str("[analysis]\nfps = 24.0\n").unwrap();
        assert_eq!(cfg.analysis.fps, 24.0);
        assert_eq!(cfg.output.brightness, 8.0);
        assert_eq!(cfg.output.prepend_width, 1920);
        assert_eq!(cfg.output.crop_height, 1080);
    }

    #[test]
    fn malformed_values_fail_to_parse() {
        assert!(toml::from_str::<Config>("[analysis]\nwindow = \"not a number\"\n").is_err());
        assert!(toml::from_str::<Config>("[output]\nbrightness = []\n").is_err());
        assert!(toml::from_str::<Config>("not toml at all {{{").is_err());
    }

    #[test]
    fn load_config_propagates_read_and_parse_errors() {
        assert!(load_config(Path::new("/nonexistent/spectro.toml")).is_err());
    }
}
