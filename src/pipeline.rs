use anyhow::{Context, Result};
use image::RgbImage;

use crate::audio::analysis::SpectralAnalyzer;
use crate::audio::decode::PcmSource;
use crate::audio::window::{ChannelSelection, WindowExtractor};
use crate::config::ConfigError;
use crate::render::color::ColorMap;
use crate::render::compose::compose;

/// Validated knobs for one spectrogram run. `window` and `step` are byte
/// lengths; when unset they default to one second of audio and window / fps.
pub struct PipelineOptions {
    pub window: Option<usize>,
    pub step: Option<usize>,
    pub fps: f64,
    pub prepend_width: u32,
    pub crop_height: usize,
    pub channels: ChannelSelection,
    pub full_magnitude: bool,
}

impl PipelineOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window == Some(0) {
            return Err(ConfigError::NonPositiveInteger("window"));
        }
        if self.step == Some(0) {
            return Err(ConfigError::NonPositiveInteger("step"));
        }
        if !(self.fps > 0.0) {
            return Err(ConfigError::NonPositiveNumber("fps"));
        }
        if self.crop_height == 0 {
            return Err(ConfigError::NonPositiveInteger("crop-height"));
        }
        Ok(())
    }
}

/// Two-phase batch pipeline: consume the whole stream into magnitude columns
/// first (normalization needs the global extrema), then map every column
/// through the color gradient into the pixel grid.
pub fn run<S: PcmSource>(source: &mut S, map: &ColorMap, opts: &PipelineOptions) -> Result<RgbImage> {
    let channels = opts.channels.resolve(source.channel_count())?;

    let bytes_per_sample = (source.bits_per_sample() as usize / 8).max(1);
    let window = opts
        .window
        .unwrap_or(source.sample_rate() as usize * bytes_per_sample);
    let step = opts
        .step
        .unwrap_or_else(|| ((window as f64 / opts.fps).round() as usize).max(1));
    if step > window {
        log::warn!(
            "step ({}) exceeds window ({}); parts of the stream will not be analyzed",
            step,
            window
        );
    }
    log::info!("Window: {} bytes, step: {} bytes", window, step);

    let mut analyzer = SpectralAnalyzer::new(opts.crop_height, opts.full_magnitude);
    let mut columns: Vec<Vec<u64>> = Vec::new();
    for mixed in WindowExtractor::new(source, channels, window, step) {
        let samples = mixed.context("Failed to decode PCM stream")?;
        columns.push(analyzer.analyze(&samples));
    }
    if columns.is_empty() {
        anyhow::bail!("No analysis windows produced");
    }

    log::info!(
        "Windows: {}, threshold: {}, mean magnitude: {}",
        columns.len(),
        analyzer.extrema.threshold(),
        analyzer.mean_magnitude(columns.len())
    );

    Ok(compose(
        &columns,
        &analyzer.extrema,
        map,
        opts.prepend_width,
        opts.crop_height,
    ))
}
