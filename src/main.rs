mod audio;
mod cli;
mod config;
mod encode;
mod pipeline;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use audio::decode::{PcmSource, SymphoniaSource};
use audio::window::ChannelSelection;
use cli::Cli;
use config::ConfigError;
use pipeline::PipelineOptions;
use render::color::{ColorMap, PREVIEW_SIZE};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect spectro.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("spectro.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("spectro").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("spectro").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    if let Some(ref path) = config_path {
        // A file named with --config must load; auto-detected ones may not.
        let cfg = match config::load_config(path) {
            Ok(cfg) => Some(cfg),
            Err(e) if cli.config.is_some() => return Err(e),
            Err(e) => {
                log::warn!("Failed to load config from {}: {:#}", path.display(), e);
                None
            }
        };
        if let Some(cfg) = cfg {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.window.is_none() {
                cli.window = cfg.analysis.window;
            }
            if cli.step.is_none() {
                cli.step = cfg.analysis.step;
            }
            if cli.fps == 30.0 {
                cli.fps = cfg.analysis.fps;
            }
            if cli.channels == "all" {
                cli.channels = cfg.analysis.channels;
            }
            if !cli.full_magnitude {
                cli.full_magnitude = cfg.analysis.full_magnitude;
            }
            if cli.brightness == 8.0 {
                cli.brightness = cfg.output.brightness;
            }
            if cli.prepend_width == 1920 {
                cli.prepend_width = cfg.output.prepend_width;
            }
            if cli.crop_height == 1080 {
                cli.crop_height = cfg.output.crop_height;
            }
            if cli.color_stops == config::default_color_stops() {
                cli.color_stops = cfg.output.color_stops;
            }
        }
    }

    // Everything below must be validated before any audio is touched.
    if !(cli.brightness > 0.0) {
        return Err(ConfigError::NonPositiveNumber("brightness").into());
    }
    let map = ColorMap::from_hex_stops(&cli.color_stops, cli.brightness)?;
    let opts = PipelineOptions {
        window: cli.window,
        step: cli.step,
        fps: cli.fps,
        prepend_width: cli.prepend_width,
        crop_height: cli.crop_height as usize,
        channels: ChannelSelection::parse(&cli.channels)?,
        full_magnitude: cli.full_magnitude,
    };
    opts.validate()?;

    // Preview mode renders the configured gradient and never opens audio.
    if cli.palette_preview {
        let out = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from("palette-preview.png"));
        log::info!("Rendering palette preview ({}x{})", PREVIEW_SIZE, PREVIEW_SIZE);
        return encode::png::write_png(&map.preview(PREVIEW_SIZE), &out);
    }

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("Input: {}", input.display());
    let mut source = SymphoniaSource::open(input)?;
    if let Some(secs) = source.duration_secs() {
        log::info!("Duration: {:.1}s", secs);
    }
    log::info!(
        "Sample rate: {}Hz, bits: {}, channels: {}",
        source.sample_rate(),
        source.bits_per_sample(),
        source.channel_count()
    );

    let img = pipeline::run(&mut source, &map, &opts)?;
    log::info!("Image size: {}x{}", img.width(), img.height());

    let out = cli.output.clone().unwrap_or_else(|| {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "spectro".into());
        PathBuf::from(format!("{name}.png"))
    });
    encode::png::write_png(&img, &out)
}
