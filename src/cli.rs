use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spectro", about = "Renders a synchronized Full-HD spectrogram image from an audio file")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Output image file (default: <input file name>.png)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// FFT window size in bytes (default: one second of audio)
    #[arg(long)]
    pub window: Option<usize>,

    /// How far the window advances between FFTs, in bytes (default: window / fps)
    #[arg(long)]
    pub step: Option<usize>,

    /// Linear brightness multiplier applied to normalized magnitudes
    #[arg(long, default_value_t = 8.0)]
    pub brightness: f64,

    /// Target video frame rate the default step is derived from
    #[arg(long, default_value_t = 30.0)]
    pub fps: f64,

    /// Silence columns prepended on the left of the spectrogram
    #[arg(long, default_value_t = 1920)]
    pub prepend_width: u32,

    /// Maximum image height in pixels
    #[arg(long, default_value_t = 1080)]
    pub crop_height: u32,

    /// Gradient color stops from silence to peak, as hex RGB
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "#000000,#0000ff,#00ffff,#00ff00,#ffffff"
    )]
    pub color_stops: Vec<String>,

    /// Channels to mix into the analysis: "all" or comma-separated indices
    #[arg(long, default_value = "all")]
    pub channels: String,

    /// Render a gradient test raster instead of processing audio
    #[arg(long)]
    pub palette_preview: bool,

    /// Use the full complex magnitude instead of the real component
    #[arg(long)]
    pub full_magnitude: bool,

    /// Optional config file path
    #[arg(long)]
    pub config: Option<PathBuf>,
}
