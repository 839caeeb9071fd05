use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// A decoded PCM stream, readable front to back exactly once.
///
/// Samples are signed 16-bit after decoding regardless of the source codec;
/// `bits_per_sample` reports the source bit depth, which sizes the default
/// analysis window.
pub trait PcmSource {
    fn sample_rate(&self) -> u32;
    fn bits_per_sample(&self) -> u32;
    fn channel_count(&self) -> usize;

    /// Reads up to `max_frames` frames. An empty chunk means the stream is
    /// exhausted.
    fn read(&mut self, max_frames: usize) -> Result<FrameChunk>;
}

/// A block of interleaved 16-bit frames read from a [`PcmSource`].
pub struct FrameChunk {
    samples: Vec<i16>,
    channels: usize,
}

impl FrameChunk {
    pub fn new(samples: Vec<i16>, channels: usize) -> Self {
        debug_assert!(channels > 0 && samples.len() % channels == 0);
        Self { samples, channels }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Little-endian bytes of a single channel, deinterleaved.
    pub fn channel_bytes(&self, channel: usize) -> Vec<u8> {
        debug_assert!(channel < self.channels);
        let mut bytes = Vec::with_capacity(self.frames() * 2);
        for frame in self.samples.chunks_exact(self.channels) {
            bytes.extend_from_slice(&frame[channel].to_le_bytes());
        }
        bytes
    }
}

/// Lazy symphonia-backed PCM source. Packets are decoded on demand and
/// buffered until a `read` can be satisfied or the container runs out.
pub struct SymphoniaSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    bits_per_sample: u32,
    channels: usize,
    total_frames: Option<u64>,
    pending: Vec<i16>,
    eof: bool,
}

impl SymphoniaSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .context("Failed to probe audio format")?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .context("No audio tracks found")?;

        let track_id = track.id;
        let channels = track.codec_params.channels.map_or(1, |c| c.count());
        let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;
        let bits_per_sample = track.codec_params.bits_per_sample.unwrap_or(16);
        let total_frames = track.codec_params.n_frames;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Failed to create audio decoder")?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            bits_per_sample,
            channels,
            total_frames,
            pending: Vec::new(),
            eof: false,
        })
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.total_frames.map(|n| n as f64 / self.sample_rate as f64)
    }

    fn buffered_frames(&self) -> usize {
        self.pending.len() / self.channels
    }

    fn fill(&mut self, target_frames: usize) -> Result<()> {
        while !self.eof && self.buffered_frames() < target_frames {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.eof = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            let num_frames = decoded.frames();

            let mut sample_buf = SampleBuffer::<i16>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            self.pending.extend_from_slice(sample_buf.samples());
        }
        Ok(())
    }
}

impl PcmSource for SymphoniaSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn bits_per_sample(&self) -> u32 {
        self.bits_per_sample
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn read(&mut self, max_frames: usize) -> Result<FrameChunk> {
        self.fill(max_frames)?;
        let take = max_frames.min(self.buffered_frames()) * self.channels;
        let samples: Vec<i16> = self.pending.drain(..take).collect();
        Ok(FrameChunk::new(samples, self.channels))
    }
}

/// In-memory PCM source for tests.
#[cfg(test)]
pub struct MemorySource {
    samples: Vec<i16>,
    channels: usize,
    sample_rate: u32,
    cursor: usize,
}

#[cfg(test)]
impl MemorySource {
    pub fn new(interleaved: Vec<i16>, channels: usize, sample_rate: u32) -> Self {
        debug_assert!(channels > 0 && interleaved.len() % channels == 0);
        Self {
            samples: interleaved,
            channels,
            sample_rate,
            cursor: 0,
        }
    }
}

#[cfg(test)]
impl PcmSource for MemorySource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn bits_per_sample(&self) -> u32 {
        16
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn read(&mut self, max_frames: usize) -> Result<FrameChunk> {
        let take = (max_frames * self.channels).min(self.samples.len() - self.cursor);
        let samples = self.samples[self.cursor..self.cursor + take].to_vec();
        self.cursor += take;
        Ok(FrameChunk::new(samples, self.channels))
    }
}
