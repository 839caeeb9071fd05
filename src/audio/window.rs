use anyhow::Result;

use super::decode::{FrameChunk, PcmSource};
use crate::config::ConfigError;

/// Frames requested per `PcmSource::read`.
const CHUNK_FRAMES: usize = 1024;

/// Which channels of the source contribute to the mixed mono window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelection {
    All,
    Indices(Vec<usize>),
}

impl ChannelSelection {
    /// Parses "all" or a comma-separated list of channel indices.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let spec = spec.trim();
        if spec.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let mut indices = Vec::new();
        for part in spec.split(',') {
            let idx: usize = part
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidChannels(spec.to_string()))?;
            if indices.contains(&idx) {
                return Err(ConfigError::DuplicateChannel(idx));
            }
            indices.push(idx);
        }
        if indices.is_empty() {
            return Err(ConfigError::InvalidChannels(spec.to_string()));
        }
        Ok(Self::Indices(indices))
    }

    /// Concrete channel indices for a source with `channel_count` channels.
    pub fn resolve(&self, channel_count: usize) -> Result<Vec<usize>, ConfigError> {
        match self {
            Self::All => Ok((0..channel_count).collect()),
            Self::Indices(indices) => {
                for &idx in indices {
                    if idx >= channel_count {
                        return Err(ConfigError::ChannelOutOfRange {
                            index: idx,
                            available: channel_count,
                        });
                    }
                }
                Ok(indices.clone())
            }
        }
    }
}

/// Slides a fixed-size window over the byte stream of the selected channels,
/// mixing them down to one mono sample buffer per position.
///
/// Each channel accumulator is seeded with `window` zero bytes and gets
/// another `window` zero bytes once the source runs dry, so the first and
/// last true samples still sit inside at least one full window.
pub struct WindowExtractor<'a, S: PcmSource> {
    source: &'a mut S,
    channels: Vec<usize>,
    window: usize,
    step: usize,
    accumulators: Vec<Vec<u8>>,
    exhausted: bool,
    tail_padded: bool,
}

impl<'a, S: PcmSource> WindowExtractor<'a, S> {
    pub fn new(source: &'a mut S, channels: Vec<usize>, window: usize, step: usize) -> Self {
        debug_assert!(!channels.is_empty() && window > 0 && step > 0);
        let accumulators = channels.iter().map(|_| vec![0u8; window]).collect();
        Self {
            source,
            channels,
            window,
            step,
            accumulators,
            exhausted: false,
            tail_padded: false,
        }
    }

    fn append_chunk(&mut self, chunk: &FrameChunk) {
        for (acc, &channel) in self.accumulators.iter_mut().zip(&self.channels) {
            acc.extend_from_slice(&chunk.channel_bytes(channel));
        }
    }

    /// Mixes the front `window` bytes of every accumulator into one mono
    /// sample buffer, then advances all accumulators by `step` bytes.
    fn emit(&mut self) -> Vec<i16> {
        let samples = self.window / 2;
        let mut mixed = vec![0i32; samples];
        for acc in &self.accumulators {
            for (sum, pair) in mixed.iter_mut().zip(acc[..self.window].chunks_exact(2)) {
                *sum += i16::from_le_bytes([pair[0], pair[1]]) as i32;
            }
        }
        let divisor = self.accumulators.len() as i32;
        let mono: Vec<i16> = mixed.into_iter().map(|s| (s / divisor) as i16).collect();

        for acc in &mut self.accumulators {
            let advance = self.step.min(acc.len());
            acc.drain(..advance);
        }
        mono
    }
}

impl<S: PcmSource> Iterator for WindowExtractor<'_, S> {
    type Item = Result<Vec<i16>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.accumulators[0].len() >= self.window {
                return Some(Ok(self.emit()));
            }
            if self.tail_padded {
                return None;
            }
            if self.exhausted {
                for acc in &mut self.accumulators {
                    acc.extend(std::iter::repeat(0u8).take(self.window));
                }
                self.tail_padded = true;
                continue;
            }
            match self.source.read(CHUNK_FRAMES) {
                Ok(chunk) if chunk.is_empty() => self.exhausted = true,
                Ok(chunk) => self.append_chunk(&chunk),
                Err(e) => {
                    // Decode failures are fatal; stop iterating after this.
                    self.tail_padded = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
