use rustfft::{num_complex::Complex, FftPlanner};
use std::collections::HashMap;
use std::sync::Arc;

/// Kaiser window shape, matching the reference renderer.
const KAISER_BETA: f64 = 1.7952;

/// Divisors tried, in order, when picking how many frequency bins to keep.
const BIN_DIVISORS: [usize; 5] = [16, 12, 8, 4, 2];

/// Running minimum and maximum over every retained bin magnitude.
///
/// Owned by the pipeline for the whole run; frozen once all columns exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct Extrema {
    min: Option<u64>,
    max: Option<u64>,
}

impl Extrema {
    pub fn observe(&mut self, value: u64) {
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Normalization denominator. Zero for an empty or constant stream.
    pub fn threshold(&self) -> u64 {
        match (self.min, self.max) {
            (Some(min), Some(max)) => max - min,
            _ => 0,
        }
    }

    /// Maps a raw magnitude into the unit range. A degenerate range (silent
    /// or constant-amplitude input) normalizes to 0 instead of dividing by
    /// zero.
    pub fn normalize(&self, raw: u64) -> f64 {
        match self.threshold() {
            0 => 0.0,
            threshold => raw as f64 / threshold as f64,
        }
    }
}

/// Picks how many of `available` one-sided bins a column keeps: the first
/// divisor whose quotient still reaches `crop_height`, so longer windows get
/// more vertical detail without blowing past the output ceiling.
pub fn select_bin_count(available: usize, crop_height: usize) -> usize {
    for divisor in BIN_DIVISORS {
        let quotient = available / divisor;
        if quotient >= crop_height {
            return quotient;
        }
    }
    available / 2
}

/// Turns mixed mono windows into magnitude columns.
///
/// Each window is tapered with a Kaiser window (cached per length, since the
/// length never changes within a run), transformed with a one-sided FFT, and
/// reduced to one non-negative integer per retained bin.
pub struct SpectralAnalyzer {
    planner: FftPlanner<f64>,
    tapers: HashMap<usize, Arc<Vec<f64>>>,
    crop_height: usize,
    full_magnitude: bool,
    pub extrema: Extrema,
    mean_total: f64,
}

impl SpectralAnalyzer {
    pub fn new(crop_height: usize, full_magnitude: bool) -> Self {
        Self {
            planner: FftPlanner::new(),
            tapers: HashMap::new(),
            crop_height,
            full_magnitude,
            extrema: Extrema::default(),
            mean_total: 0.0,
        }
    }

    pub fn analyze(&mut self, samples: &[i16]) -> Vec<u64> {
        let len = samples.len();
        let taper = self.taper(len);

        let mut buffer: Vec<Complex<f64>> = samples
            .iter()
            .zip(taper.iter())
            .map(|(&s, &w)| Complex::new(s as f64 * w, 0.0))
            .collect();
        self.planner.plan_fft_forward(len).process(&mut buffer);

        let available = len / 2 + 1;
        let retained = select_bin_count(available, self.crop_height);

        let mut column = Vec::with_capacity(retained);
        let mut window_sum = 0.0;
        for bin in &buffer[..retained] {
            let magnitude = if self.full_magnitude {
                bin.norm().trunc() as u64
            } else {
                bin.re.trunc().abs() as u64
            };
            self.extrema.observe(magnitude);
            window_sum += magnitude as f64;
            column.push(magnitude);
        }
        self.mean_total += window_sum / available as f64;
        column
    }

    /// Arithmetic mean of the per-window bin averages, for diagnostics only.
    pub fn mean_magnitude(&self, window_count: usize) -> u64 {
        if window_count == 0 {
            return 0;
        }
        (self.mean_total / window_count as f64).round() as u64
    }

    fn taper(&mut self, len: usize) -> Arc<Vec<f64>> {
        self.tapers
            .entry(len)
            .or_insert_with(|| Arc::new(kaiser_window(len, KAISER_BETA)))
            .clone()
    }
}

/// Symmetric Kaiser window of `len` points.
fn kaiser_window(len: usize, beta: f64) -> Vec<f64> {
    if len <= 1 {
        return vec![1.0; len];
    }
    let denom = modified_bessel_i0(beta);
    let span = (len - 1) as f64;
    (0..len)
        .map(|n| {
            let ratio = (2.0 * n as f64) / span - 1.0;
            let inside = (1.0 - ratio * ratio).max(0.0).sqrt();
            modified_bessel_i0(beta * inside) / denom
        })
        .collect()
}

/// Zeroth-order modified Bessel function, Abramowitz & Stegun polynomials.
fn modified_bessel_i0(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 3.75 {
        let y = (x / 3.75).powi(2);
        1.0 + y
            * (3.515_622_9
                + y * (3.089_942_4
                    + y * (1.206_749_2
                        + y * (0.265_973_2
                            + y * (0.036_076_8 + y * (0.004_581_3 + y * 0.000_324_11))))))
    } else {
        let y = 3.75 / ax;
        let poly = 0.398_942_28
            + y * (0.013_285_92
                + y * (0.002_253_19
                    + y * (-0.001_575_65
                        + y * (0.009_162_81
                            + y * (-0.020_577_06
                                + y * (0.026_355_37 + y * (-0.016_476_33 + y * 0.003_923_77)))))));
        poly * ax.exp() / ax.sqrt()
    }
}
