use image::{Rgb, RgbImage};

use crate::config::ConfigError;

/// Edge length of the square palette preview raster.
pub const PREVIEW_SIZE: u32 = 512;

/// Hue, saturation and value, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

/// One anchor of the brightness gradient.
#[derive(Debug, Clone, Copy)]
struct ColorStop {
    position: f64,
    color: Hsv,
}

/// A sorted gradient of evenly spaced color stops plus the brightness
/// multiplier applied to normalized magnitudes before lookup.
///
/// The first stop sits at 0 ("silence"), the last at 1 ("peak"). When an
/// endpoint's hue and saturation are far from its interior neighbor (their
/// combined distance exceeds 1), the endpoint inherits the neighbor's hue and
/// saturation so that only brightness changes near full black or white.
pub struct ColorMap {
    stops: Vec<ColorStop>,
    brightness: f64,
}

impl ColorMap {
    pub fn from_hex_stops(specs: &[String], brightness: f64) -> Result<Self, ConfigError> {
        if specs.len() < 2 {
            return Err(ConfigError::NotEnoughColorStops);
        }

        let last = specs.len() - 1;
        let mut stops: Vec<ColorStop> = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let [r, g, b] = parse_hex(spec)?;
                Ok(ColorStop {
                    position: i as f64 / last as f64,
                    color: rgb_to_hsv(r, g, b),
                })
            })
            .collect::<Result<_, ConfigError>>()?;

        match_extreme(&mut stops, 0, 1);
        match_extreme(&mut stops, last, last - 1);

        Ok(Self { stops, brightness })
    }

    /// Color for a normalized magnitude, brightness applied.
    pub fn color_for(&self, normalized: f64) -> Rgb<u8> {
        self.pick(normalized * self.brightness)
    }

    fn pick(&self, scaled: f64) -> Rgb<u8> {
        let first = &self.stops[0];
        let last = &self.stops[self.stops.len() - 1];
        if scaled < first.position {
            return hsv_to_rgb(first.color);
        }
        if scaled >= last.position {
            return hsv_to_rgb(last.color);
        }

        // The early returns above guarantee a bracketing pair exists.
        let (low, high) = self
            .stops
            .windows(2)
            .map(|pair| (&pair[0], &pair[1]))
            .find(|(low, high)| low.position <= scaled && scaled < high.position)
            .unwrap();

        let t = (scaled - low.position) / (high.position - low.position);
        hsv_to_rgb(Hsv {
            h: low.color.h + (high.color.h - low.color.h) * t,
            s: low.color.s + (high.color.s - low.color.s) * t,
            v: low.color.v + (high.color.v - low.color.v) * t,
        })
    }

    /// Square test raster for eyeballing a gradient: column x is the color of
    /// normalized input x / size, with no brightness scaling, on every row.
    pub fn preview(&self, size: u32) -> RgbImage {
        let mut img = RgbImage::new(size, size);
        for x in 0..size {
            let color = self.pick(x as f64 / size as f64);
            for y in 0..size {
                img.put_pixel(x, y, color);
            }
        }
        img
    }
}

/// Pulls the endpoint's hue and saturation onto its neighbor's when they are
/// more than 1.0 apart combined.
fn match_extreme(stops: &mut [ColorStop], endpoint: usize, neighbor: usize) {
    let near = stops[neighbor].color;
    let end = &mut stops[endpoint].color;
    if (end.h - near.h).abs() + (end.s - near.s).abs() > 1.0 {
        end.h = near.h;
        end.s = near.s;
    }
}

fn parse_hex(spec: &str) -> Result<[u8; 3], ConfigError> {
    let digits = spec.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ConfigError::InvalidColorStop(spec.to_string()));
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).unwrap();
    Ok([channel(0), channel(2), channel(4)])
}

pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let rf = r as f64 / 255.0;
    let gf = g as f64 / 255.0;
    let bf = b as f64 / 255.0;
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == rf {
        (((gf - bf) / delta).rem_euclid(6.0)) / 6.0
    } else if max == gf {
        ((bf - rf) / delta + 2.0) / 6.0
    } else {
        ((rf - gf) / delta + 4.0) / 6.0
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };

    Hsv { h, s, v: max }
}

pub fn hsv_to_rgb(hsv: Hsv) -> Rgb<u8> {
    let h = hsv.h.rem_euclid(1.0) * 6.0;
    let c = hsv.v * hsv.s;
    let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
    let m = hsv.v - c;

    let (r, g, b) = match h as usize {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let channel = |f: f64| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb([channel(r), channel(g), channel(b)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops(specs: &[&str]) -> Vec<String> {
        specs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rejects_malformed_stops() {
        assert!(ColorMap::from_hex_stops(&stops(&["#000000"]), 8.0).is_err());
        assert!(ColorMap::from_hex_stops(&stops(&["#000000", "fffff"]), 8.0).is_err());
        assert!(ColorMap::from_hex_stops(&stops(&["#000000", "gggggg"]), 8.0).is_err());
        assert!(ColorMap::from_hex_stops(&stops(&["#000000", "#ffffff"]), 8.0).is_ok());
        assert!(ColorMap::from_hex_stops(&stops(&["000000", "ffffff"]), 8.0).is_ok());
    }

    #[test]
    fn hex_hsv_round_trip_within_rounding() {
        for spec in ["#123456", "#ff8800", "#00ffee", "#777777", "#0b0c0d"] {
            let [r, g, b] = parse_hex(spec).unwrap();
            let Rgb([r2, g2, b2]) = hsv_to_rgb(rgb_to_hsv(r, g, b));
            assert!((r as i16 - r2 as i16).abs() <= 1, "{spec} red");
            assert!((g as i16 - g2 as i16).abs() <= 1, "{spec} green");
            assert!((b as i16 - b2 as i16).abs() <= 1, "{spec} blue");
        }
    }

    #[test]
    fn clamps_instead_of_extrapolating() {
        let map =
            ColorMap::from_hex_stops(&stops(&["#000000", "#0000ff", "#ffffff"]), 1.0).unwrap();
        assert_eq!(map.color_for(-5.0), map.color_for(0.0));
        assert_eq!(map.color_for(1000.0), map.color_for(1.0));
    }

    #[test]
    fn grayscale_gradient_stays_unsaturated() {
        let map = ColorMap::from_hex_stops(&stops(&["#000000", "#ffffff"]), 1.0).unwrap();
        for i in 0..=100 {
            let Rgb([r, g, b]) = map.color_for(i as f64 / 100.0);
            assert_eq!(r, g);
            assert_eq!(g, b);
        }
        assert_eq!(map.color_for(0.0), Rgb([0, 0, 0]));
        assert_eq!(map.color_for(1.0), Rgb([255, 255, 255]));
    }

    #[test]
    fn black_endpoint_inherits_neighbor_hue() {
        // Black vs. saturated blue: hue+saturation distance 5/3 > 1, so the
        // bottom of the ramp climbs through dark blue, never through red.
        let map = ColorMap::from_hex_stops(&stops(&["#000000", "#0000ff"]), 1.0).unwrap();
        let Rgb([r, g, b]) = map.color_for(0.5);
        assert_eq!(r, 0);
        assert_eq!(g, 0);
        assert!(b > 100);
    }

    #[test]
    fn brightness_scales_the_lookup_position() {
        let map = ColorMap::from_hex_stops(&stops(&["#000000", "#ffffff"]), 8.0).unwrap();
        // value 0.125 * brightness 8 reaches the top of the gradient.
        assert_eq!(map.color_for(0.125), Rgb([255, 255, 255]));
    }

    #[test]
    fn preview_ramps_black_to_white_without_hue() {
        let map = ColorMap::from_hex_stops(&stops(&["#000000", "#ffffff"]), 8.0).unwrap();
        let img = map.preview(64);
        let mut previous = 0u8;
        for x in 0..64 {
            let Rgb([r, g, b]) = *img.get_pixel(x, 0);
            // Saturation stays 0: every pixel is a pure gray.
            assert_eq!(r, g);
            assert_eq!(g, b);
            assert!(r >= previous);
            previous = r;
            // Every row in a column carries the same color.
            for y in 1..64 {
                assert_eq!(*img.get_pixel(x, y), Rgb([r, g, b]));
            }
        }
        // Brightness is not applied in preview mode, so the ramp is linear.
        assert_eq!(*img.get_pixel(32, 0), hsv_to_rgb(Hsv { h: 0.0, s: 0.0, v: 0.5 }));
    }

    #[test]
    fn value_channel_is_monotonic_toward_a_brighter_stop() {
        let map = ColorMap::from_hex_stops(&stops(&["#000000", "#ffffff"]), 1.0).unwrap();
        let mut previous = 0u8;
        for i in 0..=50 {
            let Rgb([r, _, _]) = map.color_for(i as f64 / 50.0);
            assert!(r >= previous);
            previous = r;
        }
    }
}
