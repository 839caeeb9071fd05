use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};

use crate::audio::analysis::Extrema;
use crate::render::color::ColorMap;

/// Assembles the buffered magnitude columns into the final pixel grid.
///
/// Height is the tallest column capped at `crop_height`; width is the data
/// column count plus `prepend_width` silence columns on the left. Within a
/// data column the lowest retained bin lands on the bottom row.
pub fn compose(
    columns: &[Vec<u64>],
    extrema: &Extrema,
    map: &ColorMap,
    prepend_width: u32,
    crop_height: usize,
) -> RgbImage {
    let height = columns
        .iter()
        .map(|c| c.len())
        .max()
        .unwrap_or(0)
        .min(crop_height)
        .max(1) as u32;
    let width = prepend_width + columns.len() as u32;

    let mut img = RgbImage::new(width, height);
    let silence = map.color_for(0.0);

    for x in 0..prepend_width {
        for y in 0..height {
            img.put_pixel(x, y, silence);
        }
    }

    let pb = ProgressBar::new(columns.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} columns ({eta} remaining)")
            .unwrap()
            .progress_chars("=>-"),
    );

    for (i, column) in columns.iter().enumerate() {
        let x = prepend_width + i as u32;
        let used = column.len().min(height as usize);
        for (y, &raw) in column[..used].iter().rev().enumerate() {
            img.put_pixel(x, y as u32, map.color_for(extrema.normalize(raw)));
        }
        for y in used..height as usize {
            img.put_pixel(x, y as u32, silence);
        }
        pb.set_position(i as u64 + 1);
    }
    pb.finish_and_clear();

    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn map() -> ColorMap {
        let stops = vec!["#000000".to_string(), "#ffffff".to_string()];
        ColorMap::from_hex_stops(&stops, 1.0).unwrap()
    }

    fn observed(values: &[u64]) -> Extrema {
        let mut e = Extrema::default();
        for &v in values {
            e.observe(v);
        }
        e
    }

    #[test]
    fn grid_dimensions_follow_columns_and_padding() {
        let columns = vec![vec![0u64, 5, 10], vec![10, 0, 5]];
        let extrema = observed(&[0, 10]);
        let img = compose(&columns, &extrema, &map(), 4, 1080);
        assert_eq!(img.width(), 4 + 2);
        assert_eq!(img.height(), 3);
    }

    #[test]
    fn height_is_capped_at_crop_height() {
        let columns = vec![(0..100u64).collect::<Vec<_>>()];
        let extrema = observed(&[0, 99]);
        let img = compose(&columns, &extrema, &map(), 0, 10);
        assert_eq!(img.height(), 10);
    }

    #[test]
    fn prepend_columns_carry_the_silence_color() {
        let columns = vec![vec![0u64, 10]];
        let extrema = observed(&[0, 10]);
        let img = compose(&columns, &extrema, &map(), 3, 1080);
        for x in 0..3 {
            for y in 0..2 {
                assert_eq!(*img.get_pixel(x, y), Rgb([0, 0, 0]));
            }
        }
    }

    #[test]
    fn lowest_bin_renders_on_the_bottom_row() {
        // Column: bin 0 is the peak, bin 1 silent.
        let columns = vec![vec![10u64, 0]];
        let extrema = observed(&[0, 10]);
        let img = compose(&columns, &extrema, &map(), 0, 1080);
        assert_eq!(*img.get_pixel(0, 1), Rgb([255, 255, 255]));
        assert_eq!(*img.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn degenerate_extrema_render_uniform_silence() {
        let columns = vec![vec![0u64, 0], vec![0, 0]];
        let extrema = observed(&[0, 0]);
        let img = compose(&columns, &extrema, &map(), 1, 1080);
        for pixel in img.pixels() {
            assert_eq!(*pixel, Rgb([0, 0, 0]));
        }
    }
}
