//! Decode/resample cost estimation.
//!
//! A thumbnail's cost is proportional to the number of source pixels that
//! have to be decoded and resampled. One admission unit buys
//! [`WEIGHT_UNIT`] pixels (a 1200×1200 image), and a single request is
//! capped at [`MAX_WEIGHT`] units so it always fits in the pool.
//!
//! Only the image header is read; pixel data is left for the generator.

use std::io::{BufRead, Seek};

use image::ImageReader;

use crate::error::PipelineResult;

/// Pixels of decode + resample work covered by one admission unit.
pub const WEIGHT_UNIT: u64 = 1200 * 1200;

/// Upper bound of a single request's weight. Equal to the default pool
/// capacity.
pub const MAX_WEIGHT: u32 = 20;

/// Admission cost of one thumbnail, in `[1, MAX_WEIGHT]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Weight(u32);

impl Weight {
    pub const MIN: Weight = Weight(1);
    pub const MAX: Weight = Weight(MAX_WEIGHT);

    /// `min(ceil(width * height / WEIGHT_UNIT), MAX_WEIGHT)`, at least 1.
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        let pixels = u64::from(width) * u64::from(height);
        let units = pixels.div_ceil(WEIGHT_UNIT);
        let capped = units.clamp(1, u64::from(MAX_WEIGHT));
        Weight(capped as u32)
    }

    pub fn units(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read just enough of `reader` to learn the image dimensions.
///
/// The format is sniffed from the magic bytes, not the file name. Fails
/// with [`PipelineError::Decode`](crate::PipelineError::Decode) on an
/// unknown format or a damaged header.
pub fn probe_dimensions<R: BufRead + Seek>(reader: R) -> PipelineResult<(u32, u32)> {
    let dims = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()?;
    Ok(dims)
}

/// Estimate the admission weight of the image behind `reader`.
pub fn estimate_weight<R: BufRead + Seek>(reader: R) -> PipelineResult<Weight> {
    let (width, height) = probe_dimensions(reader)?;
    Ok(Weight::for_dimensions(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::io::Cursor;

    #[test]
    fn reference_image_costs_one_unit() {
        assert_eq!(Weight::for_dimensions(1200, 1200).units(), 1);
        assert_eq!(Weight::for_dimensions(1200, 1201).units(), 2);
    }

    #[test]
    fn tiny_and_empty_images_cost_the_minimum() {
        assert_eq!(Weight::for_dimensions(0, 0), Weight::MIN);
        assert_eq!(Weight::for_dimensions(1, 1), Weight::MIN);
    }

    #[test]
    fn huge_images_are_capped() {
        assert_eq!(Weight::for_dimensions(100_000, 100_000), Weight::MAX);
        assert_eq!(Weight::for_dimensions(u32::MAX, u32::MAX), Weight::MAX);
    }

    #[test]
    fn weight_is_bounded_and_monotonic_in_pixel_count() {
        let mut sizes: Vec<(u32, u32)> = Vec::new();
        for w in (0..=8000).step_by(397) {
            for h in (0..=8000).step_by(613) {
                sizes.push((w, h));
            }
        }
        sizes.sort_by_key(|&(w, h)| u64::from(w) * u64::from(h));

        let mut previous = Weight::MIN;
        for (w, h) in sizes {
            let weight = Weight::for_dimensions(w, h);
            assert!(weight >= Weight::MIN && weight <= Weight::MAX);
            assert!(weight >= previous, "{w}x{h} decreased the weight");
            previous = weight;
        }
    }

    #[test]
    fn estimate_reads_header_of_png() {
        let img = image::RgbImage::new(2400, 1200);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let weight = estimate_weight(Cursor::new(bytes)).unwrap();
        assert_eq!(weight.units(), 2);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = estimate_weight(Cursor::new(b"definitely not an image".to_vec())).unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }
}
