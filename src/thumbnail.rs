//! Square thumbnail generation.
//!
//! The largest centred square is cut out of the source and resampled to
//! [`THUMBNAIL_SIZE`]² with a triangle (bilinear) filter. The output is
//! always exactly that size whatever the source aspect ratio, and is sent
//! as baseline JPEG.

use std::io::{BufRead, Cursor, Seek};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, RgbImage};

use crate::error::PipelineResult;

/// Edge length of every thumbnail, in pixels.
pub const THUMBNAIL_SIZE: u32 = 384;

/// JPEG quality for encoded thumbnails.
pub const JPEG_QUALITY: u8 = 75;

/// A square region of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub side: u32,
}

impl CropBox {
    /// Largest square centred in a `width` × `height` image.
    pub fn centered(width: u32, height: u32) -> Self {
        let side = width.min(height);
        CropBox {
            x: (width - side) / 2,
            y: (height - side) / 2,
            side,
        }
    }
}

/// Crop `source` to its centred square and resample it.
pub fn generate(source: &DynamicImage) -> RgbImage {
    let crop = CropBox::centered(source.width(), source.height());
    if crop.side == 0 {
        return RgbImage::new(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
    }

    let square = source.crop_imm(crop.x, crop.y, crop.side, crop.side);
    imageops::resize(
        &square.to_rgb8(),
        THUMBNAIL_SIZE,
        THUMBNAIL_SIZE,
        FilterType::Triangle,
    )
}

/// Decode the full image behind `reader` and generate its thumbnail.
///
/// This is the expensive step that admission accounting brackets.
pub fn decode_and_generate<R: BufRead + Seek>(reader: R) -> PipelineResult<RgbImage> {
    let source = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .decode()?;
    Ok(generate(&source))
}

/// Encode a thumbnail as JPEG.
pub fn encode_jpeg(thumbnail: &RgbImage) -> PipelineResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::with_capacity(32 * 1024));
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(thumbnail)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use image::{GenericImageView, ImageFormat, Rgb};

    #[test]
    fn crop_is_centered_on_the_long_axis() {
        assert_eq!(
            CropBox::centered(800, 600),
            CropBox {
                x: 100,
                y: 0,
                side: 600
            }
        );
        assert_eq!(
            CropBox::centered(600, 800),
            CropBox {
                x: 0,
                y: 100,
                side: 600
            }
        );
        assert_eq!(
            CropBox::centered(501, 500),
            CropBox {
                x: 0,
                y: 0,
                side: 500
            }
        );
        assert_eq!(
            CropBox::centered(384, 384),
            CropBox {
                x: 0,
                y: 0,
                side: 384
            }
        );
    }

    #[test]
    fn output_is_always_square() {
        for (w, h) in [(800, 600), (600, 800), (10, 3000), (1, 1), (384, 384), (2000, 2000)] {
            let src = DynamicImage::ImageRgb8(RgbImage::new(w, h));
            let thumb = generate(&src);
            assert_eq!(thumb.dimensions(), (THUMBNAIL_SIZE, THUMBNAIL_SIZE), "{w}x{h}");
        }
    }

    #[test]
    fn crop_discards_the_side_bands() {
        // 800x600: red bands in the outer 100px columns, green in the middle.
        let src = RgbImage::from_fn(800, 600, |x, _| {
            if (100..700).contains(&x) {
                Rgb([0, 255, 0])
            } else {
                Rgb([255, 0, 0])
            }
        });
        let thumb = generate(&DynamicImage::ImageRgb8(src));

        for x in [0, THUMBNAIL_SIZE / 2, THUMBNAIL_SIZE - 1] {
            let Rgb([r, g, _]) = *thumb.get_pixel(x, THUMBNAIL_SIZE / 2);
            assert!(g > 200 && r < 50, "pixel {x} bled from the cropped band");
        }
    }

    #[test]
    fn jpeg_round_trips_dimensions() {
        let thumb = generate(&DynamicImage::ImageRgb8(RgbImage::new(50, 40)));
        let jpeg = encode_jpeg(&thumb).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));
    }

    #[test]
    fn corrupt_input_is_a_decode_error() {
        let err = decode_and_generate(Cursor::new(b"\x89PNG\r\n\x1a\nbroken".to_vec())).unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }
}
