//! Last-resort passes for images the quality search could not fit.

use crate::budget::SizeBudget;
use crate::constants::{DOWNSCALED_QUALITY, RECOMPRESS_QUALITY};
use crate::encoders::{JpegQualityEncoder, QualityEncoder};
use crate::error::{CompressionError, Result};
use crate::formats::SourceFormat;
use crate::policy::{Compressed, Stage};
use image::{DynamicImage, GenericImageView, ImageBuffer, Pixel};

/// Halve both dimensions by point sampling: output (x, y) is source (2x, 2y).
///
/// No filtering is applied and the color type is kept. Images that would end
/// up with a zero width or height are rejected rather than encoded.
pub fn downscale(image: &DynamicImage) -> Result<DynamicImage> {
    let (width, height) = image.dimensions();
    if width / 2 == 0 || height / 2 == 0 {
        return Err(CompressionError::DegenerateImage(width, height));
    }

    let halved = match image {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(halve(buf)),
        DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(halve(buf)),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(halve(buf)),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(halve(buf)),
        DynamicImage::ImageLuma16(buf) => DynamicImage::ImageLuma16(halve(buf)),
        DynamicImage::ImageLumaA16(buf) => DynamicImage::ImageLumaA16(halve(buf)),
        DynamicImage::ImageRgb16(buf) => DynamicImage::ImageRgb16(halve(buf)),
        DynamicImage::ImageRgba16(buf) => DynamicImage::ImageRgba16(halve(buf)),
        DynamicImage::ImageRgb32F(buf) => DynamicImage::ImageRgb32F(halve(buf)),
        DynamicImage::ImageRgba32F(buf) => DynamicImage::ImageRgba32F(halve(buf)),
        other => DynamicImage::ImageRgba8(halve(&other.to_rgba8())),
    };

    Ok(halved)
}

fn halve<I>(image: &I) -> ImageBuffer<I::Pixel, Vec<<I::Pixel as Pixel>::Subpixel>>
where
    I: GenericImageView,
{
    let (width, height) = image.dimensions();
    ImageBuffer::from_fn(width / 2, height / 2, |x, y| image.get_pixel(x * 2, y * 2))
}

/// Runs once per file when the format policy's result is still over budget:
/// a fixed very-low-quality encode, then a single halving and one final
/// encode. The final buffer is returned without checking it against the
/// budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownscaleFallback<E = JpegQualityEncoder> {
    encoder: E,
}

impl<E: QualityEncoder> DownscaleFallback<E> {
    pub fn new(encoder: E) -> Self {
        Self { encoder }
    }

    pub fn recompress(
        &self,
        image: &DynamicImage,
        source: &SourceFormat,
        budget: SizeBudget,
    ) -> Result<Compressed> {
        let format = self.encoder.format();
        let format_changed = source.changes_to(format);

        let bytes = self.encoder.encode(image, RECOMPRESS_QUALITY)?;
        if budget.fits(bytes.len()) {
            return Ok(Compressed {
                bytes,
                format,
                format_changed,
                stage: Stage::Recompressed {
                    quality: RECOMPRESS_QUALITY,
                },
            });
        }

        crate::verbose!(
            "quality {} still {} bytes, halving dimensions",
            RECOMPRESS_QUALITY,
            bytes.len()
        );
        // Release the rejected attempt before allocating the next one
        drop(bytes);

        let scaled = downscale(image)?;
        let bytes = self.encoder.encode(&scaled, DOWNSCALED_QUALITY)?;
        Ok(Compressed {
            bytes,
            format,
            format_changed,
            stage: Stage::Downscaled {
                width: scaled.width(),
                height: scaled.height(),
                quality: DOWNSCALED_QUALITY,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::OutputFormat;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    /// Output size proportional to pixel count, independent of quality.
    struct AreaEncoder {
        bytes_per_pixel: usize,
    }

    impl QualityEncoder for AreaEncoder {
        fn format(&self) -> OutputFormat {
            OutputFormat::Jpeg
        }

        fn encode(&self, image: &DynamicImage, _quality: u8) -> Result<Vec<u8>> {
            let (w, h) = image.dimensions();
            Ok(vec![0; w as usize * h as usize * self.bytes_per_pixel])
        }
    }

    #[test]
    fn test_downscale_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(101, 51));
        let halved = downscale(&img).unwrap();
        assert_eq!(halved.dimensions(), (50, 25));
    }

    #[test]
    fn test_downscale_point_samples_even_pixels() {
        let img = RgbImage::from_fn(4, 4, |x, y| Rgb([x as u8, y as u8, 0]));
        let halved = downscale(&DynamicImage::ImageRgb8(img)).unwrap().to_rgb8();

        assert_eq!(halved.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(halved.get_pixel(1, 0), &Rgb([2, 0, 0]));
        assert_eq!(halved.get_pixel(0, 1), &Rgb([0, 2, 0]));
        assert_eq!(halved.get_pixel(1, 1), &Rgb([2, 2, 0]));
    }

    #[test]
    fn test_downscale_keeps_color_type() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(6, 6, Luma([7])));
        let halved = downscale(&gray).unwrap();
        assert_eq!(halved.color(), image::ColorType::L8);

        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 6, Rgba([1, 2, 3, 4])));
        let halved = downscale(&rgba).unwrap();
        assert_eq!(halved.color(), image::ColorType::Rgba8);
        assert_eq!(halved.to_rgba8().get_pixel(2, 2), &Rgba([1, 2, 3, 4]));
    }

    #[test]
    fn test_downscale_rejects_degenerate() {
        for (w, h) in [(1, 1), (1, 100), (100, 1), (0, 0)] {
            let img = DynamicImage::ImageRgb8(RgbImage::new(w, h));
            assert!(matches!(
                downscale(&img),
                Err(CompressionError::DegenerateImage(_, _))
            ));
        }
    }

    #[test]
    fn test_recompress_accepts_low_quality_pass() {
        let fallback = DownscaleFallback::new(AreaEncoder { bytes_per_pixel: 1 });
        let img = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let budget = SizeBudget::new(100).unwrap();

        let compressed = fallback.recompress(&img, &SourceFormat::Jpeg, budget).unwrap();
        assert_eq!(compressed.stage, Stage::Recompressed { quality: 5 });
        assert!(!compressed.format_changed);
    }

    #[test]
    fn test_recompress_downscales_once() {
        let fallback = DownscaleFallback::new(AreaEncoder { bytes_per_pixel: 1 });
        let img = DynamicImage::ImageRgb8(RgbImage::new(20, 20));
        let budget = SizeBudget::new(100).unwrap();

        let compressed = fallback.recompress(&img, &SourceFormat::Png, budget).unwrap();
        assert_eq!(
            compressed.stage,
            Stage::Downscaled {
                width: 10,
                height: 10,
                quality: 10
            }
        );
        assert_eq!(compressed.len(), 100);
        assert!(compressed.format_changed);
    }

    #[test]
    fn test_recompress_returns_oversized_final_attempt() {
        let fallback = DownscaleFallback::new(AreaEncoder { bytes_per_pixel: 4 });
        let img = DynamicImage::ImageRgb8(RgbImage::new(20, 20));
        let budget = SizeBudget::new(100).unwrap();

        let compressed = fallback.recompress(&img, &SourceFormat::Jpeg, budget).unwrap();
        assert_eq!(compressed.len(), 400);
    }

    #[test]
    fn test_recompress_degenerate_image_fails() {
        let fallback = DownscaleFallback::new(AreaEncoder { bytes_per_pixel: 1000 });
        let img = DynamicImage::ImageRgb8(RgbImage::new(1, 1));
        let budget = SizeBudget::new(100).unwrap();

        assert!(matches!(
            fallback.recompress(&img, &SourceFormat::Jpeg, budget),
            Err(CompressionError::DegenerateImage(1, 1))
        ));
    }
}
