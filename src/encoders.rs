//! Encoders used while fitting an image under its budget.
//!
//! JPEG is the lossy fallback and the only encoder with a quality knob, so it
//! sits behind [`QualityEncoder`] for the size search. PNG and GIF are native
//! one-shot encoders.

use crate::constants::{
    LIBDEFLATER_HIGH_LEVEL, MAX_QUALITY, MIN_QUALITY, OXIPNG_PRESET, ZOPFLI_ITERATIONS,
};
use crate::error::{CompressionError, Result};
use crate::formats::OutputFormat;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder};
use oxipng::{Deflaters, Options};
use std::num::NonZeroU8;

/// An encoder whose output size is controlled by a quality parameter.
pub trait QualityEncoder {
    fn format(&self) -> OutputFormat;

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JpegQualityEncoder;

impl QualityEncoder for JpegQualityEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        encode_jpeg(image, quality)
    }
}

/// PNG encoding effort
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PngSettings {
    /// Use Zopfli instead of libdeflate: smaller files, much slower.
    pub zopfli: bool,
}

fn ensure_dimensions(image: &DynamicImage, format: OutputFormat) -> Result<(u32, u32)> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(CompressionError::Encode(
            format,
            format!("invalid dimensions {}x{}", width, height),
        ));
    }
    Ok((width, height))
}

/// Encode as baseline JPEG. Alpha is dropped; grayscale stays single-channel.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let (width, height) = ensure_dimensions(image, OutputFormat::Jpeg)?;
    let quality = quality.clamp(MIN_QUALITY, MAX_QUALITY);

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    let result = if image.color().has_color() {
        let rgb = image.to_rgb8();
        encoder.write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
    } else {
        let luma = image.to_luma8();
        encoder.write_image(luma.as_raw(), width, height, ExtendedColorType::L8)
    };
    result.map_err(|e| CompressionError::Encode(OutputFormat::Jpeg, e.to_string()))?;

    Ok(buffer)
}

/// Encode as PNG at best compression, then run it through oxipng.
///
/// Both passes are deterministic, so the same image always produces the same
/// bytes.
pub fn encode_png(image: &DynamicImage, settings: PngSettings) -> Result<Vec<u8>> {
    ensure_dimensions(image, OutputFormat::Png)?;

    let mut raw = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut raw, CompressionType::Best, FilterType::Adaptive);
    image
        .write_with_encoder(encoder)
        .map_err(|e| CompressionError::Encode(OutputFormat::Png, e.to_string()))?;

    let mut options = Options::from_preset(OXIPNG_PRESET);
    options.deflate = if settings.zopfli {
        Deflaters::Zopfli {
            iterations: NonZeroU8::new(ZOPFLI_ITERATIONS).unwrap_or(NonZeroU8::MIN),
        }
    } else {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_HIGH_LEVEL,
        }
    };

    oxipng::optimize_from_memory(&raw, &options)
        .map_err(|e| CompressionError::Encode(OutputFormat::Png, e.to_string()))
}

/// Re-encode as a single-frame GIF with the encoder's default quantizer.
pub fn encode_gif(image: &DynamicImage) -> Result<Vec<u8>> {
    let (width, height) = ensure_dimensions(image, OutputFormat::Gif)?;
    let rgba = image.to_rgba8();

    let mut buffer = Vec::new();
    {
        // The trailer is written when the encoder is dropped.
        let mut encoder = GifEncoder::new(&mut buffer);
        encoder
            .encode(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
            .map_err(|e| CompressionError::Encode(OutputFormat::Gif, e.to_string()))?;
    }

    Ok(buffer)
}
