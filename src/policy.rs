use crate::budget::SizeBudget;
use crate::constants::HEIF_GUIDANCE;
use crate::encoders::{encode_gif, encode_png, JpegQualityEncoder, PngSettings};
use crate::error::{CompressionError, Result};
use crate::formats::{OutputFormat, SourceFormat, Strategy};
use crate::targeter::SizeTargeter;
use image::DynamicImage;

/// Which step of the pipeline produced an encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Native encoder, one attempt
    Native,
    /// Lossy quality search
    QualitySearch { quality: u8 },
    /// Fixed very-low-quality re-encode after the search bottomed out
    Recompressed { quality: u8 },
    /// Half-resolution re-encode, the last resort
    Downscaled { width: u32, height: u32, quality: u8 },
}

/// An encoded image plus what the caller needs to name and report it.
#[derive(Debug, Clone)]
pub struct Compressed {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    /// The output needs a different extension than the source file
    pub format_changed: bool,
    pub stage: Stage,
}

impl Compressed {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Picks the encoder for a source format and decides when the lossy
/// fallback takes over.
#[derive(Debug, Clone, Copy)]
pub struct FormatPolicy {
    budget: SizeBudget,
    png: PngSettings,
}

impl FormatPolicy {
    pub fn new(budget: SizeBudget, png: PngSettings) -> Self {
        Self { budget, png }
    }

    /// Encode `image` for `source`, aiming for the budget.
    ///
    /// The result may still be over budget when the lossy search bottoms out
    /// at its floor; [`crate::pipeline::fit_to_budget`] handles that case.
    pub fn compress(&self, image: &DynamicImage, source: &SourceFormat) -> Result<Compressed> {
        match source.strategy() {
            Strategy::External => Err(CompressionError::UnsupportedFormat {
                format: source.to_string(),
                guidance: HEIF_GUIDANCE,
            }),
            Strategy::QualitySearch | Strategy::LossyFallback => self.search(image, source),
            Strategy::LosslessFirst => {
                let bytes = encode_png(image, self.png)?;
                self.native_or_search(image, source, bytes, OutputFormat::Png)
            }
            Strategy::SingleNativeAttempt => {
                let bytes = encode_gif(image)?;
                self.native_or_search(image, source, bytes, OutputFormat::Gif)
            }
        }
    }

    fn native_or_search(
        &self,
        image: &DynamicImage,
        source: &SourceFormat,
        bytes: Vec<u8>,
        format: OutputFormat,
    ) -> Result<Compressed> {
        if self.budget.fits(bytes.len()) {
            return Ok(Compressed {
                bytes,
                format,
                format_changed: false,
                stage: Stage::Native,
            });
        }

        crate::verbose!(
            "{} re-encode is {} bytes, over budget; converting to JPEG",
            format,
            bytes.len()
        );
        self.search(image, source)
    }

    fn search(&self, image: &DynamicImage, source: &SourceFormat) -> Result<Compressed> {
        let targeter = SizeTargeter::new(JpegQualityEncoder);
        let targeted = targeter.target(image, self.budget)?;

        Ok(Compressed {
            bytes: targeted.bytes,
            format: targeter.format(),
            format_changed: source.changes_to(targeter.format()),
            stage: Stage::QualitySearch {
                quality: targeted.quality,
            },
        })
    }
}
