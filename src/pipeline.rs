use crate::budget::SizeBudget;
use crate::encoders::{JpegQualityEncoder, PngSettings};
use crate::error::{CompressionError, Result};
use crate::fallback::DownscaleFallback;
use crate::formats::SourceFormat;
use crate::policy::{Compressed, FormatPolicy};
use image::DynamicImage;

/// Runtime configuration for fitting one image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSettings {
    pub budget: SizeBudget,
    pub png: PngSettings,
}

impl PipelineSettings {
    pub fn new(budget: SizeBudget, png: PngSettings) -> Self {
        Self { budget, png }
    }
}

/// Encode `image` so it fits `settings.budget`.
///
/// Runs the format policy first. When that result is still too large, the
/// downscale fallback gets exactly one go; if even that misses the budget the
/// image fails with [`CompressionError::BudgetExceeded`]. No I/O happens here.
pub fn fit_to_budget(
    image: &DynamicImage,
    source: &SourceFormat,
    settings: &PipelineSettings,
) -> Result<Compressed> {
    let budget = settings.budget;

    let compressed = FormatPolicy::new(budget, settings.png).compress(image, source)?;
    if budget.fits(compressed.len()) {
        return Ok(compressed);
    }

    crate::verbose!(
        "still {} bytes at {:?}, re-compressing",
        compressed.len(),
        compressed.stage
    );
    drop(compressed);

    let compressed = DownscaleFallback::new(JpegQualityEncoder).recompress(image, source, budget)?;
    if budget.fits(compressed.len()) {
        Ok(compressed)
    } else {
        Err(CompressionError::BudgetExceeded(
            compressed.len(),
            budget.bytes(),
        ))
    }
}
