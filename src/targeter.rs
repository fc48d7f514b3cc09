use crate::budget::SizeBudget;
use crate::constants::{
    LARGE_OVERSHOOT_RATIO, LARGE_QUALITY_STEP, MAX_QUALITY, MEDIUM_OVERSHOOT_RATIO,
    MEDIUM_QUALITY_STEP, MIN_QUALITY, QUALITY_CEILING, QUALITY_FLOOR, SMALL_QUALITY_STEP,
};
use crate::encoders::QualityEncoder;
use crate::error::{CompressionError, Result};
use crate::formats::OutputFormat;
use image::DynamicImage;

/// Result of a quality search.
#[derive(Debug, Clone)]
pub struct Targeted {
    pub bytes: Vec<u8>,
    /// Quality that produced `bytes`
    pub quality: u8,
    /// Every quality tried, in order
    pub attempts: Vec<u8>,
}

/// Greedy quality descent toward a byte budget.
///
/// Starts at the ceiling and steps down by an amount proportional to how far
/// the last attempt overshot. The first attempt that fits is returned as-is.
/// If nothing above the floor fits, one final encode at the floor is returned
/// whatever its size; callers must check it against the budget.
#[derive(Debug, Clone)]
pub struct SizeTargeter<E> {
    encoder: E,
    ceiling: u8,
    floor: u8,
}

impl<E: QualityEncoder> SizeTargeter<E> {
    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            ceiling: QUALITY_CEILING,
            floor: QUALITY_FLOOR,
        }
    }

    pub fn with_bounds(encoder: E, ceiling: u8, floor: u8) -> Result<Self> {
        if floor < MIN_QUALITY || ceiling > MAX_QUALITY || floor > ceiling {
            return Err(CompressionError::InvalidQuality(floor, ceiling));
        }
        Ok(Self {
            encoder,
            ceiling,
            floor,
        })
    }

    pub fn format(&self) -> OutputFormat {
        self.encoder.format()
    }

    pub fn target(&self, image: &DynamicImage, budget: SizeBudget) -> Result<Targeted> {
        let mut quality = self.ceiling;
        let mut attempts = Vec::new();

        while quality > self.floor {
            attempts.push(quality);
            let bytes = self.encoder.encode(image, quality)?;
            crate::verbose!(
                "{} quality {}: {} bytes",
                self.encoder.format(),
                quality,
                bytes.len()
            );

            if budget.fits(bytes.len()) {
                return Ok(Targeted {
                    bytes,
                    quality,
                    attempts,
                });
            }

            quality = next_quality(quality, budget.ratio(bytes.len()), self.floor);
        }

        attempts.push(self.floor);
        let bytes = self.encoder.encode(image, self.floor)?;
        crate::verbose!(
            "{} floor quality {}: {} bytes",
            self.encoder.format(),
            self.floor,
            bytes.len()
        );

        Ok(Targeted {
            bytes,
            quality: self.floor,
            attempts,
        })
    }
}

/// How much to lower quality after an attempt that overshot by `ratio`.
pub fn quality_step(ratio: f64) -> u8 {
    if ratio > LARGE_OVERSHOOT_RATIO {
        LARGE_QUALITY_STEP
    } else if ratio > MEDIUM_OVERSHOOT_RATIO {
        MEDIUM_QUALITY_STEP
    } else {
        SMALL_QUALITY_STEP
    }
}

pub fn next_quality(quality: u8, ratio: f64, floor: u8) -> u8 {
    quality.saturating_sub(quality_step(ratio)).max(floor)
}
