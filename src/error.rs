use crate::formats::OutputFormat;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to encode {0}: {1}")]
    Encode(OutputFormat, String),

    #[error("{format} compression not supported without external tools")]
    UnsupportedFormat {
        format: String,
        guidance: &'static str,
    },

    #[error("Image too small to downscale: {0}x{1}")]
    DegenerateImage(u32, u32),

    #[error("Could not compress below budget: {0} bytes > {1} bytes")]
    BudgetExceeded(usize, u64),

    #[error("Invalid size budget: {0} bytes. Must be greater than zero")]
    InvalidBudget(u64),

    #[error("Invalid quality bounds: {0}..={1}. Must satisfy 1 <= floor <= ceiling <= 100")]
    InvalidQuality(u8, u8),

    #[error("Invalid image dimensions: {0}x{1}. Maximum allowed: {2}x{2}")]
    InvalidDimensions(u32, u32, u32),

    #[error("File too large: {0} bytes. Maximum allowed: {1} bytes")]
    FileTooLarge(u64, u64),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to create output directory: {0}")]
    DirectoryCreationFailed(PathBuf),

    #[error("Output directory {0} is the input directory; outputs would overwrite originals")]
    OutputOverwritesInput(PathBuf),

    #[error("Output {0} was already written by another file in this run")]
    OutputCollision(PathBuf),

    #[error("No image files found in input path: {0}")]
    NoImageFilesFound(String),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),
}

impl CompressionError {
    /// Text the caller should show the user alongside the error, if any.
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            CompressionError::UnsupportedFormat { guidance, .. } => Some(guidance),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompressionError>;
