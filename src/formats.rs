/// Source and output format handling
///
/// Maps what the decoder detected onto the encoding strategy used to fit the
/// image under its budget, and names the formats we can write back out.
use crate::constants::HEIF_EXTENSIONS;
use image::ImageFormat;
use std::fmt;
use std::path::Path;

/// Formats the compressor can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lossy fallback encoder, quality-parameterized
    Jpeg,
    /// Lossless, written at best compression effort
    Png,
    /// Palette format without a quality knob
    Gif,
}

impl OutputFormat {
    /// Returns the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::Gif => "GIF",
        };
        write!(f, "{}", name)
    }
}

/// Format of the file being compressed, as detected by the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
    /// HEIC/HEIF, which needs a decoder we do not ship
    Heif,
    /// Anything else the decoder understood (WebP, BMP, ...)
    Other(String),
}

/// How [`crate::policy::FormatPolicy`] treats a source format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Native encoder has a quality knob: search it directly
    QualitySearch,
    /// Try lossless native once, then fall back to the lossy search
    LosslessFirst,
    /// Re-encode natively once, then fall back to the lossy search
    SingleNativeAttempt,
    /// Needs an external decoder; always refused
    External,
    /// No native encoder here: go straight to the lossy search
    LossyFallback,
}

impl SourceFormat {
    pub fn from_image_format(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => SourceFormat::Jpeg,
            ImageFormat::Png => SourceFormat::Png,
            ImageFormat::Gif => SourceFormat::Gif,
            other => SourceFormat::Other(format!("{:?}", other).to_lowercase()),
        }
    }

    /// HEIC/HEIF files are recognised by extension so they are never handed
    /// to the decoder.
    pub fn is_heif_path(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| HEIF_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            SourceFormat::Jpeg => Strategy::QualitySearch,
            SourceFormat::Png => Strategy::LosslessFirst,
            SourceFormat::Gif => Strategy::SingleNativeAttempt,
            SourceFormat::Heif => Strategy::External,
            SourceFormat::Other(_) => Strategy::LossyFallback,
        }
    }

    /// The encoder matching this source, if we have one
    pub fn native(&self) -> Option<OutputFormat> {
        match self {
            SourceFormat::Jpeg => Some(OutputFormat::Jpeg),
            SourceFormat::Png => Some(OutputFormat::Png),
            SourceFormat::Gif => Some(OutputFormat::Gif),
            SourceFormat::Heif | SourceFormat::Other(_) => None,
        }
    }

    /// Whether writing `format` means the output needs a new extension
    pub fn changes_to(&self, format: OutputFormat) -> bool {
        self.native() != Some(format)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Jpeg => write!(f, "JPEG"),
            SourceFormat::Png => write!(f, "PNG"),
            SourceFormat::Gif => write!(f, "GIF"),
            SourceFormat::Heif => write!(f, "HEIC"),
            SourceFormat::Other(name) => write!(f, "{}", name.to_uppercase()),
        }
    }
}

impl Strategy {
    pub fn describe(&self) -> &'static str {
        match self {
            Strategy::QualitySearch => "quality search with the native JPEG encoder",
            Strategy::LosslessFirst => "best-compression PNG, JPEG fallback if too large",
            Strategy::SingleNativeAttempt => "single GIF re-encode, JPEG fallback if too large",
            Strategy::External => "not supported (requires external tools)",
            Strategy::LossyFallback => "converted to JPEG",
        }
    }
}
