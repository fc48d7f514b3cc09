/// Default output budget: 990 KB, leaving a safety margin under 1 MB.
pub const DEFAULT_BUDGET_BYTES: u64 = 990 * 1000;

pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

// Quality search bounds for the lossy encoder
pub const QUALITY_CEILING: u8 = 95;
pub const QUALITY_FLOOR: u8 = 10;

// Descent schedule: ratio = encoded size / budget
pub const LARGE_OVERSHOOT_RATIO: f64 = 2.0;
pub const MEDIUM_OVERSHOOT_RATIO: f64 = 1.5;
pub const LARGE_QUALITY_STEP: u8 = 20;
pub const MEDIUM_QUALITY_STEP: u8 = 10;
pub const SMALL_QUALITY_STEP: u8 = 5;

// Last-resort passes once the search bottoms out
pub const RECOMPRESS_QUALITY: u8 = 5;
pub const DOWNSCALED_QUALITY: u8 = 10;

pub const ZOPFLI_ITERATIONS: u8 = 15;
pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const OXIPNG_PRESET: u8 = 4;

/// Inputs larger than this are refused before decoding (100 MiB).
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 20_000;

pub const OUTPUT_DIR_NAME: &str = "compressed";

#[cfg(unix)]
pub const OUTPUT_FILE_MODE: u32 = 0o644;

pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "gif", "webp", "heic", "heif"];

pub const HEIF_EXTENSIONS: &[&str] = &["heic", "heif"];

pub const HEIF_GUIDANCE: &str = "HEIC format requires external tools for conversion.\n\
    To compress HEIC files, please convert them to JPEG first using:\n  \
    - macOS: Preview app or Photos app\n  \
    - Windows: HEIF Image Extensions from Microsoft Store\n  \
    - Command line: ImageMagick or libheif tools";

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}";
pub const PROGRESS_SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
