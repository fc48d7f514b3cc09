pub mod logger;

pub mod batch;
pub mod budget;
pub mod cli;
pub mod constants;
pub mod encoders;
pub mod error;
pub mod fallback;
pub mod formats;
pub mod info;
pub mod pipeline;
pub mod policy;
pub mod processing;
pub mod targeter;
pub mod utils;

pub use batch::{batch_compress_images, collect_image_files, BatchOptions, BatchSummary};
pub use budget::SizeBudget;
pub use encoders::{encode_gif, encode_jpeg, encode_png, JpegQualityEncoder, PngSettings, QualityEncoder};
pub use error::{CompressionError, Result};
pub use fallback::{downscale, DownscaleFallback};
pub use formats::{OutputFormat, SourceFormat, Strategy};
pub use info::{analyze_image, print_image_info, ImageReport};
pub use pipeline::{fit_to_budget, PipelineSettings};
pub use policy::{Compressed, FormatPolicy, Stage};
pub use processing::{
    compress_image, generate_output_path, load_image_with_metadata, process_file,
    process_file_tracked, validate_file_exists, write_output, FileOutcome,
};
pub use targeter::{SizeTargeter, Targeted};
