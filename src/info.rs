use crate::budget::SizeBudget;
use crate::error::Result;
use crate::formats::SourceFormat;
use crate::processing::{load_image_with_metadata, validate_file_exists};
use crate::utils::format_file_size;
use image::ColorType;
use std::fs;
use std::path::{Path, PathBuf};

/// What the compressor would see for one file
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    pub path: PathBuf,
    pub file_size: u64,
    pub fits_budget: bool,
    pub format: SourceFormat,
    /// Unknown for formats we cannot decode
    pub dimensions: Option<(u32, u32)>,
    pub color: Option<ColorType>,
}

pub fn analyze_image(input_path: &Path, budget: SizeBudget) -> Result<ImageReport> {
    validate_file_exists(input_path)?;
    let file_size = fs::metadata(input_path)?.len();
    let fits_budget = file_size <= budget.bytes();

    if SourceFormat::is_heif_path(input_path) {
        return Ok(ImageReport {
            path: input_path.to_path_buf(),
            file_size,
            fits_budget,
            format: SourceFormat::Heif,
            dimensions: None,
            color: None,
        });
    }

    let (img, format, _) = load_image_with_metadata(input_path)?;
    Ok(ImageReport {
        path: input_path.to_path_buf(),
        file_size,
        fits_budget,
        format,
        dimensions: Some((img.width(), img.height())),
        color: Some(img.color()),
    })
}

pub fn print_image_info(report: &ImageReport, budget: SizeBudget) {
    println!("📊 Analyzing image: {:?}", report.path);
    println!("📋 Basic Information:");
    println!("  🎭 Image format: {}", report.format);
    if let Some((width, height)) = report.dimensions {
        println!("  📏 Dimensions: {}x{} pixels", width, height);
        let megapixels = width as f64 * height as f64 / 1_000_000.0;
        println!("  🔢 Megapixels: {:.2} MP", megapixels);
    }
    if let Some(color) = report.color {
        println!("  🎨 Color type: {:?}", color);
    }
    println!(
        "  📦 File size: {} bytes ({})",
        report.file_size,
        format_file_size(report.file_size)
    );

    println!("\n💡 Budget: {}", budget);
    if report.format == SourceFormat::Heif {
        println!("  ❌ {}", report.format.strategy().describe());
        println!("{}", crate::constants::HEIF_GUIDANCE);
    } else if report.fits_budget {
        println!("  ✅ Already under budget: would be copied unchanged");
    } else {
        println!(
            "  🎯 Over budget by {}: {}",
            format_file_size(report.file_size - budget.bytes()),
            report.format.strategy().describe()
        );
    }
}
