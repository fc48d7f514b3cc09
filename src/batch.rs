use crate::error::{CompressionError, Result};
use crate::pipeline::PipelineSettings;
use crate::processing::{default_output_dir, process_file_tracked, FileOutcome};
use crate::utils::{create_progress_bar, format_file_size, format_megabytes, is_image_file};
use glob::glob;
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory, single file or glob pattern
    pub input: String,
    /// Defaults to `compressed/` inside the input directory
    pub output: Option<PathBuf>,
    pub recursive: bool,
    pub settings: PipelineSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub compressed: usize,
    pub copied: usize,
    pub failed: usize,
    pub total_before: u64,
    pub total_after: u64,
    pub elapsed: Duration,
    pub output_dir: PathBuf,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.compressed + self.copied
    }
}

/// Compress every image found under `options.input`, one file at a time.
///
/// A file that fails is reported and skipped; only setup problems (bad
/// input, unwritable output directory) abort the run.
pub fn batch_compress_images(options: &BatchOptions) -> Result<BatchSummary> {
    let start_time = Instant::now();
    let budget = options.settings.budget;

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| default_output_dir(Path::new(&options.input)));
    fs::create_dir_all(&output)
        .map_err(|_| CompressionError::DirectoryCreationFailed(output.clone()))?;
    let output = output
        .canonicalize()
        .map_err(|_| CompressionError::DirectoryCreationFailed(output.clone()))?;

    crate::info!("🚀 Image Compressor - Starting...");
    crate::info!("🎯 Target size: {}", budget);
    crate::info!("📁 Input: {}", options.input);
    crate::info!("📁 Output: {:?}", output);

    let image_files = collect_image_files(&options.input, options.recursive, &output)?;
    let mut summary = BatchSummary {
        output_dir: output.clone(),
        ..Default::default()
    };

    if image_files.is_empty() {
        crate::warn!("No image files found in the input path");
        summary.elapsed = start_time.elapsed();
        return Ok(summary);
    }

    crate::info!("📊 Found {} image files to process\n", image_files.len());

    let mut written = HashSet::new();
    let progress = create_progress_bar(image_files.len() as u64);
    for input_path in &image_files {
        let name = input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        progress.set_message(name.clone());

        let size = fs::metadata(input_path).map(|m| m.len()).unwrap_or(0);
        let result = process_file_tracked(input_path, &output, &options.settings, &mut written);
        report_file(&progress, &name, size, &result);

        match result {
            Ok(FileOutcome::Copied { size, .. }) => {
                summary.copied += 1;
                summary.total_before += size;
                summary.total_after += size;
            }
            Ok(FileOutcome::Compressed {
                original_size,
                compressed_size,
                ..
            }) => {
                summary.compressed += 1;
                summary.total_before += original_size;
                summary.total_after += compressed_size;
            }
            Err(_) => summary.failed += 1,
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    summary.elapsed = start_time.elapsed();
    print_summary(&summary);

    Ok(summary)
}

fn report_file(
    progress: &ProgressBar,
    name: &str,
    size: u64,
    result: &Result<FileOutcome>,
) {
    progress.suspend(|| match result {
        Ok(FileOutcome::Copied { .. }) => {
            crate::info!(
                "Processing {} ({})... COPIED (already under target)",
                name,
                format_megabytes(size)
            );
        }
        Ok(FileOutcome::Compressed {
            compressed_size,
            format,
            format_changed,
            stage,
            ..
        }) => {
            let conversion = if *format_changed {
                format!("(converting to {}) ", format)
            } else {
                String::new()
            };
            crate::info!(
                "Processing {} ({})... {}DONE ({})",
                name,
                format_megabytes(size),
                conversion,
                format_megabytes(*compressed_size)
            );
            crate::verbose!("{} accepted at {:?}", name, stage);
        }
        Err(e) => {
            crate::error!(
                "Processing {} ({})... FAILED: {}",
                name,
                format_megabytes(size),
                e
            );
            if let Some(guidance) = e.guidance() {
                eprintln!("{}", guidance);
            }
        }
    });
}

fn print_summary(summary: &BatchSummary) {
    crate::info!(
        "\n✅ Completed! Compressed {} images, copied {} images.",
        summary.compressed,
        summary.copied
    );
    if summary.failed > 0 {
        crate::info!("  ⚠️  Failed files: {}", summary.failed);
    }
    crate::info!(
        "  📊 Total size: {} -> {}",
        format_file_size(summary.total_before),
        format_file_size(summary.total_after)
    );
    crate::info!("  ⏱️  Total time: {:?}", summary.elapsed);
    crate::info!("📁 All output saved to: {:?}", summary.output_dir);
}

/// Find candidate images under `input`, sorted by path.
///
/// `input` may be a single file, a directory (walked one level deep unless
/// `recursive`) or a glob pattern. Hidden entries and `exclude` (the output
/// directory) are never returned.
pub fn collect_image_files(input: &str, recursive: bool, exclude: &Path) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    let input_path = Path::new(input);
    let canonical_input = if input_path.exists() {
        input_path
            .canonicalize()
            .map_err(|_| CompressionError::NoImageFilesFound(input.to_string()))?
    } else {
        input_path.to_path_buf()
    };
    let exclude = exclude
        .canonicalize()
        .unwrap_or_else(|_| exclude.to_path_buf());

    if canonical_input.is_file() {
        if is_image_file(&canonical_input) {
            image_files.push(canonical_input);
        }
    } else if canonical_input.is_dir() {
        let walker = if recursive {
            WalkDir::new(&canonical_input)
        } else {
            WalkDir::new(&canonical_input).max_depth(1)
        };

        let entries = walker.sort_by_file_name().into_iter().filter_entry(|e| {
            e.depth() == 0
                || (!e.file_name().to_string_lossy().starts_with('.')
                    && e.path() != exclude.as_path())
        });
        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            if entry.file_type().is_file() && is_image_file(path) {
                image_files.push(path.to_path_buf());
            }
        }
    } else if let Ok(glob_pattern) = glob(input) {
        for entry in glob_pattern.flatten() {
            if !entry.is_file() || !is_image_file(&entry) {
                continue;
            }
            if let Ok(canonical_path) = entry.canonicalize() {
                if !canonical_path.starts_with(&exclude) {
                    image_files.push(canonical_path);
                }
            }
        }
        image_files.sort();
    } else {
        return Err(CompressionError::NoImageFilesFound(input.to_string()));
    }

    Ok(image_files)
}
