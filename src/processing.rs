use crate::constants::{HEIF_GUIDANCE, MAX_FILE_SIZE, MAX_IMAGE_DIMENSION, OUTPUT_DIR_NAME};
use crate::error::{CompressionError, Result};
use crate::formats::{OutputFormat, SourceFormat};
use crate::pipeline::{fit_to_budget, PipelineSettings};
use crate::policy::Stage;
use crate::utils::{calculate_compression_ratio, format_file_size};
use image::{DynamicImage, GenericImageView, ImageReader};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// What happened to one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Already within budget; copied byte-for-byte
    Copied { output: PathBuf, size: u64 },
    /// Re-encoded to fit the budget
    Compressed {
        output: PathBuf,
        original_size: u64,
        compressed_size: u64,
        format: OutputFormat,
        format_changed: bool,
        stage: Stage,
    },
}

impl FileOutcome {
    pub fn output(&self) -> &Path {
        match self {
            FileOutcome::Copied { output, .. } | FileOutcome::Compressed { output, .. } => output,
        }
    }
}

/// Validates that a file exists at the given path.
///
/// # Example
/// ```
/// use std::path::Path;
/// use img_budget::validate_file_exists;
///
/// let result = validate_file_exists(Path::new("nonexistent.jpg"));
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CompressionError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}

/// Loads and decodes an image, detecting its format from the content.
///
/// # Returns
/// * `Ok((image, format, file_size))`
/// * `Err(CompressionError)` - If loading fails or security limits are exceeded
///
/// # Security Features
/// - Validates file existence and canonical paths
/// - Enforces maximum file size limit before reading
/// - Validates image dimensions to prevent memory exhaustion
pub fn load_image_with_metadata(input_path: &Path) -> Result<(DynamicImage, SourceFormat, u64)> {
    validate_file_exists(input_path)?;

    if SourceFormat::is_heif_path(input_path) {
        return Err(unsupported_heif());
    }

    let canonical_path = input_path
        .canonicalize()
        .map_err(|_| CompressionError::FileNotFound(input_path.to_path_buf()))?;

    let file_size = fs::metadata(&canonical_path)?.len();
    if file_size > MAX_FILE_SIZE {
        return Err(CompressionError::FileTooLarge(file_size, MAX_FILE_SIZE));
    }

    let reader = ImageReader::open(&canonical_path)?.with_guessed_format()?;
    let format = reader.format();
    let img = reader.decode()?;

    let (width, height) = img.dimensions();
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(CompressionError::InvalidDimensions(
            width,
            height,
            MAX_IMAGE_DIMENSION,
        ));
    }

    let source = format
        .map(SourceFormat::from_image_format)
        .unwrap_or_else(|| SourceFormat::Other("unknown".to_string()));

    Ok((img, source, file_size))
}

fn unsupported_heif() -> CompressionError {
    CompressionError::UnsupportedFormat {
        format: SourceFormat::Heif.to_string(),
        guidance: HEIF_GUIDANCE,
    }
}

/// Where the output for `input_path` goes inside `output_dir`.
///
/// The original file name is kept unless `changed_to` is set, in which case
/// the extension is replaced with that format's.
pub fn generate_output_path(
    input_path: &Path,
    output_dir: &Path,
    changed_to: Option<OutputFormat>,
) -> Result<PathBuf> {
    let file_name = input_path
        .file_name()
        .ok_or_else(|| CompressionError::FileNotFound(input_path.to_path_buf()))?;

    let output = match changed_to {
        None => output_dir.join(file_name),
        Some(format) => {
            let stem = Path::new(file_name)
                .file_stem()
                .unwrap_or(file_name)
                .to_string_lossy();
            output_dir.join(format!("{}.{}", stem, format.extension()))
        }
    };

    Ok(output)
}

/// Default output directory for an input: `compressed/` next to it.
pub fn default_output_dir(input: &Path) -> PathBuf {
    if input.is_dir() {
        return input.join(OUTPUT_DIR_NAME);
    }
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(OUTPUT_DIR_NAME),
        _ => PathBuf::from(OUTPUT_DIR_NAME),
    }
}

/// Write `bytes` to `output` atomically with regular file permissions.
///
/// The data lands in a hidden temporary file in the same directory first, so
/// a failure never leaves a truncated image under the final name.
pub fn write_output(output: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|_| CompressionError::DirectoryCreationFailed(dir.clone()))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".img-budget-")
        .tempfile_in(&dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    set_output_permissions(temp.path())?;
    temp.persist(output).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(unix)]
fn set_output_permissions(path: &Path) -> Result<()> {
    use crate::constants::OUTPUT_FILE_MODE;
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(OUTPUT_FILE_MODE))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_output_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Compress one file into `output_dir`.
///
/// Files already within budget are copied verbatim. Anything else is decoded
/// and fitted with [`fit_to_budget`]. On failure nothing is left under the
/// file's output name.
pub fn process_file(
    input_path: &Path,
    output_dir: &Path,
    settings: &PipelineSettings,
) -> Result<FileOutcome> {
    process_file_tracked(input_path, output_dir, settings, &mut HashSet::new())
}

/// [`process_file`] for one file of a run that shares `output_dir`.
///
/// `written` holds the outputs earlier files of the run produced. Those are
/// never overwritten or removed: a file whose output lands on one fails with
/// [`CompressionError::OutputCollision`]. On success the new output is added.
pub fn process_file_tracked(
    input_path: &Path,
    output_dir: &Path,
    settings: &PipelineSettings,
    written: &mut HashSet<PathBuf>,
) -> Result<FileOutcome> {
    validate_file_exists(input_path)?;
    fs::create_dir_all(output_dir)
        .map_err(|_| CompressionError::DirectoryCreationFailed(output_dir.to_path_buf()))?;
    ensure_separate_output(input_path, output_dir)?;

    match fit_file(input_path, output_dir, settings, written) {
        Ok(outcome) => {
            written.insert(outcome.output().to_path_buf());
            Ok(outcome)
        }
        Err(e) => {
            remove_stale_output(input_path, output_dir, written);
            Err(e)
        }
    }
}

fn claim(output: PathBuf, written: &HashSet<PathBuf>) -> Result<PathBuf> {
    if written.contains(&output) {
        return Err(CompressionError::OutputCollision(output));
    }
    Ok(output)
}

fn fit_file(
    input_path: &Path,
    output_dir: &Path,
    settings: &PipelineSettings,
    written: &HashSet<PathBuf>,
) -> Result<FileOutcome> {
    if SourceFormat::is_heif_path(input_path) {
        return Err(unsupported_heif());
    }

    let original_size = fs::metadata(input_path)?.len();
    if original_size <= settings.budget.bytes() {
        let output = claim(generate_output_path(input_path, output_dir, None)?, written)?;
        let bytes = fs::read(input_path)?;
        write_output(&output, &bytes)?;
        return Ok(FileOutcome::Copied {
            output,
            size: original_size,
        });
    }

    let (img, source, original_size) = load_image_with_metadata(input_path)?;
    crate::verbose!(
        "{:?}: {} {}x{}, {} bytes",
        input_path,
        source,
        img.width(),
        img.height(),
        original_size
    );

    let compressed = fit_to_budget(&img, &source, settings)?;
    drop(img);

    let changed_to = compressed.format_changed.then_some(compressed.format);
    let output = claim(
        generate_output_path(input_path, output_dir, changed_to)?,
        written,
    )?;
    write_output(&output, &compressed.bytes)?;

    Ok(FileOutcome::Compressed {
        output,
        original_size,
        compressed_size: compressed.len() as u64,
        format: compressed.format,
        format_changed: compressed.format_changed,
        stage: compressed.stage,
    })
}

/// Refuse to write into the input's own directory, where outputs would
/// overwrite the originals.
fn ensure_separate_output(input_path: &Path, output_dir: &Path) -> Result<()> {
    let input_dir = input_path
        .canonicalize()?
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| CompressionError::FileNotFound(input_path.to_path_buf()))?;
    let output_dir = output_dir.canonicalize()?;

    if input_dir == output_dir {
        return Err(CompressionError::OutputOverwritesInput(output_dir));
    }
    Ok(())
}

/// Remove a previous run's output for `input_path`, leaving anything this run
/// wrote in place.
fn remove_stale_output(input_path: &Path, output_dir: &Path, written: &HashSet<PathBuf>) {
    if let Ok(stale) = generate_output_path(input_path, output_dir, None) {
        if stale.is_file() && !written.contains(&stale) {
            if let Err(e) = fs::remove_file(&stale) {
                crate::warn!("Failed to remove {:?}: {}", stale, e);
            }
        }
    }
}

/// Compress a single image, printing a short report.
pub fn compress_image(
    input: &Path,
    output_dir: Option<PathBuf>,
    settings: &PipelineSettings,
) -> Result<FileOutcome> {
    let output_dir = output_dir.unwrap_or_else(|| default_output_dir(input));

    crate::info!("🗜️  Compressing image: {:?}", input);
    crate::info!("📁 Output directory: {:?}", output_dir);
    crate::info!("🎯 Target size: {}", settings.budget);

    let spinner = crate::utils::create_progress_spinner("Fitting image to budget...");
    let result = process_file(input, &output_dir, settings);
    spinner.finish_and_clear();

    let outcome = result?;
    match &outcome {
        FileOutcome::Copied { output, size } => {
            crate::info!(
                "✅ Already under target ({}), copied to {:?}",
                format_file_size(*size),
                output
            );
        }
        FileOutcome::Compressed {
            output,
            original_size,
            compressed_size,
            format,
            format_changed,
            stage,
        } => {
            crate::info!("📊 Original size: {} bytes", original_size);
            crate::info!("📈 Compressed size: {} bytes", compressed_size);
            crate::info!(
                "🎯 Compression ratio: {:.1}%",
                calculate_compression_ratio(*original_size, *compressed_size)
            );
            if *format_changed {
                crate::info!("🔄 Converted to {}", format);
            }
            crate::verbose!("Accepted at {:?}", stage);
            crate::info!("✅ Saved to {:?}", output);
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::SizeBudget;
    use crate::encoders::PngSettings;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn settings(budget: u64) -> PipelineSettings {
        PipelineSettings::new(SizeBudget::new(budget).unwrap(), PngSettings::default())
    }

    #[test]
    fn test_generate_output_path_keeps_name() {
        let result =
            generate_output_path(Path::new("photos/Test.JPEG"), Path::new("/tmp/out"), None)
                .unwrap();
        assert_eq!(result, PathBuf::from("/tmp/out/Test.JPEG"));
    }

    #[test]
    fn test_generate_output_path_format_change() {
        let result = generate_output_path(
            Path::new("photos/shot.png"),
            Path::new("/tmp/out"),
            Some(OutputFormat::Jpeg),
        )
        .unwrap();
        assert_eq!(result, PathBuf::from("/tmp/out/shot.jpg"));

        let result = generate_output_path(
            Path::new("archive.tar.webp"),
            Path::new("/tmp/out"),
            Some(OutputFormat::Jpeg),
        )
        .unwrap();
        assert_eq!(result, PathBuf::from("/tmp/out/archive.tar.jpg"));
    }

    #[test]
    fn test_generate_output_path_without_file_name() {
        let result = generate_output_path(Path::new(".."), Path::new("/tmp/out"), None);
        assert!(matches!(result, Err(CompressionError::FileNotFound(_))));
    }

    #[test]
    fn test_default_output_dir() {
        assert_eq!(
            default_output_dir(Path::new("pics/a.jpg")),
            PathBuf::from("pics/compressed")
        );
        assert_eq!(
            default_output_dir(Path::new("a.jpg")),
            PathBuf::from("compressed")
        );
    }

    #[test]
    fn test_load_image_with_metadata_not_found() {
        let result = load_image_with_metadata(Path::new("nonexistent.jpg"));
        assert!(matches!(result, Err(CompressionError::FileNotFound(_))));
    }

    #[test]
    fn test_load_image_detects_content_format() {
        let temp_dir = TempDir::new().unwrap();
        // PNG data behind a .jpg name
        let path = temp_dir.path().join("mislabeled.jpg");
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])).save_with_format(&path, image::ImageFormat::Png).unwrap();

        let (img, source, size) = load_image_with_metadata(&path).unwrap();
        assert_eq!(source, SourceFormat::Png);
        assert_eq!(img.dimensions(), (4, 4));
        assert!(size > 0);
    }

    #[test]
    fn test_load_image_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fake.png");
        fs::write(&path, b"fake image data").unwrap();

        assert!(load_image_with_metadata(&path).is_err());
    }

    #[test]
    fn test_write_output_sets_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("nested").join("out.jpg");
        write_output(&output, b"bytes").unwrap();

        assert_eq!(fs::read(&output).unwrap(), b"bytes");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&output).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o644);
        }
        // No temp files left behind
        assert_eq!(fs::read_dir(output.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_process_file_copies_small_file() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("small.jpg");
        fs::write(&input, b"not even an image").unwrap();
        let output_dir = temp_dir.path().join("out");

        let outcome = process_file(&input, &output_dir, &settings(1000)).unwrap();
        assert_eq!(
            outcome,
            FileOutcome::Copied {
                output: output_dir.join("small.jpg"),
                size: 17
            }
        );
        assert_eq!(fs::read(output_dir.join("small.jpg")).unwrap(), b"not even an image");
    }

    #[test]
    fn test_process_file_heic_always_fails() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("phone.heic");
        fs::write(&input, b"tiny").unwrap();
        let output_dir = temp_dir.path().join("out");

        let err = process_file(&input, &output_dir, &settings(1_000_000)).unwrap_err();
        assert!(matches!(err, CompressionError::UnsupportedFormat { .. }));
        assert!(!output_dir.join("phone.heic").exists());
    }

    #[test]
    fn test_process_file_failure_removes_stale_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("broken.png");
        fs::write(&input, vec![0u8; 2000]).unwrap();
        let output_dir = temp_dir.path().join("out");
        fs::create_dir(&output_dir).unwrap();
        fs::write(output_dir.join("broken.png"), b"old run").unwrap();

        let err = process_file(&input, &output_dir, &settings(1000)).unwrap_err();
        assert!(matches!(err, CompressionError::Decode(_)));
        assert!(!output_dir.join("broken.png").exists());
    }

    #[test]
    fn test_failure_keeps_output_written_earlier_in_run() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("photo.jpg");
        fs::write(&input, vec![7u8; 2000]).unwrap();
        let output_dir = temp_dir.path().join("out");
        fs::create_dir(&output_dir).unwrap();
        let earlier = output_dir.join("photo.jpg");
        fs::write(&earlier, b"converted from photo.gif").unwrap();

        let mut written = HashSet::from([earlier.clone()]);
        let err = process_file_tracked(&input, &output_dir, &settings(1000), &mut written)
            .unwrap_err();

        assert!(matches!(err, CompressionError::Decode(_)));
        assert_eq!(fs::read(&earlier).unwrap(), b"converted from photo.gif");
    }

    #[test]
    fn test_success_on_claimed_output_is_a_collision() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("x.jpg");
        fs::write(&input, b"second x").unwrap();
        let output_dir = temp_dir.path().join("out");
        fs::create_dir(&output_dir).unwrap();
        let earlier = output_dir.join("x.jpg");
        fs::write(&earlier, b"first x").unwrap();

        let mut written = HashSet::from([earlier.clone()]);
        let err = process_file_tracked(&input, &output_dir, &settings(1000), &mut written)
            .unwrap_err();

        assert!(matches!(err, CompressionError::OutputCollision(ref p) if *p == earlier));
        assert_eq!(fs::read(&earlier).unwrap(), b"first x");
    }

    #[test]
    fn test_tracked_success_records_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("small.jpg");
        fs::write(&input, b"tiny").unwrap();
        let output_dir = temp_dir.path().join("out");

        let mut written = HashSet::new();
        let outcome =
            process_file_tracked(&input, &output_dir, &settings(1000), &mut written).unwrap();
        assert!(written.contains(outcome.output()));
    }

    #[test]
    fn test_process_file_refuses_input_directory_as_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("a.jpg");
        fs::write(&input, b"data").unwrap();

        let err = process_file(&input, temp_dir.path(), &settings(1000)).unwrap_err();
        assert!(matches!(err, CompressionError::OutputOverwritesInput(_)));
        assert_eq!(fs::read(&input).unwrap(), b"data");
    }
}
