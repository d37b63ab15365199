//! Image discovery and decoding

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};

use crate::error::DecodeFailure;

/// File extensions considered by the batch runner (compared case-insensitively)
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Whether a path has one of the supported image extensions
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Identifier of an image inside a batch: its file name
pub fn image_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// List candidate image files of a directory
///
/// Entries keep the order reported by the filesystem. Sub-directories and
/// files with other extensions are skipped without notice; entries that cannot
/// be read are skipped with a warning.
///
/// # Errors
///
/// Returns the I/O error if the directory itself cannot be read.
pub fn list_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)?.map(|entry| entry.map(|e| e.path()));
    let images = select_images(entries);
    log::debug!("Found {} candidate images in {}", images.len(), dir.display());
    Ok(images)
}

/// Keep the readable entries that are supported image files
fn select_images<I>(entries: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = std::io::Result<PathBuf>>,
{
    let mut images = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        if !is_supported_image(&path) {
            continue;
        }
        // Follows symlinks; a broken link is treated like a non-file.
        if !path.is_file() {
            continue;
        }
        images.push(path);
    }
    images
}

/// Decode an image file into a raster
///
/// The format is sniffed from the file contents, so a mislabelled extension
/// still decodes.
///
/// # Arguments
///
/// * `path` - Path to the image file
///
/// # Returns
///
/// The decoded image, or a [`DecodeFailure`] naming the file
pub fn decode_image(path: &Path) -> Result<DynamicImage, DecodeFailure> {
    log::debug!("Decoding image: {}", path.display());
    let failure = |message: String| DecodeFailure {
        image: image_id(path),
        message,
    };

    ImageReader::open(path)
        .map_err(|e| failure(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| failure(e.to_string()))?
        .decode()
        .map_err(|e| failure(e.to_string()))
}
