//! Article thumbnails.
//!
//! Pure Rust: decoding and resampling use the `image` crate (Lanczos3), so no
//! ImageMagick is needed for thumbnails even though LaTeX rasterizing still
//! shells out.
//!
//! A thumbnail fits inside a `size × size` box with the aspect ratio kept and
//! is always written as PNG next to its source:
//!
//! ```text
//! figures/box.jpg → figures/box.thumb.png
//! ```

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{ImageFormat, ImageReader};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to process {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Where the thumbnail for `source` is written.
pub fn thumbnail_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{}.thumb.png", stem))
}

/// Write a PNG thumbnail of `source` to `output`, fitting in `size × size`.
pub fn create_thumbnail(source: &Path, output: &Path, size: u32) -> Result<(), ImagingError> {
    let img = ImageReader::open(source)
        .map_err(|e| ImagingError::Io {
            path: source.to_path_buf(),
            source: e,
        })?
        .with_guessed_format()
        .map_err(|e| ImagingError::Io {
            path: source.to_path_buf(),
            source: e,
        })?
        .decode()
        .map_err(|e| ImagingError::Image {
            path: source.to_path_buf(),
            source: e,
        })?;

    let thumb = img.resize(size, size, FilterType::Lanczos3);
    thumb
        .save_with_format(output, ImageFormat::Png)
        .map_err(|e| ImagingError::Image {
            path: output.to_path_buf(),
            source: e,
        })?;
    tracing::debug!(source = %source.display(), output = %output.display(), size, "Thumbnail");
    Ok(())
}
