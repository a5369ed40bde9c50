//! Visual diffs for mismatching artifacts.
//!
//! The comparator only knows the [`DiffGenerator`] interface. [`PixelDiff`]
//! is the stock implementation: absolute per-channel difference of two
//! equally sized raster images, written next to the fresh artifact.

use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader, Rgba, RgbaImage};
use regtest_kernel::checksum::index::DIFF_SUFFIX;

use crate::error::HarnessError;

/// Materializes a visual diff between a reference artifact and a fresh one.
pub trait DiffGenerator: Sync {
    /// Write a diff artifact and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Diff`] if either input cannot be decoded or
    /// the two are not comparable, [`HarnessError::Io`] on write failure.
    fn create_diff(&self, reference: &Path, fresh: &Path) -> Result<PathBuf, HarnessError>;
}

/// Where the diff of `fresh` is written: `<fresh>.diff.png`.
#[must_use]
pub fn diff_path_for(fresh: &Path) -> PathBuf {
    let mut name = fresh.as_os_str().to_os_string();
    name.push(DIFF_SUFFIX);
    PathBuf::from(name)
}

/// Pixel difference of two raster images.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelDiff;

impl DiffGenerator for PixelDiff {
    fn create_diff(&self, reference: &Path, fresh: &Path) -> Result<PathBuf, HarnessError> {
        let expected = decode(reference)?;
        let actual = decode(fresh)?;
        let diff = pixel_difference(&expected, &actual).ok_or_else(|| HarnessError::Diff {
            path: fresh.to_path_buf(),
            detail: format!(
                "size mismatch: reference {}x{}, result {}x{}",
                expected.width(),
                expected.height(),
                actual.width(),
                actual.height()
            ),
        })?;

        let out = diff_path_for(fresh);
        diff.save_with_format(&out, ImageFormat::Png)
            .map_err(|e| HarnessError::Diff {
                path: out.clone(),
                detail: e.to_string(),
            })?;
        Ok(out)
    }
}

/// Per-channel absolute difference; alpha is forced opaque so that
/// identical regions render black rather than transparent.
///
/// Returns `None` if the images differ in size.
#[must_use]
pub fn pixel_difference(expected: &RgbaImage, actual: &RgbaImage) -> Option<RgbaImage> {
    if expected.dimensions() != actual.dimensions() {
        return None;
    }
    let (width, height) = expected.dimensions();
    Some(RgbaImage::from_fn(width, height, |x, y| {
        let e = expected.get_pixel(x, y).0;
        let a = actual.get_pixel(x, y).0;
        Rgba([e[0].abs_diff(a[0]), e[1].abs_diff(a[1]), e[2].abs_diff(a[2]), 255])
    }))
}

fn decode(path: &Path) -> Result<RgbaImage, HarnessError> {
    let reader = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|e| HarnessError::io("open", path, e))?;
    let image = reader.decode().map_err(|e| HarnessError::Diff {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    Ok(image.to_rgba8())
}
