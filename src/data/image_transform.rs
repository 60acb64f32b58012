// ============================================================
// Layer 4 — Image Transform and Shape Source
// ============================================================
// Deterministic per-image preprocessing for the shape classifier:
//
//   1. Convert to 8-bit grayscale
//   2. Resize to size × size (triangle filter, aspect not kept)
//   3. Scale to [0, 1] floats, row-major [1, H, W]
//
// Steps 1 and 2 are idempotent: an image that is already a
// size × size grayscale image comes back unchanged, because
// resize is skipped when the dimensions already match.

use anyhow::Result;
use image::{imageops::FilterType, DynamicImage, GrayImage};
use std::path::{Path, PathBuf};

use crate::data::error::{DatasetError, DatasetResult};
use crate::data::manifest::read_manifest;
use crate::domain::sample::ImageSample;
use crate::domain::traits::SampleSource;

#[derive(Debug, Clone, Copy)]
pub struct ImageTransform {
    size: u32,
}

impl ImageTransform {
    /// Fails if `size` is zero.
    pub fn new(size: u32) -> DatasetResult<Self> {
        if size == 0 {
            return Err(DatasetError::Other("image size must be positive".to_string()));
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Grayscale + resize.
    pub fn apply(&self, img: &DynamicImage) -> GrayImage {
        let gray = img.to_luma8();
        if gray.dimensions() == (self.size, self.size) {
            return gray;
        }
        image::imageops::resize(&gray, self.size, self.size, FilterType::Triangle)
    }

    /// Pixel bytes → [0, 1] floats.
    pub fn to_pixels(&self, gray: &GrayImage) -> Vec<f32> {
        gray.as_raw().iter().map(|&p| p as f32 / 255.0).collect()
    }

    /// Open, transform and convert one image file.
    pub fn load(&self, path: &Path) -> DatasetResult<Vec<f32>> {
        let img = image::open(path).map_err(|source| DatasetError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.to_pixels(&self.apply(&img)))
    }
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self::new(54).expect("54 is a positive image size")
    }
}

// ─── ShapeSource ─────────────────────────────────────────────────────────────
/// Loads every image listed in a CSV manifest.
pub struct ShapeSource {
    manifest:  PathBuf,
    transform: ImageTransform,
}

impl ShapeSource {
    pub fn new(manifest: impl Into<PathBuf>, transform: ImageTransform) -> Self {
        Self { manifest: manifest.into(), transform }
    }
}

impl SampleSource<ImageSample> for ShapeSource {
    fn load_all(&self) -> Result<Vec<ImageSample>> {
        let entries = read_manifest(&self.manifest)?;
        let side    = self.transform.size() as usize;

        let mut samples = Vec::with_capacity(entries.len());
        for entry in entries {
            // No partial-failure handling: one bad file aborts the run
            let pixels = self.transform.load(&entry.image_path)?;
            tracing::debug!("Loaded {} ({})", entry.image_path.display(), entry.label.name());
            samples.push(ImageSample {
                pixels,
                height: side,
                width:  side,
                label:  entry.label,
            });
        }

        tracing::info!(
            "Loaded {} images from '{}'",
            samples.len(),
            self.manifest.display()
        );
        Ok(samples)
    }
}
