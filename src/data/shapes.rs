// ============================================================
// Layer 4 — Synthetic Shape Generator
// ============================================================
// Draws a labelled dataset of white circles and squares on a
// black background and writes it as PNG files plus a CSV
// manifest that ShapeSource can read back.
//
// Guarantees:
//   - every image is exactly size × size pixels
//   - the first count/2 images are circles (label 0), the rest
//     squares (label 1); odd counts are rejected, so the two
//     classes are always exactly balanced
//   - every shape lies fully inside its image
//   - the same seed always draws the same dataset

use image::{GrayImage, Luma};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{fs, path::Path};

use crate::data::error::{DatasetError, DatasetResult};
use crate::data::manifest::write_manifest;
use crate::domain::sample::ShapeKind;

const FOREGROUND: Luma<u8> = Luma([255]);

/// Smallest image side the generator accepts.
pub const MIN_SIZE: u32 = 8;

pub struct ShapeGenerator {
    size: u32,
    seed: u64,
}

impl ShapeGenerator {
    /// Fails if `size` is below 8 pixels, too small to draw
    /// distinguishable shapes.
    pub fn new(size: u32, seed: u64) -> DatasetResult<Self> {
        if size < MIN_SIZE {
            return Err(DatasetError::Other(format!(
                "shape images need at least {MIN_SIZE}x{MIN_SIZE} pixels, got {size}"
            )));
        }
        Ok(Self { size, seed })
    }

    /// Draw `count` shapes in memory.
    pub fn render_set(&self, count: usize) -> DatasetResult<Vec<(ShapeKind, GrayImage)>> {
        if count % 2 != 0 {
            return Err(DatasetError::Other(format!(
                "shape count must be even so both classes are balanced, got {count}"
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let circles = count / 2;

        Ok((0..count)
            .map(|i| {
                let kind = if i < circles { ShapeKind::Circle } else { ShapeKind::Square };
                (kind, self.render(kind, &mut rng))
            })
            .collect())
    }

    /// Draw the dataset into `dir` and write `dir/dataset.csv`.
    /// Returns the manifest path.
    pub fn generate(&self, dir: &Path, count: usize) -> DatasetResult<std::path::PathBuf> {
        fs::create_dir_all(dir).map_err(|e| DatasetError::io(dir, e))?;

        let mut rows = Vec::with_capacity(count);
        for (i, (kind, img)) in self.render_set(count)?.into_iter().enumerate() {
            let name = format!("shape_{i:05}.png");
            let path = dir.join(&name);
            img.save(&path).map_err(|source| DatasetError::Image { path: path.clone(), source })?;
            rows.push((name, kind));
        }

        let manifest = dir.join("dataset.csv");
        write_manifest(&manifest, &rows)?;
        tracing::info!(
            "Generated {} shapes ({}x{}) in '{}'",
            count, self.size, self.size, dir.display()
        );
        Ok(manifest)
    }

    fn render(&self, kind: ShapeKind, rng: &mut StdRng) -> GrayImage {
        let size    = self.size as i64;
        let mut img = GrayImage::new(self.size, self.size);

        match kind {
            ShapeKind::Circle => {
                let radius = rng.gen_range(size / 8..=size / 3);
                let cx     = rng.gen_range(radius..size - radius);
                let cy     = rng.gen_range(radius..size - radius);
                for y in (cy - radius)..=(cy + radius) {
                    for x in (cx - radius)..=(cx + radius) {
                        let (dx, dy) = (x - cx, y - cy);
                        if dx * dx + dy * dy <= radius * radius && x < size && y < size {
                            img.put_pixel(x as u32, y as u32, FOREGROUND);
                        }
                    }
                }
            }
            ShapeKind::Square => {
                let side = rng.gen_range(size / 4..=size * 2 / 3);
                let left = rng.gen_range(0..=size - side);
                let top  = rng.gen_range(0..=size - side);
                for y in top..top + side {
                    for x in left..left + side {
                        img.put_pixel(x as u32, y as u32, FOREGROUND);
                    }
                }
            }
        }

        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::manifest::read_manifest;

    #[test]
    fn test_exactly_half_of_each_class() {
        let set     = ShapeGenerator::new(54, 7).unwrap().render_set(40).unwrap();
        let circles = set.iter().filter(|(k, _)| *k == ShapeKind::Circle).count();
        let squares = set.iter().filter(|(k, _)| *k == ShapeKind::Square).count();
        assert_eq!(circles, 20);
        assert_eq!(squares, 20);
    }

    #[test]
    fn test_images_have_declared_dimensions() {
        for (_, img) in ShapeGenerator::new(31, 1).unwrap().render_set(10).unwrap() {
            assert_eq!(img.dimensions(), (31, 31));
        }
    }

    #[test]
    fn test_every_image_has_a_shape() {
        for (_, img) in ShapeGenerator::new(16, 3).unwrap().render_set(20).unwrap() {
            assert!(img.pixels().any(|p| p.0[0] == 255));
        }
    }

    #[test]
    fn test_same_seed_same_dataset() {
        let a = ShapeGenerator::new(20, 99).unwrap().render_set(6).unwrap();
        let b = ShapeGenerator::new(20, 99).unwrap().render_set(6).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tiny_images_are_rejected() {
        assert!(ShapeGenerator::new(MIN_SIZE - 1, 0).is_err());
        assert!(ShapeGenerator::new(MIN_SIZE, 0).is_ok());
    }

    #[test]
    fn test_odd_count_is_rejected() {
        assert!(ShapeGenerator::new(20, 0).unwrap().render_set(5).is_err());
    }

    #[test]
    fn test_generate_writes_manifest() {
        let dir      = tempfile::tempdir().unwrap();
        let manifest = ShapeGenerator::new(12, 5).unwrap().generate(dir.path(), 4).unwrap();
        let entries  = read_manifest(&manifest).unwrap();
        assert_eq!(entries.len(), 4);
        assert!(entries.iter().all(|e| e.image_path.exists()));
        assert_eq!(entries[0].label, ShapeKind::Circle);
        assert_eq!(entries[3].label, ShapeKind::Square);
    }
}
