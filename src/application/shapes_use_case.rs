// ============================================================
// Layer 2 — Shapes Use Case
// ============================================================
// Trains the shape CNN end to end:
//
//   Step 1: Generate the synthetic dataset (optional)  (Layer 4)
//   Step 2: Load manifest + transform images           (Layer 4)
//   Step 3: Shuffle and split train / test             (Layer 4)
//   Step 4: Save config                                (Layer 6)
//   Step 5: Train, testing after every epoch           (Layer 5)

use anyhow::{ensure, Result};
use burn::optim::AdamConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{
    batcher::ShapeBatcher,
    dataset::InMemoryDataset,
    image_transform::{ImageTransform, ShapeSource},
    shapes::ShapeGenerator,
    splitter::split_train_test,
};
use crate::domain::traits::SampleSource;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    default_device,
    evaluator::EvalReport,
    schedule::LrPolicy,
    shape_cnn::{ShapeCnn, ShapeCnnConfig},
    trainer::{build_loaders, fit, FitOptions},
    InferBackend, TrainBackend,
};

pub const MODEL_NAME: &str = "shape_cnn";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapesRunConfig {
    pub manifest:       String,
    /// Generate this many images into the manifest's directory
    /// first; the generated manifest is then `dataset.csv` there
    pub generate:       Option<usize>,
    pub checkpoint_dir: String,
    pub image_size:     u32,
    pub channels:       usize,
    pub train_ratio:    f64,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub log_every:      usize,
    pub seed:           u64,
}

impl Default for ShapesRunConfig {
    fn default() -> Self {
        Self {
            manifest:       "data/shapes/dataset.csv".to_string(),
            generate:       None,
            checkpoint_dir: "checkpoints".to_string(),
            image_size:     54,
            channels:       8,
            train_ratio:    0.8,
            batch_size:     32,
            epochs:         10,
            lr:             1e-3,
            log_every:      10,
            seed:           42,
        }
    }
}

/// Write `count` synthetic images and their manifest into `dir`.
pub fn generate_shapes(dir: &Path, count: usize, size: u32, seed: u64) -> Result<PathBuf> {
    Ok(ShapeGenerator::new(size, seed)?.generate(dir, count)?)
}

pub struct ShapesUseCase {
    config: ShapesRunConfig,
}

impl ShapesUseCase {
    pub fn new(config: ShapesRunConfig) -> Self {
        Self { config }
    }

    /// Returns the test report of the last epoch.
    pub fn execute(&self) -> Result<EvalReport> {
        let cfg = &self.config;
        let model_cfg = ShapeCnnConfig::new()
            .with_image_size(cfg.image_size as usize)
            .with_channels(cfg.channels);
        model_cfg.validate()?;
        ensure!(cfg.batch_size > 0, "batch size must be positive");

        // ── Step 1: Synthetic data ───────────────────────────────────────────
        let mut manifest = PathBuf::from(&cfg.manifest);
        if let Some(count) = cfg.generate {
            let dir = manifest.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            manifest = generate_shapes(&dir, count, cfg.image_size, cfg.seed)?;
        }

        // ── Step 2: Load ─────────────────────────────────────────────────────
        let source  = ShapeSource::new(&manifest, ImageTransform::new(cfg.image_size)?);
        let samples = source.load_all()?;
        ensure!(!samples.is_empty(), "Manifest '{}' lists no images", manifest.display());
        tracing::info!("Loaded {} images", samples.len());

        // ── Step 3: Split ────────────────────────────────────────────────────
        let (train, test) = split_train_test(samples, cfg.train_ratio, cfg.seed);
        tracing::info!("Split: {} train, {} test", train.len(), test.len());

        // ── Step 4: Persist config ───────────────────────────────────────────
        let ckpt    = CheckpointManager::new(&cfg.checkpoint_dir, MODEL_NAME)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;

        // ── Step 5: Train ────────────────────────────────────────────────────
        let device  = default_device();
        let loaders = build_loaders(
            ShapeBatcher::<TrainBackend>::new(device.clone()),
            ShapeBatcher::<InferBackend>::new(device.clone()),
            InMemoryDataset::new(train),
            InMemoryDataset::new(test),
            cfg.batch_size,
            cfg.seed,
        );

        let model: ShapeCnn<TrainBackend> = model_cfg.init(&device);
        let optim = AdamConfig::new().init::<TrainBackend, ShapeCnn<TrainBackend>>();

        let opts = FitOptions {
            model_name: MODEL_NAME.to_string(),
            epochs:     cfg.epochs,
            lr:         LrPolicy::Constant(cfg.lr),
            log_every:  cfg.log_every,
        };
        let result = fit(model, optim, &loaders, &opts, &ckpt, &metrics)?;
        Ok(result.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end_on_generated_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ShapesRunConfig {
            manifest:       dir.path().join("shapes").join("dataset.csv").display().to_string(),
            generate:       Some(20),
            checkpoint_dir: dir.path().join("ckpt").display().to_string(),
            image_size:     16,
            channels:       2,
            batch_size:     4,
            epochs:         1,
            log_every:      0,
            ..ShapesRunConfig::default()
        };

        let report = ShapesUseCase::new(cfg.clone()).execute().unwrap();
        // 20 images, floor(0.8 * 20) = 16 train, 4 test
        assert_eq!(report.total, 4);
        assert!(report.accuracy().is_some());

        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir, MODEL_NAME).unwrap();
        assert_eq!(ckpt.latest_epoch().unwrap(), 1);
        let saved: ShapesRunConfig = ckpt.load_config().unwrap();
        assert_eq!(saved.image_size, 16);
    }

    #[test]
    fn test_too_small_images_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(generate_shapes(dir.path(), 4, 4, 0).is_err());

        let cfg = ShapesRunConfig {
            manifest:       dir.path().join("dataset.csv").display().to_string(),
            generate:       Some(4),
            checkpoint_dir: dir.path().join("ckpt").display().to_string(),
            image_size:     4,
            ..ShapesRunConfig::default()
        };
        assert!(ShapesUseCase::new(cfg).execute().is_err());
        assert!(!dir.path().join("ckpt").exists());
    }
}
