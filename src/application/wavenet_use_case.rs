// ============================================================
// Layer 2 — WaveNet Use Case
// ============================================================
// Trains the causal convolutional generator and samples from it:
//
//   Step 1: Load waves and join them into one series    (Layer 2/4)
//   Step 2: Chronological split, then window each part  (Layer 4)
//   Step 3: Save config                                 (Layer 6)
//   Step 4: Train next-bin classification               (Layer 5)
//   Step 5: Generate from the start of the test series  (Layer 5)
//   Step 6: Write the generated audio                   (Layer 6)
//
// `from_checkpoint` repeats steps 1, 5 and 6 with weights loaded
// from disk instead of trained.

use anyhow::{ensure, Result};
use burn::{module::AutodiffModule, optim::AdamConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::audio_input::AudioInput;
use crate::data::{
    audio::concat,
    batcher::ClassWindowBatcher,
    dataset::InMemoryDataset,
    quantizer::Quantizer,
    splitter::split_sequential,
    windowing::{window_series, WindowSpec},
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger, wav::write_wav};
use crate::ml::{
    default_device,
    generate::extend_series,
    schedule::LrPolicy,
    trainer::{build_loaders, fit, FitOptions},
    wavenet::{WaveNet, WaveNetConfig, WaveNetPredictor},
    InferBackend, TrainBackend,
};

pub const MODEL_NAME: &str = "wavenet";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveNetRunConfig {
    pub audio:             AudioInput,
    pub checkpoint_dir:    String,
    pub output:            String,
    /// Past samples per training window
    pub time_steps:        usize,
    /// Distance between window starts
    pub hop:               usize,
    pub bins:              usize,
    pub residual_channels: usize,
    pub skip_channels:     usize,
    pub layers:            usize,
    pub train_ratio:       f64,
    pub batch_size:        usize,
    pub epochs:            usize,
    pub lr:                f64,
    pub log_every:         usize,
    /// Samples generated after training
    pub generate:          usize,
    pub seed:              u64,
}

impl Default for WaveNetRunConfig {
    fn default() -> Self {
        Self {
            audio:             AudioInput::default(),
            checkpoint_dir:    "checkpoints".to_string(),
            output:            "output/wavenet.wav".to_string(),
            time_steps:        2048,
            hop:               32,
            bins:              256,
            residual_channels: 32,
            skip_channels:     64,
            layers:            8,
            train_ratio:       0.8,
            batch_size:        32,
            epochs:            1,
            lr:                1e-3,
            log_every:         10,
            generate:          22_050,
            seed:              42,
        }
    }
}

impl WaveNetRunConfig {
    pub fn model_config(&self) -> WaveNetConfig {
        WaveNetConfig::new()
            .with_bins(self.bins)
            .with_residual_channels(self.residual_channels)
            .with_skip_channels(self.skip_channels)
            .with_layers(self.layers)
    }

    /// Reject settings that would otherwise fail inside training.
    fn validate(&self) -> Result<()> {
        self.model_config().validate()?;
        ensure!(self.time_steps > 0, "time_steps must be positive");
        ensure!(self.batch_size > 0, "batch size must be positive");
        Ok(())
    }

    /// Chronological (train, test) halves of the loaded audio.
    fn series(&self) -> Result<(Vec<f32>, Vec<f32>)> {
        let series = concat(self.audio.load_waves()?);
        Ok(split_sequential(series, self.train_ratio))
    }

    fn generate_and_write(&self, model: WaveNet<InferBackend>, test: &[f32]) -> Result<Vec<f32>> {
        ensure!(
            test.len() >= self.time_steps,
            "test series has {} samples, fewer than time_steps = {}",
            test.len(), self.time_steps,
        );
        let predictor = WaveNetPredictor::new(model, Quantizer::new(self.bins)?, default_device());
        let seed      = &test[..self.time_steps];
        let audio     = extend_series(&predictor, seed, self.generate, self.time_steps)?;

        write_wav(Path::new(&self.output), &audio, self.audio.sample_rate)?;
        Ok(audio)
    }
}

pub struct WaveNetUseCase {
    config: WaveNetRunConfig,
}

impl WaveNetUseCase {
    pub fn new(config: WaveNetRunConfig) -> Self {
        Self { config }
    }

    /// Returns the written audio: the seed window followed by
    /// the generated samples.
    pub fn execute(&self) -> Result<Vec<f32>> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Steps 1–2: Series and windows ────────────────────────────────────
        let (train_series, test_series) = cfg.series()?;
        let spec  = WindowSpec::new(cfg.time_steps, 1)?.with_hop(cfg.hop);
        let train = window_series(&train_series, &spec);
        let test  = window_series(&test_series, &spec);
        ensure!(
            !train.is_empty() && !test.is_empty(),
            "not enough audio for {}-sample windows ({} train / {} test samples)",
            cfg.time_steps, train_series.len(), test_series.len(),
        );
        tracing::info!("Windows: {} train, {} test", train.len(), test.len());

        let receptive = cfg.model_config().receptive_field();
        if cfg.time_steps < receptive {
            tracing::warn!(
                "time_steps = {} is shorter than the receptive field ({} samples)",
                cfg.time_steps, receptive,
            );
        }

        // ── Step 3: Persist config ───────────────────────────────────────────
        let ckpt    = CheckpointManager::new(&cfg.checkpoint_dir, MODEL_NAME)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;

        // ── Step 4: Train ────────────────────────────────────────────────────
        let device    = default_device();
        let quantizer = Quantizer::new(cfg.bins)?;
        let loaders   = build_loaders(
            ClassWindowBatcher::<TrainBackend>::new(device.clone(), quantizer),
            ClassWindowBatcher::<InferBackend>::new(device.clone(), quantizer),
            InMemoryDataset::new(train),
            InMemoryDataset::new(test),
            cfg.batch_size,
            cfg.seed,
        );

        let model: WaveNet<TrainBackend> = cfg.model_config().init(&device);
        let optim = AdamConfig::new().init::<TrainBackend, WaveNet<TrainBackend>>();
        let opts  = FitOptions {
            model_name: MODEL_NAME.to_string(),
            epochs:     cfg.epochs,
            lr:         LrPolicy::Constant(cfg.lr),
            log_every:  cfg.log_every,
        };
        let result = fit(model, optim, &loaders, &opts, &ckpt, &metrics)?;

        // ── Steps 5–6: Generate ──────────────────────────────────────────────
        cfg.generate_and_write(result.model.valid(), &test_series)
    }

    /// Generate with the latest checkpoint in `checkpoint_dir`.
    pub fn from_checkpoint(checkpoint_dir: &str, generate: usize, output: &str) -> Result<Vec<f32>> {
        let ckpt = CheckpointManager::new(checkpoint_dir, MODEL_NAME)?;
        let mut cfg: WaveNetRunConfig = ckpt.load_config()?;
        cfg.generate = generate;
        cfg.output   = output.to_string();
        cfg.validate()?;

        let device = default_device();
        let model  = ckpt.load_model(cfg.model_config().init::<InferBackend>(&device), &device)?;
        let (_, test_series) = cfg.series()?;
        cfg.generate_and_write(model, &test_series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny(dir: &Path) -> WaveNetRunConfig {
        WaveNetRunConfig {
            audio: AudioInput { desired_samples: 200, sine_waves: 1, ..AudioInput::default() },
            checkpoint_dir:    dir.join("ckpt").display().to_string(),
            output:            dir.join("out.wav").display().to_string(),
            time_steps:        16,
            hop:               4,
            bins:              16,
            residual_channels: 4,
            skip_channels:     4,
            layers:            3,
            batch_size:        8,
            log_every:         0,
            generate:          10,
            ..WaveNetRunConfig::default()
        }
    }

    #[test]
    fn test_train_then_generate_from_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny(dir.path());

        let audio = WaveNetUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(audio.len(), 16 + 10);
        assert!(Path::new(&cfg.output).exists());

        let other = dir.path().join("again.wav").display().to_string();
        let again = WaveNetUseCase::from_checkpoint(&cfg.checkpoint_dir, 5, &other).unwrap();
        assert_eq!(again.len(), 16 + 5);
        assert!(Path::new(&other).exists());
    }

    #[test]
    fn test_too_little_audio_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = WaveNetRunConfig { time_steps: 500, ..tiny(dir.path()) };
        assert!(WaveNetUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_degenerate_settings_fail_before_training() {
        let dir = tempfile::tempdir().unwrap();
        for cfg in [
            WaveNetRunConfig { time_steps: 0, ..tiny(dir.path()) },
            WaveNetRunConfig { bins: 1, ..tiny(dir.path()) },
            WaveNetRunConfig { layers: 0, skip_channels: 8, ..tiny(dir.path()) },
            WaveNetRunConfig { batch_size: 0, ..tiny(dir.path()) },
        ] {
            assert!(WaveNetUseCase::new(cfg).execute().is_err());
        }
        assert!(!dir.path().join("ckpt").exists());
    }
}
