// ============================================================
// Layer 2 — Audio Transformer Use Case
// ============================================================
// Each wave of `desired_samples` values becomes one sample:
// the model sees the quantised first n-1 values and regresses
// the last one. After training, audio is generated one value
// at a time with the last `d_model` values as context, seeded
// with the first held-out wave.

use anyhow::{ensure, Result};
use burn::{module::AutodiffModule, optim::AdamConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::audio_input::AudioInput;
use crate::data::{
    batcher::AudioTokenBatcher,
    dataset::InMemoryDataset,
    quantizer::Quantizer,
    splitter::split_train_test,
};
use crate::domain::sample::SeriesSample;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger, wav::write_wav};
use crate::ml::{
    audio_transformer::{AudioTransformer, AudioTransformerConfig, AudioTransformerPredictor},
    default_device,
    generate::extend_series,
    schedule::LrPolicy,
    trainer::{build_loaders, fit, FitOptions},
    InferBackend, TrainBackend,
};

pub const MODEL_NAME: &str = "audio_transformer";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTransformerRunConfig {
    pub audio:          AudioInput,
    pub checkpoint_dir: String,
    pub output:         String,
    pub bins:           usize,
    pub d_model:        usize,
    pub d_ff:           usize,
    pub num_heads:      usize,
    pub train_ratio:    f64,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub log_every:      usize,
    pub generate:       usize,
    pub seed:           u64,
}

impl Default for AudioTransformerRunConfig {
    fn default() -> Self {
        Self {
            audio: AudioInput {
                desired_samples: 512,
                limit:           None,
                sine_waves:      256,
                ..AudioInput::default()
            },
            checkpoint_dir: "checkpoints".to_string(),
            output:         "output/audio_transformer.wav".to_string(),
            bins:           4096,
            d_model:        1024,
            d_ff:           2048,
            num_heads:      1,
            train_ratio:    0.8,
            batch_size:     64,
            epochs:         1,
            lr:             1e-3,
            log_every:      10,
            generate:       22_050,
            seed:           42,
        }
    }
}

/// Input: every value but the last. Target: the last value.
pub fn next_value_sample(wave: &[f32]) -> Option<SeriesSample> {
    let (last, rest) = wave.split_last()?;
    (!rest.is_empty()).then(|| SeriesSample::new(rest.to_vec(), vec![*last]))
}

impl AudioTransformerRunConfig {
    pub fn model_config(&self) -> AudioTransformerConfig {
        AudioTransformerConfig::new()
            .with_bins(self.bins)
            .with_d_model(self.d_model)
            .with_d_ff(self.d_ff)
            .with_num_heads(self.num_heads)
    }

    fn validate(&self) -> Result<()> {
        self.model_config().validate()?;
        ensure!(self.batch_size > 0, "batch size must be positive");
        Ok(())
    }

    fn samples(&self) -> Result<(Vec<SeriesSample>, Vec<SeriesSample>)> {
        let samples: Vec<SeriesSample> = self.audio
            .load_waves()?
            .iter()
            .filter_map(|w| next_value_sample(w))
            .collect();
        ensure!(samples.len() >= 2, "need at least two waves of two samples or more");
        Ok(split_train_test(samples, self.train_ratio, self.seed))
    }

    fn generate_and_write(&self, model: AudioTransformer<InferBackend>, seed: &[f32]) -> Result<Vec<f32>> {
        let predictor = AudioTransformerPredictor::new(model, Quantizer::new(self.bins)?, default_device());
        let audio     = extend_series(&predictor, seed, self.generate, self.d_model)?;
        write_wav(Path::new(&self.output), &audio, self.audio.sample_rate)?;
        Ok(audio)
    }
}

pub struct AudioTransformerUseCase {
    config: AudioTransformerRunConfig,
}

impl AudioTransformerUseCase {
    pub fn new(config: AudioTransformerRunConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<f32>> {
        let cfg = &self.config;
        cfg.validate()?;

        let (train, test) = cfg.samples()?;
        ensure!(!train.is_empty() && !test.is_empty(), "Too few waves to split");
        tracing::info!("Split: {} train, {} test", train.len(), test.len());

        let ckpt    = CheckpointManager::new(&cfg.checkpoint_dir, MODEL_NAME)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;

        let device    = default_device();
        let quantizer = Quantizer::new(cfg.bins)?;
        let seed      = test[0].input.clone();
        let loaders   = build_loaders(
            AudioTokenBatcher::<TrainBackend>::new(device.clone(), quantizer),
            AudioTokenBatcher::<InferBackend>::new(device.clone(), quantizer),
            InMemoryDataset::new(train),
            InMemoryDataset::new(test),
            cfg.batch_size,
            cfg.seed,
        );

        let model: AudioTransformer<TrainBackend> = cfg.model_config().init(&device);
        let optim = AdamConfig::new()
            .with_beta_2(0.98)
            .with_epsilon(1e-9)
            .init::<TrainBackend, AudioTransformer<TrainBackend>>();
        let opts = FitOptions {
            model_name: MODEL_NAME.to_string(),
            epochs:     cfg.epochs,
            lr:         LrPolicy::Constant(cfg.lr),
            log_every:  cfg.log_every,
        };
        let result = fit(model, optim, &loaders, &opts, &ckpt, &metrics)?;

        cfg.generate_and_write(result.model.valid(), &seed)
    }

    pub fn from_checkpoint(checkpoint_dir: &str, generate: usize, output: &str) -> Result<Vec<f32>> {
        let ckpt = CheckpointManager::new(checkpoint_dir, MODEL_NAME)?;
        let mut cfg: AudioTransformerRunConfig = ckpt.load_config()?;
        cfg.generate = generate;
        cfg.output   = output.to_string();
        cfg.validate()?;

        let device = default_device();
        let model  = ckpt.load_model(cfg.model_config().init::<InferBackend>(&device), &device)?;
        let (_, test) = cfg.samples()?;
        let seed = test
            .first()
            .map(|s| s.input.clone())
            .ok_or_else(|| anyhow::anyhow!("no held-out wave to seed generation"))?;
        cfg.generate_and_write(model, &seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_value_sample() {
        let s = next_value_sample(&[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(s.input, vec![0.1, 0.2]);
        assert_eq!(s.target, vec![0.3]);
        assert!(next_value_sample(&[0.1]).is_none());
        assert!(next_value_sample(&[]).is_none());
    }

    #[test]
    fn test_train_then_generate() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AudioTransformerRunConfig {
            audio: AudioInput { desired_samples: 9, sine_waves: 10, ..AudioInput::default() },
            checkpoint_dir: dir.path().join("ckpt").display().to_string(),
            output:         dir.path().join("gen.wav").display().to_string(),
            bins:           16,
            d_model:        8,
            d_ff:           16,
            batch_size:     4,
            log_every:      0,
            generate:       12,
            ..AudioTransformerRunConfig::default()
        };

        let audio = AudioTransformerUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(audio.len(), 8 + 12);
        assert!(audio.iter().all(|v| v.abs() <= 1.0));

        let again = AudioTransformerUseCase::from_checkpoint(
            &cfg.checkpoint_dir, 4, &dir.path().join("again.wav").display().to_string(),
        ).unwrap();
        assert_eq!(again.len(), 8 + 4);
    }

    #[test]
    fn test_single_bin_fails_before_training() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AudioTransformerRunConfig {
            checkpoint_dir: dir.path().join("ckpt").display().to_string(),
            bins:           1,
            ..AudioTransformerRunConfig::default()
        };
        assert!(AudioTransformerUseCase::new(cfg).execute().is_err());
        assert!(!dir.path().join("ckpt").exists());
    }
}
