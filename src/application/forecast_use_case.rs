// ============================================================
// Layer 2 — Forecast Use Case
// ============================================================
// Trains the LSTM forecaster in one of three set-ups:
//
//   single  — 4000 past samples → the next sample
//   multi   — 8000 past samples → the next 4410 samples
//   delayed — 1200 past samples → the sample 720 steps after
//             the window, tanh output, 71.5 % train split
//
// Steps: load and join waves → chronological split → window each
// part → train (MSE) → forecast the held-out windows. A
// single-step model additionally continues the test series
// autoregressively; the written WAV is that continuation, or the
// forecasts of the first held-out windows laid end to end.

use anyhow::{ensure, Result};
use burn::{module::AutodiffModule, optim::AdamConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::audio_input::AudioInput;
use crate::data::{
    audio::concat,
    batcher::SeriesBatcher,
    dataset::InMemoryDataset,
    splitter::split_sequential,
    windowing::{window_series, WindowSpec},
};
use crate::domain::sample::SeriesSample;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger, wav::write_wav};
use crate::ml::{
    default_device,
    generate::extend_series,
    lstm::{LstmForecaster, LstmForecasterConfig, LstmPredictor},
    schedule::LrPolicy,
    trainer::{build_loaders, fit, FitOptions},
    InferBackend, TrainBackend,
};

pub const MODEL_NAME: &str = "lstm";

/// Preset windows: non-zero past and future, hop of 32.
const fn preset(past: usize, future: usize, delay: usize) -> WindowSpec {
    WindowSpec { past, future, delay, step: 1, hop: 32 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastMode {
    Single,
    Multi,
    Delayed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRunConfig {
    pub audio:          AudioInput,
    pub checkpoint_dir: String,
    pub output:         String,
    pub window:         WindowSpec,
    pub hidden:         usize,
    pub tanh_output:    bool,
    pub train_ratio:    f64,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub log_every:      usize,
    /// Autoregressive samples (single-step models only)
    pub generate:       usize,
    /// Held-out windows to forecast and report
    pub preview:        usize,
    pub seed:           u64,
}

impl ForecastRunConfig {
    pub fn for_mode(mode: ForecastMode) -> Self {
        let base = Self {
            audio:          AudioInput::default(),
            checkpoint_dir: "checkpoints".to_string(),
            output:         "output/forecast.wav".to_string(),
            window:         preset(4000, 1, 0),
            hidden:         128,
            tanh_output:    false,
            train_ratio:    0.8,
            batch_size:     32,
            epochs:         1,
            lr:             1e-3,
            log_every:      10,
            generate:       22_050,
            preview:        5,
            seed:           42,
        };
        let long_audio = AudioInput { desired_samples: 220_500, ..AudioInput::default() };

        match mode {
            ForecastMode::Single => base,
            ForecastMode::Multi => Self {
                audio:  long_audio,
                window: preset(8000, 22_050 / 5, 0),
                epochs: 5,
                ..base
            },
            ForecastMode::Delayed => Self {
                audio:       long_audio,
                window:      preset(1200, 1, 720),
                tanh_output: true,
                train_ratio: 0.715,
                batch_size:  256,
                epochs:      5,
                ..base
            },
        }
    }

    pub fn model_config(&self) -> LstmForecasterConfig {
        LstmForecasterConfig::new(self.window.future)
            .with_hidden(self.hidden)
            .with_tanh_output(self.tanh_output)
    }

    fn single_step(&self) -> bool {
        self.window.future == 1 && self.window.delay == 0
    }

    fn series(&self) -> Result<(Vec<f32>, Vec<f32>)> {
        let series = concat(self.audio.load_waves()?);
        Ok(split_sequential(series, self.train_ratio))
    }

    /// Forecast the first held-out windows, continue the series
    /// when single-step, and write the result as audio.
    fn predict_and_write(
        &self,
        model: LstmForecaster<InferBackend>,
        test:  &[SeriesSample],
        test_series: &[f32],
    ) -> Result<ForecastOutcome> {
        let device  = default_device();
        let preview = &test[..self.preview.min(test.len())];
        let inputs: Vec<Vec<f32>> = preview.iter().map(|s| s.input.clone()).collect();
        let forecasts = model.predict_windows(&inputs, &device)?;

        let abs_err: Vec<f32> = forecasts
            .iter()
            .zip(preview)
            .flat_map(|(f, s)| f.iter().zip(&s.target).map(|(p, t)| (p - t).abs()))
            .collect();
        let mae = (!abs_err.is_empty()).then(|| abs_err.iter().sum::<f32>() / abs_err.len() as f32);
        match mae {
            Some(mae) => tracing::info!("Mean absolute error over {} held-out windows: {:.6}", preview.len(), mae),
            None      => tracing::info!("No held-out windows previewed; MAE not computed"),
        }

        let audio = if self.single_step() && self.generate > 0 {
            ensure!(test_series.len() >= self.window.past, "test series shorter than one window");
            let predictor = LstmPredictor::new(model, device);
            let seed      = &test_series[..self.window.past];
            extend_series(&predictor, seed, self.generate, self.window.past)?
        } else {
            forecasts.iter().flatten().copied().collect()
        };
        write_wav(Path::new(&self.output), &audio, self.audio.sample_rate)?;

        Ok(ForecastOutcome { forecasts, mae, audio })
    }
}

#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    /// One forecast per previewed held-out window
    pub forecasts: Vec<Vec<f32>>,
    /// None when no window was previewed
    pub mae:       Option<f32>,
    /// What was written to the output WAV
    pub audio:     Vec<f32>,
}

pub struct ForecastUseCase {
    config: ForecastRunConfig,
}

impl ForecastUseCase {
    pub fn new(config: ForecastRunConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ForecastOutcome> {
        let cfg = &self.config;
        cfg.window.check()?;

        let (train_series, test_series) = cfg.series()?;
        let train = window_series(&train_series, &cfg.window);
        let test  = window_series(&test_series, &cfg.window);
        ensure!(
            !train.is_empty() && !test.is_empty(),
            "not enough audio for the window ({} train / {} test samples)",
            train_series.len(), test_series.len(),
        );
        tracing::info!("Windows: {} train, {} test", train.len(), test.len());

        let ckpt    = CheckpointManager::new(&cfg.checkpoint_dir, MODEL_NAME)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;

        let device  = default_device();
        let loaders = build_loaders(
            SeriesBatcher::<TrainBackend>::new(device.clone()),
            SeriesBatcher::<InferBackend>::new(device.clone()),
            InMemoryDataset::new(train),
            InMemoryDataset::new(test.clone()),
            cfg.batch_size,
            cfg.seed,
        );

        let model: LstmForecaster<TrainBackend> = cfg.model_config().init(&device);
        let optim = AdamConfig::new().init::<TrainBackend, LstmForecaster<TrainBackend>>();
        let opts  = FitOptions {
            model_name: MODEL_NAME.to_string(),
            epochs:     cfg.epochs,
            lr:         LrPolicy::Constant(cfg.lr),
            log_every:  cfg.log_every,
        };
        let result = fit(model, optim, &loaders, &opts, &ckpt, &metrics)?;

        cfg.predict_and_write(result.model.valid(), &test, &test_series)
    }

    /// Predict with the latest checkpoint in `checkpoint_dir`.
    pub fn from_checkpoint(checkpoint_dir: &str, generate: usize, output: &str) -> Result<ForecastOutcome> {
        let ckpt = CheckpointManager::new(checkpoint_dir, MODEL_NAME)?;
        let mut cfg: ForecastRunConfig = ckpt.load_config()?;
        cfg.generate = generate;
        cfg.output   = output.to_string();
        cfg.window.check()?;

        let device = default_device();
        let model  = ckpt.load_model(cfg.model_config().init::<InferBackend>(&device), &device)?;
        let (_, test_series) = cfg.series()?;
        let test = window_series(&test_series, &cfg.window);
        cfg.predict_and_write(model, &test, &test_series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny(dir: &Path, mode: ForecastMode, window: WindowSpec) -> ForecastRunConfig {
        ForecastRunConfig {
            audio:          AudioInput { desired_samples: 120, ..AudioInput::default() },
            checkpoint_dir: dir.join("ckpt").display().to_string(),
            output:         dir.join("forecast.wav").display().to_string(),
            window,
            hidden:         4,
            batch_size:     8,
            epochs:         1,
            log_every:      0,
            generate:       7,
            preview:        2,
            ..ForecastRunConfig::for_mode(mode)
        }
    }

    #[test]
    fn test_mode_defaults() {
        let multi = ForecastRunConfig::for_mode(ForecastMode::Multi);
        assert_eq!(multi.window.past, 8000);
        assert_eq!(multi.window.future, 4410);

        let delayed = ForecastRunConfig::for_mode(ForecastMode::Delayed);
        assert_eq!(delayed.window.delay, 720);
        assert!(delayed.tanh_output);
        assert_eq!(delayed.train_ratio, 0.715);
        assert_eq!(delayed.batch_size, 256);
    }

    #[test]
    fn test_single_step_continues_the_series() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny(dir.path(), ForecastMode::Single, WindowSpec::new(8, 1).unwrap());

        let out = ForecastUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(out.forecasts.len(), 2);
        assert_eq!(out.audio.len(), 8 + 7);
        assert!(out.mae.is_some_and(f32::is_finite));

        let again = ForecastUseCase::from_checkpoint(
            &cfg.checkpoint_dir, 3, &dir.path().join("again.wav").display().to_string(),
        ).unwrap();
        assert_eq!(again.audio.len(), 8 + 3);
    }

    #[test]
    fn test_multi_step_writes_forecasts() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny(dir.path(), ForecastMode::Multi, WindowSpec::new(6, 3).unwrap());

        let out = ForecastUseCase::new(cfg).execute().unwrap();
        assert!(out.forecasts.iter().all(|f| f.len() == 3));
        assert_eq!(out.audio.len(), out.forecasts.len() * 3);
    }

    #[test]
    fn test_no_preview_reports_no_mae() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ForecastRunConfig {
            preview: 0,
            ..tiny(dir.path(), ForecastMode::Multi, WindowSpec::new(6, 3).unwrap())
        };

        let out = ForecastUseCase::new(cfg).execute().unwrap();
        assert!(out.forecasts.is_empty());
        assert_eq!(out.mae, None);
    }

    #[test]
    fn test_zero_hop_window_is_rejected() {
        let dir    = tempfile::tempdir().unwrap();
        let window = WindowSpec { hop: 0, ..WindowSpec::new(6, 1).unwrap() };
        let cfg    = tiny(dir.path(), ForecastMode::Single, window);
        assert!(ForecastUseCase::new(cfg).execute().is_err());
    }
}
