// ============================================================
// Layer 5 — LSTM Forecaster
// ============================================================
// Regresses the next `future` values of a series from a window
// of past values.
//
//   [B,T,1] → LSTM(hidden) → final hidden state [B,hidden]
//           → Linear(→ future) → optional tanh
//
// future = 1 is the single-step forecaster and can also extend a
// series autoregressively; future > 1 predicts a whole block at
// once. The tanh head keeps outputs in [-1, 1] for normalised
// audio.

use anyhow::Result;
use burn::{
    nn::{
        loss::{MseLoss, Reduction},
        Linear, LinearConfig, Lstm, LstmConfig,
    },
    prelude::*,
    tensor::{activation::tanh, backend::AutodiffBackend},
};

use crate::data::batcher::SeriesBatch;
use crate::domain::traits::NextValuePredictor;
use crate::ml::evaluator::{BatchScore, ValidStep};
use crate::ml::trainer::{StepOutput, TrainStep};

#[derive(Config, Debug)]
pub struct LstmForecasterConfig {
    /// Values predicted per window
    pub future:      usize,
    #[config(default = 128)]
    pub hidden:      usize,
    #[config(default = false)]
    pub tanh_output: bool,
}

impl LstmForecasterConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmForecaster<B> {
        LstmForecaster {
            lstm:        LstmConfig::new(1, self.hidden, true).init(device),
            head:        LinearConfig::new(self.hidden, self.future).init(device),
            tanh_output: self.tanh_output,
        }
    }
}

#[derive(Module, Debug)]
pub struct LstmForecaster<B: Backend> {
    pub lstm:        Lstm<B>,
    pub head:        Linear<B>,
    pub tanh_output: bool,
}

impl<B: Backend> LstmForecaster<B> {
    /// inputs: [batch, T, 1] → [batch, future]
    pub fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 2> {
        let (_, state) = self.lstm.forward(inputs, None);
        let out = self.head.forward(state.hidden);
        if self.tanh_output { tanh(out) } else { out }
    }

    /// Forecast every window in `windows`, in order.
    pub fn predict_windows(&self, windows: &[Vec<f32>], device: &B::Device) -> Result<Vec<Vec<f32>>> {
        let Some(first) = windows.first() else {
            return Ok(Vec::new());
        };
        let steps = first.len();
        anyhow::ensure!(
            windows.iter().all(|w| w.len() == steps),
            "all forecast windows must have {steps} values",
        );

        let flat: Vec<f32> = windows.iter().flatten().copied().collect();
        let input = Tensor::<B, 3>::from_data(TensorData::new(flat, [windows.len(), steps, 1]), device);
        let out   = self.forward(input);
        let [_, future] = out.dims();

        let values: Vec<f32> = out
            .into_data()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("Cannot read forecast: {e:?}"))?;
        Ok(values.chunks(future).map(<[f32]>::to_vec).collect())
    }
}

impl<B: AutodiffBackend> TrainStep<B, SeriesBatch<B>> for LstmForecaster<B> {
    fn step(&self, batch: SeriesBatch<B>) -> StepOutput<B> {
        let items = batch.targets.dims()[0];
        let pred  = self.forward(batch.inputs);
        let loss  = MseLoss::new().forward(pred, batch.targets, Reduction::Mean);
        StepOutput { loss, items }
    }
}

impl<B: Backend> ValidStep<SeriesBatch<B>> for LstmForecaster<B> {
    fn score(&self, batch: SeriesBatch<B>) -> BatchScore {
        let items = batch.targets.dims()[0];
        let pred  = self.forward(batch.inputs);
        let loss  = MseLoss::new()
            .forward(pred, batch.targets, Reduction::Mean)
            .into_scalar()
            .elem::<f64>();
        BatchScore::regression(loss * items as f64, items)
    }
}

// ─── Autoregressive use ──────────────────────────────────────────────────────
/// First forecast value of the window ending at the context's end.
pub struct LstmPredictor<B: Backend> {
    model:  LstmForecaster<B>,
    device: B::Device,
}

impl<B: Backend> LstmPredictor<B> {
    pub fn new(model: LstmForecaster<B>, device: B::Device) -> Self {
        Self { model, device }
    }
}

impl<B: Backend> NextValuePredictor for LstmPredictor<B> {
    fn predict_next(&self, context: &[f32]) -> Result<f32> {
        let forecast = self.model.predict_windows(&[context.to_vec()], &self.device)?;
        forecast
            .first()
            .and_then(|f| f.first())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("LSTM produced no forecast"))
    }
}
