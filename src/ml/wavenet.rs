// ============================================================
// Layer 5 — WaveNet Generator
// ============================================================
// Predicts the quantised next sample of a waveform from a window
// of past samples (van den Oord et al., 2016).
//
//   [B,1,T] → causal conv(k=2) → R channels
//           → residual stack, dilations 1, 2, 4, … 2^(L-1):
//                 z    = tanh(W_f * x) ⊙ σ(W_g * x)
//                 x   += 1×1(z)          (residual)
//                 skip += 1×1(z)         (skip)
//           → ReLU → 1×1 → ReLU → last time step → Linear(→ bins)
//
// Every convolution is causal: the input is left-padded with
// (k - 1) · dilation zeros, so output t never sees input t + 1.

use anyhow::{ensure, Result};
use burn::{
    nn::{
        conv::{Conv1d, Conv1dConfig},
        loss::CrossEntropyLossConfig,
        Linear, LinearConfig, PaddingConfig1d,
    },
    prelude::*,
    tensor::{
        activation::{relu, sigmoid, tanh},
        backend::AutodiffBackend,
    },
};

use crate::data::{batcher::ClassWindowBatch, quantizer::Quantizer};
use crate::domain::traits::NextValuePredictor;
use crate::ml::evaluator::{BatchScore, ValidStep};
use crate::ml::trainer::{StepOutput, TrainStep};

#[derive(Config, Debug)]
pub struct WaveNetConfig {
    /// Output classes, one per amplitude bin
    #[config(default = 256)]
    pub bins:              usize,
    #[config(default = 32)]
    pub residual_channels: usize,
    #[config(default = 64)]
    pub skip_channels:     usize,
    #[config(default = 2)]
    pub kernel_size:       usize,
    /// Residual blocks; block i uses dilation 2^i
    #[config(default = 8)]
    pub layers:            usize,
}

impl WaveNetConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.bins >= 2, "WaveNet needs at least 2 bins, got {}", self.bins);
        ensure!(self.layers >= 1, "WaveNet needs at least one residual block");
        ensure!(self.kernel_size >= 1, "kernel size must be positive");
        ensure!(
            self.residual_channels > 0 && self.skip_channels > 0,
            "residual ({}) and skip ({}) channels must be positive",
            self.residual_channels, self.skip_channels,
        );
        Ok(())
    }

    /// Samples one output step depends on.
    pub fn receptive_field(&self) -> usize {
        let k = self.kernel_size - 1;
        1 + k + (0..self.layers).map(|i| k << i).sum::<usize>()
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> WaveNet<B> {
        let r = self.residual_channels;
        let s = self.skip_channels;

        let blocks = (0..self.layers)
            .map(|i| ResidualBlock {
                filter:   CausalConv1d::new(r, r, self.kernel_size, 1 << i, device),
                gate:     CausalConv1d::new(r, r, self.kernel_size, 1 << i, device),
                residual: Conv1dConfig::new(r, r, 1).init(device),
                skip:     Conv1dConfig::new(r, s, 1).init(device),
            })
            .collect();

        WaveNet {
            input:  CausalConv1d::new(1, r, self.kernel_size, 1, device),
            blocks,
            post:   Conv1dConfig::new(s, s, 1).init(device),
            head:   LinearConfig::new(s, self.bins).init(device),
        }
    }
}

// ─── Causal convolution ──────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct CausalConv1d<B: Backend> {
    pub conv: Conv1d<B>,
    pub pad:  usize,
}

impl<B: Backend> CausalConv1d<B> {
    pub fn new(c_in: usize, c_out: usize, kernel: usize, dilation: usize, device: &B::Device) -> Self {
        let conv = Conv1dConfig::new(c_in, c_out, kernel)
            .with_dilation(dilation)
            .with_padding(PaddingConfig1d::Valid)
            .init(device);
        Self { conv, pad: (kernel - 1) * dilation }
    }

    /// [B, C_in, T] → [B, C_out, T]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        if self.pad == 0 {
            return self.conv.forward(x);
        }
        let [batch, channels, _] = x.dims();
        let zeros = Tensor::zeros([batch, channels, self.pad], &x.device());
        self.conv.forward(Tensor::cat(vec![zeros, x], 2))
    }
}

// ─── Gated residual block ────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    pub filter:   CausalConv1d<B>,
    pub gate:     CausalConv1d<B>,
    pub residual: Conv1d<B>,
    pub skip:     Conv1d<B>,
}

impl<B: Backend> ResidualBlock<B> {
    /// Returns (residual output, skip contribution).
    pub fn forward(&self, x: Tensor<B, 3>) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let z = tanh(self.filter.forward(x.clone())) * sigmoid(self.gate.forward(x.clone()));
        let skip = self.skip.forward(z.clone());
        (x + self.residual.forward(z), skip)
    }
}

// ─── Model ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct WaveNet<B: Backend> {
    pub input:  CausalConv1d<B>,
    pub blocks: Vec<ResidualBlock<B>>,
    pub post:   Conv1d<B>,
    pub head:   Linear<B>,
}

impl<B: Backend> WaveNet<B> {
    /// inputs: [batch, 1, T] → logits over bins [batch, bins]
    pub fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 2> {
        let mut x    = self.input.forward(inputs);
        let mut skip: Option<Tensor<B, 3>> = None;

        for block in &self.blocks {
            let (next, s) = block.forward(x);
            x = next;
            skip = Some(match skip {
                Some(acc) => acc + s,
                None      => s,
            });
        }

        let y = match skip {
            Some(acc) => acc,
            None      => x,
        };
        let y = relu(self.post.forward(relu(y)));

        let [batch, channels, steps] = y.dims();
        let last = y.slice([0..batch, 0..channels, steps - 1..steps]).reshape([batch, channels]);
        self.head.forward(last)
    }
}

impl<B: AutodiffBackend> TrainStep<B, ClassWindowBatch<B>> for WaveNet<B> {
    fn step(&self, batch: ClassWindowBatch<B>) -> StepOutput<B> {
        let items  = batch.classes.dims()[0];
        let logits = self.forward(batch.inputs);
        let loss   = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, batch.classes);
        StepOutput { loss, items }
    }
}

impl<B: Backend> ValidStep<ClassWindowBatch<B>> for WaveNet<B> {
    fn score(&self, batch: ClassWindowBatch<B>) -> BatchScore {
        let items  = batch.classes.dims()[0];
        let logits = self.forward(batch.inputs);
        let pred   = logits.clone().argmax(1).flatten::<1>(0, 1);

        let correct = pred
            .equal(batch.classes.clone())
            .int().sum().into_scalar().elem::<i64>() as usize;
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, batch.classes)
            .into_scalar()
            .elem::<f64>();

        BatchScore { loss_sum: loss * items as f64, items, correct, counted: items }
    }
}

// ─── Sampling ────────────────────────────────────────────────────────────────
/// Next value = centre of the most likely bin.
pub struct WaveNetPredictor<B: Backend> {
    model:     WaveNet<B>,
    quantizer: Quantizer,
    device:    B::Device,
}

impl<B: Backend> WaveNetPredictor<B> {
    pub fn new(model: WaveNet<B>, quantizer: Quantizer, device: B::Device) -> Self {
        Self { model, quantizer, device }
    }
}

impl<B: Backend> NextValuePredictor for WaveNetPredictor<B> {
    fn predict_next(&self, context: &[f32]) -> Result<f32> {
        anyhow::ensure!(!context.is_empty(), "WaveNet needs at least one context sample");
        let input = Tensor::<B, 3>::from_data(
            TensorData::new(context.to_vec(), [1, 1, context.len()]), &self.device,
        );
        let bin = self.model
            .forward(input)
            .argmax(1)
            .into_scalar()
            .elem::<i64>();
        Ok(self.quantizer.decode(bin as usize))
    }
}

// ─── Unit Tests ──────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;

    type TestBackend = NdArray;

    fn small() -> WaveNetConfig {
        WaveNetConfig::new()
            .with_bins(16)
            .with_residual_channels(4)
            .with_skip_channels(4)
            .with_layers(3)
    }

    #[test]
    fn test_validate_rejects_empty_stack() {
        assert!(small().validate().is_ok());
        assert!(small().with_layers(0).validate().is_err());
        assert!(small().with_bins(1).validate().is_err());
        assert!(small().with_skip_channels(0).validate().is_err());
    }

    #[test]
    fn test_receptive_field() {
        // 1 + 1 (input conv) + 1 + 2 + 4
        assert_eq!(small().receptive_field(), 9);
        assert_eq!(WaveNetConfig::new().receptive_field(), 257);
    }

    #[test]
    fn test_causal_conv_keeps_length() {
        let device = Default::default();
        let conv   = CausalConv1d::<TestBackend>::new(1, 2, 2, 4, &device);
        let out    = conv.forward(Tensor::ones([3, 1, 10], &device));
        assert_eq!(out.dims(), [3, 2, 10]);
    }

    #[test]
    fn test_causal_conv_ignores_future() {
        let device = Default::default();
        let conv   = CausalConv1d::<TestBackend>::new(1, 1, 2, 2, &device);

        let a: Vec<f32> = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let mut b = a.clone();
        b[5] = -9.0;

        let run = |v: Vec<f32>| -> Vec<f32> {
            conv.forward(Tensor::from_data(TensorData::new(v, [1, 1, 6]), &device))
                .into_data()
                .to_vec()
                .unwrap()
        };
        let (ya, yb) = (run(a), run(b));
        assert_eq!(ya[..5], yb[..5]);
        assert_ne!(ya[5], yb[5]);
    }

    #[test]
    fn test_forward_gives_bin_logits() {
        let device = Default::default();
        let model: WaveNet<TestBackend> = small().init(&device);
        let logits = model.forward(Tensor::zeros([2, 1, 12], &device));
        assert_eq!(logits.dims(), [2, 16]);
    }

    #[test]
    fn test_train_step_and_predictor() {
        type B = Autodiff<TestBackend>;
        let device = Default::default();
        let model: WaveNet<B> = small().init(&device);

        let batch = ClassWindowBatch {
            inputs:  Tensor::<B, 3>::zeros([2, 1, 8], &device),
            classes: Tensor::<B, 1, Int>::from_data([3i64, 7], &device),
        };
        let out = model.step(batch);
        assert!(out.loss.clone().into_scalar().elem::<f64>().is_finite());

        let predictor = WaveNetPredictor::new(model.valid(), Quantizer::new(16).unwrap(), device);
        let next = predictor.predict_next(&[0.0; 8]).unwrap();
        assert!((-1.0..=1.0).contains(&next));
        assert!(predictor.predict_next(&[]).is_err());
    }
}
