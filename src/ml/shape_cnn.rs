// ============================================================
// Layer 5 — Shape CNN
// ============================================================
// Classifies 54×54 grayscale images as circle or square.
//
//   [B,1,54,54] → conv3×3(8) → ReLU → maxpool2 → [B,8,27,27]
//               → conv3×3(8) → ReLU → maxpool2 → [B,8,13,13]
//               → conv3×3(8) → ReLU → maxpool2 → [B,8,6,6]
//               → flatten → Linear(288 → 2) → log-softmax
//
// The output is log-probabilities, so the loss is negative
// log-likelihood taken directly on the output.

use anyhow::{ensure, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
    tensor::{activation::log_softmax, backend::AutodiffBackend},
};

use crate::data::batcher::ShapeBatch;
use crate::ml::evaluator::{BatchScore, ValidStep};
use crate::ml::trainer::{StepOutput, TrainStep};

#[derive(Config, Debug)]
pub struct ShapeCnnConfig {
    #[config(default = 54)]
    pub image_size:  usize,
    #[config(default = 8)]
    pub channels:    usize,
    #[config(default = 2)]
    pub num_classes: usize,
}

impl ShapeCnnConfig {
    /// Three 2×2 pools need at least 8 pixels per side.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.image_size >= 8, "image size must be at least 8 pixels, got {}", self.image_size);
        ensure!(self.channels > 0, "convolutions need at least one channel");
        ensure!(self.num_classes >= 2, "a classifier needs at least 2 classes");
        Ok(())
    }

    /// Side length after the three 2×2 pools.
    pub fn pooled_size(&self) -> usize {
        self.image_size / 2 / 2 / 2
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ShapeCnn<B> {
        let conv = |c_in: usize| {
            Conv2dConfig::new([c_in, self.channels], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };
        let flat = self.channels * self.pooled_size() * self.pooled_size();

        ShapeCnn {
            conv1: conv(1),
            conv2: conv(self.channels),
            conv3: conv(self.channels),
            pool:  MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            relu:  Relu::new(),
            fc:    LinearConfig::new(flat, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct ShapeCnn<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub conv3: Conv2d<B>,
    pub pool:  MaxPool2d,
    pub relu:  Relu,
    pub fc:    Linear<B>,
}

impl<B: Backend> ShapeCnn<B> {
    /// images: [batch, 1, H, W] → log-probabilities [batch, classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(self.relu.forward(self.conv1.forward(images)));
        let x = self.pool.forward(self.relu.forward(self.conv2.forward(x)));
        let x = self.pool.forward(self.relu.forward(self.conv3.forward(x)));
        let x = x.flatten::<2>(1, 3);
        log_softmax(self.fc.forward(x), 1)
    }

    /// Predicted class per image.
    pub fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 1, Int> {
        self.forward(images).argmax(1).flatten::<1>(0, 1)
    }
}

/// Per-sample negative log-likelihood, [batch].
pub fn nll<B: Backend>(log_probs: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    log_probs
        .gather(1, targets.unsqueeze_dim::<2>(1))
        .flatten::<1>(0, 1)
        .neg()
}

impl<B: AutodiffBackend> TrainStep<B, ShapeBatch<B>> for ShapeCnn<B> {
    fn step(&self, batch: ShapeBatch<B>) -> StepOutput<B> {
        let items = batch.labels.dims()[0];
        let loss  = nll(self.forward(batch.images), batch.labels).mean();
        StepOutput { loss, items }
    }
}

impl<B: Backend> ValidStep<ShapeBatch<B>> for ShapeCnn<B> {
    fn score(&self, batch: ShapeBatch<B>) -> BatchScore {
        let items     = batch.labels.dims()[0];
        let log_probs = self.forward(batch.images);
        let pred      = log_probs.clone().argmax(1).flatten::<1>(0, 1);

        let correct = pred
            .equal(batch.labels.clone())
            .int().sum().into_scalar().elem::<i64>() as usize;
        // Summed NLL; the evaluator divides by the dataset size
        let loss_sum = nll(log_probs, batch.labels).sum().into_scalar().elem::<f64>();

        BatchScore { loss_sum, items, correct, counted: items }
    }
}

// ─── Unit Tests ──────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;

    #[test]
    fn test_validate_needs_room_for_three_pools() {
        assert!(ShapeCnnConfig::new().validate().is_ok());
        assert!(ShapeCnnConfig::new().with_image_size(7).validate().is_err());
        assert!(ShapeCnnConfig::new().with_channels(0).validate().is_err());
    }

    #[test]
    fn test_default_flattens_to_288() {
        let cfg = ShapeCnnConfig::new();
        assert_eq!(cfg.pooled_size(), 6);
        let model: ShapeCnn<TestBackend> = cfg.init(&Default::default());
        assert_eq!(model.fc.weight.dims(), [288, 2]);
    }

    #[test]
    fn test_forward_is_log_probabilities() {
        let device = Default::default();
        let model: ShapeCnn<TestBackend> = ShapeCnnConfig::new().with_image_size(16).init(&device);
        let out = model.forward(Tensor::ones([3, 1, 16, 16], &device));
        assert_eq!(out.dims(), [3, 2]);

        let probs: Vec<f32> = out.exp().sum_dim(1).into_data().to_vec().unwrap();
        for p in probs {
            assert!((p - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_nll_picks_target_column() {
        let device    = Default::default();
        let log_probs = Tensor::<TestBackend, 2>::from_data([[-0.5f32, -2.0], [-3.0, -0.25]], &device);
        let targets   = Tensor::<TestBackend, 1, Int>::from_data([1i64, 1], &device);
        let loss: Vec<f32> = nll(log_probs, targets).into_data().to_vec().unwrap();
        assert_eq!(loss, vec![2.0, 0.25]);
    }

    #[test]
    fn test_train_step_has_gradients() {
        type B = Autodiff<TestBackend>;
        let device = Default::default();
        let model: ShapeCnn<B> = ShapeCnnConfig::new().with_image_size(8).init(&device);
        let batch = ShapeBatch {
            images: Tensor::<B, 4>::ones([2, 1, 8, 8], &device),
            labels: Tensor::<B, 1, Int>::from_data([0i64, 1], &device),
        };
        let out = model.step(batch);
        assert_eq!(out.items, 2);
        let grads = out.loss.backward();
        assert!(model.fc.weight.grad(&grads).is_some());
    }
}
