// ============================================================
// Layer 5 — Audio Transformer
// ============================================================
// Decoder-only next-value regressor over quantised audio.
//
//   bins [B,T] → Embedding(4096, d)·√d + PE
//              → causal self-attention → add & norm
//              → FFN(ReLU) → add & norm
//              → mean over time → Linear(→ 1) → [B,1]
//
// Trained with MSE against the real-valued next sample. During
// generation the context is the last `d_model` generated values.

use anyhow::{ensure, Result};
use burn::{
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::{MseLoss, Reduction},
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::{activation::relu, backend::AutodiffBackend},
};

use crate::data::{batcher::AudioTokenBatch, quantizer::Quantizer};
use crate::domain::traits::NextValuePredictor;
use crate::ml::evaluator::{BatchScore, ValidStep};
use crate::ml::positional::add_position;
use crate::ml::trainer::{StepOutput, TrainStep};

#[derive(Config, Debug)]
pub struct AudioTransformerConfig {
    #[config(default = 4096)]
    pub bins:      usize,
    #[config(default = 1024)]
    pub d_model:   usize,
    #[config(default = 2048)]
    pub d_ff:      usize,
    #[config(default = 1)]
    pub num_heads: usize,
}

impl AudioTransformerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.bins >= 2, "the input embedding needs at least 2 bins, got {}", self.bins);
        ensure!(self.d_model > 0 && self.d_ff > 0, "d_model and d_ff must be positive");
        ensure!(
            self.num_heads > 0 && self.d_model % self.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})",
            self.d_model, self.num_heads,
        );
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> AudioTransformer<B> {
        let norm = || LayerNormConfig::new(self.d_model).with_epsilon(1e-6).init(device);
        AudioTransformer {
            embedding: EmbeddingConfig::new(self.bins, self.d_model).init(device),
            attention: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(0.0)
                .init(device),
            norm1:     norm(),
            ff1:       LinearConfig::new(self.d_model, self.d_ff).init(device),
            ff2:       LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm2:     norm(),
            head:      LinearConfig::new(self.d_model, 1).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct AudioTransformer<B: Backend> {
    pub embedding: Embedding<B>,
    pub attention: MultiHeadAttention<B>,
    pub norm1:     LayerNorm<B>,
    pub ff1:       Linear<B>,
    pub ff2:       Linear<B>,
    pub norm2:     LayerNorm<B>,
    pub head:      Linear<B>,
}

impl<B: Backend> AudioTransformer<B> {
    /// bins: [batch, T] → next value [batch, 1]
    pub fn forward(&self, bins: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch, steps] = bins.dims();
        let x = add_position(self.embedding.forward(bins));

        let causal = generate_autoregressive_mask::<B>(batch, steps, &x.device());
        let attn = self.attention
            .forward(MhaInput::self_attn(x.clone()).mask_attn(causal))
            .context;
        let x = self.norm1.forward(x + attn);

        let ffn = self.ff2.forward(relu(self.ff1.forward(x.clone())));
        let x = self.norm2.forward(x + ffn);

        let [_, _, d_model] = x.dims();
        let pooled = x.mean_dim(1).reshape([batch, d_model]);
        self.head.forward(pooled)
    }
}

impl<B: AutodiffBackend> TrainStep<B, AudioTokenBatch<B>> for AudioTransformer<B> {
    fn step(&self, batch: AudioTokenBatch<B>) -> StepOutput<B> {
        let items = batch.targets.dims()[0];
        let pred  = self.forward(batch.inputs);
        let loss  = MseLoss::new().forward(pred, batch.targets, Reduction::Mean);
        StepOutput { loss, items }
    }
}

impl<B: Backend> ValidStep<AudioTokenBatch<B>> for AudioTransformer<B> {
    fn score(&self, batch: AudioTokenBatch<B>) -> BatchScore {
        let items = batch.targets.dims()[0];
        let pred  = self.forward(batch.inputs);
        let loss  = MseLoss::new()
            .forward(pred, batch.targets, Reduction::Mean)
            .into_scalar()
            .elem::<f64>();
        BatchScore::regression(loss * items as f64, items)
    }
}

// ─── Generation ──────────────────────────────────────────────────────────────
pub struct AudioTransformerPredictor<B: Backend> {
    model:     AudioTransformer<B>,
    quantizer: Quantizer,
    device:    B::Device,
}

impl<B: Backend> AudioTransformerPredictor<B> {
    pub fn new(model: AudioTransformer<B>, quantizer: Quantizer, device: B::Device) -> Self {
        Self { model, quantizer, device }
    }
}

impl<B: Backend> NextValuePredictor for AudioTransformerPredictor<B> {
    fn predict_next(&self, context: &[f32]) -> Result<f32> {
        anyhow::ensure!(!context.is_empty(), "audio transformer needs at least one context sample");
        let bins: Vec<i64> = context.iter().map(|&v| self.quantizer.encode(v) as i64).collect();
        let input = Tensor::<B, 2, Int>::from_data(TensorData::new(bins, [1, context.len()]), &self.device);
        let value = self.model.forward(input).into_scalar().elem::<f32>();
        Ok(value.clamp(-1.0, 1.0))
    }
}

// ─── Unit Tests ──────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;

    type TestBackend = NdArray;

    fn tiny() -> AudioTransformerConfig {
        AudioTransformerConfig::new().with_bins(32).with_d_model(8).with_d_ff(16)
    }

    #[test]
    fn test_validate_checks_heads_and_bins() {
        assert!(tiny().validate().is_ok());
        assert!(tiny().with_bins(1).validate().is_err());
        assert!(tiny().with_num_heads(3).validate().is_err());
        assert!(tiny().with_num_heads(0).validate().is_err());
    }

    #[test]
    fn test_forward_is_one_value_per_sequence() {
        let device = Default::default();
        let model: AudioTransformer<TestBackend> = tiny().init(&device);
        let out = model.forward(Tensor::zeros([3, 11], &device));
        assert_eq!(out.dims(), [3, 1]);
    }

    #[test]
    fn test_train_step_and_predictor() {
        type B = Autodiff<TestBackend>;
        let device = Default::default();
        let model: AudioTransformer<B> = tiny().init(&device);
        let batch = AudioTokenBatch {
            inputs:  Tensor::<B, 2, Int>::zeros([2, 5], &device),
            targets: Tensor::<B, 2>::zeros([2, 1], &device),
        };
        let out = model.step(batch);
        assert!(out.loss.into_scalar().elem::<f64>().is_finite());

        let predictor = AudioTransformerPredictor::new(model.valid(), Quantizer::new(32).unwrap(), device);
        let next = predictor.predict_next(&[0.5, -0.5, 0.25]).unwrap();
        assert!((-1.0..=1.0).contains(&next));
    }
}
