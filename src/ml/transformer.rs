// ============================================================
// Layer 5 — Encoder–Decoder Transformer
// ============================================================
// Sequence-to-sequence translator (Vaswani et al., 2017).
//
//   source ids [B,S] → embed·√d + PE → dropout → N × EncoderLayer
//   target ids [B,T] → embed·√d + PE → dropout → N × DecoderLayer
//                                        (over the encoder output)
//                    → Linear(→ target vocab) → logits [B,T,V]
//
// EncoderLayer: self-attention → dropout → add & norm
//               → FFN(ReLU) → dropout → add & norm
// DecoderLayer: causal self-attention → add & norm
//               → cross-attention over the encoder → add & norm
//               → FFN(ReLU) → add & norm
//
// Source padding is masked in encoder self-attention and in
// decoder cross-attention. Target padding needs no mask: pads
// only ever follow real tokens, causal attention keeps real
// positions from seeing them, and the loss ignores pad targets.

use anyhow::{ensure, Result};
use burn::{
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::{
        activation::{log_softmax, relu},
        backend::AutodiffBackend,
    },
};

use crate::data::batcher::TokenBatch;
use crate::domain::traits::NextTokenPredictor;
use crate::infra::tokenizer_store::PAD_ID;
use crate::ml::evaluator::{BatchScore, ValidStep};
use crate::ml::positional::add_position;
use crate::ml::shape_cnn::nll;
use crate::ml::trainer::{StepOutput, TrainStep};

#[derive(Config, Debug)]
pub struct TransformerConfig {
    pub source_vocab: usize,
    pub target_vocab: usize,
    #[config(default = 4)]
    pub num_layers:   usize,
    #[config(default = 128)]
    pub d_model:      usize,
    #[config(default = 512)]
    pub d_ff:         usize,
    #[config(default = 8)]
    pub num_heads:    usize,
    #[config(default = 0.1)]
    pub dropout:      f64,
}

impl TransformerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.num_layers >= 1, "the transformer needs at least one layer");
        ensure!(self.d_model > 0 && self.d_ff > 0, "d_model and d_ff must be positive");
        ensure!(
            self.num_heads > 0 && self.d_model % self.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})",
            self.d_model, self.num_heads,
        );
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Transformer<B> {
        Transformer {
            source_embedding: EmbeddingConfig::new(self.source_vocab, self.d_model).init(device),
            target_embedding: EmbeddingConfig::new(self.target_vocab, self.d_model).init(device),
            encoder: (0..self.num_layers).map(|_| self.encoder_layer(device)).collect(),
            decoder: (0..self.num_layers).map(|_| self.decoder_layer(device)).collect(),
            output:  LinearConfig::new(self.d_model, self.target_vocab).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }

    fn attention<B: Backend>(&self, device: &B::Device) -> MultiHeadAttention<B> {
        MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device)
    }

    fn norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.d_model).with_epsilon(1e-6).init(device)
    }

    fn ffn<B: Backend>(&self, device: &B::Device) -> FeedForward<B> {
        FeedForward {
            linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
        }
    }

    fn encoder_layer<B: Backend>(&self, device: &B::Device) -> EncoderLayer<B> {
        EncoderLayer {
            self_attn: self.attention(device),
            ffn:       self.ffn(device),
            norm1:     self.norm(device),
            norm2:     self.norm(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
        }
    }

    fn decoder_layer<B: Backend>(&self, device: &B::Device) -> DecoderLayer<B> {
        DecoderLayer {
            self_attn:  self.attention(device),
            cross_attn: self.attention(device),
            ffn:        self.ffn(device),
            norm1:      self.norm(device),
            norm2:      self.norm(device),
            norm3:      self.norm(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
        }
    }
}

// ─── Building blocks ─────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    pub linear1: Linear<B>,
    pub linear2: Linear<B>,
}

impl<B: Backend> FeedForward<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.linear2.forward(relu(self.linear1.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct EncoderLayer<B: Backend> {
    pub self_attn: MultiHeadAttention<B>,
    pub ffn:       FeedForward<B>,
    pub norm1:     LayerNorm<B>,
    pub norm2:     LayerNorm<B>,
    pub dropout:   Dropout,
}

impl<B: Backend> EncoderLayer<B> {
    pub fn forward(&self, x: Tensor<B, 3>, source_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self.self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(source_pad))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn));
        let ffn = self.ffn.forward(x.clone());
        self.norm2.forward(x + self.dropout.forward(ffn))
    }
}

#[derive(Module, Debug)]
pub struct DecoderLayer<B: Backend> {
    pub self_attn:  MultiHeadAttention<B>,
    pub cross_attn: MultiHeadAttention<B>,
    pub ffn:        FeedForward<B>,
    pub norm1:      LayerNorm<B>,
    pub norm2:      LayerNorm<B>,
    pub norm3:      LayerNorm<B>,
    pub dropout:    Dropout,
}

impl<B: Backend> DecoderLayer<B> {
    pub fn forward(
        &self,
        x:          Tensor<B, 3>,
        memory:     Tensor<B, 3>,
        source_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let [batch, steps, _] = x.dims();
        let causal = generate_autoregressive_mask::<B>(batch, steps, &x.device());

        let attn = self.self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_attn(causal))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn));

        let cross = self.cross_attn
            .forward(MhaInput::new(x.clone(), memory.clone(), memory).mask_pad(source_pad))
            .context;
        let x = self.norm2.forward(x + self.dropout.forward(cross));

        let ffn = self.ffn.forward(x.clone());
        self.norm3.forward(x + self.dropout.forward(ffn))
    }
}

// ─── Model ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Transformer<B: Backend> {
    pub source_embedding: Embedding<B>,
    pub target_embedding: Embedding<B>,
    pub encoder:          Vec<EncoderLayer<B>>,
    pub decoder:          Vec<DecoderLayer<B>>,
    pub output:           Linear<B>,
    pub dropout:          Dropout,
}

impl<B: Backend> Transformer<B> {
    /// source: [batch, S], source_pad: [batch, S] (true = pad) → [batch, S, d_model]
    pub fn encode(&self, source: Tensor<B, 2, Int>, source_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let mut x = self.dropout.forward(add_position(self.source_embedding.forward(source)));
        for layer in &self.encoder {
            x = layer.forward(x, source_pad.clone());
        }
        x
    }

    /// target: [batch, T] → logits [batch, T, target_vocab]
    pub fn decode(
        &self,
        target:     Tensor<B, 2, Int>,
        memory:     Tensor<B, 3>,
        source_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let mut x = self.dropout.forward(add_position(self.target_embedding.forward(target)));
        for layer in &self.decoder {
            x = layer.forward(x, memory.clone(), source_pad.clone());
        }
        self.output.forward(x)
    }

    pub fn forward(
        &self,
        source:     Tensor<B, 2, Int>,
        source_pad: Tensor<B, 2, Bool>,
        target:     Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let memory = self.encode(source, source_pad.clone());
        self.decode(target, memory, source_pad)
    }

    /// Flattened logits [batch·T, V] and targets [batch·T].
    fn flat_logits(&self, batch: TokenBatch<B>) -> (Tensor<B, 2>, Tensor<B, 1, Int>) {
        let logits = self.forward(batch.source, batch.source_pad, batch.target_in);
        let [b, t, v] = logits.dims();
        (logits.reshape([b * t, v]), batch.target_out.reshape([b * t]))
    }
}

/// Summed NLL over non-pad targets, and the count of those targets.
fn masked_nll_sum<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> (Tensor<B, 1>, Tensor<B, 1>) {
    let real = targets.clone().equal_elem(PAD_ID as i64).bool_not().float();
    let per_token = nll(log_softmax(logits, 1), targets);
    ((per_token * real.clone()).sum(), real.sum())
}

/// Mean NLL per real target token. Pads count in neither numerator nor denominator.
fn masked_cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    let (sum, tokens) = masked_nll_sum(logits, targets);
    sum / tokens.clamp_min(1.0)
}

impl<B: AutodiffBackend> TrainStep<B, TokenBatch<B>> for Transformer<B> {
    fn step(&self, batch: TokenBatch<B>) -> StepOutput<B> {
        let items = batch.source.dims()[0];
        let (logits, targets) = self.flat_logits(batch);
        StepOutput { loss: masked_cross_entropy(logits, targets), items }
    }
}

impl<B: Backend> ValidStep<TokenBatch<B>> for Transformer<B> {
    /// Scored per non-pad target token.
    fn score(&self, batch: TokenBatch<B>) -> BatchScore {
        let (logits, targets) = self.flat_logits(batch);
        let real = targets.clone().equal_elem(PAD_ID as i64).bool_not().int();
        let pred = logits.clone().argmax(1).flatten::<1>(0, 1);

        let tokens  = real.clone().sum().into_scalar().elem::<i64>() as usize;
        let correct = (pred.equal(targets.clone()).int() * real)
            .sum().into_scalar().elem::<i64>() as usize;
        let (loss_sum, _) = masked_nll_sum(logits, targets);

        BatchScore { loss_sum: loss_sum.into_scalar().elem::<f64>(), items: tokens, correct, counted: tokens }
    }
}

// ─── Greedy decoding ─────────────────────────────────────────────────────────
pub struct TranslatorPredictor<B: Backend> {
    model:  Transformer<B>,
    device: B::Device,
}

impl<B: Backend> TranslatorPredictor<B> {
    pub fn new(model: Transformer<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    fn ids(&self, ids: &[u32]) -> Tensor<B, 2, Int> {
        let data: Vec<i64> = ids.iter().map(|&id| id as i64).collect();
        Tensor::from_data(TensorData::new(data, [1, ids.len()]), &self.device)
    }
}

impl<B: Backend> NextTokenPredictor for TranslatorPredictor<B> {
    fn predict_next_token(&self, source: &[u32], prefix: &[u32]) -> Result<u32> {
        anyhow::ensure!(!source.is_empty() && !prefix.is_empty(), "empty source or target prefix");

        let source     = self.ids(source);
        let source_pad = source.clone().equal_elem(PAD_ID as i64);
        let logits     = self.model.forward(source, source_pad, self.ids(prefix));

        let [_, steps, vocab] = logits.dims();
        let last = logits.slice([0..1, steps - 1..steps, 0..vocab]).reshape([1, vocab]);
        Ok(last.argmax(1).into_scalar().elem::<i64>() as u32)
    }
}

// ─── Unit Tests ──────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::data::dataloader::batcher::Batcher;
    use burn::module::AutodiffModule;

    use crate::data::batcher::TokenBatcher;
    use crate::domain::sample::TokenPair;

    type TestBackend = NdArray;

    fn tiny() -> TransformerConfig {
        TransformerConfig::new(12, 10)
            .with_num_layers(2)
            .with_d_model(8)
            .with_d_ff(16)
            .with_num_heads(2)
            .with_dropout(0.0)
    }

    fn pairs() -> Vec<TokenPair> {
        vec![
            TokenPair { source: vec![2, 5, 6, 3],    target: vec![2, 7, 3] },
            TokenPair { source: vec![2, 8, 3],       target: vec![2, 4, 5, 6, 3] },
        ]
    }

    #[test]
    fn test_validate_checks_head_split() {
        assert!(tiny().validate().is_ok());
        assert!(tiny().with_num_heads(3).validate().is_err());
        assert!(tiny().with_num_layers(0).validate().is_err());
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model: Transformer<TestBackend> = tiny().init(&device);
        let batch = TokenBatcher::<TestBackend>::new(device.clone()).batch(pairs());
        let logits = model.forward(batch.source, batch.source_pad, batch.target_in);
        assert_eq!(logits.dims(), [2, 4, 10]);
    }

    #[test]
    fn test_decoder_is_causal() {
        let device = Default::default();
        let model: Transformer<TestBackend> = tiny().init(&device);
        let source = Tensor::<TestBackend, 2, Int>::from_data([[2i64, 5, 3]], &device);
        let pad    = source.clone().equal_elem(0);

        let run = |target: [i64; 3]| -> Vec<f32> {
            let t = Tensor::<TestBackend, 2, Int>::from_data([target], &device);
            model.forward(source.clone(), pad.clone(), t)
                .slice([0..1, 0..2, 0..10])
                .into_data()
                .to_vec()
                .unwrap()
        };
        // Changing the last target token must not change earlier positions
        let a = run([2, 4, 5]);
        let b = run([2, 4, 9]);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_valid_score_counts_real_tokens() {
        let device = Default::default();
        let model: Transformer<TestBackend> = tiny().init(&device);
        let batch = TokenBatcher::<TestBackend>::new(device.clone()).batch(pairs());
        let score = model.score(batch);
        // target_out: [7,3,0,0] and [4,5,6,3]
        assert_eq!(score.items, 6);
        assert_eq!(score.counted, 6);
        assert!(score.correct <= 6);
        assert!(score.loss_sum.is_finite());
    }

    #[test]
    fn test_masked_loss_averages_over_real_tokens() {
        let device = Default::default();
        // Uniform logits over two classes: every real token costs ln 2
        let logits  = Tensor::<TestBackend, 2>::zeros([4, 2], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_data([1i64, 1, 0, 0], &device);

        let mean = masked_cross_entropy(logits.clone(), targets.clone()).into_scalar().elem::<f64>();
        assert!((mean - std::f64::consts::LN_2).abs() < 1e-5, "mean = {mean}");

        let (sum, tokens) = masked_nll_sum(logits, targets);
        assert!((sum.into_scalar().elem::<f64>() - 2.0 * std::f64::consts::LN_2).abs() < 1e-5);
        assert_eq!(tokens.into_scalar().elem::<f64>(), 2.0);
    }

    #[test]
    fn test_all_pad_targets_give_zero_loss() {
        let device = Default::default();
        let logits  = Tensor::<TestBackend, 2>::zeros([3, 2], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_data([0i64, 0, 0], &device);
        let loss = masked_cross_entropy(logits, targets).into_scalar().elem::<f64>();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn test_train_step_and_greedy_token() {
        type B = Autodiff<TestBackend>;
        let device = Default::default();
        let model: Transformer<B> = tiny().init(&device);
        let batch = TokenBatcher::<B>::new(device.clone()).batch(pairs());

        let out = model.step(batch);
        assert_eq!(out.items, 2);
        assert!(out.loss.into_scalar().elem::<f64>().is_finite());

        let predictor = TranslatorPredictor::new(model.valid(), device);
        let next = predictor.predict_next_token(&[2, 5, 3], &[2]).unwrap();
        assert!(next < 10);
        assert!(predictor.predict_next_token(&[2, 5, 3], &[]).is_err());
    }
}
