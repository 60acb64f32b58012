// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, trains or runs a network.
//
//   shape_cnn.rs         — 3×(conv → ReLU → pool) image classifier
//   wavenet.rs           — gated dilated causal conv generator
//   lstm.rs              — LSTM forecaster (single / multi-step)
//   transformer.rs       — encoder–decoder translator
//   audio_transformer.rs — causal attention next-value regressor
//   positional.rs        — sinusoidal positional encoding
//   schedule.rs          — constant or warm-up learning rate
//   trainer.rs           — generic epoch loop + checkpointing
//   evaluator.rs         — held-out loss / accuracy
//   generate.rs          — autoregressive series and token loops
//
// Training always runs on `TrainBackend` (autodiff); evaluation
// and generation run on `InferBackend` via `model.valid()` or a
// model loaded from a checkpoint.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

use burn::prelude::*;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;
#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

pub type Device = <InferBackend as Backend>::Device;

pub fn default_device() -> Device {
    Default::default()
}

/// Image classifier for the synthetic shape dataset
pub mod shape_cnn;

/// Autoregressive causal convolutional generator
pub mod wavenet;

/// Recurrent forecaster
pub mod lstm;

/// Sinusoidal positional encoding shared by both transformers
pub mod positional;

/// Encoder–decoder sequence-to-sequence transformer
pub mod transformer;

/// Decoder-only audio transformer
pub mod audio_transformer;

/// Learning-rate policies
pub mod schedule;

/// Generic training loop with validation and checkpointing
pub mod trainer;

/// Held-out evaluation
pub mod evaluator;

/// Autoregressive generation
pub mod generate;
