// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to these traits, so a CSV
// manifest, a directory of WAV files or a synthetic generator
// can all feed the same pipeline, and the autoregressive loops
// in Layer 5 can be tested without a trained network.

use anyhow::Result;

// ─── SampleSource ────────────────────────────────────────────────────────────
/// Anything that can produce a finite collection of items.
///
/// Implementations:
///   - ShapeSource  → CSV manifest of images
///   - WavDirectory → one waveform per `.wav` file
pub trait SampleSource<T> {
    /// Load every item. A missing or corrupt file aborts the load.
    fn load_all(&self) -> Result<Vec<T>>;
}

// ─── NextValuePredictor ──────────────────────────────────────────────────────
/// A model that predicts the next value of a series from the
/// values seen so far.
pub trait NextValuePredictor {
    fn predict_next(&self, context: &[f32]) -> Result<f32>;
}

// ─── NextTokenPredictor ──────────────────────────────────────────────────────
/// A sequence-to-sequence model that predicts the next target
/// token given the full source and the target prefix.
pub trait NextTokenPredictor {
    fn predict_next_token(&self, source: &[u32], prefix: &[u32]) -> Result<u32>;
}
