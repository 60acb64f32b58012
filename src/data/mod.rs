// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between files on disk and tensor batches.
//
//   images:  manifest CSV ─► ImageTransform ─► ImageSample
//   audio:   WAV dir / sine ─► windowing ─────► SeriesSample
//   text:    TSV pairs ─► tokenizers ─────────► TokenPair
//                   │
//                   ▼
//   splitter  → seeded shuffle or chronological train/valid split
//   dataset   → Burn Dataset over the in-memory samples
//   batcher   → Burn Batcher per model family
//
// Loaders either return every sample or a DatasetError; a
// missing or unreadable file never yields a partial dataset.

/// Typed errors for manifest, image and audio loading
pub mod error;

/// CSV manifest of `image_path,label` rows
pub mod manifest;

/// Grayscale resize and [0, 1] scaling for shape images
pub mod image_transform;

/// Synthetic circle / square dataset generator
pub mod shapes;

/// WAV decoding and synthetic sine waves
pub mod audio;

/// Sliding past/future windows over a 1-D series
pub mod windowing;

/// Amplitude ↔ bin mapping
pub mod quantizer;

/// Tab-separated translation pairs
pub mod pairs;

/// Shuffles and splits data into train/validation sets
pub mod splitter;

/// Implements Burn's Dataset trait over loaded samples
pub mod dataset;

/// Implements Burn's Batcher trait for each model family
pub mod batcher;
