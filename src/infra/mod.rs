// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by several use cases:
//
//   checkpoint.rs      — model weights (Burn CompactRecorder),
//                        the latest-epoch pointer and the JSON
//                        run config needed to rebuild a model
//
//   metrics.rs         — one CSV row per model per epoch
//
//   tokenizer_store.rs — word-level tokenizers for the
//                        translation corpus, one per language,
//                        built once and reloaded afterwards
//
//   wav.rs             — writes generated and preprocessed
//                        audio as mono float WAV files

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;

/// WAV output
pub mod wav;
