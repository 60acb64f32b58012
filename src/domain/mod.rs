// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing what the system works
// with, independent of Burn, image or audio crates:
//
//   sample.rs — the (input, target) pairs every script trains on
//   traits.rs — the seams the data and ml layers implement
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only structs, enums and traits

/// Samples: shape images, series windows, token pairs
pub mod sample;

/// Core abstractions other layers implement
pub mod traits;
