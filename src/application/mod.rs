// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// One use case per model family. Each owns a serialisable run
// config and coordinates the other layers:
//
//   load (Layer 4) → split (Layer 4) → save config (Layer 6)
//   → fit (Layer 5) → evaluate / generate (Layer 5) → write (Layer 6)
//
// No model maths here and no argument parsing; the CLI builds
// the configs and this layer only decides the order of work.
// The audio use cases can also rebuild their model from the
// saved config and latest checkpoint and generate again.

/// Shared audio loading for the waveform use cases
pub mod audio_input;

/// Synthetic shape generation and CNN training
pub mod shapes_use_case;

/// WaveNet training and sampling
pub mod wavenet_use_case;

/// LSTM forecasting
pub mod forecast_use_case;

/// Transformer translation
pub mod translate_use_case;

/// Audio transformer training and sampling
pub mod audio_transformer_use_case;
