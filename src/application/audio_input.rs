// ============================================================
// Layer 2 — Audio Input
// ============================================================
// The audio use cases all start from a list of equal-length
// waves: decoded from a directory of `.wav` files when one is
// given, otherwise synthesised sine waves of the same length.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::data::audio::{SineSource, WavDirectory};
use crate::domain::traits::SampleSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioInput {
    /// Directory of `.wav` files; None selects the sine source
    pub audio_dir:       Option<String>,
    /// Every wave is truncated or zero-padded to this length
    pub desired_samples: usize,
    /// Use only the first N files (name order)
    pub limit:           Option<usize>,
    pub sample_rate:     u32,
    pub sine_frequency:  f32,
    /// Number of sine waves when no directory is given
    pub sine_waves:      usize,
}

impl Default for AudioInput {
    fn default() -> Self {
        Self {
            audio_dir:       None,
            desired_samples: 110_250,
            limit:           Some(1),
            sample_rate:     22_050,
            sine_frequency:  440.0,
            sine_waves:      1,
        }
    }
}

impl AudioInput {
    pub fn load_waves(&self) -> Result<Vec<Vec<f32>>> {
        let waves = match &self.audio_dir {
            Some(dir) => {
                tracing::info!("Loading audio from '{}'", dir);
                WavDirectory::new(dir, self.desired_samples)
                    .with_limit(self.limit)
                    .load_all()?
            }
            None => {
                tracing::info!(
                    "No audio directory given, using {} sine wave(s) at {} Hz",
                    self.sine_waves, self.sine_frequency,
                );
                SineSource::new(self.sine_frequency, self.sample_rate)
                    .waves(self.sine_waves, self.desired_samples)
            }
        };
        ensure!(!waves.is_empty(), "No audio to train on");
        Ok(waves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_fallback_has_requested_shape() {
        let input = AudioInput { desired_samples: 64, sine_waves: 3, ..AudioInput::default() };
        let waves = input.load_waves().unwrap();
        assert_eq!(waves.len(), 3);
        assert!(waves.iter().all(|w| w.len() == 64));
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir   = tempfile::tempdir().unwrap();
        let input = AudioInput {
            audio_dir: Some(dir.path().display().to_string()),
            ..AudioInput::default()
        };
        assert!(input.load_waves().is_err());
    }
}
