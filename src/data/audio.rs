// ============================================================
// Layer 4 — Audio Loader
// ============================================================
// Loads waveforms for the WaveNet, LSTM and audio transformer
// pipelines.
//
// Each `.wav` in a directory is decoded through hound, reduced
// to its first channel as f32 in [-1, 1], then truncated or
// zero-padded to exactly `desired_samples` so every wave has the
// same fixed length. Files are taken in name order; `limit` keeps
// only the first N of them.
//
// SineSource stands in for recorded audio when no directory is
// given, so every pipeline also runs on a clean periodic signal.

use anyhow::Result;
use std::{
    f32::consts::PI,
    fs,
    path::{Path, PathBuf},
};

use crate::data::error::{DatasetError, DatasetResult};
use crate::domain::traits::SampleSource;

pub struct WavDirectory {
    dir:             PathBuf,
    desired_samples: usize,
    limit:           Option<usize>,
}

impl WavDirectory {
    pub fn new(dir: impl Into<PathBuf>, desired_samples: usize) -> Self {
        Self { dir: dir.into(), desired_samples, limit: None }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Sorted `.wav` paths in the directory, after `limit`.
    pub fn list(&self) -> DatasetResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| DatasetError::io(&self.dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| DatasetError::io(&self.dir, e))?.path();
            let is_wav = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("wav"))
                .unwrap_or(false);
            if is_wav {
                paths.push(path);
            }
        }
        paths.sort();

        if let Some(limit) = self.limit {
            paths.truncate(limit);
        }
        Ok(paths)
    }
}

impl SampleSource<Vec<f32>> for WavDirectory {
    fn load_all(&self) -> Result<Vec<Vec<f32>>> {
        let paths = self.list()?;
        tracing::info!("Number of audio files: {}", paths.len());

        let mut waves = Vec::with_capacity(paths.len());
        for path in &paths {
            waves.push(decode_wav(path, self.desired_samples)?);
            tracing::debug!("Decoded '{}'", path.display());
        }
        Ok(waves)
    }
}

/// Decode the first channel of a WAV file to exactly
/// `desired_samples` values.
pub fn decode_wav(path: &Path, desired_samples: usize) -> DatasetResult<Vec<f32>> {
    let audio_err = |source| DatasetError::Audio { path: path.to_path_buf(), source };

    let mut reader = hound::WavReader::open(path).map_err(audio_err)?;
    let spec       = reader.spec();
    let channels   = spec.channels.max(1) as usize;

    // Interleaved frames; keep channel 0 and stop once we have enough
    let wanted = desired_samples.saturating_mul(channels);
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .take(wanted)
            .step_by(channels)
            .collect::<Result<_, _>>()
            .map_err(audio_err)?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .take(wanted)
                .step_by(channels)
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(audio_err)?
        }
    };

    Ok(fit_length(samples, desired_samples))
}

/// Truncate or zero-pad to exactly `len` values.
pub fn fit_length(mut samples: Vec<f32>, len: usize) -> Vec<f32> {
    samples.resize(len, 0.0);
    samples
}

/// Join waves end to end into one series.
pub fn concat(waves: Vec<Vec<f32>>) -> Vec<f32> {
    waves.into_iter().flatten().collect()
}

// ─── SineSource ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy)]
pub struct SineSource {
    pub frequency:   f32,
    pub sample_rate: u32,
    pub amplitude:   f32,
}

impl SineSource {
    pub fn new(frequency: f32, sample_rate: u32) -> Self {
        Self { frequency, sample_rate, amplitude: 0.8 }
    }

    pub fn generate(&self, len: usize) -> Vec<f32> {
        let step = 2.0 * PI * self.frequency / self.sample_rate as f32;
        (0..len).map(|i| self.amplitude * (step * i as f32).sin()).collect()
    }

    /// `count` sine waves of `len` samples, each starting at a
    /// different phase so they are not identical samples.
    pub fn waves(&self, count: usize, len: usize) -> Vec<Vec<f32>> {
        let full = self.generate(len + count * 7);
        (0..count).map(|i| full[i * 7..i * 7 + len].to_vec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_int_wav(path: &Path, channels: u16, frames: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for s in frames {
            w.write_sample(*s).unwrap();
        }
        w.finalize().unwrap();
    }

    #[test]
    fn test_fit_length_truncates_and_pads() {
        assert_eq!(fit_length(vec![1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
        assert_eq!(fit_length(vec![1.0], 3), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_decode_keeps_first_channel_and_pads() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        // Stereo: left = 16384 (0.5), right = -16384
        write_int_wav(&path, 2, &[16384, -16384, 16384, -16384]);

        let wave = decode_wav(&path, 4).unwrap();
        assert_eq!(wave, vec![0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_directory_is_sorted_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        write_int_wav(&dir.path().join("b.wav"), 1, &[0; 8]);
        write_int_wav(&dir.path().join("a.wav"), 1, &[0; 8]);
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let src   = WavDirectory::new(dir.path(), 16).with_limit(Some(1));
        let paths = src.list().unwrap();
        assert_eq!(paths, vec![dir.path().join("a.wav")]);

        let waves = src.load_all().unwrap();
        assert_eq!(waves.len(), 1);
        assert_eq!(waves[0].len(), 16);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let src = WavDirectory::new("/definitely/not/here", 16);
        assert!(src.load_all().is_err());
    }

    #[test]
    fn test_sine_stays_in_range() {
        let wave = SineSource::new(440.0, 22050).generate(1000);
        assert_eq!(wave.len(), 1000);
        assert!(wave.iter().all(|v| v.abs() <= 0.8 + 1e-6));
    }
}
