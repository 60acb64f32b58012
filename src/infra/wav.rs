// ============================================================
// Layer 6 — WAV Writer
// ============================================================
// Generated audio is written as mono 32-bit float WAV through
// hound. Values are clamped to [-1, 1] before writing.

use anyhow::{Context, Result};
use std::path::Path;

pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }

    let spec = hound::WavSpec {
        channels:        1,
        sample_rate,
        bits_per_sample: 32,
        sample_format:   hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Cannot create WAV file '{}'", path.display()))?;
    for &s in samples {
        writer.write_sample(s.clamp(-1.0, 1.0))?;
    }
    writer
        .finalize()
        .with_context(|| format!("Cannot finalise WAV file '{}'", path.display()))?;

    tracing::info!("Wrote {} samples to '{}'", samples.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::audio::decode_wav;

    #[test]
    fn test_written_wav_decodes_back() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("generated.wav");

        write_wav(&path, &[0.25, -0.5, 2.0], 22050).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(decode_wav(&path, 3).unwrap(), vec![0.25, -0.5, 1.0]);
    }
}
