// ============================================================
// Layer 4 — Amplitude Quantiser
// ============================================================
// Maps amplitudes in [-1, 1] onto `bins` equal-width bins and
// back to bin centres. Out-of-range values are clamped.
//
// Used for the WaveNet class targets (256 bins) and for the
// audio transformer's embedding input (4096 bins).

use crate::data::error::{DatasetError, DatasetResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    bins: usize,
}

impl Quantizer {
    /// Fails if fewer than two bins are requested.
    pub fn new(bins: usize) -> DatasetResult<Self> {
        if bins < 2 {
            return Err(DatasetError::Other(format!("a quantiser needs at least 2 bins, got {bins}")));
        }
        Ok(Self { bins })
    }

    pub fn encode(&self, value: f32) -> usize {
        let v = if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) };
        let bin = ((v + 1.0) / 2.0 * self.bins as f32).floor() as usize;
        bin.min(self.bins - 1)
    }

    pub fn decode(&self, bin: usize) -> f32 {
        let width = 2.0 / self.bins as f32;
        -1.0 + (bin.min(self.bins - 1) as f32 + 0.5) * width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_map_to_first_and_last_bin() {
        let q = Quantizer::new(256).unwrap();
        assert_eq!(q.encode(-1.0), 0);
        assert_eq!(q.encode(1.0), 255);
        assert_eq!(q.encode(5.0), 255);
        assert_eq!(q.encode(-5.0), 0);
    }

    #[test]
    fn test_decode_is_within_half_a_bin() {
        let q = Quantizer::new(4096).unwrap();
        for v in [-0.9f32, -0.25, 0.0, 0.33, 0.999] {
            let back = q.decode(q.encode(v));
            assert!((back - v).abs() <= 1.0 / 4096.0 + 1e-6, "{v} -> {back}");
        }
    }

    #[test]
    fn test_single_bin_is_rejected() {
        assert!(Quantizer::new(1).is_err());
        assert!(Quantizer::new(0).is_err());
    }
}
