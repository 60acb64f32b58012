// ============================================================
// Layer 4 — Series Windowing
// ============================================================
// Turns one long series into supervised samples.
//
// For a window starting at i:
//   input  = series[i .. i+past]        (every `step`-th value)
//   target = series[i+past+delay .. i+past+delay+future]
//
// Window starts advance by `hop`. With delay = 0, future = 1 this
// is the classic "predict the next sample" set; delay > 0 is the
// weather-style forecaster that predicts one value `delay` steps
// beyond the end of the window.
//
// Example: series = [0,1,2,3,4], past = 2, future = 1
//   [0,1] → [2]
//   [1,2] → [3]
//   [2,3] → [4]

use serde::{Deserialize, Serialize};

use crate::data::error::{DatasetError, DatasetResult};
use crate::domain::sample::SeriesSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub past:   usize,
    pub future: usize,
    pub delay:  usize,
    pub step:   usize,
    pub hop:    usize,
}

impl WindowSpec {
    /// Fails if `past` or `future` is zero.
    pub fn new(past: usize, future: usize) -> DatasetResult<Self> {
        let spec = Self { past, future, delay: 0, step: 1, hop: 1 };
        spec.check()?;
        Ok(spec)
    }

    /// Re-check a spec built field by field or read back from disk.
    pub fn check(&self) -> DatasetResult<()> {
        if self.past == 0 || self.future == 0 || self.step == 0 || self.hop == 0 {
            return Err(DatasetError::Other(format!(
                "window past ({}), future ({}), step ({}) and hop ({}) must be positive",
                self.past, self.future, self.step, self.hop,
            )));
        }
        Ok(())
    }

    pub fn with_delay(mut self, delay: usize) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step.max(1);
        self
    }

    pub fn with_hop(mut self, hop: usize) -> Self {
        self.hop = hop.max(1);
        self
    }

    /// Number of values the model actually sees per window.
    pub fn input_len(&self) -> usize {
        (self.past + self.step - 1) / self.step
    }

    /// Span of the series one sample covers.
    fn span(&self) -> usize {
        self.past + self.delay + self.future
    }

    /// How many windows a series of `len` values yields.
    pub fn count(&self, len: usize) -> usize {
        if len < self.span() {
            0
        } else {
            (len - self.span()) / self.hop + 1
        }
    }
}

pub fn window_series(series: &[f32], spec: &WindowSpec) -> Vec<SeriesSample> {
    (0..spec.count(series.len()))
        .map(|w| {
            let i     = w * spec.hop;
            let input = series[i..i + spec.past].iter().step_by(spec.step).copied().collect();
            let t0    = i + spec.past + spec.delay;
            SeriesSample::new(input, series[t0..t0 + spec.future].to_vec())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f32> {
        (0..n).map(|v| v as f32).collect()
    }

    #[test]
    fn test_single_step_windows() {
        let w = window_series(&ramp(5), &WindowSpec::new(2, 1).unwrap());
        assert_eq!(w.len(), 3);
        assert_eq!(w[0], SeriesSample::new(vec![0.0, 1.0], vec![2.0]));
        assert_eq!(w[2], SeriesSample::new(vec![2.0, 3.0], vec![4.0]));
    }

    #[test]
    fn test_multi_step_windows() {
        let w = window_series(&ramp(10), &WindowSpec::new(4, 3).unwrap());
        assert_eq!(w.len(), 4);
        assert_eq!(w[3].input, vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(w[3].target, vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_delay_and_step() {
        let spec = WindowSpec::new(4, 1).unwrap().with_delay(2).with_step(2);
        let w    = window_series(&ramp(10), &spec);
        assert_eq!(spec.input_len(), 2);
        assert_eq!(w[0].input, vec![0.0, 2.0]);
        assert_eq!(w[0].target, vec![6.0]);
        assert_eq!(w.len(), 4);
    }

    #[test]
    fn test_hop_skips_starts() {
        let spec = WindowSpec::new(2, 1).unwrap().with_hop(3);
        let w    = window_series(&ramp(9), &spec);
        assert_eq!(w.len(), 3);
        assert_eq!(w[1].input, vec![3.0, 4.0]);
    }

    #[test]
    fn test_short_series_gives_no_windows() {
        assert!(window_series(&ramp(2), &WindowSpec::new(2, 1).unwrap()).is_empty());
    }

    #[test]
    fn test_zero_length_window_is_rejected() {
        assert!(WindowSpec::new(0, 1).is_err());
        assert!(WindowSpec::new(3, 0).is_err());

        let zero_hop = WindowSpec { hop: 0, ..WindowSpec::new(3, 1).unwrap() };
        assert!(zero_hop.check().is_err());
    }
}
