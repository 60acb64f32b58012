// ============================================================
// Layer 5 — Autoregressive Generation
// ============================================================
// Both loops only see the predictor traits from Layer 3, so they
// run the same way for WaveNet, the LSTM, the audio transformer
// and the translator, and can be tested with closures in place
// of trained networks.

use anyhow::Result;

use crate::domain::traits::{NextTokenPredictor, NextValuePredictor};

/// Extend `seed` by `steps` predicted values.
///
/// Each prediction sees at most the last `context` values of the
/// series so far (all of them when `context` is 0) and is
/// appended before the next one. The result always has
/// `seed.len() + steps` values and starts with `seed`.
pub fn extend_series<P: NextValuePredictor + ?Sized>(
    predictor: &P,
    seed:      &[f32],
    steps:     usize,
    context:   usize,
) -> Result<Vec<f32>> {
    anyhow::ensure!(!seed.is_empty(), "cannot extend an empty series");

    let mut series = Vec::with_capacity(seed.len() + steps);
    series.extend_from_slice(seed);

    for i in 0..steps {
        let start = if context == 0 { 0 } else { series.len().saturating_sub(context) };
        let next  = predictor.predict_next(&series[start..])?;
        series.push(next);

        if (i + 1) % 1000 == 0 {
            tracing::info!("Generated {}/{} samples", i + 1, steps);
        }
    }
    Ok(series)
}

/// Greedy decoding: start from `[start]` and append the most
/// likely token until `end` is produced or `max_new` tokens have
/// been added. The result has at most `1 + max_new` ids and
/// includes `end` when it was produced.
pub fn greedy_decode<P: NextTokenPredictor + ?Sized>(
    predictor: &P,
    source:    &[u32],
    start:     u32,
    end:       u32,
    max_new:   usize,
) -> Result<Vec<u32>> {
    let mut output = vec![start];
    for _ in 0..max_new {
        let next = predictor.predict_next_token(source, &output)?;
        output.push(next);
        if next == end {
            break;
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Fn1<F: Fn(&[f32]) -> f32>(F);

    impl<F: Fn(&[f32]) -> f32> NextValuePredictor for Fn1<F> {
        fn predict_next(&self, context: &[f32]) -> Result<f32> {
            Ok((self.0)(context))
        }
    }

    struct Counter {
        end_after: usize,
        prefixes:  RefCell<Vec<usize>>,
    }

    impl NextTokenPredictor for Counter {
        fn predict_next_token(&self, _source: &[u32], prefix: &[u32]) -> Result<u32> {
            self.prefixes.borrow_mut().push(prefix.len());
            Ok(if prefix.len() >= self.end_after { 3 } else { 10 + prefix.len() as u32 })
        }
    }

    #[test]
    fn test_extension_length_is_seed_plus_steps() {
        let p = Fn1(|c: &[f32]| c[c.len() - 1] + 1.0);
        for (seed_len, steps) in [(1, 0), (1, 5), (4, 17), (10, 3)] {
            let seed = vec![0.0; seed_len];
            let out  = extend_series(&p, &seed, steps, 0).unwrap();
            assert_eq!(out.len(), seed_len + steps);
            assert_eq!(&out[..seed_len], &seed[..]);
        }
    }

    #[test]
    fn test_predictions_are_fed_back() {
        let p   = Fn1(|c: &[f32]| c[c.len() - 1] + 1.0);
        let out = extend_series(&p, &[1.0], 3, 0).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_context_is_bounded() {
        // Predicts the context length it was given
        let p   = Fn1(|c: &[f32]| c.len() as f32);
        let out = extend_series(&p, &[0.0; 2], 4, 3).unwrap();
        assert_eq!(out[2..], [2.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_empty_seed_is_rejected() {
        let p = Fn1(|_: &[f32]| 0.0);
        assert!(extend_series(&p, &[], 3, 0).is_err());
    }

    #[test]
    fn test_greedy_stops_at_end_token() {
        let p   = Counter { end_after: 3, prefixes: RefCell::new(Vec::new()) };
        let out = greedy_decode(&p, &[2, 9, 3], 2, 3, 40).unwrap();
        assert_eq!(out, vec![2, 11, 12, 3]);
        assert_eq!(*p.prefixes.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_greedy_respects_max_length() {
        let p   = Counter { end_after: usize::MAX, prefixes: RefCell::new(Vec::new()) };
        let out = greedy_decode(&p, &[2, 3], 2, 3, 5).unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(out[0], 2);
    }
}
