// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Partitions samples into a training set and a held-out set by a
// fixed ratio. Both functions use the same size arithmetic:
//
//   train_size = floor(ratio * len)
//   test_size  = len - train_size
//
// split_train_test shuffles first (Fisher-Yates via
// rand::seq::SliceRandom) with an RNG seeded from `seed`, so the
// same seed always produces the same partition. Image datasets
// use it.
//
// split_sequential keeps the original order: the first
// train_size samples train, the rest are held out. Series
// windows use it so the test set is the future of the train set.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Number of training samples for `total` samples at `train_fraction`.
pub fn train_size(total: usize, train_fraction: f64) -> usize {
    let fraction = train_fraction.clamp(0.0, 1.0);
    ((total as f64) * fraction).floor() as usize
}

/// Shuffle with a seeded RNG and split into (train, test).
pub fn split_train_test<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);
    split_sequential(samples, train_fraction)
}

/// Split into (train, test) without reordering.
pub fn split_sequential<T>(mut samples: Vec<T>, train_fraction: f64) -> (Vec<T>, Vec<T>) {
    let total    = samples.len();
    let split_at = train_size(total, train_fraction);

    // split_off(n) leaves [0..n) in `samples` and returns [n..)
    let test = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} test ({}% / {}%)",
        samples.len(),
        test.len(),
        (samples.len() * 100) / total.max(1),
        (test.len() * 100) / total.max(1),
    );

    (samples, test)
}

// ─── Unit Tests ──────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, test)     = split_train_test(items, 0.8, 42);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(),  20);
    }

    #[test]
    fn test_train_size_is_floored() {
        // 0.8 * 7 = 5.6 → 5, never rounded up
        for n in 0..200usize {
            let items: Vec<usize> = (0..n).collect();
            let (train, test)     = split_train_test(items, 0.8, 1);
            assert_eq!(train.len(), (0.8 * n as f64).floor() as usize);
            assert_eq!(train.len() + test.len(), n);
        }
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, test)     = split_train_test(items, 0.7, 3);
        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_test((0..30).collect::<Vec<usize>>(), 0.8, 9);
        let b = split_train_test((0..30).collect::<Vec<usize>>(), 0.8, 9);
        assert_eq!(a, b);
    }

    #[test]
    fn test_sequential_keeps_order() {
        let (train, test) = split_sequential((0..10).collect::<Vec<usize>>(), 0.715);
        assert_eq!(train, (0..7).collect::<Vec<_>>());
        assert_eq!(test, vec![7, 8, 9]);
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, test)     = split_train_test(items, 0.8, 0);
        assert!(train.is_empty());
        assert!(test.is_empty());
    }

    #[test]
    fn test_full_training_split() {
        let items: Vec<usize> = (0..10).collect();
        let (train, test)     = split_train_test(items, 1.0, 0);
        assert_eq!(train.len(), 10);
        assert!(test.is_empty());
    }
}
