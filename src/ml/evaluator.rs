// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Runs a model over held-out batches and reports the mean loss
// and, for classifiers, accuracy. Every model scores a batch
// through ValidStep, so this loop is shared by all families.
//
// Losses are accumulated as sums and divided by the number of
// scored items at the end, so a short last batch weighs exactly
// as much as its size.

use burn::data::dataloader::DataLoader;

/// Sums over one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchScore {
    /// Sum of per-item losses
    pub loss_sum: f64,
    /// Items `loss_sum` was summed over (samples, or tokens)
    pub items:    usize,
    /// Correct predictions; 0 for regressors
    pub correct:  usize,
    /// Predictions `correct` counts over; 0 for regressors
    pub counted:  usize,
}

impl BatchScore {
    pub fn regression(loss_sum: f64, items: usize) -> Self {
        Self { loss_sum, items, correct: 0, counted: 0 }
    }
}

/// A model that can score a batch without gradients.
pub trait ValidStep<I> {
    fn score(&self, batch: I) -> BatchScore;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalReport {
    pub avg_loss: f64,
    pub correct:  usize,
    pub total:    usize,
    counted:      usize,
}

impl EvalReport {
    pub fn from_scores(scores: impl IntoIterator<Item = BatchScore>) -> Self {
        let mut loss_sum = 0.0;
        let mut items    = 0usize;
        let mut correct  = 0usize;
        let mut counted  = 0usize;
        for s in scores {
            loss_sum += s.loss_sum;
            items    += s.items;
            correct  += s.correct;
            counted  += s.counted;
        }
        let avg_loss = if items > 0 { loss_sum / items as f64 } else { f64::NAN };
        Self { avg_loss, correct, total: items, counted }
    }

    /// None when nothing was classified.
    pub fn accuracy(&self) -> Option<f64> {
        (self.counted > 0).then(|| self.correct as f64 / self.counted as f64)
    }

    pub fn summary(&self) -> String {
        match self.accuracy() {
            Some(acc) => format!(
                "Average loss: {:.4}, Accuracy: {}/{} ({:.0}%)",
                self.avg_loss, self.correct, self.counted, acc * 100.0,
            ),
            None => format!("Average loss: {:.6}", self.avg_loss),
        }
    }
}

pub fn evaluate<I, M: ValidStep<I>>(model: &M, loader: &dyn DataLoader<I>) -> EvalReport {
    EvalReport::from_scores(loader.iter().map(|batch| model.score(batch)))
}
