// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per model per epoch, so several runs and
// model families can share one file:
//
//   model,epoch,train_loss,valid_loss,accuracy
//   shape_cnn,1,0.684211,0.652004,0.612500
//   lstm,1,0.031200,0.029877,
//
// `accuracy` is left empty for regression models.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const METRICS_HEADER: &str = "model,epoch,train_loss,valid_loss,accuracy";

/// One row of metrics for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub model: String,

    /// Starts at 1
    pub epoch: usize,

    /// Mean loss over all training batches
    pub train_loss: f64,

    /// Loss on the held-out split, as reported by the evaluator
    pub valid_loss: f64,

    /// Fraction in [0.0, 1.0]; None for regression
    pub accuracy: Option<f64>,
}

impl EpochMetrics {
    pub fn new(
        model:      impl Into<String>,
        epoch:      usize,
        train_loss: f64,
        valid_loss: f64,
        accuracy:   Option<f64>,
    ) -> Self {
        Self { model: model.into(), epoch, train_loss, valid_loss, accuracy }
    }

    /// Returns true if this epoch improved over the previous best valid_loss
    pub fn is_improvement(&self, best_valid_loss: f64) -> bool {
        self.valid_loss < best_valid_loss
    }

    fn to_csv_row(&self) -> String {
        let accuracy = self.accuracy.map(|a| format!("{a:.6}")).unwrap_or_default();
        format!(
            "{},{},{:.6},{:.6},{}",
            self.model, self.epoch, self.train_loss, self.valid_loss, accuracy,
        )
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{METRICS_HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{}", m.to_csv_row())?;

        tracing::debug!(
            "Logged {} epoch {} metrics: train_loss={:.4}, valid_loss={:.4}",
            m.model, m.epoch, m.train_loss, m.valid_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ──────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new("cnn", 2, 2.5, 2.3, Some(0.2));
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
    }

    #[test]
    fn test_rows_append_under_one_header() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new("shape_cnn", 1, 0.5, 0.25, Some(0.75))).unwrap();

        // A second logger on the same directory must not rewrite the header
        let again = MetricsLogger::new(dir.path()).unwrap();
        again.log(&EpochMetrics::new("lstm", 1, 0.125, 0.0625, None)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            METRICS_HEADER,
            "shape_cnn,1,0.500000,0.250000,0.750000",
            "lstm,1,0.125000,0.062500,",
        ]);
    }
}
