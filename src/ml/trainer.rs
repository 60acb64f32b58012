// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One epoch loop for every model family, using Burn's DataLoader
// and any Burn optimiser.
//
//   - Training uses TrainBackend (autodiff) for gradients
//   - model.valid() returns the model on InferBackend, with
//     dropout disabled, and the validation loader must batch
//     onto InferBackend too
//   - the learning rate is read from an LrPolicy before every
//     optimiser step, so the warm-up schedule sees the global
//     step count, not the epoch
//
// Per epoch: train on every batch, evaluate on the held-out
// split, append a metrics row, save a checkpoint. A non-finite
// loss stops the run with an error.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::{
        dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::{fmt::Debug, sync::Arc};

use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::evaluator::{evaluate, EvalReport, ValidStep};
use crate::ml::schedule::LrPolicy;
use crate::ml::TrainBackend;

/// Loss of one training batch.
pub struct StepOutput<B: AutodiffBackend> {
    /// Scalar mean loss, still attached to the graph
    pub loss:  Tensor<B, 1>,
    /// Samples in the batch
    pub items: usize,
}

/// A model that can compute a differentiable loss for a batch.
pub trait TrainStep<B: AutodiffBackend, I> {
    fn step(&self, batch: I) -> StepOutput<B>;
}

pub struct Loaders<TI, VI> {
    pub train: Arc<dyn DataLoader<TI>>,
    pub valid: Arc<dyn DataLoader<VI>>,
}

/// Training loader shuffles with `seed`; validation keeps order.
pub fn build_loaders<I, TI, VI, TB, VB, D>(
    train_batcher: TB,
    valid_batcher: VB,
    train:         D,
    valid:         D,
    batch_size:    usize,
    seed:          u64,
) -> Loaders<TI, VI>
where
    I:  Send + Sync + Clone + Debug + 'static,
    TI: Send + Clone + Debug + 'static,
    VI: Send + Clone + Debug + 'static,
    TB: Batcher<I, TI> + Clone + 'static,
    VB: Batcher<I, VI> + Clone + 'static,
    D:  Dataset<I> + 'static,
{
    let train = DataLoaderBuilder::new(train_batcher)
        .batch_size(batch_size)
        .shuffle(seed)
        .num_workers(1)
        .build(train);
    let valid = DataLoaderBuilder::new(valid_batcher)
        .batch_size(batch_size)
        .num_workers(1)
        .build(valid);
    Loaders { train, valid }
}

#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Row label in metrics.csv
    pub model_name: String,
    pub epochs:     usize,
    pub lr:         LrPolicy,
    /// Log training progress every N batches; 0 disables it
    pub log_every:  usize,
}

pub struct FitResult<M> {
    pub model:   M,
    pub history: Vec<EpochMetrics>,
    pub last:    EvalReport,
}

pub fn fit<M, O, TI, VI>(
    mut model: M,
    mut optim: O,
    loaders:   &Loaders<TI, VI>,
    opts:      &FitOptions,
    ckpt:      &CheckpointManager,
    metrics:   &MetricsLogger,
) -> Result<FitResult<M>>
where
    M: AutodiffModule<TrainBackend> + TrainStep<TrainBackend, TI>,
    M::InnerModule: ValidStep<VI>,
    O: Optimizer<M, TrainBackend>,
{
    let total       = loaders.train.num_items();
    let mut step    = 0usize;
    let mut history = Vec::with_capacity(opts.epochs);
    let mut last    = EvalReport::default();
    let mut best    = f64::INFINITY;

    tracing::info!("Training '{}' for {} epochs on {} samples", opts.model_name, opts.epochs, total);

    for epoch in 1..=opts.epochs {
        // ── Training phase ───────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut seen     = 0usize;

        for batch in loaders.train.iter() {
            let out = model.step(batch);
            let loss_val: f64 = out.loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                bail!(
                    "Non-finite loss ({loss_val}) in '{}' at epoch {epoch}, batch {}",
                    opts.model_name, batches + 1,
                );
            }

            loss_sum += loss_val;
            batches  += 1;
            seen     += out.items;
            step     += 1;

            let grads = GradientsParams::from_grads(out.loss.backward(), &model);
            model = optim.step(opts.lr.at(step), model, grads);

            if opts.log_every > 0 && batches % opts.log_every == 0 {
                tracing::info!(
                    "Train Epoch: {} [{}/{} ({:.0}%)]  Loss: {:.6}",
                    epoch, seen, total,
                    100.0 * seen as f64 / total.max(1) as f64,
                    loss_val,
                );
            }
        }

        let avg_train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };

        // ── Validation phase ─────────────────────────────────────────────────
        let valid  = model.valid();
        let report = evaluate(&valid, loaders.valid.as_ref());

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | {}",
            epoch, opts.epochs, avg_train_loss, report.summary(),
        );

        let row = EpochMetrics::new(
            opts.model_name.clone(), epoch, avg_train_loss, report.avg_loss, report.accuracy(),
        );
        metrics.log(&row)?;
        if row.is_improvement(best) {
            best = row.valid_loss;
            tracing::info!("New best validation loss: {:.6}", best);
        }
        history.push(row);

        ckpt.save_model(&valid, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
        last = report;
    }

    tracing::info!("Training '{}' complete", opts.model_name);
    Ok(FitResult { model, history, last })
}
