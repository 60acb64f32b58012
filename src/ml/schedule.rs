// ============================================================
// Layer 5 — Learning-Rate Schedules
// ============================================================
// The translator trains with the warm-up schedule of Vaswani et
// al. (2017):
//
//   lr(step) = d_model^-0.5 · min(step^-0.5, step · warmup^-1.5)
//
// It rises linearly for `warmup_steps` optimiser steps, then
// decays with the inverse square root of the step. Every other
// model uses a constant rate.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarmupSchedule {
    pub d_model:      usize,
    pub warmup_steps: usize,
}

impl WarmupSchedule {
    pub fn new(d_model: usize, warmup_steps: usize) -> Self {
        Self { d_model, warmup_steps: warmup_steps.max(1) }
    }

    /// `step` counts optimiser updates from 1; step 0 is treated as 1.
    pub fn lr(&self, step: usize) -> f64 {
        let step   = step.max(1) as f64;
        let warmup = self.warmup_steps as f64;
        (self.d_model as f64).powf(-0.5) * step.powf(-0.5).min(step * warmup.powf(-1.5))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LrPolicy {
    Constant(f64),
    Warmup(WarmupSchedule),
}

impl LrPolicy {
    pub fn at(&self, step: usize) -> f64 {
        match self {
            LrPolicy::Constant(lr) => *lr,
            LrPolicy::Warmup(s)    => s.lr(step),
        }
    }
}
