// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// Every model family gets its own file prefix, so several runs
// can share one checkpoint directory:
//
//   checkpoints/
//     wavenet_epoch_1.mpk     ← weights after epoch 1
//     wavenet_epoch_2.mpk
//     wavenet_latest.json     ← number of the last saved epoch
//     wavenet_config.json     ← the use-case config of the run
//
// The config is written before training starts. Loading for
// generation reads it back first, rebuilds the architecture from
// it, and only then loads the weights into that architecture.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::PathBuf,
};

pub struct CheckpointManager {
    dir:  PathBuf,
    name: String,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir, name: name.into() })
    }

    fn weights_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("{}_epoch_{epoch}", self.name))
    }

    fn latest_path(&self) -> PathBuf {
        self.dir.join(format!("{}_latest.json", self.name))
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join(format!("{}_config.json", self.name))
    }

    /// Save model weights for `epoch` and move the latest pointer to it.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<()> {
        let path = self.weights_path(epoch);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        fs::write(self.latest_path(), serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", self.latest_path().display()))?;

        tracing::debug!("Saved '{}' checkpoint: epoch {}", self.name, epoch);
        Ok(())
    }

    /// Load the weights of the latest saved epoch into `model`.
    ///
    /// `model` must have the architecture the checkpoint was
    /// saved from, or loading fails.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let epoch = self.latest_epoch()?;
        let path  = self.weights_path(epoch);

        tracing::info!("Loading '{}' checkpoint from epoch {}", self.name, epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Has the model been trained?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_config<C: Serialize>(&self, cfg: &C) -> Result<()> {
        let path = self.config_path();
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config<C: DeserializeOwned>(&self) -> Result<C> {
        let path = self.config_path();
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    /// Errors if no epoch has been saved yet.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.latest_path();
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Has the model been trained?", path.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
