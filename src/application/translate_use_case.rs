// ============================================================
// Layer 2 — Translate Use Case
// ============================================================
// Trains the encoder–decoder transformer on a tab-separated
// parallel corpus and translates a few held-out sentences:
//
//   Step 1: Read pairs                                (Layer 4)
//   Step 2: Build / load one tokenizer per language   (Layer 6)
//   Step 3: Encode, drop pairs over max_length        (Layer 4)
//   Step 4: Shuffle and split                         (Layer 4)
//   Step 5: Train with the warm-up schedule           (Layer 5)
//   Step 6: Greedy-decode the first held-out sources  (Layer 5)

use anyhow::{ensure, Result};
use burn::{module::AutodiffModule, optim::AdamConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::data::{
    batcher::TokenBatcher,
    dataset::InMemoryDataset,
    pairs::{encode_pairs, read_pairs},
    splitter::split_train_test,
};
use crate::domain::sample::TokenPair;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    tokenizer_store::{decode, TokenizerStore, END_ID, START_ID},
};
use crate::ml::{
    default_device,
    generate::greedy_decode,
    schedule::{LrPolicy, WarmupSchedule},
    trainer::{build_loaders, fit, FitOptions},
    transformer::{Transformer, TransformerConfig, TranslatorPredictor},
    InferBackend, TrainBackend,
};

pub const MODEL_NAME: &str = "transformer";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRunConfig {
    pub pairs:          String,
    pub source_lang:    String,
    pub target_lang:    String,
    pub checkpoint_dir: String,
    pub vocab_size:     usize,
    /// Longest sequence kept, `[START]` and `[END]` included
    pub max_length:     usize,
    pub num_layers:     usize,
    pub d_model:        usize,
    pub d_ff:           usize,
    pub num_heads:      usize,
    pub dropout:        f64,
    pub warmup_steps:   usize,
    pub train_ratio:    f64,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub log_every:      usize,
    /// Held-out sentences translated after training
    pub samples:        usize,
    pub seed:           u64,
}

impl Default for TranslateRunConfig {
    fn default() -> Self {
        Self {
            pairs:          "data/pt_en.tsv".to_string(),
            source_lang:    "pt".to_string(),
            target_lang:    "en".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            vocab_size:     8192,
            max_length:     40,
            num_layers:     4,
            d_model:        128,
            d_ff:           512,
            num_heads:      8,
            dropout:        0.1,
            warmup_steps:   4000,
            train_ratio:    0.8,
            batch_size:     64,
            epochs:         20,
            log_every:      50,
            samples:        10,
            seed:           42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub source:     String,
    pub reference:  String,
    pub prediction: String,
}

pub struct TranslateUseCase {
    config: TranslateRunConfig,
}

impl TranslateUseCase {
    pub fn new(config: TranslateRunConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<Translation>> {
        let cfg = &self.config;

        // ── Step 1: Pairs ────────────────────────────────────────────────────
        let pairs = read_pairs(Path::new(&cfg.pairs))?;
        ensure!(!pairs.is_empty(), "No tab-separated pairs in '{}'", cfg.pairs);
        tracing::info!("Read {} sentence pairs", pairs.len());

        // ── Step 2: Tokenizers ───────────────────────────────────────────────
        let store = TokenizerStore::new(&cfg.checkpoint_dir);
        let sources: Vec<&str> = pairs.iter().map(|p| p.source.as_str()).collect();
        let targets: Vec<&str> = pairs.iter().map(|p| p.target.as_str()).collect();
        let source_tok = store.load_or_build(&cfg.source_lang, &sources, cfg.vocab_size)?;
        let target_tok = store.load_or_build(&cfg.target_lang, &targets, cfg.vocab_size)?;

        // ── Step 3: Encode ───────────────────────────────────────────────────
        let encoded = encode_pairs(&pairs, &source_tok, &target_tok, cfg.max_length)?;
        ensure!(!encoded.is_empty(), "Every pair is longer than {} tokens", cfg.max_length);

        // ── Step 4: Split ────────────────────────────────────────────────────
        let (train, test) = split_train_test(encoded, cfg.train_ratio, cfg.seed);
        ensure!(!train.is_empty() && !test.is_empty(), "Too few pairs to split");
        tracing::info!("Split: {} train, {} test", train.len(), test.len());

        let ckpt    = CheckpointManager::new(&cfg.checkpoint_dir, MODEL_NAME)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;

        // ── Step 5: Train ────────────────────────────────────────────────────
        let device  = default_device();
        let loaders = build_loaders(
            TokenBatcher::<TrainBackend>::new(device.clone()),
            TokenBatcher::<InferBackend>::new(device.clone()),
            InMemoryDataset::new(train),
            InMemoryDataset::new(test.clone()),
            cfg.batch_size,
            cfg.seed,
        );

        let model_cfg = TransformerConfig::new(
            source_tok.get_vocab_size(true),
            target_tok.get_vocab_size(true),
        )
        .with_num_layers(cfg.num_layers)
        .with_d_model(cfg.d_model)
        .with_d_ff(cfg.d_ff)
        .with_num_heads(cfg.num_heads)
        .with_dropout(cfg.dropout);
        model_cfg.validate()?;

        let model: Transformer<TrainBackend> = model_cfg.init(&device);
        let optim = AdamConfig::new()
            .with_beta_1(0.9)
            .with_beta_2(0.98)
            .with_epsilon(1e-9)
            .init::<TrainBackend, Transformer<TrainBackend>>();
        let opts = FitOptions {
            model_name: MODEL_NAME.to_string(),
            epochs:     cfg.epochs,
            lr:         LrPolicy::Warmup(WarmupSchedule::new(cfg.d_model, cfg.warmup_steps)),
            log_every:  cfg.log_every,
        };
        let result = fit(model, optim, &loaders, &opts, &ckpt, &metrics)?;

        // ── Step 6: Translate ────────────────────────────────────────────────
        let predictor = TranslatorPredictor::new(result.model.valid(), device);
        let shown     = &test[..cfg.samples.min(test.len())];
        translate_all(&predictor, shown, &source_tok, &target_tok, cfg.max_length)
    }
}

fn translate_all(
    predictor:  &TranslatorPredictor<InferBackend>,
    pairs:      &[TokenPair],
    source_tok: &Tokenizer,
    target_tok: &Tokenizer,
    max_length: usize,
) -> Result<Vec<Translation>> {
    let mut out = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let ids = greedy_decode(predictor, &pair.source, START_ID, END_ID, max_length)?;
        let t   = Translation {
            source:     decode(source_tok, &pair.source)?,
            reference:  decode(target_tok, &pair.target)?,
            prediction: decode(target_tok, &ids)?,
        };
        println!("Input:      {}", t.source);
        println!("Reference:  {}", t.reference);
        println!("Prediction: {}\n", t.prediction);
        out.push(t);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end_on_tiny_corpus() {
        let dir    = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("pairs.tsv");
        let lines: Vec<String> = (0..20)
            .map(|i| format!("olá número {i}\thello number {i}"))
            .collect();
        std::fs::write(&corpus, lines.join("\n")).unwrap();

        let cfg = TranslateRunConfig {
            pairs:          corpus.display().to_string(),
            checkpoint_dir: dir.path().join("ckpt").display().to_string(),
            num_layers:     1,
            d_model:        8,
            d_ff:           16,
            num_heads:      2,
            batch_size:     4,
            epochs:         1,
            log_every:      0,
            samples:        2,
            max_length:     6,
            ..TranslateRunConfig::default()
        };

        let translations = TranslateUseCase::new(cfg).execute().unwrap();
        assert_eq!(translations.len(), 2);
        for t in &translations {
            assert!(t.source.starts_with("olá"));
            assert!(t.reference.starts_with("hello"));
        }
        assert!(dir.path().join("ckpt").join("tokenizer_pt.json").exists());
        assert!(dir.path().join("ckpt").join("tokenizer_en.json").exists());
    }
}
