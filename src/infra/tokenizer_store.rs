// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Word-level tokenizers for the translation corpus, one file per
// language in the checkpoint directory:
//
//   checkpoints/
//     tokenizer_pt.json
//     tokenizer_en.json
//
// The first four ids are reserved and identical in every
// language, so batching and decoding never need the tokenizer:
//
//   [PAD] = 0   [UNK] = 1   [START] = 2   [END] = 3
//
// In tokenizers 0.15, train_from_files requires Trainer::Model
// to equal ModelWrapper. Instead the vocabulary is counted here
// and written out as a HuggingFace WordLevel tokenizer JSON,
// which Tokenizer::from_file loads directly. Words are counted
// with the crate's own normalizer and pre-tokenizer, so every
// corpus word encodes to its own id.

use anyhow::{Context, Result};
use std::{collections::HashMap, path::PathBuf};
use tokenizers::{
    normalizers::Lowercase, pre_tokenizers::whitespace::Whitespace, Normalizer, OffsetReferential,
    OffsetType, PreTokenizedString, PreTokenizer, Tokenizer,
};

pub const PAD_ID:   u32 = 0;
pub const UNK_ID:   u32 = 1;
pub const START_ID: u32 = 2;
pub const END_ID:   u32 = 3;

const SPECIAL_TOKENS: [(&str, u32); 4] = [
    ("[PAD]",   PAD_ID),
    ("[UNK]",   UNK_ID),
    ("[START]", START_ID),
    ("[END]",   END_ID),
];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, lang: &str) -> PathBuf {
        self.dir.join(format!("tokenizer_{lang}.json"))
    }

    /// Load the saved tokenizer for `lang`, or build one from `texts`.
    pub fn load_or_build(&self, lang: &str, texts: &[&str], vocab_size: usize) -> Result<Tokenizer> {
        if self.path(lang).exists() {
            tracing::info!("Loading existing '{}' tokenizer from disk", lang);
            self.load(lang)
        } else {
            tracing::info!("Building new '{}' tokenizer (vocab_size={})", lang, vocab_size);
            self.build_and_save(lang, texts, vocab_size)
        }
    }

    pub fn load(&self, lang: &str) -> Result<Tokenizer> {
        let path = self.path(lang);
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    fn build_and_save(&self, lang: &str, texts: &[&str], vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // ── Step 1: Vocabulary from word frequencies ─────────────────────────
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in pre_tokenize(text)? {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        // Most frequent first; ties alphabetical so rebuilds are stable
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size.saturating_sub(SPECIAL_TOKENS.len()));

        let mut vocab = serde_json::Map::new();
        for (token, id) in SPECIAL_TOKENS {
            vocab.insert(token.to_string(), serde_json::json!(id));
        }
        let mut next_id = SPECIAL_TOKENS.len() as u32;
        for (word, _) in &words {
            vocab.insert(word.clone(), serde_json::json!(next_id));
            next_id += 1;
        }

        // ── Step 2: HuggingFace tokenizer JSON ───────────────────────────────
        let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
            .iter()
            .map(|(content, id)| serde_json::json!({
                "id": id, "content": content, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            }))
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": { "type": "Lowercase" },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let path = self.path(lang);
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON '{}'", path.display()))?;

        tracing::info!("Tokenizer '{}' built with {} ids, saved to '{}'", lang, next_id, path.display());

        Tokenizer::from_file(&path).map_err(|e| anyhow::anyhow!("Cannot reload tokenizer: {e}"))
    }
}

/// Lowercased words exactly as the saved tokenizer will split
/// them: the same `Lowercase` normalizer and `Whitespace`
/// pre-tokenizer the JSON below declares.
pub fn pre_tokenize(text: &str) -> Result<Vec<String>> {
    let mut pretokenized = PreTokenizedString::from(text);
    pretokenized
        .normalize(|s| Lowercase.normalize(s))
        .map_err(|e| anyhow::anyhow!("Normalization error: {e}"))?;
    Whitespace::default()
        .pre_tokenize(&mut pretokenized)
        .map_err(|e| anyhow::anyhow!("Pre-tokenization error: {e}"))?;

    Ok(pretokenized
        .get_splits(OffsetReferential::Original, OffsetType::Byte)
        .into_iter()
        .map(|(word, _, _)| word.to_string())
        .collect())
}

/// Tokenizer::decode with special tokens dropped.
pub fn decode(tokenizer: &Tokenizer, ids: &[u32]) -> Result<String> {
    tokenizer
        .decode(ids, true)
        .map_err(|e| anyhow::anyhow!("Decode error: {e}"))
}
