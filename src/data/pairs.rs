// ============================================================
// Layer 4 — Translation Pairs
// ============================================================
// Reads a tab-separated corpus, one pair per line:
//
//   source sentence<TAB>target sentence
//
// and turns it into TokenPairs:
//
//   [START] source tokens [END]
//   [START] target tokens [END]
//
// Pairs where either side is longer than `max_length` ids
// (markers included) are dropped, as are lines without a tab.

use anyhow::Result;
use std::{fs, path::Path};
use tokenizers::Tokenizer;

use crate::data::error::{DatasetError, DatasetResult};
use crate::domain::sample::TokenPair;
use crate::infra::tokenizer_store::{END_ID, START_ID};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPair {
    pub source: String,
    pub target: String,
}

pub fn read_pairs(path: &Path) -> DatasetResult<Vec<TextPair>> {
    let text = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
    Ok(parse_pairs(&text))
}

pub fn parse_pairs(text: &str) -> Vec<TextPair> {
    text.lines()
        .filter_map(|line| {
            let (source, target) = line.split_once('\t')?;
            let (source, target) = (source.trim(), target.trim());
            if source.is_empty() || target.is_empty() {
                return None;
            }
            Some(TextPair { source: source.to_string(), target: target.to_string() })
        })
        .collect()
}

/// `[START] ids [END]`
pub fn wrap(ids: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(ids.len() + 2);
    out.push(START_ID);
    out.extend_from_slice(ids);
    out.push(END_ID);
    out
}

pub fn encode_pairs(
    pairs:      &[TextPair],
    source_tok: &Tokenizer,
    target_tok: &Tokenizer,
    max_length: usize,
) -> Result<Vec<TokenPair>> {
    let mut out     = Vec::with_capacity(pairs.len());
    let mut dropped = 0usize;

    for pair in pairs {
        let src = source_tok
            .encode(pair.source.as_str(), false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        let tgt = target_tok
            .encode(pair.target.as_str(), false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

        let source = wrap(src.get_ids());
        let target = wrap(tgt.get_ids());
        if source.len() > max_length || target.len() > max_length {
            dropped += 1;
            continue;
        }
        out.push(TokenPair { source, target });
    }

    tracing::info!("Encoded {} pairs ({} longer than {} dropped)", out.len(), dropped, max_length);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_lines_without_tab() {
        let pairs = parse_pairs("olá mundo\thello world\nbroken line\n\t\nsim\tyes\n");
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].source, "olá mundo");
        assert_eq!(pairs[1].target, "yes");
    }

    #[test]
    fn test_wrap_adds_markers() {
        assert_eq!(wrap(&[7, 8]), vec![START_ID, 7, 8, END_ID]);
        assert_eq!(wrap(&[]), vec![START_ID, END_ID]);
    }
}
