//! Lexical tokenization for relevance scoring.
//!
//! Tokens are ASCII-alphanumeric runs, lowercased and deduplicated in
//! first-occurrence order. Everything else, including non-ASCII bytes, acts
//! as a separator: `"Canción.S01E01"` yields `["canci", "n", "s01e01"]`.

pub mod score;

pub use score::{Ranked, rank, score};

use std::collections::HashSet;

/// Split `text` into distinct lowercase alphanumeric tokens, keeping first-occurrence order.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|run| !run.is_empty())
        .map(str::to_ascii_lowercase)
        .filter(|token| seen.insert(token.clone()))
        .collect()
}
