//! Candidate scoring and ranking against a query such as a video filename.

use super::tokenize;

/// Count matches between query tokens and candidate tokens.
///
/// Every query token adds one per equal candidate token. Candidate tokens
/// are already distinct, so each query token contributes 0 or 1.
pub fn score(candidate_tokens: &[String], query: &str) -> usize {
    matches(candidate_tokens, &tokenize(query))
}

fn matches(candidate_tokens: &[String], query_tokens: &[String]) -> usize {
    query_tokens
        .iter()
        .map(|token| candidate_tokens.iter().filter(|candidate| *candidate == token).count())
        .sum()
}

/// An item paired with its relevance score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked<T> {
    pub item: T,
    pub score: usize,
}

/// Score every item and sort by score descending.
///
/// The sort is stable: equally scored items keep their input order.
pub fn rank<T, F>(items: impl IntoIterator<Item = T>, query: &str, tokens_of: F) -> Vec<Ranked<T>>
where
    F: Fn(&T) -> &[String],
{
    let query_tokens = tokenize(query);
    let mut ranked: Vec<Ranked<T>> = items
        .into_iter()
        .map(|item| {
            let score = matches(tokens_of(&item), &query_tokens);
            Ranked { item, score }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}
