//! Upstream data types.

use crate::text::tokenize;
use serde::{Deserialize, Serialize};

/// The session cookie handed out alongside a search token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    /// Value for a `Cookie` request header.
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Anti-automation token plus the cookie it is bound to.
///
/// Valid for one search flow; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    pub cookie: SessionCookie,
}

/// One subtitle listed by the upstream search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// Distinct tokens of `title + " " + description`, computed once.
    pub description_tokens: Vec<String>,
}

impl SearchCandidate {
    pub fn new(id: u64, title: impl Into<String>, description: impl Into<String>) -> Self {
        let title = title.into();
        let description = description.into();
        let description_tokens = tokenize(&format!("{title} {description}"));
        Self { id, title, description, description_tokens }
    }
}

/// A page of upstream search results.
///
/// `candidates` may hold fewer entries than `total_records`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub total_records: u64,
    pub candidates: Vec<SearchCandidate>,
}
