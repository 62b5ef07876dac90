//! Cache key composition.
//!
//! Keys stay human-readable (`<prefix> : <natural id>`) so operators can
//! reason about cache composition by prefix. Bump a prefix version when the
//! shape of the stored value changes.

/// Prefix for title metadata entries.
pub const TITLE_PREFIX: &str = "imdb.title";

/// Prefix for upstream search result entries.
pub const SEARCH_PREFIX: &str = "subdivx.subtitles.v1";

/// Compose a key from a prefix and a natural identifier.
pub fn compose(prefix: &str, id: &str) -> String {
    format!("{prefix} : {}", id.trim())
}

/// Key for a title metadata lookup, e.g. `imdb.title : tt0944947`.
pub fn title_key(imdb_id: &str) -> String {
    compose(TITLE_PREFIX, imdb_id)
}

/// Key for an upstream search, e.g. `subdivx.subtitles.v1 : Game of Thrones S01E01`.
pub fn search_key(term: &str) -> String {
    compose(SEARCH_PREFIX, term)
}

/// The prefix part of a composed key.
pub fn prefix_of(key: &str) -> &str {
    key.split_once(" : ").map(|(prefix, _)| prefix).unwrap_or(key)
}
