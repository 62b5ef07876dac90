//! Client code for subdx.
//!
//! This crate provides the subdivx upstream client, archive extraction,
//! encoding normalization, relevance scoring, title metadata lookup and the
//! pipeline service shared by the server and CLI.

pub mod archive;
pub mod encoding;
pub mod fetch;
pub mod metadata;
pub mod service;
pub mod subdivx;
pub mod text;
pub mod validate;

pub use archive::{ArchiveFormat, ExtractedFile, SubtitlePolicy, extract};
pub use encoding::{DetectedEncoding, normalize};
pub use fetch::HttpConfig;
pub use metadata::{CinemetaClient, Title, TitleKind, TitleLookup};
pub use service::{
    CacheTtls, NormalizedSubtitle, RankedSubtitles, SubtitleProvider, SubtitleQuery, SubtitleService,
};
pub use subdivx::{SearchCandidate, SearchResult, SessionCookie, SessionToken, SubdivxClient};
pub use text::{rank, score, tokenize};
