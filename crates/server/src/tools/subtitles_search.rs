//! subtitles_search tool implementation.
//!
//! Resolves a title, searches the upstream (both cached) and ranks the
//! results against the video filename.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use subdx_client::{RankedSubtitles, SubtitleQuery, SubtitleService, TitleKind};
use subdx_core::Error;

/// Input parameters for subtitles_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubtitlesSearchParams {
    /// Title kind: "movie" or "series".
    pub kind: String,

    /// IMDb title id, e.g. "tt0944947".
    pub imdb_id: String,

    /// Season number (required for series).
    #[serde(default)]
    pub season: Option<u32>,

    /// Episode number (required for series).
    #[serde(default)]
    pub episode: Option<u32>,

    /// Video filename used to rank results, e.g. "Dark.S01E01.1080p.WEB-DL.mkv".
    #[serde(default)]
    pub filename: Option<String>,
}

impl TryFrom<SubtitlesSearchParams> for SubtitleQuery {
    type Error = Error;

    fn try_from(params: SubtitlesSearchParams) -> Result<Self, Self::Error> {
        let kind: TitleKind = params.kind.parse()?;
        let query = SubtitleQuery {
            kind,
            imdb_id: params.imdb_id,
            season: params.season,
            episode: params.episode,
            filename: params.filename,
        };
        query.validate()?;
        Ok(query)
    }
}

/// Output structure for subtitles_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubtitlesSearchOutput {
    /// Term searched upstream.
    pub term: String,
    /// Subtitle ids, best match first.
    pub ids: Vec<u64>,
    /// Relevance score per id.
    pub scores: Vec<usize>,
    /// Subtitle language (ISO 639-2).
    pub lang: String,
    /// Release year of the title, if known.
    pub year: Option<u16>,
    /// Total matches reported upstream.
    pub total_records: u64,
}

impl From<RankedSubtitles> for SubtitlesSearchOutput {
    fn from(ranked: RankedSubtitles) -> Self {
        Self {
            term: ranked.term,
            ids: ranked.ids,
            scores: ranked.scores,
            lang: ranked.lang,
            year: ranked.year,
            total_records: ranked.total_records,
        }
    }
}

/// Implementation of the subtitles_search tool.
pub async fn search_impl(service: &SubtitleService, params: SubtitlesSearchParams) -> Result<CallToolResult, McpError> {
    let query = SubtitleQuery::try_from(params)?;
    let ranked = service.find_subtitles(&query).await?;

    let output = SubtitlesSearchOutput::from(ranked);
    let json = serde_json::to_string_pretty(&output).map_err(Error::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
