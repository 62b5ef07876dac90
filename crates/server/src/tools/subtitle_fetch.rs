//! subtitle_fetch tool implementation.
//!
//! Downloads a subtitle archive, extracts the first subtitle file and
//! returns its text as UTF-8.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use subdx_client::{NormalizedSubtitle, SubtitleService, validate};
use subdx_core::Error;

/// Input parameters for subtitle_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleFetchParams {
    /// Subtitle id as returned by subtitles_search.
    pub id: String,
}

/// Output structure for subtitle_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleFetchOutput {
    /// File name inside the archive.
    pub name: String,
    /// Detected source encoding: "utf-8", "windows-1252", "iso-8859-1" or "unknown".
    pub encoding: String,
    /// Size of the normalized text in bytes.
    pub size: usize,
    /// Subtitle text. Bytes that are not valid UTF-8 are replaced.
    pub text: String,
}

impl From<NormalizedSubtitle> for SubtitleFetchOutput {
    fn from(subtitle: NormalizedSubtitle) -> Self {
        Self {
            name: subtitle.name,
            encoding: subtitle.encoding.as_str().to_string(),
            size: subtitle.data.len(),
            text: String::from_utf8_lossy(&subtitle.data).into_owned(),
        }
    }
}

/// Implementation of the subtitle_fetch tool.
pub async fn fetch_impl(service: &SubtitleService, params: SubtitleFetchParams) -> Result<CallToolResult, McpError> {
    let id = validate::subtitle_id(&params.id)?;
    let subtitle = service.fetch_subtitle(id).await?;

    let output = SubtitleFetchOutput::from(subtitle);
    let json = serde_json::to_string_pretty(&output).map_err(Error::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
