//! Upstream JSON payloads and their normalization.

use super::types::{SearchCandidate, SearchResult};
use serde::Deserialize;

/// Body of `GET /inc/gt.php?gt=1`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Body of `POST /inc/ajax.php`.
#[derive(Debug, Deserialize)]
pub struct AjaxResponse {
    #[serde(rename = "iTotalRecords")]
    pub total_records: u64,
    #[serde(rename = "aaData", default)]
    pub rows: Vec<AjaxRow>,
}

/// One row of `aaData`.
#[derive(Debug, Deserialize)]
pub struct AjaxRow {
    pub id: u64,
    #[serde(rename = "titulo", default)]
    pub title: String,
    #[serde(rename = "descripcion", default)]
    pub description: String,
}

impl From<AjaxResponse> for SearchResult {
    fn from(response: AjaxResponse) -> Self {
        let candidates = response
            .rows
            .into_iter()
            .filter(|row| {
                if row.id == 0 {
                    tracing::debug!(title = %row.title, "skipping search row without id");
                }
                row.id > 0
            })
            .map(|row| SearchCandidate::new(row.id, row.title, row.description))
            .collect();

        SearchResult { total_records: response.total_records, candidates }
    }
}
