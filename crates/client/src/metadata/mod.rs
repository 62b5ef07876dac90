//! Title metadata lookup.
//!
//! The pipeline only needs a display name and a release year to build the
//! upstream search term. [`TitleLookup`] is the seam; [`CinemetaClient`] is
//! the production implementation against the public Cinemeta catalog
//! (`GET {base}/meta/{kind}/{imdb_id}.json`).

use crate::fetch::{self, HttpConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use subdx_core::{AppConfig, Error};
use url::Url;

/// What kind of title an IMDb id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleKind {
    Movie,
    Series,
}

impl TitleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TitleKind::Movie => "movie",
            TitleKind::Series => "series",
        }
    }
}

impl fmt::Display for TitleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TitleKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(TitleKind::Movie),
            "series" => Ok(TitleKind::Series),
            other => Err(Error::InvalidInput(format!(
                "invalid title kind '{other}', only movie and series are supported"
            ))),
        }
    }
}

/// Display name and release year of a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub name: String,
    pub year: Option<u16>,
}

/// Resolves IMDb ids to titles.
#[async_trait::async_trait]
pub trait TitleLookup: Send + Sync {
    /// Look up a title; failures surface as `MetadataLookup`.
    async fn get_title(&self, kind: TitleKind, imdb_id: &str) -> Result<Title, Error>;
}

#[derive(Debug, Deserialize)]
struct MetaResponse {
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    year: Option<serde_json::Value>,
    #[serde(default, rename = "releaseInfo")]
    release_info: Option<String>,
}

impl Meta {
    /// First four-digit run of `year` (string or number) or `releaseInfo`.
    ///
    /// Series report ranges such as `"2017–2020"`; the start year wins.
    fn start_year(&self) -> Option<u16> {
        let year = match &self.year {
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => String::new(),
        };

        [year.as_str(), self.release_info.as_deref().unwrap_or_default()]
            .into_iter()
            .find_map(leading_year)
    }
}

fn leading_year(text: &str) -> Option<u16> {
    let digits: String = text.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() == 4 { digits.parse().ok() } else { None }
}

/// Cinemeta catalog client.
#[derive(Debug, Clone)]
pub struct CinemetaClient {
    http: reqwest::Client,
    base: Url,
}

impl CinemetaClient {
    pub fn new(base_url: &str, config: &HttpConfig) -> Result<Self, Error> {
        let base = fetch::canonicalize_base(base_url).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let http = fetch::build_client(config)?;
        Ok(Self { http, base })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(&config.metadata_base_url, &HttpConfig::from(config))
    }
}

#[async_trait::async_trait]
impl TitleLookup for CinemetaClient {
    async fn get_title(&self, kind: TitleKind, imdb_id: &str) -> Result<Title, Error> {
        let url = fetch::endpoint(&self.base, &format!("meta/{kind}/{imdb_id}.json"))
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        tracing::debug!(%url, "looking up title metadata");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::MetadataLookup(format!("request for {imdb_id} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::MetadataLookup(format!("{imdb_id}: status {}", status.as_u16())));
        }

        let body: MetaResponse = response
            .json()
            .await
            .map_err(|e| Error::MetadataLookup(format!("{imdb_id}: malformed response: {e}")))?;

        let meta = body
            .meta
            .filter(|meta| !meta.name.trim().is_empty())
            .ok_or_else(|| Error::MetadataLookup(format!("{imdb_id}: title not found")))?;

        let title = Title { name: meta.name.trim().to_string(), year: meta.start_year() };
        tracing::debug!(imdb_id, name = %title.name, year = ?title.year, "resolved title");
        Ok(title)
    }
}
