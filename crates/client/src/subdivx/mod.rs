//! subdivx upstream client.
//!
//! The site has no public API. A search flow looks like this:
//!
//! 1. `GET /inc/gt.php?gt=1` hands out a token (JSON) and a session cookie.
//! 2. `GET /` exposes the site version marker that names the search field.
//! 3. `POST /inc/ajax.php` with `buscar<version>=<query>` and the token,
//!    cookie attached, returns a JSON page of results.
//!
//! Downloads go through `GET /descargar.php?id=<id>`, which redirects to an
//! archive (ZIP, RAR or GZIP, whatever the uploader used).
//!
//! Nothing here retries; failures surface to the caller.

pub mod request;
pub mod response;
pub mod types;
pub mod version;

pub use types::{SearchCandidate, SearchResult, SessionCookie, SessionToken};
pub use version::VersionParser;

use crate::archive::{self, ExtractedFile, SubtitlePolicy};
use crate::fetch::{self, HttpConfig};
use bytes::Bytes;
use reqwest::{StatusCode, header};
use subdx_core::{AppConfig, Error};
use url::Url;

/// HTTP client for the subdivx site.
#[derive(Debug, Clone)]
pub struct SubdivxClient {
    http: reqwest::Client,
    base: Url,
    config: HttpConfig,
    policy: SubtitlePolicy,
    version: VersionParser,
}

impl SubdivxClient {
    /// Create a client against `base_url`.
    pub fn new(base_url: &str, config: HttpConfig, policy: SubtitlePolicy) -> Result<Self, Error> {
        let base = fetch::canonicalize_base(base_url).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let http = fetch::build_client(&config)?;
        let version = VersionParser::new()?;

        Ok(Self { http, base, config, policy, version })
    }

    /// Create a client from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let policy = SubtitlePolicy::new(&config.subtitle_extensions, config.max_entry_bytes);
        Self::new(&config.base_url, HttpConfig::from(config), policy)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        fetch::endpoint(&self.base, path).map_err(|e| Error::InvalidInput(e.to_string()))
    }

    /// Acquire a search token and its session cookie.
    ///
    /// # Errors
    ///
    /// - `UpstreamUnavailable` on transport failure or timeout
    /// - `UpstreamProtocol` on a non-2xx status, malformed JSON, an empty
    ///   token, or a missing session cookie
    pub async fn get_token(&self) -> Result<SessionToken, Error> {
        let url = self.url("inc/gt.php?gt=1")?;
        tracing::debug!(%url, "requesting session token");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| fetch::transport_error("token request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamProtocol(format!("token request: status {}", status.as_u16())));
        }

        let cookie = response
            .cookies()
            .find(|cookie| !cookie.name().is_empty())
            .map(|cookie| SessionCookie { name: cookie.name().to_string(), value: cookie.value().to_string() })
            .ok_or_else(|| Error::UpstreamProtocol("token response carried no session cookie".to_string()))?;

        let body: response::TokenResponse = response
            .json()
            .await
            .map_err(|e| fetch::transport_error("token response", e))?;

        if body.token.trim().is_empty() {
            return Err(Error::UpstreamProtocol("token response carried an empty token".to_string()));
        }

        Ok(SessionToken { token: body.token, cookie })
    }

    /// Fetch the landing page and read the current site version.
    pub async fn site_version(&self) -> Result<String, Error> {
        let response = self
            .http
            .get(self.base.clone())
            .send()
            .await
            .map_err(|e| fetch::transport_error("landing page request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamProtocol(format!("landing page: status {}", status.as_u16())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| fetch::transport_error("failed to read landing page", e))?;

        self.version.parse_site_version(&body)
    }

    /// Run a search with a fresh session token.
    ///
    /// # Errors
    ///
    /// - `UpstreamUnavailable` on transport failure or timeout
    /// - `UpstreamProtocol` if the version marker is missing or ambiguous,
    ///   the status is not 200, or the JSON does not decode
    pub async fn search(&self, token: &SessionToken, query: &str) -> Result<SearchResult, Error> {
        let version = self.site_version().await?;
        let body = request::search_form(&version, &token.token, query);
        tracing::debug!(query, version = %version, "searching subtitles");

        let response = self
            .http
            .post(self.url("inc/ajax.php")?)
            .header(header::COOKIE, token.cookie.header_value())
            .header(header::CONTENT_TYPE, request::FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| fetch::transport_error("search request failed", e))?;

        fetch::require_status(&response, StatusCode::OK, "search")?;

        let page: response::AjaxResponse = response
            .json()
            .await
            .map_err(|e| fetch::transport_error("search response", e))?;
        let result = SearchResult::from(page);

        tracing::info!(
            query,
            total_records = result.total_records,
            candidates = result.candidates.len(),
            "found subtitles"
        );

        Ok(result)
    }

    /// Download a subtitle archive, bounded by the configured byte cap.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for id 0
    /// - `UpstreamUnavailable` on transport failure or timeout
    /// - `UpstreamProtocol` if the final status is not 200
    /// - `DownloadTooLarge` once the body exceeds the cap
    pub async fn download_archive(&self, id: u64) -> Result<Bytes, Error> {
        if id == 0 {
            return Err(Error::InvalidInput("subtitle id must be positive".to_string()));
        }

        let url = self.url(&format!("descargar.php?id={id}"))?;
        let response = self
            .http
            .get(url)
            .timeout(self.config.download_timeout)
            .send()
            .await
            .map_err(|e| fetch::transport_error("download request failed", e))?;

        fetch::require_status(&response, StatusCode::OK, "download")?;
        let final_url = response.url().clone();
        let bytes = fetch::read_capped(response, self.config.max_archive_bytes).await?;

        tracing::info!(id, %final_url, size = bytes.len(), "downloaded subtitle archive");
        Ok(bytes)
    }

    /// Download an archive and extract its first subtitle entry.
    ///
    /// Extraction runs on the blocking pool.
    pub async fn fetch_subtitle(&self, id: u64) -> Result<ExtractedFile, Error> {
        let bytes = self.download_archive(id).await?;
        let policy = self.policy.clone();

        tokio::task::spawn_blocking(move || archive::extract(&bytes, &policy))
            .await
            .map_err(|e| Error::MalformedArchive(format!("extraction task failed: {e}")))?
    }
}
