//! Shared HTTP plumbing for upstream calls.
//!
//! ### Client
//! - Browser-like User-Agent and `Accept-Language` on every request, so the
//!   upstream does not switch language by client IP.
//! - Request timeout (default: 10s); downloads override it per request.
//! - Max redirects: 5
//!
//! ### Body Limits
//! - Downloads are read chunk by chunk and abort once the cap is exceeded.
//! - A declared `Content-Length` above the cap fails before reading.

pub mod url;

use bytes::{Bytes, BytesMut};
use reqwest::{Client, Response, StatusCode, header};
use std::time::Duration;
use subdx_core::{AppConfig, Error};

pub use self::url::{UrlError, canonicalize_base, endpoint};

/// Configuration for the upstream HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// User agent string
    pub user_agent: String,

    /// Accept-Language header value
    pub accept_language: String,

    /// Session and search timeout (default: 10s)
    pub timeout: Duration,

    /// Archive download timeout (default: 30s)
    pub download_timeout: Duration,

    /// Maximum archive size in bytes (default: 200 KiB)
    pub max_archive_bytes: usize,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for HttpConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
            timeout: config.timeout(),
            download_timeout: config.download_timeout(),
            max_archive_bytes: config.max_archive_bytes,
            max_redirects: 5,
        }
    }
}

/// Build the reqwest client shared by all upstream calls.
pub fn build_client(config: &HttpConfig) -> Result<Client, Error> {
    let mut headers = header::HeaderMap::new();
    let accept_language = header::HeaderValue::from_str(&config.accept_language)
        .map_err(|e| Error::InvalidInput(format!("invalid Accept-Language header: {e}")))?;
    headers.insert(header::ACCEPT_LANGUAGE, accept_language);

    Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(config.timeout)
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .use_rustls_tls()
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .map_err(|e| Error::UpstreamUnavailable(format!("failed to build HTTP client: {e}")))
}

/// Map a reqwest failure onto the upstream error family.
///
/// Body decoding problems mean the upstream answered in an unexpected shape;
/// everything else is a transport failure.
pub fn transport_error(context: &str, err: reqwest::Error) -> Error {
    if err.is_decode() {
        Error::UpstreamProtocol(format!("{context}: {err}"))
    } else if err.is_timeout() {
        Error::UpstreamUnavailable(format!("{context}: timed out"))
    } else {
        Error::UpstreamUnavailable(format!("{context}: {err}"))
    }
}

/// Fail with `UpstreamProtocol` unless the response status is exactly `expected`.
pub fn require_status(response: &Response, expected: StatusCode, context: &str) -> Result<(), Error> {
    let status = response.status();
    if status != expected {
        return Err(Error::UpstreamProtocol(format!("{context}: status {}", status.as_u16())));
    }
    Ok(())
}

/// Read a response body, failing once more than `max_bytes` arrive.
pub async fn read_capped(mut response: Response, max_bytes: usize) -> Result<Bytes, Error> {
    if let Some(len) = response.content_length()
        && len > max_bytes as u64
    {
        return Err(Error::DownloadTooLarge(format!("{len} bytes exceeds {max_bytes}")));
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| transport_error("failed to read response", e))?
    {
        if body.len() + chunk.len() > max_bytes {
            return Err(Error::DownloadTooLarge(format!("more than {max_bytes} bytes received")));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body.freeze())
}
