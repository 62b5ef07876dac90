//! Unified error types for subdx.
//!
//! Every variant renders as `CODE: detail` so that callers (and logs) can
//! tell upstream drift apart from archive problems and cache failures.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the subtitle pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., malformed IMDb id).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Transport-level failure talking to the upstream site (connect, timeout, reset).
    #[error("UPSTREAM_UNAVAILABLE: {0}")]
    UpstreamUnavailable(String),

    /// The upstream answered, but not in the shape we expect.
    ///
    /// Unexpected status codes, malformed JSON, a missing session cookie or a
    /// missing site version marker all land here.
    #[error("UPSTREAM_PROTOCOL: {0}")]
    UpstreamProtocol(String),

    /// Archive download exceeded the configured byte cap.
    #[error("DOWNLOAD_TOO_LARGE: {0}")]
    DownloadTooLarge(String),

    /// Leading bytes did not match any known archive signature.
    #[error("UNSUPPORTED_ARCHIVE_FORMAT")]
    UnsupportedArchiveFormat,

    /// The archive matched a signature but could not be read.
    #[error("MALFORMED_ARCHIVE: {0}")]
    MalformedArchive(String),

    /// The archive holds no entry with an allowed subtitle extension.
    #[error("NO_SUBTITLE_IN_ARCHIVE")]
    NoSubtitleInArchive,

    /// Title metadata lookup failed.
    #[error("METADATA_LOOKUP: {0}")]
    MetadataLookup(String),

    /// Cache TTL was zero or negative.
    #[error("CACHE_ERROR: ttl must be positive")]
    InvalidTtl,

    /// Cached value could not be serialized or deserialized.
    #[error("CACHE_ERROR: serialization failed: {0}")]
    Serialization(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Whether this error belongs to the cache store family.
    pub fn is_cache_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidTtl | Error::Serialization(_) | Error::Database(_) | Error::MigrationFailed(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::UpstreamUnavailable(msg) => (-32003, msg.clone()),
            Error::UpstreamProtocol(msg) => (-32004, msg.clone()),
            Error::DownloadTooLarge(msg) => (-32005, msg.clone()),
            Error::UnsupportedArchiveFormat => (-32006, "Unsupported archive format".to_string()),
            Error::MalformedArchive(msg) => (-32007, msg.clone()),
            Error::NoSubtitleInArchive => (-32008, "No subtitle found in archive".to_string()),
            Error::MetadataLookup(msg) => (-32009, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::Serialization(msg) => (-32002, msg.clone()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::InvalidTtl => (-32002, "Cache TTL must be positive".to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UpstreamProtocol("version marker not found".to_string());
        assert!(err.to_string().contains("UPSTREAM_PROTOCOL"));
        assert!(err.to_string().contains("version marker"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::NoSubtitleInArchive;
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32008);
    }

    #[test]
    fn test_cache_error_family() {
        assert!(Error::InvalidTtl.is_cache_error());
        assert!(Error::Serialization("bad".into()).is_cache_error());
        assert!(!Error::UnsupportedArchiveFormat.is_cache_error());
    }

    #[test]
    fn test_serde_json_error_converts() {
        let parse: Result<u32, _> = serde_json::from_str("not json");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
