//! Base URL canonicalization for upstream endpoints.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a service base URL so endpoint paths can be joined onto it.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Drop query and fragment
/// 5. Ensure the path ends with `/`
pub fn canonicalize_base(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_query(None);
    parsed.set_fragment(None);

    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed)
}

/// Join a relative endpoint path (no leading `/`) onto a canonical base.
pub fn endpoint(base: &url::Url, path: &str) -> Result<url::Url, UrlError> {
    base.join(path).map_err(|e| UrlError::InvalidUrl(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize_base("https://www.subdivx.com").unwrap();
        assert_eq!(url.as_str(), "https://www.subdivx.com/");
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize_base("www.subdivx.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("www.subdivx.com"));
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize_base("https://WWW.SubDivX.com").unwrap();
        assert_eq!(url.host_str(), Some("www.subdivx.com"));
    }

    #[test]
    fn test_canonicalize_drops_query_and_fragment() {
        let url = canonicalize_base("https://example.com/?a=1#top").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_canonicalize_keeps_port_and_path_prefix() {
        let url = canonicalize_base("http://127.0.0.1:8080/mirror").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/mirror/");
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize_base("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize_base(""), Err(UrlError::Empty)));
        assert!(matches!(canonicalize_base("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_endpoint_join() {
        let base = canonicalize_base("http://127.0.0.1:8080/mirror").unwrap();
        let url = endpoint(&base, "inc/gt.php?gt=1").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/mirror/inc/gt.php?gt=1");
    }
}
