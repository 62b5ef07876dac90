//! Site version marker scraping.
//!
//! The search form field is named `buscar<version>`, where `<version>` is
//! the release marker printed on the landing page (`>v2.3.1<`) with dots
//! removed. This is the piece most likely to break when the upstream
//! redesigns its markup, so it lives alone here.

use regex::bytes::Regex;
use subdx_core::Error;

const VERSION_MARKER: &str = r">v([0-9.a-z]+)<";

#[derive(Debug, Clone)]
pub struct VersionParser {
    marker: Regex,
}

impl VersionParser {
    pub fn new() -> Result<Self, Error> {
        let marker = Regex::new(VERSION_MARKER)
            .map_err(|e| Error::UpstreamProtocol(format!("invalid version marker pattern: {e}")))?;
        Ok(Self { marker })
    }

    /// Extract the dot-stripped site version from a landing page body.
    ///
    /// # Errors
    ///
    /// `UpstreamProtocol` if no marker is present, or if the page carries
    /// more than one distinct version.
    pub fn parse_site_version(&self, body: &[u8]) -> Result<String, Error> {
        let mut found: Option<String> = None;

        for captures in self.marker.captures_iter(body) {
            let Some(raw) = captures.get(1) else { continue };
            let version: String = String::from_utf8_lossy(raw.as_bytes()).chars().filter(|c| *c != '.').collect();

            match &found {
                None => found = Some(version),
                Some(existing) if *existing == version => {}
                Some(existing) => {
                    return Err(Error::UpstreamProtocol(format!(
                        "ambiguous site version markers: v{existing} and v{version}"
                    )));
                }
            }
        }

        found
            .filter(|version| !version.is_empty())
            .ok_or_else(|| Error::UpstreamProtocol("site version marker not found".to_string()))
    }
}
