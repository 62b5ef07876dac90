//! Subtitle text encoding detection and normalization to UTF-8.
//!
//! Subtitles on the upstream are mostly Spanish and were authored on
//! Windows, so the legacy candidates are Windows-1252 and ISO-8859-1.
//!
//! 1. Valid UTF-8 (BOM or not) is `Utf8` and is never altered.
//! 2. Trailing DOS EOF (`0x1A`) and NUL padding is ignored; any other
//!    C0 control byte (besides tab, newline, carriage return, form feed)
//!    makes the input `Unknown`, as do bytes Windows-1252 leaves undefined.
//! 3. `chardetng` classifies the rest. A Western guess with bytes in
//!    `0x80..=0x9F` is `Windows1252`, without them `Iso8859_1`; any other
//!    guess is `Unknown`.
//!
//! `Unknown` bytes pass through unchanged so callers can still decide.

use chardetng::EncodingDetector;
use serde::{Deserialize, Serialize};

/// Top-level domain hint for the detector; the upstream serves Spanish text.
const SOURCE_TLD: &[u8] = b"ar";

/// Trailing bytes legacy editors append after the last cue.
const PADDING: [u8; 2] = [0x1A, 0x00];

/// Bytes in `0x80..=0x9F` that Windows-1252 leaves unassigned.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectedEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "windows-1252")]
    Windows1252,
    #[serde(rename = "iso-8859-1")]
    Iso8859_1,
    Unknown,
}

impl DetectedEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectedEncoding::Utf8 => "utf-8",
            DetectedEncoding::Windows1252 => "windows-1252",
            DetectedEncoding::Iso8859_1 => "iso-8859-1",
            DetectedEncoding::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DetectedEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guess the encoding of `data`.
pub fn detect(data: &[u8]) -> DetectedEncoding {
    if encoding_rs::Encoding::utf8_valid_up_to(data) == data.len() {
        return DetectedEncoding::Utf8;
    }

    let body = trim_padding(data);
    if body.iter().any(|&b| is_binary_control(b) || CP1252_UNDEFINED.contains(&b)) {
        return DetectedEncoding::Unknown;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(body, true);
    if detector.guess(Some(SOURCE_TLD), false) != encoding_rs::WINDOWS_1252 {
        return DetectedEncoding::Unknown;
    }

    if body.iter().any(|b| (0x80..=0x9F).contains(b)) {
        DetectedEncoding::Windows1252
    } else {
        DetectedEncoding::Iso8859_1
    }
}

/// Detect the encoding of `data` and transcode it to UTF-8.
///
/// UTF-8 input is returned byte-identical, including any BOM.
/// `Unknown` input is returned unchanged. Transcoded output drops the
/// trailing padding.
pub fn normalize(data: Vec<u8>) -> (Vec<u8>, DetectedEncoding) {
    let encoding = detect(&data);
    let normalized = match encoding {
        DetectedEncoding::Utf8 | DetectedEncoding::Unknown => data,
        DetectedEncoding::Windows1252 => {
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(trim_padding(&data));
            text.into_owned().into_bytes()
        }
        DetectedEncoding::Iso8859_1 => encoding_rs::mem::decode_latin1(trim_padding(&data)).into_owned().into_bytes(),
    };

    tracing::debug!(encoding = encoding.as_str(), size = normalized.len(), "normalized subtitle text");
    (normalized, encoding)
}

fn trim_padding(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|b| !PADDING.contains(b)).map_or(0, |i| i + 1);
    &data[..end]
}

/// C0 controls other than tab, newline, carriage return and form feed.
fn is_binary_control(b: u8) -> bool {
    b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C)
}
