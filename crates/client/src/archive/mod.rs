//! Subtitle archive extraction.
//!
//! ### Format Sniffing
//! - Decided once from leading magic bytes, never from headers or file names.
//! - ZIP `PK\x03\x04`, RAR 1.5-4.0 `Rar!\x1A\x07\x00`, RAR 5.0
//!   `Rar!\x1A\x07\x01\x00`, GZIP `\x1F\x8B`.
//! - Anything else is `UnsupportedArchiveFormat`; no heuristic decompression.
//!
//! ### Entry Selection
//! - Entries are visited in archive order (ZIP directory order, RAR stream
//!   order, the single GZIP member named by its `FNAME` header).
//! - The **first** entry whose lowercase name ends in an allowed extension
//!   wins. Upstream archives carry one subtitle track, so there is no
//!   best-match logic.
//!
//! ### Resource Bounds
//! - Callers cap the downloaded archive (200-500 KiB) before calling.
//! - The selected entry is inflated through a byte limit, so a small
//!   compressed bomb cannot blow up memory.
//!
//! Text encoding is not touched here; see [`crate::encoding`].

mod gzip;
mod rar;
mod zip;

use serde::{Deserialize, Serialize};
use std::io::Read;
use subdx_core::Error;

/// Shortest buffer that can carry any supported signature.
pub const MIN_ARCHIVE_LEN: usize = 4;

/// Default subtitle extensions.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".srt", ".sub", ".ssa"];

/// Default inflated-size cap for the selected entry (4 MiB).
pub const DEFAULT_MAX_ENTRY_BYTES: usize = 4 * 1024 * 1024;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const RAR4_MAGIC: &[u8] = b"Rar!\x1A\x07\x00";
const RAR5_MAGIC: &[u8] = b"Rar!\x1A\x07\x01\x00";
const GZIP_MAGIC: &[u8] = b"\x1F\x8B";

/// A subtitle file pulled out of an archive, still in its original encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFile {
    /// Name as stored in the archive.
    pub name: String,
    /// Raw entry bytes.
    pub data: Vec<u8>,
}

/// Container formats recognized by their signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Rar4,
    Rar5,
    Gzip,
}

impl ArchiveFormat {
    /// Classify a buffer by its leading bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(ZIP_MAGIC) {
            Some(ArchiveFormat::Zip)
        } else if data.starts_with(RAR4_MAGIC) {
            Some(ArchiveFormat::Rar4)
        } else if data.starts_with(RAR5_MAGIC) {
            Some(ArchiveFormat::Rar5)
        } else if data.starts_with(GZIP_MAGIC) {
            Some(ArchiveFormat::Gzip)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Rar4 => "rar4",
            ArchiveFormat::Rar5 => "rar5",
            ArchiveFormat::Gzip => "gzip",
        }
    }

    fn reader(&self) -> &'static dyn EntryReader {
        match self {
            ArchiveFormat::Zip => &zip::ZipEntries,
            ArchiveFormat::Rar4 | ArchiveFormat::Rar5 => &rar::RarEntries,
            ArchiveFormat::Gzip => &gzip::GzipEntries,
        }
    }
}

/// Which archive entries count as subtitles, and how large they may inflate.
#[derive(Debug, Clone)]
pub struct SubtitlePolicy {
    extensions: Vec<String>,
    max_entry_bytes: usize,
}

impl SubtitlePolicy {
    /// Build a policy from extensions such as `".srt"`; matching is case-insensitive.
    pub fn new<S: AsRef<str>>(extensions: impl IntoIterator<Item = S>, max_entry_bytes: usize) -> Self {
        let extensions = extensions.into_iter().map(|ext| ext.as_ref().to_lowercase()).collect();
        Self { extensions, max_entry_bytes }
    }

    pub fn accepts(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    pub fn max_entry_bytes(&self) -> usize {
        self.max_entry_bytes
    }
}

impl Default for SubtitlePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS.iter().copied(), DEFAULT_MAX_ENTRY_BYTES)
    }
}

/// Format-specific strategy that walks entries in archive order.
trait EntryReader: Sync {
    /// Return the first entry accepted by `policy`, or `None` if there is none.
    fn first_match(&self, data: &[u8], policy: &SubtitlePolicy) -> Result<Option<ExtractedFile>, Error>;
}

/// Extract the first subtitle entry from an archive buffer.
///
/// # Errors
///
/// - `MalformedArchive` if `data` is shorter than 4 bytes, the container is
///   corrupt, or the entry inflates past the policy limit
/// - `UnsupportedArchiveFormat` if no signature matches
/// - `NoSubtitleInArchive` if no entry has an allowed extension
pub fn extract(data: &[u8], policy: &SubtitlePolicy) -> Result<ExtractedFile, Error> {
    if data.len() < MIN_ARCHIVE_LEN {
        return Err(Error::MalformedArchive(format!(
            "archive is {} bytes, shorter than {MIN_ARCHIVE_LEN}",
            data.len()
        )));
    }

    let format = ArchiveFormat::sniff(data).ok_or(Error::UnsupportedArchiveFormat)?;
    tracing::debug!(format = format.name(), size = data.len(), "extracting archive");

    let file = format.reader().first_match(data, policy)?.ok_or(Error::NoSubtitleInArchive)?;
    tracing::debug!(format = format.name(), name = %file.name, size = file.data.len(), "extracted subtitle entry");

    Ok(file)
}

/// Read an entry through the inflate cap.
fn read_bounded(reader: impl Read, limit: usize, name: &str) -> Result<Vec<u8>, Error> {
    let mut data = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut data)
        .map_err(|e| Error::MalformedArchive(format!("failed to read '{name}': {e}")))?;

    if data.len() > limit {
        return Err(Error::MalformedArchive(format!("'{name}' inflates beyond {limit} bytes")));
    }

    Ok(data)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::{Cursor, Write};

    /// Build a ZIP with the given (name, content) entries in order.
    pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = ::zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Build a GZIP stream, optionally carrying an `FNAME` header.
    pub fn gzip_stream(name: Option<&str>, content: &[u8]) -> Vec<u8> {
        let mut builder = flate2::GzBuilder::new();
        if let Some(name) = name {
            builder = builder.filename(name);
        }
        let mut encoder = builder.write(Vec::new(), flate2::Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap()
    }
}
