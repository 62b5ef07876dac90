//! RAR 4 and RAR 5 via libunrar.
//!
//! libunrar only opens archives from a path, so the buffer is staged in a
//! temporary file that is removed when the reader returns.

use super::{EntryReader, ExtractedFile, SubtitlePolicy};
use std::io::Write;
use subdx_core::Error;
use unrar::Archive;

pub(super) struct RarEntries;

impl EntryReader for RarEntries {
    fn first_match(&self, data: &[u8], policy: &SubtitlePolicy) -> Result<Option<ExtractedFile>, Error> {
        let mut staged = tempfile::Builder::new()
            .prefix("subdx-")
            .suffix(".rar")
            .tempfile()
            .map_err(|e| Error::MalformedArchive(format!("failed to stage RAR archive: {e}")))?;
        staged
            .write_all(data)
            .and_then(|_| staged.flush())
            .map_err(|e| Error::MalformedArchive(format!("failed to stage RAR archive: {e}")))?;

        let mut archive = Archive::new(staged.path()).open_for_processing().map_err(rar_error)?;

        while let Some(header) = archive.read_header().map_err(rar_error)? {
            let entry = header.entry();
            let name = entry.filename.to_string_lossy().replace('\\', "/");
            let selected = entry.is_file() && policy.accepts(&name);
            let unpacked_size = entry.unpacked_size;

            if selected {
                if unpacked_size > policy.max_entry_bytes() as u64 {
                    return Err(Error::MalformedArchive(format!(
                        "'{name}' inflates beyond {} bytes",
                        policy.max_entry_bytes()
                    )));
                }
                let (data, _) = header.read().map_err(rar_error)?;
                return Ok(Some(ExtractedFile { name, data }));
            }

            archive = header.skip().map_err(rar_error)?;
        }

        Ok(None)
    }
}

fn rar_error(err: unrar::error::UnrarError) -> Error {
    Error::MalformedArchive(format!("invalid RAR archive: {err}"))
}
