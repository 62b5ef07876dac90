use super::{EntryReader, ExtractedFile, SubtitlePolicy, read_bounded};
use std::io::Cursor;
use subdx_core::Error;
use zip::ZipArchive;
use zip::result::ZipError;

pub(super) struct ZipEntries;

impl EntryReader for ZipEntries {
    fn first_match(&self, data: &[u8], policy: &SubtitlePolicy) -> Result<Option<ExtractedFile>, Error> {
        let mut archive = ZipArchive::new(Cursor::new(data)).map_err(zip_error)?;

        for index in 0..archive.len() {
            // Raw access reads the local header only, so entries we skip are never inflated.
            let name = {
                let entry = archive.by_index_raw(index).map_err(zip_error)?;
                if entry.is_dir() || !policy.accepts(entry.name()) {
                    continue;
                }
                entry.name().to_string()
            };

            let entry = archive.by_index(index).map_err(zip_error)?;
            let data = read_bounded(entry, policy.max_entry_bytes(), &name)?;
            return Ok(Some(ExtractedFile { name, data }));
        }

        Ok(None)
    }
}

fn zip_error(err: ZipError) -> Error {
    Error::MalformedArchive(format!("invalid ZIP archive: {err}"))
}
