use super::{EntryReader, ExtractedFile, SubtitlePolicy, read_bounded};
use flate2::read::GzDecoder;
use subdx_core::Error;

/// A GZIP stream holds one member; its name comes from the optional `FNAME` header.
/// Without a name there is nothing to match against the allowlist.
pub(super) struct GzipEntries;

impl EntryReader for GzipEntries {
    fn first_match(&self, data: &[u8], policy: &SubtitlePolicy) -> Result<Option<ExtractedFile>, Error> {
        let mut decoder = GzDecoder::new(data);
        let body = read_bounded(&mut decoder, policy.max_entry_bytes(), "gzip member")?;

        let name = decoder
            .header()
            .and_then(|header| header.filename())
            .map(|raw| String::from_utf8_lossy(raw).into_owned());

        match name {
            Some(name) if policy.accepts(&name) => Ok(Some(ExtractedFile { name, data: body })),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::gzip_stream;
    use super::*;

    #[test]
    fn test_unnamed_member_is_not_a_subtitle() {
        let stream = gzip_stream(None, b"1\nHola\n");
        assert_eq!(GzipEntries.first_match(&stream, &SubtitlePolicy::default()).unwrap(), None);
    }

    #[test]
    fn test_name_outside_allowlist() {
        let stream = gzip_stream(Some("notes.txt"), b"plain text");
        assert_eq!(GzipEntries.first_match(&stream, &SubtitlePolicy::default()).unwrap(), None);
    }

    #[test]
    fn test_corrupt_body() {
        let mut stream = gzip_stream(Some("a.srt"), b"some subtitle body that compresses");
        let len = stream.len();
        stream.truncate(len - 12);
        stream.extend_from_slice(&[0xFF; 4]);
        let result = GzipEntries.first_match(&stream, &SubtitlePolicy::default());
        assert!(matches!(result, Err(Error::MalformedArchive(_))));
    }
}
