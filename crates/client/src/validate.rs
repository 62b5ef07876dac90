//! Input validation shared by the MCP tools and the CLI.

use regex::Regex;
use std::sync::LazyLock;
use subdx_core::Error;

static IMDB_TITLE_ID: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"^tt\d+$"));

/// Accept IMDb title ids of the form `tt<digits>`.
pub fn imdb_id(id: &str) -> Result<&str, Error> {
    let pattern = IMDB_TITLE_ID
        .as_ref()
        .map_err(|e| Error::InvalidInput(format!("invalid id pattern: {e}")))?;
    if pattern.is_match(id) {
        Ok(id)
    } else {
        Err(Error::InvalidInput(format!("invalid IMDb title id '{id}'")))
    }
}

/// Parse a subdivx subtitle id, which must be a positive integer.
pub fn subtitle_id(id: &str) -> Result<u64, Error> {
    let value: i64 = id
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("invalid subtitle id '{id}', not a number")))?;

    if value <= 0 {
        return Err(Error::InvalidInput(format!("invalid subtitle id '{id}', must be positive")));
    }

    Ok(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imdb_id() {
        assert!(imdb_id("tt0944947").is_ok());
        assert!(imdb_id("tt1").is_ok());
        for bad in ["", "tt", "0944947", "tt09a", "TT0944947", " tt0944947", "tt0944947/"] {
            assert!(matches!(imdb_id(bad), Err(Error::InvalidInput(_))), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_imdb_pattern_is_valid() {
        assert!(IMDB_TITLE_ID.is_ok());
    }

    #[test]
    fn test_subtitle_id() {
        assert_eq!(subtitle_id("685421").unwrap(), 685421);
        assert_eq!(subtitle_id(" 12 ").unwrap(), 12);
        assert!(subtitle_id("0").is_err());
        assert!(subtitle_id("-3").is_err());
        assert!(subtitle_id("abc").is_err());
        assert!(subtitle_id("").is_err());
    }
}
