//! Accepts the root folder either as a Drive link or as a bare ID.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{DriveError, Result};

/// Folder links as copied from the Drive web UI, including `open?id=` links.
static FOLDER_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://drive\.google\.com/(?:drive/(?:u/\d+/)?folders/|open\?id=)([a-zA-Z0-9_-]+)",
    )
    .expect("Invalid folder link regex")
});

static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid ID regex"));

/// Resolve the folder argument to a Drive folder ID.
///
/// ```
/// use drive_transfer::url_parser::folder_id;
///
/// let id = folder_id("https://drive.google.com/drive/u/1/folders/1abc123?usp=sharing").unwrap();
/// assert_eq!(id, "1abc123");
///
/// assert_eq!(folder_id("root").unwrap(), "root");
/// ```
pub fn folder_id(link_or_id: &str) -> Result<String> {
    let trimmed = link_or_id.trim();

    if let Some(id) = FOLDER_LINK_REGEX
        .captures(trimmed)
        .and_then(|captures| captures.get(1))
    {
        return Ok(id.as_str().to_string());
    }

    if ID_REGEX.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    Err(DriveError::InvalidUrlOrId(link_or_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_link_with_user_index() {
        let url = "https://drive.google.com/drive/u/2/folders/1abc123XYZ";
        assert_eq!(folder_id(url).unwrap(), "1abc123XYZ");
    }

    #[test]
    fn test_open_link() {
        let url = "https://drive.google.com/open?id=1abc123XYZ";
        assert_eq!(folder_id(url).unwrap(), "1abc123XYZ");
    }

    #[test]
    fn test_file_link_is_rejected() {
        let url = "https://drive.google.com/file/d/1abc123XYZ/view";
        assert!(folder_id(url).is_err());
    }

    #[test]
    fn test_blank_input() {
        assert!(folder_id("").is_err());
        assert!(folder_id("   ").is_err());
    }
}
