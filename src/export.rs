use std::fs;
use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::domain::{PROFILE_BASE_URL, USERNAME_COLUMN, ViewerError};

/// Builds the newline-joined profile url payload from the username column.
///
/// Values are passed through verbatim, one url per non-missing username in
/// row order. Blank cells are skipped instead of producing malformed urls.
pub fn profile_urls(frame: &DataFrame) -> Result<String, ViewerError> {
    let column = frame
        .column(USERNAME_COLUMN)
        .map_err(|_| ViewerError::ColumnNotFound(USERNAME_COLUMN.to_string()))?;

    let usernames = column.cast(&DataType::String)?;
    let urls: Vec<String> = usernames
        .str()?
        .into_iter()
        .flatten()
        .filter(|username| !username.is_empty())
        .map(|username| format!("{PROFILE_BASE_URL}{username}"))
        .collect();

    Ok(urls.join("\n"))
}

pub fn save(path: &Path, payload: &str) -> Result<usize, ViewerError> {
    fs::write(path, payload)?;
    let count = if payload.is_empty() { 0 } else { payload.lines().count() };
    info!("Wrote {} urls to {:?}", count, path);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_one_url_per_username_skipping_nulls() {
        let frame = df!(
            "user/username" => &[Some("alice"), None, Some("bob")],
        )
        .unwrap();
        assert_eq!(
            profile_urls(&frame).unwrap(),
            "https://www.instagram.com/alice\nhttps://www.instagram.com/bob"
        );
    }

    #[test]
    fn values_are_not_transformed() {
        let frame = df!(
            "user/username" => &[" spaced ", "weird/chars?&"],
        )
        .unwrap();
        assert_eq!(
            profile_urls(&frame).unwrap(),
            "https://www.instagram.com/ spaced \nhttps://www.instagram.com/weird/chars?&"
        );
    }

    #[test]
    fn no_usernames_yields_an_empty_payload() {
        let frame = df!(
            "user/username" => &[None::<&str>, Some("")],
        )
        .unwrap();
        assert_eq!(profile_urls(&frame).unwrap(), "");
    }

    #[test]
    fn absent_column_is_an_error() {
        let frame = df!("text" => &["hi"]).unwrap();
        let err = profile_urls(&frame).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Column 'user/username' not found in the loaded file"
        );
    }

    #[test]
    fn save_reports_the_url_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usernames.txt");

        let count = save(&path, "https://www.instagram.com/alice").unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "https://www.instagram.com/alice"
        );

        assert_eq!(save(&path, "").unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
