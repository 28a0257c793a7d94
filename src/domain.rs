use std::fmt;
use std::io::Error;

use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

/// Columns that must be present in an opened file before anything is rendered.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "user/username",
    "text",
    "comment_like_count",
    "user/is_verified",
    "created_at",
    "user_profile_url",
];

/// Left-to-right column order of the rendered table, independent of the
/// column order in the file.
pub const DISPLAY_ORDER: [&str; 6] = [
    "user_profile_url",
    "user/username",
    "user/is_verified",
    "comment_like_count",
    "text",
    "created_at",
];

pub const USERNAME_COLUMN: &str = "user/username";
pub const PROFILE_BASE_URL: &str = "https://www.instagram.com/";
pub const EXPORT_FILE_NAME: &str = "usernames.txt";

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            event_poll_time: 100,
            max_column_width: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    ToggleIndex,
    OpenFile,
    Export,
    CopyCell,
    CopyRow,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

#[derive(Debug)]
pub enum ViewerError {
    IoError(Error),
    PolarsError(PolarsError),
    XlsxError(calamine::XlsxError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    MissingColumns(Vec<String>),
    ColumnNotFound(String),
}

impl From<Error> for ViewerError {
    fn from(err: Error) -> Self {
        ViewerError::IoError(err)
    }
}

impl From<PolarsError> for ViewerError {
    fn from(err: PolarsError) -> Self {
        ViewerError::PolarsError(err)
    }
}

impl From<calamine::XlsxError> for ViewerError {
    fn from(err: calamine::XlsxError) -> Self {
        ViewerError::XlsxError(err)
    }
}

// Rendered on the status line, so every variant has to read as a sentence.
impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerError::IoError(e) => write!(f, "Failed to load file: {e}"),
            ViewerError::PolarsError(e) => write!(f, "Failed to load file: {e}"),
            ViewerError::XlsxError(e) => write!(f, "Failed to load file: {e}"),
            ViewerError::LoadingFailed(reason) => write!(f, "Failed to load file: {reason}"),
            ViewerError::FileNotFound => write!(f, "Failed to load file: file not found"),
            ViewerError::PermissionDenied => write!(f, "Failed to load file: permission denied"),
            ViewerError::UnknownFileType => {
                write!(f, "Unknown file type, expected xlsx, csv, parquet or arrow")
            }
            ViewerError::MissingColumns(missing) => {
                write!(f, "Missing required columns: {}", missing.join(", "))
            }
            ViewerError::ColumnNotFound(name) => {
                write!(f, "Column '{name}' not found in the loaded file")
            }
        }
    }
}

impl std::error::Error for ViewerError {}

pub const HELP_TEXT: &str = "\
igview - Instagram comment export viewer

  o            open a file (xlsx, csv, parquet, arrow)
  e            export profile urls to usernames.txt
  y / Y        copy current cell / row to the clipboard
  i            toggle the row index column
  arrows, hjkl move the selection
  PgUp / PgDn  move one page
  g / G        jump to the first / last row
  ?            show this help
  Esc          close popup or prompt
  q            quit
";
