use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::domain::{DISPLAY_ORDER, ViewerError};

pub const NULL_GLYPH: &str = "∅";
const NEWLINE_GLYPH: &str = " ↵ ";
const CHECKED: &str = "[x]";
const UNCHECKED: &str = "[ ]";

/// How a column is rendered. Dispatch is exhaustive in `format_cells`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnKind {
    /// Cell holds a url, rendered as a fixed clickable label instead of the
    /// raw string.
    Link { display_text: &'static str },
    Text,
    Checkbox,
    Number,
    Date,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub label: &'static str,
    pub kind: ColumnKind,
}

/// Display rules for the known columns. Pure constant data; columns outside
/// the required set are never rendered regardless of what is listed here.
pub fn column_spec(name: &str) -> Option<ColumnSpec> {
    let spec = match name {
        "user_profile_url" => ColumnSpec {
            label: "Profile",
            kind: ColumnKind::Link {
                display_text: "View profile",
            },
        },
        "user/profile_pic_url" => ColumnSpec {
            label: "Profile picture",
            kind: ColumnKind::Link {
                display_text: "View photo",
            },
        },
        "user/username" => ColumnSpec {
            label: "Username",
            kind: ColumnKind::Text,
        },
        "user/is_verified" => ColumnSpec {
            label: "Verified",
            kind: ColumnKind::Checkbox,
        },
        "comment_like_count" => ColumnSpec {
            label: "Likes",
            kind: ColumnKind::Number,
        },
        "text" => ColumnSpec {
            label: "Comment",
            kind: ColumnKind::Text,
        },
        "created_at" => ColumnSpec {
            label: "Date",
            kind: ColumnKind::Date,
        },
        _ => return None,
    };
    Some(spec)
}

/// Restricts a validated frame to the required columns, reordered for
/// display. Formatting is applied afterwards, per column.
pub fn project(frame: &DataFrame) -> Result<DataFrame, ViewerError> {
    Ok(frame.select(DISPLAY_ORDER)?)
}

/// Formats one column into display strings, one per row. Must never panic,
/// whatever the cell values are.
pub fn format_cells(column: &Column, kind: &ColumnKind) -> Result<Vec<String>, ViewerError> {
    let cells = match kind {
        ColumnKind::Link { display_text } => stringify(column)?
            .into_iter()
            .map(|value| match value {
                Some(_) => display_text.to_string(),
                None => NULL_GLYPH.to_string(),
            })
            .collect(),
        ColumnKind::Text | ColumnKind::Number => stringify(column)?
            .into_iter()
            .map(|value| value.unwrap_or_else(|| NULL_GLYPH.to_string()))
            .collect(),
        ColumnKind::Checkbox => format_checkbox(column)?,
        ColumnKind::Date => format_date(column)?,
    };
    Ok(cells)
}

// String rendition of any column, embedded newlines folded into a glyph.
fn stringify(column: &Column) -> Result<Vec<Option<String>>, ViewerError> {
    let col = column.cast(&DataType::String)?;
    let series = col.str()?;
    Ok(series
        .into_iter()
        .map(|value| value.map(|s| s.replace("\r\n", NEWLINE_GLYPH).replace("\n", NEWLINE_GLYPH)))
        .collect())
}

fn format_checkbox(column: &Column) -> Result<Vec<String>, ViewerError> {
    if column.dtype() == &DataType::Boolean {
        let series = column.bool()?;
        return Ok(series
            .into_iter()
            .map(|value| match value {
                Some(true) => CHECKED.to_string(),
                Some(false) => UNCHECKED.to_string(),
                None => NULL_GLYPH.to_string(),
            })
            .collect());
    }

    // Non-boolean columns get a best-effort coercion from the usual textual
    // spellings; anything unrecognized renders verbatim.
    Ok(stringify(column)?
        .into_iter()
        .map(|value| match value {
            Some(s) => match s.to_lowercase().as_str() {
                "true" | "1" => CHECKED.to_string(),
                "false" | "0" => UNCHECKED.to_string(),
                _ => s,
            },
            None => NULL_GLYPH.to_string(),
        })
        .collect())
}

fn format_date(column: &Column) -> Result<Vec<String>, ViewerError> {
    let column = match column.dtype() {
        DataType::Date => column.clone(),
        DataType::Datetime(_, _) => column.cast(&DataType::Date)?,
        _ => column.clone(),
    };

    Ok(stringify(&column)?
        .into_iter()
        .map(|value| match value {
            Some(s) => coerce_date(&s).map(|d| d.to_string()).unwrap_or(s),
            None => NULL_GLYPH.to_string(),
        })
        .collect())
}

// A Date column stringifies to YYYY-MM-DD already and passes through the
// first parse attempt; string columns get the common timestamp layouts.
fn coerce_date(value: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.date_naive());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::REQUIRED_COLUMNS;

    #[test]
    fn every_required_column_has_a_spec() {
        for name in REQUIRED_COLUMNS {
            assert!(column_spec(name).is_some(), "no spec for {name}");
        }
        assert!(column_spec("something_else").is_none());
    }

    #[test]
    fn projection_restricts_and_reorders() {
        let frame = df!(
            "extra" => &[1i64],
            "text" => &["hi"],
            "created_at" => &["2024-01-01"],
            "user/username" => &["alice"],
            "comment_like_count" => &[3i64],
            "user/is_verified" => &[true],
            "user_profile_url" => &["https://example.com/alice"],
        )
        .unwrap();

        let projected = project(&frame).unwrap();
        let names: Vec<&str> = projected
            .get_column_names()
            .iter()
            .map(|n| n.as_str())
            .collect();
        assert_eq!(names, DISPLAY_ORDER.to_vec());
    }

    #[test]
    fn links_render_as_fixed_labels() {
        let column = Column::new(
            "user_profile_url".into(),
            &[Some("https://example.com/a"), None],
        );
        let kind = ColumnKind::Link {
            display_text: "View profile",
        };
        assert_eq!(
            format_cells(&column, &kind).unwrap(),
            vec!["View profile", NULL_GLYPH]
        );
    }

    #[test]
    fn checkboxes_from_booleans_and_text() {
        let column = Column::new("v".into(), &[Some(true), Some(false), None]);
        assert_eq!(
            format_cells(&column, &ColumnKind::Checkbox).unwrap(),
            vec!["[x]", "[ ]", NULL_GLYPH]
        );

        let column = Column::new("v".into(), &["True", "0", "maybe"]);
        assert_eq!(
            format_cells(&column, &ColumnKind::Checkbox).unwrap(),
            vec!["[x]", "[ ]", "maybe"]
        );
    }

    #[test]
    fn numbers_use_default_formatting() {
        let column = Column::new("likes".into(), &[Some(12i64), None]);
        assert_eq!(
            format_cells(&column, &ColumnKind::Number).unwrap(),
            vec!["12", NULL_GLYPH]
        );
    }

    #[test]
    fn text_is_verbatim_with_folded_newlines() {
        let column = Column::new("text".into(), &["plain", "two\nlines"]);
        assert_eq!(
            format_cells(&column, &ColumnKind::Text).unwrap(),
            vec!["plain", "two ↵ lines"]
        );
    }

    #[test]
    fn dates_are_coerced_and_fall_back_verbatim() {
        let column = Column::new(
            "created_at".into(),
            &["2024-03-05T10:30:00+00:00", "2024-03-05", "not a date"],
        );
        assert_eq!(
            format_cells(&column, &ColumnKind::Date).unwrap(),
            vec!["2024-03-05", "2024-03-05", "not a date"]
        );
    }
}
