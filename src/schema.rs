use polars::prelude::*;

use crate::domain::{REQUIRED_COLUMNS, ViewerError};

/// Required names absent from the frame, in required-list order.
pub fn missing_columns(frame: &DataFrame, required: &[&str]) -> Vec<String> {
    let present = frame.get_column_names();
    required
        .iter()
        .filter(|name| !present.iter().any(|p| p.as_str() == **name))
        .map(|name| name.to_string())
        .collect()
}

/// Presence is binary per column; cell values are not type-checked.
pub fn validate(frame: &DataFrame) -> Result<(), ViewerError> {
    let missing = missing_columns(frame, &REQUIRED_COLUMNS);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ViewerError::MissingColumns(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DISPLAY_ORDER;

    fn full_frame() -> DataFrame {
        df!(
            "user/username" => &["alice"],
            "text" => &["hi"],
            "comment_like_count" => &[1i64],
            "user/is_verified" => &[true],
            "created_at" => &["2024-01-01"],
            "user_profile_url" => &["https://example.com/alice"],
        )
        .unwrap()
    }

    #[test]
    fn complete_frame_validates() {
        assert!(validate(&full_frame()).is_ok());
    }

    #[test]
    fn extra_columns_and_order_do_not_matter() {
        let mut frame = full_frame();
        frame.with_column(Series::new("extra".into(), &[42i64])).unwrap();
        assert!(validate(&frame).is_ok());
    }

    #[test]
    fn missing_subset_is_reported_in_required_order() {
        let frame = df!(
            "text" => &["hi"],
            "created_at" => &["2024-01-01"],
        )
        .unwrap();

        let err = validate(&frame).unwrap_err();
        let ViewerError::MissingColumns(missing) = err else {
            panic!("expected MissingColumns, got {err:?}");
        };
        assert_eq!(
            missing,
            vec![
                "user/username",
                "comment_like_count",
                "user/is_verified",
                "user_profile_url"
            ]
        );
    }

    #[test]
    fn all_columns_missing_lists_the_full_required_set() {
        let frame = df!("unrelated" => &[1i64]).unwrap();
        let missing = missing_columns(&frame, &REQUIRED_COLUMNS);
        assert_eq!(missing, REQUIRED_COLUMNS.map(String::from).to_vec());
    }

    #[test]
    fn display_order_is_a_permutation_of_the_required_set() {
        let mut required = REQUIRED_COLUMNS.to_vec();
        let mut order = DISPLAY_ORDER.to_vec();
        required.sort_unstable();
        order.sort_unstable();
        assert_eq!(required, order);
    }

    #[test]
    fn error_message_lists_exact_names() {
        let frame = df!(
            "user/username" => &["alice"],
            "text" => &["hi"],
            "comment_like_count" => &[1i64],
            "created_at" => &["2024-01-01"],
        )
        .unwrap();
        let err = validate(&frame).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required columns: user/is_verified, user_profile_url"
        );
    }
}
