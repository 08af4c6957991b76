//! Helpers for text values arriving through multipart forms.

use crate::error::AppError;

/// Parses a form boolean once at the edge. `"true"`/`"false"` (any case) are
/// accepted; an empty value counts as absent.
pub fn parse_flag(field: &str, raw: Option<&str>) -> Result<Option<bool>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if raw.eq_ignore_ascii_case("true") {
        Ok(Some(true))
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(Some(false))
    } else {
        Err(AppError::Validation(format!(
            "{field} must be \"true\" or \"false\", got {raw:?}"
        )))
    }
}

/// Treats blank text as absent, the way browsers submit untouched inputs.
pub fn non_empty(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}

/// Keeps only the final path component of a client-supplied file name and
/// replaces anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_true_false_and_absent() {
        assert_eq!(parse_flag("available", Some("true")).unwrap(), Some(true));
        assert_eq!(parse_flag("available", Some("FALSE")).unwrap(), Some(false));
        assert_eq!(parse_flag("available", Some("")).unwrap(), None);
        assert_eq!(parse_flag("available", None).unwrap(), None);
        assert!(parse_flag("available", Some("yes")).is_err());
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\cakes\\black forest.jpg"), "black_forest.jpg");
        assert_eq!(sanitize_file_name(".."), "upload");
    }
}
