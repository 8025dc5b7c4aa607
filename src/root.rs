//! Base-path normalization for resolving inputs and references.

use std::path::{is_separator, MAIN_SEPARATOR};

/// Normalize a raw root so that it ends with exactly one path separator.
///
/// Empty (or absent) input stays empty, meaning "the working directory".
/// A root that already ends in a separator is returned unchanged, which makes
/// the function idempotent.
pub fn normalize_root(raw: Option<&str>) -> String {
    let raw = raw.unwrap_or("");
    if raw.is_empty() {
        return String::new();
    }
    match raw.chars().last() {
        Some(c) if is_separator(c) => raw.to_string(),
        _ => format!("{raw}{MAIN_SEPARATOR}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_maps_to_empty() {
        assert_eq!(normalize_root(None), "");
        assert_eq!(normalize_root(Some("")), "");
    }

    #[test]
    fn test_appends_single_separator() {
        let out = normalize_root(Some("app"));
        assert_eq!(out, format!("app{MAIN_SEPARATOR}"));
        assert_eq!(normalize_root(Some("app/")), "app/");
    }

    #[test]
    fn test_idempotent() {
        for raw in ["app", "a/b", "/abs/dir", "x/"] {
            let once = normalize_root(Some(raw));
            assert_eq!(normalize_root(Some(&once)), once);
        }
    }
}
