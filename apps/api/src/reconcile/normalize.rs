//! Canonical text forms used to compare library records with rules-engine output.

/// Separator between composite-key parts and between normalised list elements.
pub const KEY_DELIMITER: &str = "|";

/// Trims surrounding whitespace and lowercases.
pub fn normalize_text(value: &str) -> String {
    value.trim().to_lowercase()
}

/// `normalize_text` for optional fields; absent normalises to the empty string.
pub fn normalize_optional(value: Option<&str>) -> String {
    value.map(normalize_text).unwrap_or_default()
}

/// Order-independent canonical form of a tag-like list: every element is
/// normalised, empties are dropped, the rest sorted ascending and joined.
pub fn normalize_list(values: &[String]) -> String {
    let mut normalized: Vec<String> = values
        .iter()
        .map(|value| normalize_text(value))
        .filter(|value| !value.is_empty())
        .collect();
    normalized.sort();
    normalized.join(KEY_DELIMITER)
}
