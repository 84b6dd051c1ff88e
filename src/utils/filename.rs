//! Filename sanitization for download names.

/// Reduces `name` to a string usable as a filename.
///
/// - Trims surrounding whitespace
/// - Replaces inner spaces with `_`
/// - Drops everything except Unicode alphanumerics, `-`, `_` and `.`
///
/// The output is stable under repeated application.
pub fn get_valid_filename(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|&c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect()
}
