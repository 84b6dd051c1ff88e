//! Content storage layout.
//!
//! Files live at `<storage>/<c0>/<c1>/<checksum>.<ext>` where `c0`/`c1` are the
//! first two characters of the checksum. Sharding keeps directories small.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static VALID_STORAGE_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{32}(-data)?\.[0-9a-z]+$").expect("valid regex"));

/// True when `filename` looks like `<md5 hex>[-data].<ext>`.
pub fn is_valid_storage_filename(filename: &str) -> bool {
    VALID_STORAGE_FILENAME.is_match(filename)
}

/// Resolves the on-disk location of a storage filename.
///
/// Returns an error for anything that is not a valid storage filename, which
/// also rules out path traversal through the URL.
pub fn get_content_storage_file_path(storage_dir: &Path, filename: &str) -> Result<PathBuf> {
    if !is_valid_storage_filename(filename) {
        bail!("'{}' is not a valid content storage filename", filename);
    }
    let mut chars = filename.chars();
    // validated above: at least 32 ascii hex chars
    let (c0, c1) = match (chars.next(), chars.next()) {
        (Some(a), Some(b)) => (a, b),
        _ => bail!("'{}' is too short", filename),
    };
    Ok(storage_dir
        .join(c0.to_string())
        .join(c1.to_string())
        .join(filename))
}
