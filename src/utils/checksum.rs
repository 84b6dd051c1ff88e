//! Checksums and importing files into content storage.

use anyhow::{anyhow, Context, Result};
use md5::{Digest, Md5};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::utils::paths::get_content_storage_file_path;

const BUF_SIZE: usize = 1024 * 1024;

/// MD5 of a file as lowercase hex. Reads in bounded chunks.
pub fn md5_path(path: &Path) -> Result<String> {
    let mut f = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// MD5 of an in-memory buffer as lowercase hex.
pub fn md5_bytes(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

/// Returned (inside `anyhow::Error`) when an import source escapes the import root.
#[derive(Debug)]
pub struct OutsideImportRoot(pub PathBuf);

impl std::fmt::Display for OutsideImportRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source {} is outside the import root", self.0.display())
    }
}

impl std::error::Error for OutsideImportRoot {}

/// Resolves `source` against `import_root`, refusing anything that ends up
/// outside of it (`..`, absolute paths elsewhere, symlinks pointing out).
pub fn resolve_import_source(import_root: &Path, source: &Path) -> Result<PathBuf> {
    let root = import_root
        .canonicalize()
        .with_context(|| format!("import root {}", import_root.display()))?;
    let joined = if source.is_absolute() {
        source.to_path_buf()
    } else {
        root.join(source)
    };
    let resolved = joined
        .canonicalize()
        .with_context(|| format!("source {}", source.display()))?;
    if !resolved.starts_with(&root) {
        return Err(OutsideImportRoot(source.to_path_buf()).into());
    }
    Ok(resolved)
}

/// Copies `source` into content storage under its checksum name.
///
/// Returns `(checksum, extension)`. The extension is taken from the source
/// path, lowercased. If the target already exists the copy is skipped, since
/// identical names mean identical bytes.
///
/// Writes go to a uniquely named temp file beside the target and are renamed
/// into place, so concurrent imports of the same bytes never see a partial file.
pub fn import_into_storage(storage_dir: &Path, source: &Path) -> Result<(String, String)> {
    if !source.is_file() {
        return Err(anyhow!("source {} is not a file", source.display()));
    }
    let extension = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| anyhow!("source {} has no extension", source.display()))?;

    let checksum = md5_path(source)?;
    let filename = format!("{}.{}", checksum, extension);
    let out_path = get_content_storage_file_path(storage_dir, &filename)?;

    if out_path.exists() {
        log::debug!("{} already in storage, skipping copy", filename);
        return Ok((checksum, extension));
    }

    let parent = out_path
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent", out_path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    let mut tmp = NamedTempFile::with_prefix_in(format!(".{}.", filename), parent)
        .with_context(|| format!("temp file in {}", parent.display()))?;
    let mut input = fs::File::open(source).with_context(|| format!("open {}", source.display()))?;
    io::copy(&mut input, tmp.as_file_mut())
        .with_context(|| format!("copy {} -> {}", source.display(), tmp.path().display()))?;
    tmp.persist(&out_path)
        .with_context(|| format!("rename into {}", out_path.display()))?;

    log::info!("imported {} as {}", source.display(), filename);
    Ok((checksum, extension))
}
