//! In-memory catalog of content files, persisted as pretty JSON.

use anyhow::{anyhow, Context, Result};
use dashmap::DashMap;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::models::{ContentFileRecord, File};
use crate::utils::paths::{get_content_storage_file_path, is_valid_storage_filename};

/// Files keyed by storage filename (`{checksum}.{extension}`).
#[derive(Default)]
pub struct ContentCatalog {
    files: DashMap<String, File>,
    // Held across snapshot + write so a later save never loses to an earlier one.
    save_lock: Mutex<()>,
}

impl ContentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a record. Returns the previous one, if any.
    pub fn insert(&self, file: File) -> Option<File> {
        self.files.insert(file.get_filename(), file)
    }

    pub fn get(&self, filename: &str) -> Option<File> {
        self.files.get(filename).map(|f| f.value().clone())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Snapshot of all records, sorted by storage filename.
    pub fn list(&self) -> Vec<File> {
        let mut out: Vec<File> = self.files.iter().map(|e| e.value().clone()).collect();
        out.sort_by_key(|f| f.get_filename());
        out
    }

    /// Walks `storage_dir` and sets each record's `available` flag to whether
    /// its storage file sits at the sharded path the download endpoint reads.
    /// A file with the right name in the wrong directory does not count.
    ///
    /// Returns `(total, available, changed)`.
    pub fn annotate_available(&self, storage_dir: &Path) -> (usize, usize, bool) {
        let on_disk: HashSet<PathBuf> = WalkDir::new(storage_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_str().map_or(false, is_valid_storage_filename))
            .map(|e| e.into_path())
            .collect();

        let mut available = 0;
        let mut changed = false;
        for mut entry in self.files.iter_mut() {
            let present = get_content_storage_file_path(storage_dir, entry.key())
                .map(|p| on_disk.contains(&p))
                .unwrap_or(false);
            if entry.available != present {
                entry.available = present;
                changed = true;
            }
            if present {
                available += 1;
            }
        }
        (self.files.len(), available, changed)
    }

    /// Loads records from a JSON array. A missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self> {
        let catalog = Self::new();
        if !path.exists() {
            return Ok(catalog);
        }
        let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let records: Vec<ContentFileRecord> = serde_json::from_slice(&data)
            .with_context(|| format!("parse catalog {}", path.display()))?;
        for record in records {
            catalog.insert(File::from(record));
        }
        Ok(catalog)
    }

    /// Writes the catalog as pretty JSON via a temp file renamed over `path`,
    /// so readers only ever see a complete catalog.
    pub fn save(&self, path: &Path) -> Result<()> {
        let _guard = self
            .save_lock
            .lock()
            .map_err(|_| anyhow!("catalog save lock poisoned"))?;
        let records: Vec<ContentFileRecord> =
            self.list().iter().map(ContentFileRecord::from).collect();
        let bytes = serde_json::to_vec_pretty(&records)?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;
        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("temp file in {}", parent.display()))?;
        tmp.write_all(&bytes)
            .with_context(|| format!("write {}", tmp.path().display()))?;
        tmp.persist(path)
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}
