//! Utilities: configuration, storage layout, checksums, and the content catalog.
//!
//! This module centralizes the filesystem work used by the HTTP API layer:
//! - Server configuration from a JSON file with environment overrides (load_config)
//! - Content storage path resolution and filename validation (paths)
//! - Download filename sanitization (filename)
//! - MD5 checksums and importing files into storage from the import root (checksum)
//! - The shared catalog of known content files (catalog)
//!
//! Key files:
//! - Config: content_server.json (or $CONTENT_SERVER_CONFIG)
//! - Catalog: content/catalog.json
//! - Storage layout: content/storage/<c0>/<c1>/<checksum>.<ext>

pub mod catalog;
pub mod checksum;
pub mod filename;
pub mod paths;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::ServerConfig;

const DEFAULT_CONFIG_FILE: &str = "content_server.json";

/// Path of the JSON config file: $CONTENT_SERVER_CONFIG or ./content_server.json.
pub fn config_file_path() -> PathBuf {
    std::env::var("CONTENT_SERVER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Reads a config file. Missing file means defaults; unset keys keep defaults.
pub fn read_config_file(path: &Path) -> Result<ServerConfig> {
    if !path.exists() {
        return Ok(ServerConfig::default());
    }
    let data = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parse config {}", path.display()))
}

/// Applies environment overrides on top of `config`.
///
/// Recognized: CONTENT_BIND_ADDRESS, CONTENT_PORT, CONTENT_STORAGE_DIR, CONTENT_CATALOG_FILE,
/// CONTENT_IMPORT_ROOT.
/// An unparsable CONTENT_PORT is ignored with a warning.
pub fn apply_env_overrides<F>(mut config: ServerConfig, get: F) -> ServerConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = get("CONTENT_BIND_ADDRESS").filter(|s| !s.is_empty()) {
        config.bind_address = v;
    }
    if let Some(v) = get("CONTENT_PORT") {
        match v.parse() {
            Ok(port) => config.port = port,
            Err(_) => log::warn!("ignoring invalid CONTENT_PORT {:?}", v),
        }
    }
    if let Some(v) = get("CONTENT_STORAGE_DIR").filter(|s| !s.is_empty()) {
        config.content_storage_dir = v;
    }
    if let Some(v) = get("CONTENT_CATALOG_FILE").filter(|s| !s.is_empty()) {
        config.catalog_file = v;
    }
    if let Some(v) = get("CONTENT_IMPORT_ROOT").filter(|s| !s.is_empty()) {
        config.import_root = Some(v);
    }
    config
}

/// Effective configuration: file, then process environment.
pub fn load_config() -> Result<ServerConfig> {
    let from_file = read_config_file(&config_file_path())?;
    Ok(apply_env_overrides(from_file, |k| std::env::var(k).ok()))
}
