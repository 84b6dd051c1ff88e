//! HTTP API: content downloads and the content-file catalog.
//!
//! - content: `/downloadcontent/{filename}/{new_filename}`
//! - catalog: listing, lookup, refresh and import of content files

pub mod catalog;
pub mod content;

use actix_web::web;
use anyhow::Result;
use std::path::PathBuf;

use crate::models::ServerConfig;
use crate::utils::catalog::ContentCatalog;

/// State shared by all workers.
pub struct AppState {
    pub storage_dir: PathBuf,
    pub catalog_file: PathBuf,
    /// Only files under this directory may be imported; `None` disables imports.
    pub import_root: Option<PathBuf>,
    pub catalog: ContentCatalog,
}

impl AppState {
    /// Loads the catalog from `config.catalog_file` and syncs availability with storage.
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let storage_dir = PathBuf::from(config.content_storage_dir);
        let catalog_file = PathBuf::from(config.catalog_file);
        let catalog = ContentCatalog::load(&catalog_file)?;
        let (total, available, _) = catalog.annotate_available(&storage_dir);
        log::info!(
            "catalog {}: {} files, {} available in {}",
            catalog_file.display(),
            total,
            available,
            storage_dir.display()
        );
        Ok(Self {
            storage_dir,
            catalog_file,
            import_root: config.import_root.map(PathBuf::from),
            catalog,
        })
    }
}

/// Registers every endpoint. Shared by `main` and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(content::download_content)
        .service(catalog::list_content_files)
        .service(catalog::refresh_content_files)
        .service(catalog::get_content_file)
        .service(catalog::import_content_file);
}
