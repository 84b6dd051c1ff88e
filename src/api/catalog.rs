//! Content-file catalog endpoints.
//!
//! Handlers for listing, refreshing and importing the files known to the server.

use actix_web::{get, post, web, HttpResponse};
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::AppState;
use crate::models::{
    ContentFileEntry, ContentFilesResponse, ContentNode, File, ImportContentFileRequest,
};
use crate::utils::checksum::{import_into_storage, resolve_import_source, OutsideImportRoot};

fn files_response(state: &AppState) -> ContentFilesResponse {
    let files: Vec<ContentFileEntry> = state.catalog.list().iter().map(ContentFileEntry::from).collect();
    ContentFilesResponse {
        storage_directory: state.storage_dir.display().to_string(),
        total: files.len(),
        available: files.iter().filter(|f| f.available).count(),
        files,
    }
}

/// Persists the catalog off the async workers. Failures are logged, not returned.
async fn persist_catalog(state: web::Data<AppState>) {
    let path = state.catalog_file.clone();
    match web::block(move || state.catalog.save(&state.catalog_file)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("failed to write catalog {}: {:#}", path.display(), e),
        Err(e) => log::error!("catalog save task failed: {}", e),
    }
}

/// Returns every catalog entry with its download filename and URL.
///
/// Example (curl):
/// - curl -s http://localhost:8080/content-files | jq '.files[].download_url'
#[get("/content-files")]
pub async fn list_content_files(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(files_response(&state))
}

/// Looks up one entry by storage filename (`{checksum}.{extension}`).
#[get("/content-files/{filename}")]
pub async fn get_content_file(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let filename = path.into_inner();
    match state.catalog.get(&filename) {
        Some(file) => HttpResponse::Ok().json(ContentFileEntry::from(&file)),
        None => HttpResponse::NotFound().body(format!("no catalog entry for {}", filename)),
    }
}

/// Re-checks storage for every entry, persists the catalog, and returns the list.
#[get("/refresh-content-files")]
pub async fn refresh_content_files(state: web::Data<AppState>) -> HttpResponse {
    let (total, available, changed) = state.catalog.annotate_available(&state.storage_dir);
    log::info!("refresh: {} files, {} available (changed: {})", total, available, changed);
    if changed {
        persist_catalog(state.clone()).await;
    }
    HttpResponse::Ok().json(files_response(&state))
}

/// Copies a file from the configured import root into content storage and registers it.
///
/// Body: `{"source_path": "...", "title": "...", "preset": "document"}`.
/// Relative source paths are taken from the import root.
///
/// Status codes:
/// - 200 with the new catalog entry
/// - 400 when the source cannot be imported (missing, no extension, ...)
/// - 403 when no import root is configured or the source lies outside it
#[post("/import-content-file")]
pub async fn import_content_file(
    body: web::Json<ImportContentFileRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let req = body.into_inner();
    let import_root = match &state.import_root {
        Some(root) => root.clone(),
        None => {
            log::warn!("import of {} refused: no import root configured", req.source_path);
            return HttpResponse::Forbidden().body("imports are disabled");
        }
    };
    let source = PathBuf::from(&req.source_path);
    let storage_dir = state.storage_dir.clone();

    let imported = web::block(move || {
        let resolved = resolve_import_source(&import_root, &source)?;
        import_into_storage(&storage_dir, &resolved)
    })
    .await;
    let (checksum, extension) = match imported {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) if e.downcast_ref::<OutsideImportRoot>().is_some() => {
            log::warn!("import of {} refused: {:#}", req.source_path, e);
            return HttpResponse::Forbidden().body(format!("{:#}", e));
        }
        Ok(Err(e)) => {
            log::warn!("import of {} failed: {:#}", req.source_path, e);
            return HttpResponse::BadRequest().body(format!("{:#}", e));
        }
        Err(e) => {
            log::error!("import task failed: {}", e);
            return HttpResponse::InternalServerError().body("import task failed");
        }
    };

    let preset = req.preset.unwrap_or_else(|| extension.clone());
    let file = File::new(
        checksum,
        extension,
        true,
        Arc::new(ContentNode::new(req.title)),
        preset,
    );
    let entry = ContentFileEntry::from(&file);
    state.catalog.insert(file);
    persist_catalog(state).await;
    HttpResponse::Ok().json(entry)
}
