//! Content download endpoint.

use actix_web::http::header::{
    self, CacheControl, CacheDirective, Charset, ContentDisposition, DispositionParam,
    DispositionType, ETag, EntityTag, ExtendedValue, Header, IfNoneMatch,
};
use actix_web::{get, web, HttpRequest, HttpResponse};
use tokio_util::io::ReaderStream;

use crate::api::AppState;
use crate::utils::filename::get_valid_filename;
use crate::utils::paths::get_content_storage_file_path;

const ONE_YEAR_SECS: u32 = 365 * 24 * 60 * 60;

/// Serves a stored content file as an attachment.
///
/// Path params:
/// - filename: storage name, `{checksum}.{extension}`
/// - new_filename: name offered to the browser (sanitized again before use)
///
/// Status codes:
/// - 404 when the storage name is invalid or the file is not in storage
/// - 304 when the client sends If-Modified-Since, or an If-None-Match that matches
/// - 200 with the file bytes otherwise, streamed from disk
///
/// Example (curl):
/// - curl -OJ http://localhost:8080/downloadcontent/<md5>.pdf/Fractions_Document
#[get("/downloadcontent/{filename}/{new_filename}")]
pub async fn download_content(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let (filename, new_filename) = path.into_inner();

    let file_path = match get_content_storage_file_path(&state.storage_dir, &filename) {
        Ok(p) => p,
        Err(e) => {
            log::debug!("rejecting download: {}", e);
            return HttpResponse::NotFound().body(format!("\"{}\" does not exist locally", filename));
        }
    };

    let len = match tokio::fs::metadata(&file_path).await {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => {
            log::info!("download miss: {}", file_path.display());
            return HttpResponse::NotFound().body(format!("\"{}\" does not exist locally", filename));
        }
    };

    // Name is content-addressed, so the checksum is a strong validator.
    let checksum = filename.split('.').next().unwrap_or(filename.as_str());
    let etag = EntityTag::new_strong(checksum.to_string());

    if client_has_copy(&req, &etag) {
        return HttpResponse::NotModified()
            .insert_header(ETag(etag))
            .finish();
    }

    let file = match tokio::fs::File::open(&file_path).await {
        Ok(f) => f,
        Err(e) => {
            log::error!("failed to open {}: {}", file_path.display(), e);
            return HttpResponse::InternalServerError().body("failed to read content file");
        }
    };

    let mut download_name = get_valid_filename(&new_filename);
    if download_name.is_empty() {
        download_name = filename.clone();
    }
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    log::info!("serving {} as {} ({} bytes)", filename, download_name, len);

    HttpResponse::Ok()
        .content_type(mime.to_string())
        .insert_header(attachment(&download_name, &filename))
        .insert_header(ETag(etag))
        .insert_header(CacheControl(vec![
            CacheDirective::Public,
            CacheDirective::MaxAge(ONE_YEAR_SECS),
        ]))
        .no_chunking(len)
        .streaming(ReaderStream::new(file))
}

/// `attachment; filename=<ascii>` plus `filename*=UTF-8''<name>` when the name
/// is not plain ASCII.
fn attachment(download_name: &str, storage_name: &str) -> ContentDisposition {
    if download_name.is_ascii() {
        return ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(download_name.to_string())],
        };
    }
    let fallback: String = download_name.chars().filter(|c| c.is_ascii()).collect();
    let fallback = if fallback.trim_matches(|c| c == '_' || c == '.').is_empty() {
        storage_name.to_string()
    } else {
        fallback
    };
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![
            DispositionParam::Filename(fallback),
            DispositionParam::FilenameExt(ExtendedValue {
                charset: Charset::Ext("UTF-8".to_string()),
                language_tag: None,
                value: download_name.as_bytes().to_vec(),
            }),
        ],
    }
}

/// If-None-Match wins over If-Modified-Since when both are sent.
fn client_has_copy(req: &HttpRequest, etag: &EntityTag) -> bool {
    if req.headers().contains_key(header::IF_NONE_MATCH) {
        return match IfNoneMatch::parse(req) {
            Ok(IfNoneMatch::Any) => true,
            Ok(IfNoneMatch::Items(tags)) => tags.iter().any(|t| t.weak_eq(etag)),
            Err(_) => false,
        };
    }
    req.headers().contains_key(header::IF_MODIFIED_SINCE)
}
