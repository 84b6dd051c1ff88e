// Importing a local file copies it into storage under its MD5 name via a
// temp file that is renamed into place. Sources must sit under the import root.

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use std::fs;

use content_server::api::{self, AppState};
use content_server::models::ServerConfig;
use content_server::utils::catalog::ContentCatalog;
use content_server::utils::checksum::{import_into_storage, md5_bytes};
use content_server::utils::paths::get_content_storage_file_path;

#[::core::prelude::v1::test]
fn import_writes_non_zero_file_at_sharded_path() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("Lesson One.PDF");
    fs::write(&src, [1u8, 2, 3, 4, 5]).unwrap();
    let storage = tmp.path().join("storage");

    let (checksum, extension) = import_into_storage(&storage, &src).unwrap();
    assert_eq!(checksum, md5_bytes(&[1u8, 2, 3, 4, 5]));
    assert_eq!(extension, "pdf");

    let out_path = get_content_storage_file_path(&storage, &format!("{checksum}.{extension}")).unwrap();
    let meta = fs::metadata(&out_path).unwrap();
    assert_eq!(meta.len(), 5, "expected copied bytes in storage");
    let shard_entries = fs::read_dir(out_path.parent().unwrap()).unwrap().count();
    assert_eq!(shard_entries, 1, "temp file left behind");

    // same bytes again: no error, same name
    let again = import_into_storage(&storage, &src).unwrap();
    assert_eq!(again, (checksum, extension));
}

#[::core::prelude::v1::test]
fn concurrent_imports_of_same_bytes_all_succeed() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("same.pdf");
    fs::write(&src, vec![7u8; 256 * 1024]).unwrap();
    let storage = tmp.path().join("storage");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let (storage, src) = (storage.clone(), src.clone());
            std::thread::spawn(move || import_into_storage(&storage, &src))
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap().is_ok());
    }
    let (checksum, ext) = import_into_storage(&storage, &src).unwrap();
    let out_path = get_content_storage_file_path(&storage, &format!("{checksum}.{ext}")).unwrap();
    assert_eq!(fs::metadata(&out_path).unwrap().len(), 256 * 1024);
    assert_eq!(fs::read_dir(out_path.parent().unwrap()).unwrap().count(), 1);
}

#[::core::prelude::v1::test]
fn import_missing_source_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let err = import_into_storage(&tmp.path().join("storage"), &tmp.path().join("nope.pdf"));
    assert!(err.is_err());
}

#[actix_web::test]
async fn import_endpoint_registers_and_persists() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("fractions.mp4");
    fs::write(&src, b"video bytes").unwrap();
    let catalog_file = tmp.path().join("catalog.json");
    let config = ServerConfig {
        content_storage_dir: tmp.path().join("storage").display().to_string(),
        catalog_file: catalog_file.display().to_string(),
        import_root: Some(tmp.path().display().to_string()),
        ..ServerConfig::default()
    };
    let state = web::Data::new(AppState::from_config(config).unwrap());
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/import-content-file")
        .set_json(serde_json::json!({
            "source_path": src.display().to_string(),
            "title": "Intro to Fractions",
            "preset": "high_res_video",
        }))
        .to_request();
    let entry: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let checksum = md5_bytes(b"video bytes");
    assert_eq!(entry["filename"], format!("{checksum}.mp4"));
    assert_eq!(entry["download_filename"], "Intro_to_Fractions_High_Resolution");
    assert_eq!(entry["available"], true);

    let persisted = ContentCatalog::load(&catalog_file).unwrap();
    assert_eq!(persisted.len(), 1);

    let req = test::TestRequest::get()
        .uri(entry["download_url"].as_str().unwrap())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(&body[..], b"video bytes");
}

#[actix_web::test]
async fn import_endpoint_rejects_missing_source() {
    let tmp = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        content_storage_dir: tmp.path().join("storage").display().to_string(),
        catalog_file: tmp.path().join("catalog.json").display().to_string(),
        import_root: Some(tmp.path().display().to_string()),
        ..ServerConfig::default()
    };
    let state = web::Data::new(AppState::from_config(config).unwrap());
    let app = test::init_service(App::new().app_data(state).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/import-content-file")
        .set_json(serde_json::json!({"source_path": "not-here.pdf", "title": "x"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn refresh_marks_deleted_files_unavailable() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("notes.txt");
    fs::write(&src, b"notes").unwrap();
    let storage = tmp.path().join("storage");
    let config = ServerConfig {
        content_storage_dir: storage.display().to_string(),
        catalog_file: tmp.path().join("catalog.json").display().to_string(),
        import_root: Some(tmp.path().display().to_string()),
        ..ServerConfig::default()
    };
    let state = web::Data::new(AppState::from_config(config).unwrap());
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/import-content-file")
        .set_json(serde_json::json!({"source_path": src.display().to_string(), "title": "Notes", "preset": "document"}))
        .to_request();
    let entry: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let filename = entry["filename"].as_str().unwrap().to_string();

    fs::remove_file(get_content_storage_file_path(&storage, &filename).unwrap()).unwrap();

    let req = test::TestRequest::get().uri("/refresh-content-files").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["available"], 0);
    assert!(!state.catalog.get(&filename).unwrap().available);
}

#[actix_web::test]
async fn import_endpoint_refuses_files_outside_import_root() {
    let tmp = tempfile::tempdir().unwrap();
    let import_root = tmp.path().join("imports");
    fs::create_dir_all(&import_root).unwrap();
    let secret = tmp.path().join("secret.txt");
    fs::write(&secret, b"TOP-SECRET").unwrap();
    let config = ServerConfig {
        content_storage_dir: tmp.path().join("storage").display().to_string(),
        catalog_file: tmp.path().join("catalog.json").display().to_string(),
        import_root: Some(import_root.display().to_string()),
        ..ServerConfig::default()
    };
    let state = web::Data::new(AppState::from_config(config).unwrap());
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    for source in [secret.display().to_string(), "../secret.txt".to_string()] {
        let req = test::TestRequest::post()
            .uri("/import-content-file")
            .set_json(serde_json::json!({"source_path": source, "title": "x"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{source}");
    }
    assert!(state.catalog.is_empty());
    assert!(!tmp.path().join("storage").exists());
}

#[actix_web::test]
async fn import_endpoint_disabled_without_import_root() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("notes.txt");
    fs::write(&src, b"notes").unwrap();
    let config = ServerConfig {
        content_storage_dir: tmp.path().join("storage").display().to_string(),
        catalog_file: tmp.path().join("catalog.json").display().to_string(),
        ..ServerConfig::default()
    };
    let state = web::Data::new(AppState::from_config(config).unwrap());
    let app = test::init_service(App::new().app_data(state).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/import-content-file")
        .set_json(serde_json::json!({"source_path": src.display().to_string(), "title": "Notes"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
