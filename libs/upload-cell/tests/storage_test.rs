use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_utils::test_utils::TestConfig;
use upload_cell::models::UploadError;
use upload_cell::services::storage::{StorageService, MAX_UPLOAD_BYTES};

fn test_config(mock_server: &MockServer, uploads_dir: &std::path::Path) -> AppConfig {
    let mut config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    config.uploads_dir = uploads_dir.to_string_lossy().to_string();
    config
}

fn upload_row(user_id: Uuid, server_filename: &str, mime_type: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "user_id": user_id,
        "original_name": "scan.pdf",
        "server_filename": server_filename,
        "mime_type": mime_type,
        "url": format!("http://localhost:3000/uploads/{server_filename}"),
        "created_at": "2025-06-01T10:00:00Z"
    })
}

#[tokio::test]
async fn rejects_unsupported_content_types_before_writing() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let service = StorageService::new(&test_config(&mock_server, dir.path()));

    let result = service
        .save(Uuid::new_v4(), "page.html", "text/html", b"<html>", "token")
        .await;

    assert_matches!(result, Err(UploadError::InvalidFile(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn rejects_files_over_the_size_cap() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let service = StorageService::new(&test_config(&mock_server, dir.path()));

    let oversized = vec![0u8; MAX_UPLOAD_BYTES + 1];
    let result = service
        .save(Uuid::new_v4(), "big.pdf", "application/pdf", &oversized, "token")
        .await;

    assert_matches!(result, Err(UploadError::TooLarge(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn persists_the_file_and_its_metadata_row() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let user_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/uploads"))
        .and(body_partial_json(json!({
            "user_id": user_id,
            "original_name": "lab report.pdf",
            "mime_type": "application/pdf"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([upload_row(user_id, "123-lab_report.pdf", "application/pdf")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = StorageService::new(&test_config(&mock_server, dir.path()));
    let record = service
        .save(user_id, "lab report.pdf", "application/pdf", b"%PDF-1.4", "token")
        .await
        .expect("save should succeed");

    assert_eq!(record.mime_type, "application/pdf");
    // Exactly one file landed on disk, with the whitespace flattened.
    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].ends_with("-lab_report.pdf"));
}

#[tokio::test]
async fn dotted_names_survive_the_serve_round_trip() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let user_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/uploads"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([upload_row(user_id, "123-scan.pdf", "application/pdf")])),
        )
        .mount(&mock_server)
        .await;

    let service = StorageService::new(&test_config(&mock_server, dir.path()));
    service
        .save(user_id, "scan..pdf", "application/pdf", b"%PDF-1.4", "token")
        .await
        .expect("save should succeed");

    // The name actually written to disk is what the serve route receives.
    let stored_name = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .next()
        .expect("a file should be on disk");
    assert!(!stored_name.contains(".."));

    Mock::given(method("GET"))
        .and(path("/rest/v1/uploads"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([upload_row(user_id, &stored_name, "application/pdf")])),
        )
        .mount(&mock_server)
        .await;

    let (mime_type, data) = service
        .fetch(&stored_name)
        .await
        .expect("the stored file should be servable");
    assert_eq!(mime_type, "application/pdf");
    assert_eq!(data, b"%PDF-1.4");
}

#[tokio::test]
async fn fetch_refuses_names_with_path_separators() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/uploads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = StorageService::new(&test_config(&mock_server, dir.path()));
    for name in ["../secrets.txt", "a/b.pdf", "a\\b.pdf"] {
        let result = service.fetch(name).await;
        assert_matches!(result, Err(UploadError::NotFound));
    }
}

#[tokio::test]
async fn fetch_replays_the_recorded_mime() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let server_filename = "1717236000-photo.png";
    std::fs::write(dir.path().join(server_filename), b"png-bytes").unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/uploads"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([upload_row(Uuid::new_v4(), server_filename, "image/png")])),
        )
        .mount(&mock_server)
        .await;

    let service = StorageService::new(&test_config(&mock_server, dir.path()));
    let (mime_type, data) = service
        .fetch(server_filename)
        .await
        .expect("fetch should succeed");

    assert_eq!(mime_type, "image/png");
    assert_eq!(data, b"png-bytes");
}

#[tokio::test]
async fn fetch_of_an_unknown_name_is_not_found() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/uploads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = StorageService::new(&test_config(&mock_server, dir.path()));
    let result = service.fetch("1717236000-missing.pdf").await;

    assert_matches!(result, Err(UploadError::NotFound));
}
