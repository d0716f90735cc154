use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Method;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{encode_param, StoreClient};

use crate::models::{UploadError, UploadRecord};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Disk-backed upload storage with a metadata row per file.
///
/// Validation runs before anything touches the disk; the served MIME comes
/// from the metadata row, never from re-sniffing the file.
pub struct StorageService {
    store: StoreClient,
    uploads_dir: String,
    public_base_url: String,
}

impl StorageService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
            uploads_dir: config.uploads_dir.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    pub async fn save(
        &self,
        user_id: Uuid,
        original_name: &str,
        mime_type: &str,
        data: &[u8],
        auth_token: &str,
    ) -> Result<UploadRecord, UploadError> {
        if !allowed_mime(mime_type) {
            return Err(UploadError::InvalidFile(format!(
                "unsupported content type {mime_type}"
            )));
        }
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge(MAX_UPLOAD_BYTES / (1024 * 1024)));
        }

        let server_filename = server_filename(original_name);

        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .map_err(|e| UploadError::Io(e.to_string()))?;
        let disk_path = Path::new(&self.uploads_dir).join(&server_filename);
        tokio::fs::write(&disk_path, data)
            .await
            .map_err(|e| UploadError::Io(e.to_string()))?;

        let url = format!(
            "{}/uploads/{}",
            self.public_base_url.trim_end_matches('/'),
            server_filename
        );

        let record: UploadRecord = self
            .store
            .insert_returning(
                "uploads",
                Some(auth_token),
                json!({
                    "user_id": user_id,
                    "original_name": original_name,
                    "server_filename": server_filename,
                    "mime_type": mime_type,
                    "url": url,
                }),
            )
            .await
            .map_err(|e| UploadError::DatabaseError(e.to_string()))?;

        info!(
            "Stored upload {} ({} bytes) for user {}",
            record.server_filename,
            data.len(),
            user_id
        );

        Ok(record)
    }

    /// Look a stored file up by its server filename and read it back.
    pub async fn fetch(&self, filename: &str) -> Result<(String, Vec<u8>), UploadError> {
        // Served names never contain separators; anything else is a probe.
        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return Err(UploadError::NotFound);
        }

        let rows: Vec<UploadRecord> = self
            .store
            .request(
                Method::GET,
                &format!(
                    "/rest/v1/uploads?server_filename=eq.{}",
                    encode_param(filename)
                ),
                None,
                None,
            )
            .await
            .map_err(|e| UploadError::DatabaseError(e.to_string()))?;

        let record = rows.into_iter().next().ok_or(UploadError::NotFound)?;

        let disk_path = Path::new(&self.uploads_dir).join(&record.server_filename);
        let data = tokio::fs::read(&disk_path)
            .await
            .map_err(|_| UploadError::NotFound)?;

        Ok((record.mime_type, data))
    }
}

pub fn allowed_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/") || mime_type == "application/pdf"
}

/// `{unix_millis}-{original}` with whitespace runs collapsed to `_` and dot
/// runs to a single `.`. The serve route refuses names containing `..`, so a
/// name this function produces must never contain one.
pub fn server_filename(original_name: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let mut cleaned = String::with_capacity(original_name.len());
    for c in original_name.chars() {
        let mapped = if c.is_whitespace() { '_' } else { c };
        if mapped == '/' || mapped == '\\' {
            continue;
        }
        if (mapped == '_' || mapped == '.') && cleaned.ends_with(mapped) {
            continue;
        }
        cleaned.push(mapped);
    }
    format!("{millis}-{cleaned}")
}
