use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub original_name: String,
    pub server_filename: String,
    pub mime_type: String,
    pub url: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("File exceeds the {0} MiB limit")]
    TooLarge(usize),

    #[error("File not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Io(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
