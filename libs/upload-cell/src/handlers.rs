use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::UploadError;
use crate::services::StorageService;

fn upload_error(e: UploadError) -> AppError {
    match e {
        UploadError::InvalidFile(msg) => AppError::BadRequest(msg),
        UploadError::TooLarge(_) => AppError::BadRequest(e.to_string()),
        UploadError::NotFound => AppError::NotFound("File not found".to_string()),
        UploadError::Io(msg) => AppError::Internal(msg),
        UploadError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn upload_file(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .unwrap_or("upload.bin")
            .to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let service = StorageService::new(&state);
        let record = service
            .save(user.id, &original_name, &mime_type, &data, auth.token())
            .await
            .map_err(upload_error)?;

        return Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "File uploaded",
                "file": record,
            })),
        ));
    }

    Err(AppError::BadRequest(
        "multipart field \"file\" is required".to_string(),
    ))
}

#[axum::debug_handler]
pub async fn serve_file(
    State(state): State<Arc<AppConfig>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let service = StorageService::new(&state);
    let (mime_type, data) = service.fetch(&filename).await.map_err(upload_error)?;

    Ok(([(header::CONTENT_TYPE, mime_type)], data).into_response())
}
