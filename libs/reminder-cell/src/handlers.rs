use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use reqwest::Method;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_database::{timestamp, StoreClient};
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{CreateReminderRequest, Reminder};

#[axum::debug_handler]
pub async fn create_reminder(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateReminderRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let message = request
        .message
        .as_deref()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::ValidationError("message is required".to_string()))?;
    let due_at = request
        .due_at
        .ok_or_else(|| AppError::ValidationError("due_at is required".to_string()))?;

    let store = StoreClient::new(&state);
    let reminder: Reminder = store
        .insert_returning(
            "reminders",
            Some(auth.token()),
            json!({
                "user_id": user.id,
                "message": message,
                "due_at": timestamp(due_at),
            }),
        )
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Reminder set",
            "reminder": reminder,
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_reminders(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let store = StoreClient::new(&state);
    let reminders: Vec<Reminder> = store
        .request(
            Method::GET,
            &format!(
                "/rest/v1/reminders?user_id=eq.{}&order=due_at.desc",
                user.id
            ),
            Some(auth.token()),
            None,
        )
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(reminders)))
}
