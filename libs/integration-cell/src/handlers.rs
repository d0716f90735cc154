use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::{IntegrationError, VideoTokenQuery};
use crate::services::{ChatProxyService, VideoTokenService};
use crate::IntegrationState;

fn integration_error(e: IntegrationError) -> AppError {
    match e {
        IntegrationError::MissingFields(msg) => AppError::ValidationError(msg),
        IntegrationError::VideoNotConfigured => {
            AppError::Internal("Video credentials are not configured".to_string())
        }
        IntegrationError::Token(msg) => AppError::Internal(msg),
        IntegrationError::UpstreamUnavailable(msg) | IntegrationError::UpstreamRejected(msg) => {
            AppError::ExternalService(msg)
        }
        IntegrationError::Inventory(msg) => AppError::Internal(msg),
        IntegrationError::UnknownProduct => {
            AppError::NotFound("Unknown product code".to_string())
        }
    }
}

#[axum::debug_handler]
pub async fn video_token(
    State(state): State<Arc<IntegrationState>>,
    Query(query): Query<VideoTokenQuery>,
) -> Result<Json<Value>, AppError> {
    let identity = query
        .identity
        .as_deref()
        .filter(|i| !i.is_empty())
        .ok_or_else(|| AppError::ValidationError("identity is required".to_string()))?;

    let service = VideoTokenService::new(&state.config);
    let issued = service
        .issue(identity, query.room.as_deref())
        .map_err(integration_error)?;

    Ok(Json(json!({
        "ok": true,
        "token": issued.token,
        "ttl": issued.ttl,
        "identity": issued.identity,
        "room": issued.room,
    })))
}

#[axum::debug_handler]
pub async fn chat_message(
    State(state): State<Arc<IntegrationState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let service = ChatProxyService::new(&state.config);
    let relayed = service.relay(&body).await.map_err(integration_error)?;
    Ok(Json(relayed))
}

#[axum::debug_handler]
pub async fn check_availability(
    State(state): State<Arc<IntegrationState>>,
    Path(product_code): Path<String>,
) -> Result<Json<Value>, AppError> {
    let item = state
        .inventory
        .lookup(&product_code)
        .await
        .ok_or_else(|| integration_error(IntegrationError::UnknownProduct))?;

    Ok(Json(json!({
        "product_code": item.product_code,
        "name": item.name,
        "available": item.quantity > 0,
        "quantity": item.quantity,
    })))
}

#[axum::debug_handler]
pub async fn reload_inventory(
    State(state): State<Arc<IntegrationState>>,
) -> Result<Json<Value>, AppError> {
    let count = state
        .inventory
        .load()
        .await
        .map_err(integration_error)?;

    Ok(Json(json!({ "ok": true, "count": count })))
}
