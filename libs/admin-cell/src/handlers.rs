use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_database::StoreClient;
use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

#[axum::debug_handler]
pub async fn dashboard(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;

    let store = StoreClient::new(&state);
    let token = Some(auth.token());

    let mut stats = serde_json::Map::new();
    for (key, table) in [
        ("totalUsers", "users"),
        ("totalPatients", "patients"),
        ("totalDoctors", "doctors"),
        ("totalAppointments", "appointments"),
        ("totalPrescriptions", "prescriptions"),
        ("totalConsultations", "consultations"),
    ] {
        let count = store
            .count(table, token)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        stats.insert(key.to_string(), json!(count));
    }

    Ok(Json(json!({
        "message": format!("Welcome Admin {}", user.username),
        "stats": stats,
    })))
}
