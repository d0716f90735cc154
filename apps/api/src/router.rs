use std::sync::Arc;

use axum::{routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use admin_cell::admin_routes;
use identity_cell::{identity_routes, IdentityState};
use integration_cell::{integration_routes, IntegrationState};
use reminder_cell::reminder_routes;
use scheduling_cell::scheduling_routes;
use shared_config::AppConfig;
use upload_cell::upload_routes;

async fn health() -> Json<Value> {
    Json(json!({
        "ok": true,
        "time": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

pub fn create_router(
    config: Arc<AppConfig>,
    identity: Arc<IdentityState>,
    integration: Arc<IntegrationState>,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Telecare API is running!" }))
        .route("/api/health", get(health))
        .merge(identity_routes(identity))
        .merge(scheduling_routes(config.clone()))
        .merge(reminder_routes(config.clone()))
        .merge(upload_routes(config.clone()))
        .merge(integration_routes(integration))
        .merge(admin_routes(config))
}
