use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::IntegrationState;

pub fn integration_routes(state: Arc<IntegrationState>) -> Router {
    Router::new()
        .route("/api/twilio/token", get(handlers::video_token))
        .route("/api/v1/message", post(handlers::chat_message))
        .route(
            "/api/check_availability/{product_code}",
            get(handlers::check_availability),
        )
        .route("/api/reload_inventory", post(handlers::reload_inventory))
        .with_state(state)
}
