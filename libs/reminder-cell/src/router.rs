use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn reminder_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/reminders",
            post(handlers::create_reminder).get(handlers::list_reminders),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
