use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::storage::MAX_UPLOAD_BYTES;

pub fn upload_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new().route("/uploads/{filename}", get(handlers::serve_file));

    // Body limit leaves headroom over the file cap for multipart framing.
    let protected_routes = Router::new()
        .route("/uploads", post(handlers::upload_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
