use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/appointments",
            post(handlers::create_appointment).get(handlers::list_appointments),
        )
        .route("/appointments/me", get(handlers::list_my_appointments))
        .route(
            "/prescriptions",
            post(handlers::create_prescription).get(handlers::list_prescriptions),
        )
        .route("/consultations/start", post(handlers::start_consultation))
        .route("/consultations/end/{id}", post(handlers::end_consultation))
        .route("/consultations", get(handlers::list_consultations))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
