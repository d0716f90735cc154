use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::IdentityState;

pub fn identity_routes(state: Arc<IdentityState>) -> Router {
    let public_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/auth/send-otp", post(handlers::send_otp))
        .route("/auth/verify-otp", post(handlers::verify_otp))
        .route("/doctors", get(handlers::list_doctors));

    let protected_routes = Router::new()
        .route("/profile", get(handlers::get_profile))
        .route("/doctors/me", get(handlers::doctor_me))
        .route("/patients/me", get(handlers::patient_me))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
