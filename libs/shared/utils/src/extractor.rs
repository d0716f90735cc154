use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Bearer-token gate for protected routes. A missing or malformed header is
/// 401; a token that fails signature or expiry checks is 403. On success the
/// resolved identity is attached to the request extensions.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    let token = &auth_value[7..];

    let user = validate_token(token, &config.jwt_secret).map_err(AppError::Forbidden)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Role gate, run by handlers after the middleware has authenticated the caller.
pub fn require_role(user: &AuthUser, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Access denied: insufficient role".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            username: "u".to_string(),
            role,
        }
    }

    #[test]
    fn matching_role_passes() {
        assert!(require_role(&user(Role::Doctor), &[Role::Doctor, Role::Admin]).is_ok());
    }

    #[test]
    fn mismatched_role_is_forbidden() {
        let err = require_role(&user(Role::Patient), &[Role::Admin]).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
