use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_models::auth::{AuthUser, Role, TokenResponse};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;
use shared_utils::jwt::sign_token;

use crate::models::{
    DoctorSearchQuery, IdentityError, LoginRequest, RegisterRequest, SendOtpRequest,
    VerifyOtpRequest,
};
use crate::services::{generate_code, AccountService, OTP_TTL_SECONDS};
use crate::IdentityState;

fn identity_error(e: IdentityError) -> AppError {
    match e {
        IdentityError::DuplicateUser => AppError::BadRequest("User already exists".to_string()),
        IdentityError::InvalidRole => AppError::BadRequest("Invalid role".to_string()),
        IdentityError::InvalidCredentials => {
            AppError::BadRequest("Invalid credentials".to_string())
        }
        IdentityError::UserNotFound => AppError::NotFound("User not found".to_string()),
        IdentityError::OtpExpired => AppError::BadRequest("OTP expired".to_string()),
        IdentityError::OtpMismatch => AppError::BadRequest("Invalid OTP".to_string()),
        IdentityError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn issue_token(state: &IdentityState, user: AuthUser) -> Result<TokenResponse, AppError> {
    let token = sign_token(&user, &state.config.jwt_secret, state.config.token_ttl_hours)
        .map_err(AppError::Internal)?;

    Ok(TokenResponse {
        message: "Login successful".to_string(),
        token,
        role: user.role,
    })
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<IdentityState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if request.username.is_empty() || request.role.is_empty() {
        return Err(AppError::ValidationError(
            "username and role are required".to_string(),
        ));
    }

    let service = AccountService::new(&state.config);
    let user = service.register(&request).await.map_err(identity_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered", "id": user.id })),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<IdentityState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if request.username.is_empty() || request.password.is_empty() {
        return Err(AppError::ValidationError(
            "username and password are required".to_string(),
        ));
    }

    let service = AccountService::new(&state.config);
    let user = service
        .login(&request.username, &request.password)
        .await
        .map_err(identity_error)?;

    let response = issue_token(
        &state,
        AuthUser {
            id: user.id,
            username: user.username,
            role: user.role,
        },
    )?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn send_otp(
    State(state): State<Arc<IdentityState>>,
    Json(request): Json<SendOtpRequest>,
) -> Result<Json<Value>, AppError> {
    if request.phone.is_empty() {
        return Err(AppError::ValidationError("phone is required".to_string()));
    }

    let service = AccountService::new(&state.config);

    // A 200 with registered:false deliberately avoids leaking enrollment via
    // the status code.
    if service
        .find_by_username(&request.phone)
        .await
        .map_err(identity_error)?
        .is_none()
    {
        return Ok(Json(json!({
            "registered": false,
            "message": "Phone number not registered"
        })));
    }

    let code = generate_code();
    state
        .otp
        .put(&request.phone, code.clone(), OTP_TTL_SECONDS)
        .await;

    debug!("OTP for {}: {}", request.phone, code);

    if let Err(e) = state
        .notifier
        .deliver(
            &request.phone,
            &format!("Your verification code is {}", code),
        )
        .await
    {
        warn!("OTP delivery to {} failed: {}", request.phone, e);
    }

    Ok(Json(json!({ "registered": true, "message": "OTP sent" })))
}

#[axum::debug_handler]
pub async fn verify_otp(
    State(state): State<Arc<IdentityState>>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if request.phone.is_empty() || request.otp.is_empty() {
        return Err(AppError::ValidationError(
            "phone and otp are required".to_string(),
        ));
    }

    let entry = state
        .otp
        .get(&request.phone)
        .await
        .ok_or_else(|| identity_error(IdentityError::OtpExpired))?;

    // Wrong code keeps the entry so the user can retry within the TTL.
    if entry.code != request.otp {
        return Err(identity_error(IdentityError::OtpMismatch));
    }

    state.otp.remove(&request.phone).await;

    let service = AccountService::new(&state.config);
    let user = service
        .find_by_username(&request.phone)
        .await
        .map_err(identity_error)?
        .ok_or_else(|| identity_error(IdentityError::UserNotFound))?;

    let response = issue_token(
        &state,
        AuthUser {
            id: user.id,
            username: user.username,
            role: user.role,
        },
    )?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<Arc<IdentityState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = AccountService::new(&state.config);
    let profile = service
        .get_profile(&user, auth.token())
        .await
        .map_err(identity_error)?;

    Ok(Json(profile))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<IdentityState>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AccountService::new(&state.config);
    let doctors = service
        .list_doctors(query.specialization.as_deref())
        .await
        .map_err(identity_error)?;

    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn doctor_me(
    State(state): State<Arc<IdentityState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor])?;

    let service = AccountService::new(&state.config);
    let profile = service
        .doctor_profile(user.id, auth.token())
        .await
        .map_err(identity_error)?;

    Ok(Json(json!(profile)))
}

#[axum::debug_handler]
pub async fn patient_me(
    State(state): State<Arc<IdentityState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Patient])?;

    let service = AccountService::new(&state.config);
    let profile = service
        .patient_profile(user.id, auth.token())
        .await
        .map_err(identity_error)?;

    Ok(Json(json!(profile)))
}
