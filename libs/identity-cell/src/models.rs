use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::auth::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub age: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub specialization: String,
}

/// Directory entry: doctor profile joined with the owning user's phone.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorListing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub specialization: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: Option<String>,
    pub role: String,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub specialization: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub phone: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct DoctorSearchQuery {
    pub specialization: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("User already exists")]
    DuplicateUser,

    #[error("Invalid role")]
    InvalidRole,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("OTP expired")]
    OtpExpired,

    #[error("Invalid OTP")]
    OtpMismatch,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
