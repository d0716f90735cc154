use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Role};

use crate::jwt::sign_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_store_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            token_ttl_hours: 168,
            frontend_origin: "*".to_string(),
            uploads_dir: "uploads".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            twilio_account_sid: String::new(),
            twilio_api_key_sid: String::new(),
            twilio_api_key_secret: String::new(),
            twilio_token_ttl_seconds: 3600,
            chat_service_url: "http://127.0.0.1:5001/internal/respond".to_string(),
            inventory_path: "inventory.json".to_string(),
            reminder_interval_seconds: 60,
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl TestUser {
    pub fn new(username: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            role,
        }
    }

    pub fn patient(username: &str) -> Self {
        Self::new(username, Role::Patient)
    }

    pub fn doctor(username: &str) -> Self {
        Self::new(username, Role::Doctor)
    }

    pub fn admin(username: &str) -> Self {
        Self::new(username, Role::Admin)
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str) -> String {
        sign_token(&user.to_auth_user(), secret, 24).expect("test token")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        sign_token(&user.to_auth_user(), secret, -1).expect("test token")
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        sign_token(&user.to_auth_user(), "wrong-secret", 24).expect("test token")
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows for wiremock-backed tests.
pub struct MockStoreResponses;

impl MockStoreResponses {
    pub fn user_row(id: Uuid, username: &str, role: &str) -> Value {
        json!({
            "id": id,
            "username": username,
            "password_hash": null,
            "role": role,
            "created_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn doctor_row(user_id: Uuid, name: &str, specialization: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "name": name,
            "specialization": specialization
        })
    }

    pub fn patient_row(user_id: Uuid, name: &str, age: Option<i32>) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "name": name,
            "age": age
        })
    }
}
