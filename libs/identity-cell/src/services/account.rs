use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{encode_param, StoreClient, StoreError};
use shared_models::auth::{AuthUser, Role};

use crate::models::{
    DoctorListing, DoctorProfile, IdentityError, PatientProfile, RegisterRequest, UserRecord,
};

pub struct AccountService {
    store: StoreClient,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, IdentityError> {
        let path = format!("/rest/v1/users?username=eq.{}", encode_param(username));
        let rows: Vec<UserRecord> = self
            .store
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    /// Create the user row and its role profile. The store cannot span both
    /// inserts in one transaction, so a failed profile insert rolls the user
    /// row back with a compensating delete.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserRecord, IdentityError> {
        let role: Role = request
            .role
            .parse()
            .map_err(|_| IdentityError::InvalidRole)?;
        if role == Role::Admin {
            return Err(IdentityError::InvalidRole);
        }

        if self.find_by_username(&request.username).await?.is_some() {
            return Err(IdentityError::DuplicateUser);
        }

        let password_hash = match &request.password {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };

        let user: UserRecord = self
            .store
            .insert_returning(
                "users",
                None,
                json!({
                    "username": request.username,
                    "password_hash": password_hash,
                    "role": role,
                }),
            )
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => IdentityError::DuplicateUser,
                other => IdentityError::DatabaseError(other.to_string()),
            })?;

        let name = request.name.clone().unwrap_or_else(|| request.username.clone());
        let profile_result = match role {
            Role::Patient => self
                .store
                .insert_returning::<PatientProfile>(
                    "patients",
                    None,
                    json!({
                        "user_id": user.id,
                        "name": name,
                        "age": request.age,
                    }),
                )
                .await
                .map(|_| ()),
            Role::Doctor => self
                .store
                .insert_returning::<DoctorProfile>(
                    "doctors",
                    None,
                    json!({
                        "user_id": user.id,
                        "name": name,
                        "specialization": request
                            .specialization
                            .clone()
                            .unwrap_or_else(|| "General".to_string()),
                    }),
                )
                .await
                .map(|_| ()),
            Role::Admin => unreachable!("admin registration rejected above"),
        };

        if let Err(e) = profile_result {
            warn!("Profile insert failed for {}, rolling back user row: {}", user.id, e);
            let path = format!("/rest/v1/users?id=eq.{}", user.id);
            if let Err(del) = self.store.delete(&path, None).await {
                warn!("Compensating delete for {} also failed: {}", user.id, del);
            }
            return Err(IdentityError::DatabaseError(e.to_string()));
        }

        debug!("Registered {} as {}", user.username, role);
        Ok(user)
    }

    /// Never reveals whether the username or the password was wrong.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserRecord, IdentityError> {
        let user = self
            .find_by_username(username)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(IdentityError::InvalidCredentials)?;

        if !verify_password(password, hash) {
            return Err(IdentityError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Caller's user row merged with the matching role profile.
    pub async fn get_profile(
        &self,
        user: &AuthUser,
        auth_token: &str,
    ) -> Result<Value, IdentityError> {
        let path = format!(
            "/rest/v1/users?id=eq.{}&select=id,username,role,created_at",
            user.id
        );
        let rows: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        let mut base = rows.into_iter().next().ok_or(IdentityError::UserNotFound)?;

        let profile = match user.role {
            Role::Patient => self
                .patient_profile(user.id, auth_token)
                .await?
                .map(|p| serde_json::to_value(p).unwrap_or(Value::Null)),
            Role::Doctor => self
                .doctor_profile(user.id, auth_token)
                .await?
                .map(|d| serde_json::to_value(d).unwrap_or(Value::Null)),
            Role::Admin => None,
        };

        if let Some(obj) = base.as_object_mut() {
            obj.insert("profile".to_string(), profile.unwrap_or(Value::Null));
        }

        Ok(base)
    }

    pub async fn patient_profile(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<PatientProfile>, IdentityError> {
        let path = format!("/rest/v1/patients?user_id=eq.{}", user_id);
        let rows: Vec<PatientProfile> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    pub async fn doctor_profile(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<DoctorProfile>, IdentityError> {
        let path = format!("/rest/v1/doctors?user_id=eq.{}", user_id);
        let rows: Vec<DoctorProfile> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    /// Public directory, optionally narrowed to one specialization, with each
    /// doctor's phone looked up in a single batched query.
    pub async fn list_doctors(
        &self,
        specialization: Option<&str>,
    ) -> Result<Vec<DoctorListing>, IdentityError> {
        let mut path = "/rest/v1/doctors?order=id.desc".to_string();
        if let Some(spec) = specialization {
            path.push_str(&format!("&specialization=eq.{}", encode_param(spec)));
        }

        let doctors: Vec<DoctorProfile> = self
            .store
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        if doctors.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = doctors.iter().map(|d| d.user_id.to_string()).collect();
        let users_path = format!(
            "/rest/v1/users?id=in.({})&select=id,username",
            ids.join(",")
        );
        let users: Vec<Value> = self
            .store
            .request(Method::GET, &users_path, None, None)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        let phone_of = |user_id: Uuid| -> Option<String> {
            users.iter().find_map(|u| {
                let id = u.get("id")?.as_str()?;
                if Uuid::parse_str(id).ok()? == user_id {
                    Some(u.get("username")?.as_str()?.to_string())
                } else {
                    None
                }
            })
        };

        Ok(doctors
            .into_iter()
            .map(|d| DoctorListing {
                phone: phone_of(d.user_id),
                id: d.id,
                user_id: d.user_id,
                name: d.name,
                specialization: d.specialization,
            })
            .collect())
    }
}

fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| IdentityError::DatabaseError(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
