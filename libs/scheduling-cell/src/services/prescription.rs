use reqwest::Method;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{encode_param, StoreClient};
use shared_models::auth::{AuthUser, Role};

use crate::models::{CreatePrescriptionRequest, Prescription, PrescriptionListing, SchedulingError};

pub struct PrescriptionService {
    store: StoreClient,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    /// Record a prescription authored by the calling doctor.
    pub async fn create(
        &self,
        doctor: &AuthUser,
        request: &CreatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<Prescription, SchedulingError> {
        let medicine = request
            .medicine
            .as_deref()
            .filter(|m| !m.is_empty())
            .ok_or_else(|| SchedulingError::MissingFields("medicine is required".to_string()))?;

        let patient_id = self
            .resolve_patient(request.patient_id, request.patient_username.as_deref(), auth_token)
            .await?;

        let prescription: Prescription = self
            .store
            .insert_returning(
                "prescriptions",
                Some(auth_token),
                json!({
                    "patient_user_id": patient_id,
                    "doctor_user_id": doctor.id,
                    "medicine": medicine,
                }),
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        info!(
            "Prescription {} recorded by doctor {} for patient {}",
            prescription.id, doctor.id, patient_id
        );

        Ok(prescription)
    }

    /// Patients see prescriptions written for them, doctors the ones they
    /// authored; the counterpart's profile name is attached to each row.
    pub async fn list(
        &self,
        user: &AuthUser,
        auth_token: &str,
    ) -> Result<Vec<PrescriptionListing>, SchedulingError> {
        let (own_column, counterpart_table) = match user.role {
            Role::Patient => ("patient_user_id", "doctors"),
            Role::Doctor => ("doctor_user_id", "patients"),
            Role::Admin => {
                return Err(SchedulingError::MissingFields(
                    "listing is scoped to patients and doctors".to_string(),
                ))
            }
        };

        let path = format!(
            "/rest/v1/prescriptions?{}=eq.{}&order=created_at.desc",
            own_column, user.id
        );
        let prescriptions: Vec<Prescription> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        if prescriptions.is_empty() {
            return Ok(vec![]);
        }

        let counterpart_ids = prescriptions
            .iter()
            .map(|p| match user.role {
                Role::Patient => p.doctor_user_id.to_string(),
                _ => p.patient_user_id.to_string(),
            })
            .collect::<Vec<_>>()
            .join(",");

        let profiles: Vec<Value> = self
            .store
            .request(
                Method::GET,
                &format!(
                    "/rest/v1/{}?user_id=in.({})&select=user_id,name",
                    counterpart_table, counterpart_ids
                ),
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        Ok(prescriptions
            .into_iter()
            .map(|prescription| {
                let counterpart = match user.role {
                    Role::Patient => prescription.doctor_user_id,
                    _ => prescription.patient_user_id,
                };
                let counterpart_name = profiles
                    .iter()
                    .find(|p| {
                        p.get("user_id").and_then(|v| v.as_str())
                            == Some(counterpart.to_string().as_str())
                    })
                    .and_then(|p| p.get("name").and_then(|v| v.as_str()))
                    .map(str::to_string);
                PrescriptionListing {
                    prescription,
                    counterpart_name,
                }
            })
            .collect())
    }

    async fn resolve_patient(
        &self,
        patient_id: Option<Uuid>,
        patient_username: Option<&str>,
        auth_token: &str,
    ) -> Result<Uuid, SchedulingError> {
        let path = match (patient_id, patient_username) {
            (Some(id), _) => format!("/rest/v1/users?id=eq.{}&role=eq.patient&select=id", id),
            (None, Some(username)) => format!(
                "/rest/v1/users?username=eq.{}&role=eq.patient&select=id",
                encode_param(username)
            ),
            (None, None) => {
                return Err(SchedulingError::MissingFields(
                    "patient_id or patient_username is required".to_string(),
                ))
            }
        };

        let rows: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        rows.first()
            .and_then(|row| row.get("id"))
            .and_then(|id| id.as_str())
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or(SchedulingError::PatientNotFound)
    }
}
