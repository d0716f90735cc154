use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{timestamp, StoreClient};
use shared_models::auth::{AuthUser, Role};

use crate::models::{
    Consultation, ConsultationStatus, SchedulingError, StartConsultationRequest,
};

pub struct ConsultationService {
    store: StoreClient,
}

impl ConsultationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    /// The caller fills their own side from their role; the counterpart comes
    /// from the body. Both sides must resolve.
    pub async fn start(
        &self,
        user: &AuthUser,
        request: &StartConsultationRequest,
        auth_token: &str,
    ) -> Result<Consultation, SchedulingError> {
        let mut doctor = request.doctor_user_id;
        let mut patient = request.patient_user_id;

        match user.role {
            Role::Doctor => doctor = Some(user.id),
            Role::Patient => patient = Some(user.id),
            Role::Admin => {}
        }

        let (doctor, patient) = match (doctor, patient) {
            (Some(d), Some(p)) => (d, p),
            _ => {
                return Err(SchedulingError::MissingFields(
                    "doctor_user_id and patient_user_id required (or caller must be doctor/patient)"
                        .to_string(),
                ))
            }
        };

        let consultation: Consultation = self
            .store
            .insert_returning(
                "consultations",
                Some(auth_token),
                json!({
                    "doctor_user_id": doctor,
                    "patient_user_id": patient,
                    "status": ConsultationStatus::Ongoing,
                    "start_time": timestamp(Utc::now()),
                }),
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        info!(
            "Consultation {} started between doctor {} and patient {}",
            consultation.id, doctor, patient
        );

        Ok(consultation)
    }

    /// Transition ongoing -> ended, stamping end_time once. Ending an already
    /// ended consultation returns it unchanged instead of re-stamping.
    pub async fn end(
        &self,
        consultation_id: Uuid,
        auth_token: &str,
    ) -> Result<Consultation, SchedulingError> {
        let path = format!(
            "/rest/v1/consultations?id=eq.{}&status=eq.ongoing",
            consultation_id
        );
        let updated: Vec<Consultation> = self
            .store
            .update_returning(
                &path,
                Some(auth_token),
                json!({
                    "status": ConsultationStatus::Ended,
                    "end_time": timestamp(Utc::now()),
                }),
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        if let Some(consultation) = updated.into_iter().next() {
            info!("Consultation {} ended", consultation.id);
            return Ok(consultation);
        }

        // No ongoing row matched: either already ended (idempotent) or unknown.
        let rows: Vec<Consultation> = self
            .store
            .request(
                Method::GET,
                &format!("/rest/v1/consultations?id=eq.{}", consultation_id),
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        match rows.into_iter().next() {
            Some(consultation) => {
                debug!(
                    "Consultation {} was already ended at {:?}",
                    consultation.id, consultation.end_time
                );
                Ok(consultation)
            }
            None => Err(SchedulingError::NotFound),
        }
    }

    pub async fn list(
        &self,
        user: &AuthUser,
        auth_token: &str,
    ) -> Result<Vec<Consultation>, SchedulingError> {
        let own_column = match user.role {
            Role::Doctor => "doctor_user_id",
            Role::Patient => "patient_user_id",
            Role::Admin => {
                return Err(SchedulingError::MissingFields(
                    "listing is scoped to patients and doctors".to_string(),
                ))
            }
        };

        let path = format!(
            "/rest/v1/consultations?{}=eq.{}&order=start_time.desc",
            own_column, user.id
        );

        self.store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))
    }
}
