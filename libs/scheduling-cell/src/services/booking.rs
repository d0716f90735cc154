use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{encode_param, timestamp, StoreClient, StoreError};
use shared_models::auth::{AuthUser, Role};

use crate::models::{Appointment, AppointmentListing, BookAppointmentRequest, SchedulingError};

pub struct AppointmentBookingService {
    store: StoreClient,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    /// Book a slot for the calling patient and queue the companion reminder.
    ///
    /// The pre-insert lookup gives the common case a friendly error; the
    /// store's unique `(doctor_user_id, scheduled_at)` constraint is what
    /// actually closes the race between concurrent identical bookings, so a
    /// 409 from the insert is mapped to the same conflict error.
    pub async fn book_appointment(
        &self,
        patient: &AuthUser,
        request: &BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let scheduled_at = request.scheduled_at.ok_or_else(|| {
            SchedulingError::MissingFields("scheduled_at is required".to_string())
        })?;

        let doctor_id = self
            .resolve_doctor(request.doctor_id, request.doctor_username.as_deref(), auth_token)
            .await?;

        if self
            .slot_taken(doctor_id, scheduled_at, auth_token)
            .await?
        {
            return Err(SchedulingError::SlotConflict);
        }

        let appointment: Appointment = self
            .store
            .insert_returning(
                "appointments",
                Some(auth_token),
                json!({
                    "patient_user_id": patient.id,
                    "doctor_user_id": doctor_id,
                    "scheduled_at": timestamp(scheduled_at),
                }),
            )
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => SchedulingError::SlotConflict,
                other => SchedulingError::DatabaseError(other.to_string()),
            })?;

        info!(
            "Booked appointment {} for patient {} with doctor {}",
            appointment.id, patient.id, doctor_id
        );

        // Best-effort pair: the booking stands even if the reminder insert
        // fails, matching the persisted-appointment-first ordering.
        let due_at = scheduled_at - Duration::hours(1);
        let reminder = self
            .store
            .insert_returning::<Value>(
                "reminders",
                Some(auth_token),
                json!({
                    "user_id": patient.id,
                    "message": format!("Reminder: Appointment at {}", timestamp(scheduled_at)),
                    "due_at": timestamp(due_at),
                }),
            )
            .await;

        if let Err(e) = reminder {
            warn!(
                "Reminder insert failed for appointment {}: {}",
                appointment.id, e
            );
        }

        Ok(appointment)
    }

    /// Role-scoped listing with the counterpart's name and phone attached.
    pub async fn list_appointments(
        &self,
        user: &AuthUser,
        auth_token: &str,
    ) -> Result<Vec<AppointmentListing>, SchedulingError> {
        let (own_column, counterpart_profiles) = match user.role {
            Role::Patient => ("patient_user_id", "doctors"),
            Role::Doctor => ("doctor_user_id", "patients"),
            Role::Admin => {
                return Err(SchedulingError::MissingFields(
                    "listing is scoped to patients and doctors".to_string(),
                ))
            }
        };

        let path = format!(
            "/rest/v1/appointments?{}=eq.{}&order=scheduled_at.desc",
            own_column, user.id
        );
        let appointments: Vec<Appointment> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let counterpart_ids: Vec<Uuid> = appointments
            .iter()
            .map(|a| match user.role {
                Role::Patient => a.doctor_user_id,
                _ => a.patient_user_id,
            })
            .collect();

        let identities = self
            .counterpart_identities(&counterpart_ids, counterpart_profiles, auth_token)
            .await?;

        Ok(appointments
            .into_iter()
            .map(|appointment| {
                let counterpart = match user.role {
                    Role::Patient => appointment.doctor_user_id,
                    _ => appointment.patient_user_id,
                };
                let (name, phone) = identities
                    .iter()
                    .find(|(id, _, _)| *id == counterpart)
                    .map(|(_, n, p)| (n.clone(), p.clone()))
                    .unwrap_or((None, None));
                AppointmentListing {
                    appointment,
                    counterpart_name: name,
                    counterpart_phone: phone,
                }
            })
            .collect())
    }

    async fn resolve_doctor(
        &self,
        doctor_id: Option<Uuid>,
        doctor_username: Option<&str>,
        auth_token: &str,
    ) -> Result<Uuid, SchedulingError> {
        let path = match (doctor_id, doctor_username) {
            (Some(id), _) => format!("/rest/v1/users?id=eq.{}&role=eq.doctor&select=id", id),
            (None, Some(username)) => format!(
                "/rest/v1/users?username=eq.{}&role=eq.doctor&select=id",
                encode_param(username)
            ),
            (None, None) => {
                return Err(SchedulingError::MissingFields(
                    "doctor_id or doctor_username is required".to_string(),
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
            .ok_or(SchedulingError::DoctorNotFound)
    }

    /// Exact-timestamp check only; bookings one second apart do not conflict.
    async fn slot_taken(
        &self,
        doctor_id: Uuid,
        scheduled_at: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_user_id=eq.{}&scheduled_at=eq.{}&select=id",
            doctor_id,
            encode_param(&timestamp(scheduled_at))
        );

        let rows: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        if !rows.is_empty() {
            debug!(
                "Slot conflict for doctor {} at {}",
                doctor_id,
                timestamp(scheduled_at)
            );
        }

        Ok(!rows.is_empty())
    }

    async fn counterpart_identities(
        &self,
        user_ids: &[Uuid],
        profile_table: &str,
        auth_token: &str,
    ) -> Result<Vec<(Uuid, Option<String>, Option<String>)>, SchedulingError> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        let id_list = user_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let profiles: Vec<Value> = self
            .store
            .request(
                Method::GET,
                &format!(
                    "/rest/v1/{}?user_id=in.({})&select=user_id,name",
                    profile_table, id_list
                ),
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let users: Vec<Value> = self
            .store
            .request(
                Method::GET,
                &format!("/rest/v1/users?id=in.({})&select=id,username", id_list),
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let field = |row: &Value, key: &str| -> Option<String> {
            row.get(key).and_then(|v| v.as_str()).map(str::to_string)
        };

        Ok(user_ids
            .iter()
            .map(|id| {
                let name = profiles
                    .iter()
                    .find(|p| field(p, "user_id").as_deref() == Some(&id.to_string()))
                    .and_then(|p| field(p, "name"));
                let phone = users
                    .iter()
                    .find(|u| field(u, "id").as_deref() == Some(&id.to_string()))
                    .and_then(|u| field(u, "username"));
                (*id, name, phone)
            })
            .collect())
    }
}
