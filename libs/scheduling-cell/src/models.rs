use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_user_id: Uuid,
    pub doctor_user_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Listing row: the appointment plus the identity of the other party,
/// resolved from the caller's point of view.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentListing {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub counterpart_name: Option<String>,
    pub counterpart_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BookAppointmentRequest {
    #[serde(alias = "doctorId")]
    pub doctor_id: Option<Uuid>,
    #[serde(alias = "doctorUsername")]
    pub doctor_username: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub patient_user_id: Uuid,
    pub doctor_user_id: Uuid,
    pub medicine: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionListing {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub counterpart_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePrescriptionRequest {
    #[serde(alias = "patientId")]
    pub patient_id: Option<Uuid>,
    #[serde(alias = "patientUsername")]
    pub patient_username: Option<String>,
    pub medicine: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationStatus {
    Ongoing,
    Ended,
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationStatus::Ongoing => write!(f, "ongoing"),
            ConsultationStatus::Ended => write!(f, "ended"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub id: Uuid,
    pub doctor_user_id: Uuid,
    pub patient_user_id: Uuid,
    pub status: ConsultationStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct StartConsultationRequest {
    #[serde(alias = "doctorUserId")]
    pub doctor_user_id: Option<Uuid>,
    #[serde(alias = "patientUserId")]
    pub patient_user_id: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Missing fields: {0}")]
    MissingFields(String),

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor already booked at that time")]
    SlotConflict,

    #[error("Not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
