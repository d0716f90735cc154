use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{
    BookAppointmentRequest, CreatePrescriptionRequest, SchedulingError, StartConsultationRequest,
};
use crate::services::{AppointmentBookingService, ConsultationService, PrescriptionService};

fn scheduling_error(e: SchedulingError) -> AppError {
    match e {
        SchedulingError::MissingFields(msg) => AppError::ValidationError(msg),
        SchedulingError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        SchedulingError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
        SchedulingError::SlotConflict => {
            AppError::Conflict("Doctor already booked at that time".to_string())
        }
        SchedulingError::NotFound => AppError::NotFound("Not found".to_string()),
        SchedulingError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, &[Role::Patient])?;

    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .book_appointment(&user, &request, auth.token())
        .await
        .map_err(scheduling_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment booked",
            "appointment": appointment,
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Patient, Role::Doctor])?;

    let service = AppointmentBookingService::new(&state);
    let appointments = service
        .list_appointments(&user, auth.token())
        .await
        .map_err(scheduling_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Patient])?;

    let service = AppointmentBookingService::new(&state);
    let appointments = service
        .list_appointments(&user, auth.token())
        .await
        .map_err(scheduling_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn create_prescription(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, &[Role::Doctor])?;

    let service = PrescriptionService::new(&state);
    let prescription = service
        .create(&user, &request, auth.token())
        .await
        .map_err(scheduling_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Prescription added",
            "prescription": prescription,
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_prescriptions(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Patient, Role::Doctor])?;

    let service = PrescriptionService::new(&state);
    let prescriptions = service
        .list(&user, auth.token())
        .await
        .map_err(scheduling_error)?;

    Ok(Json(json!(prescriptions)))
}

#[axum::debug_handler]
pub async fn start_consultation(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<StartConsultationRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ConsultationService::new(&state);
    let consultation = service
        .start(&user, &request, auth.token())
        .await
        .map_err(scheduling_error)?;

    Ok(Json(json!({
        "message": "Consultation started",
        "id": consultation.id,
    })))
}

#[axum::debug_handler]
pub async fn end_consultation(
    State(state): State<Arc<AppConfig>>,
    Path(consultation_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = ConsultationService::new(&state);
    let consultation = service
        .end(consultation_id, auth.token())
        .await
        .map_err(|e| match e {
            SchedulingError::NotFound => {
                AppError::NotFound("Consultation not found".to_string())
            }
            other => scheduling_error(other),
        })?;

    Ok(Json(json!({
        "message": "Consultation ended",
        "session": consultation,
    })))
}

#[axum::debug_handler]
pub async fn list_consultations(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Patient, Role::Doctor])?;

    let service = ConsultationService::new(&state);
    let consultations = service
        .list(&user, auth.token())
        .await
        .map_err(scheduling_error)?;

    Ok(Json(json!(consultations)))
}
