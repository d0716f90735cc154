use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Extension, Json, Path, State};
use axum_extra::TypedHeader;
use chrono::{DateTime, Utc};
use headers::Authorization;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::handlers;
use scheduling_cell::models::{
    BookAppointmentRequest, CreatePrescriptionRequest, StartConsultationRequest,
};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::{TestConfig, TestUser};

fn test_config(mock_server: &MockServer) -> Arc<AppConfig> {
    TestConfig::with_store_url(&mock_server.uri()).to_arc()
}

fn bearer() -> TypedHeader<Authorization<headers::authorization::Bearer>> {
    TypedHeader(Authorization::bearer("caller-token").unwrap())
}

fn slot() -> DateTime<Utc> {
    "2025-06-01T10:00:00Z".parse().unwrap()
}

fn appointment_row(patient_id: Uuid, doctor_id: Uuid) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "patient_user_id": patient_id,
        "doctor_user_id": doctor_id,
        "scheduled_at": "2025-06-01T10:00:00Z",
        "created_at": "2025-05-20T00:00:00Z"
    })
}

fn book_request(doctor_id: Uuid) -> BookAppointmentRequest {
    BookAppointmentRequest {
        doctor_id: Some(doctor_id),
        doctor_username: None,
        scheduled_at: Some(slot()),
    }
}

#[tokio::test]
async fn booking_queues_reminder_an_hour_before_the_slot() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("+15550001");
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": doctor_id}])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([appointment_row(patient.id, doctor_id)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/reminders"))
        .and(body_partial_json(json!({
            "user_id": patient.id,
            "due_at": "2025-06-01T09:00:00Z"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "user_id": patient.id,
            "message": "Reminder: Appointment at 2025-06-01T10:00:00Z",
            "due_at": "2025-06-01T09:00:00Z",
            "sent": false
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = handlers::create_appointment(
        State(test_config(&mock_server)),
        bearer(),
        Extension(patient.to_auth_user()),
        Json(book_request(doctor_id)),
    )
    .await;

    let (status, body) = result.expect("booking should succeed");
    assert_eq!(status, axum::http::StatusCode::CREATED);
    assert_eq!(body.0["message"], "Appointment booked");
    assert_eq!(
        body.0["appointment"]["doctor_user_id"],
        json!(doctor_id.to_string())
    );
}

#[tokio::test]
async fn booking_a_taken_slot_is_a_conflict() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("+15550002");
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": doctor_id}])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": Uuid::new_v4()}])),
        )
        .mount(&mock_server)
        .await;
    // The insert must never run when the precheck already saw the slot.
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = handlers::create_appointment(
        State(test_config(&mock_server)),
        bearer(),
        Extension(patient.to_auth_user()),
        Json(book_request(doctor_id)),
    )
    .await;

    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn concurrent_insert_conflict_maps_to_conflict() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("+15550003");
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": doctor_id}])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    // Precheck raced: the unique constraint rejects the insert.
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({"message": "duplicate key value"})),
        )
        .mount(&mock_server)
        .await;

    let result = handlers::create_appointment(
        State(test_config(&mock_server)),
        bearer(),
        Extension(patient.to_auth_user()),
        Json(book_request(doctor_id)),
    )
    .await;

    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn booking_with_unknown_doctor_is_not_found() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("+15550004");

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = handlers::create_appointment(
        State(test_config(&mock_server)),
        bearer(),
        Extension(patient.to_auth_user()),
        Json(book_request(Uuid::new_v4())),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn doctors_cannot_book_appointments() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor("+15550005");

    let result = handlers::create_appointment(
        State(test_config(&mock_server)),
        bearer(),
        Extension(doctor.to_auth_user()),
        Json(book_request(Uuid::new_v4())),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn doctor_listing_is_scoped_to_their_own_column() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor("+15550006");
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_user_id", format!("eq.{}", doctor.id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([appointment_row(patient_id, doctor.id)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "user_id": patient_id,
            "name": "Pat Example"
        }])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": patient_id,
            "username": "+15550007"
        }])))
        .mount(&mock_server)
        .await;

    let result = handlers::list_appointments(
        State(test_config(&mock_server)),
        bearer(),
        Extension(doctor.to_auth_user()),
    )
    .await;

    let body = result.expect("listing should succeed").0;
    assert_eq!(body[0]["counterpart_name"], "Pat Example");
    assert_eq!(body[0]["counterpart_phone"], "+15550007");
}

#[tokio::test]
async fn admins_are_not_in_appointment_listing_scope() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("root");

    let result = handlers::list_appointments(
        State(test_config(&mock_server)),
        bearer(),
        Extension(admin.to_auth_user()),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn patients_cannot_write_prescriptions() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("+15550011");

    let result = handlers::create_prescription(
        State(test_config(&mock_server)),
        bearer(),
        Extension(patient.to_auth_user()),
        Json(CreatePrescriptionRequest {
            patient_id: Some(Uuid::new_v4()),
            patient_username: None,
            medicine: Some("Amoxicillin 500mg".to_string()),
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn prescription_requires_a_medicine() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor("+15550012");

    let result = handlers::create_prescription(
        State(test_config(&mock_server)),
        bearer(),
        Extension(doctor.to_auth_user()),
        Json(CreatePrescriptionRequest {
            patient_id: Some(Uuid::new_v4()),
            patient_username: None,
            medicine: Some(String::new()),
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn doctor_records_a_prescription_by_patient_username() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor("+15550013");
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("username", "eq.+15550099"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": patient_id}])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/prescriptions"))
        .and(body_partial_json(json!({
            "patient_user_id": patient_id,
            "doctor_user_id": doctor.id,
            "medicine": "Ibuprofen 200mg"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "patient_user_id": patient_id,
            "doctor_user_id": doctor.id,
            "medicine": "Ibuprofen 200mg",
            "created_at": "2025-06-01T10:00:00Z"
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = handlers::create_prescription(
        State(test_config(&mock_server)),
        bearer(),
        Extension(doctor.to_auth_user()),
        Json(CreatePrescriptionRequest {
            patient_id: None,
            patient_username: Some("+15550099".to_string()),
            medicine: Some("Ibuprofen 200mg".to_string()),
        }),
    )
    .await;

    let (status, body) = result.expect("prescription should be recorded");
    assert_eq!(status, axum::http::StatusCode::CREATED);
    assert_eq!(body.0["prescription"]["medicine"], "Ibuprofen 200mg");
}

#[tokio::test]
async fn ending_an_ended_consultation_is_idempotent() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor("+15550008");
    let consultation_id = Uuid::new_v4();
    let ended = json!({
        "id": consultation_id,
        "doctor_user_id": doctor.id,
        "patient_user_id": Uuid::new_v4(),
        "status": "ended",
        "start_time": "2025-06-01T10:00:00Z",
        "end_time": "2025-06-01T10:30:00Z"
    });

    // The guarded PATCH matches no ongoing row.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/consultations"))
        .and(query_param("status", "eq.ongoing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ended])))
        .mount(&mock_server)
        .await;

    let result = handlers::end_consultation(
        State(test_config(&mock_server)),
        Path(consultation_id),
        bearer(),
        Extension(doctor.to_auth_user()),
    )
    .await;

    let body = result.expect("second end should succeed").0;
    assert_eq!(body["session"]["status"], "ended");
    // The original end_time survives, it is not re-stamped.
    assert_eq!(body["session"]["end_time"], "2025-06-01T10:30:00Z");
}

#[tokio::test]
async fn ending_an_unknown_consultation_is_not_found() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor("+15550009");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = handlers::end_consultation(
        State(test_config(&mock_server)),
        Path(Uuid::new_v4()),
        bearer(),
        Extension(doctor.to_auth_user()),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn starting_a_consultation_fills_the_caller_side() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor("+15550010");
    let patient_id = Uuid::new_v4();
    let consultation_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/consultations"))
        .and(body_partial_json(json!({
            "doctor_user_id": doctor.id,
            "patient_user_id": patient_id,
            "status": "ongoing"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": consultation_id,
            "doctor_user_id": doctor.id,
            "patient_user_id": patient_id,
            "status": "ongoing",
            "start_time": "2025-06-01T10:00:00Z",
            "end_time": null
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = handlers::start_consultation(
        State(test_config(&mock_server)),
        bearer(),
        Extension(doctor.to_auth_user()),
        Json(StartConsultationRequest {
            doctor_user_id: None,
            patient_user_id: Some(patient_id),
        }),
    )
    .await;

    let body = result.expect("start should succeed").0;
    assert_eq!(body["id"], json!(consultation_id.to_string()));
}
