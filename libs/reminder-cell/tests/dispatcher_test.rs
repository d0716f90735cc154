use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use axum::extract::{Extension, Json, State};
use axum_extra::TypedHeader;
use headers::Authorization;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reminder_cell::handlers;
use reminder_cell::models::CreateReminderRequest;
use reminder_cell::ReminderDispatcher;
use shared_models::error::AppError;
use shared_utils::notify::{Notifier, NotifyError};
use shared_utils::test_utils::{TestConfig, TestUser};

struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            messages: Mutex::new(vec![]),
        }
    }

    fn delivered(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        self.messages
            .lock()
            .unwrap()
            .push((recipient.to_string(), message.to_string()));
        Ok(())
    }
}

fn reminder_row(id: Uuid, user_id: Uuid, sent: bool) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": user_id,
        "message": "Reminder: Appointment at 2025-06-01T10:00:00Z",
        "due_at": "2025-06-01T09:00:00Z",
        "sent": sent,
        "created_at": "2025-05-20T00:00:00Z"
    })
}

#[tokio::test]
async fn cycle_claims_and_delivers_due_reminders() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    let reminder_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/reminders"))
        .and(query_param("sent", "eq.false"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([reminder_row(reminder_id, user_id, false)])),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": user_id,
            "username": "+15551234"
        }])))
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/reminders"))
        .and(query_param("id", format!("eq.{}", reminder_id)))
        .and(query_param("sent", "eq.false"))
        .and(body_partial_json(json!({"sent": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([reminder_row(reminder_id, user_id, true)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let notifier = Arc::new(RecordingNotifier::new());
    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let dispatcher = ReminderDispatcher::new(&config, notifier.clone());

    let dispatched = dispatcher.run_cycle().await.expect("cycle should succeed");

    assert_eq!(dispatched, 1);
    let delivered = notifier.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, "+15551234");
    assert_eq!(
        delivered[0].1,
        "Reminder: Appointment at 2025-06-01T10:00:00Z"
    );
}

#[tokio::test]
async fn cycle_skips_rows_claimed_elsewhere() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    let reminder_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/reminders"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([reminder_row(reminder_id, user_id, false)])),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": user_id,
            "username": "+15551234"
        }])))
        .mount(&mock_server)
        .await;
    // Another sweep already flipped the flag, so the claim matches nothing.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/reminders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let notifier = Arc::new(RecordingNotifier::new());
    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let dispatcher = ReminderDispatcher::new(&config, notifier.clone());

    let dispatched = dispatcher.run_cycle().await.expect("cycle should succeed");

    assert_eq!(dispatched, 0);
    assert!(notifier.delivered().is_empty());
}

#[tokio::test]
async fn cycle_with_nothing_due_is_a_no_op() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reminders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let notifier = Arc::new(RecordingNotifier::new());
    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    let dispatcher = ReminderDispatcher::new(&config, notifier.clone());

    let dispatched = dispatcher.run_cycle().await.expect("cycle should succeed");
    assert_eq!(dispatched, 0);
}

#[tokio::test]
async fn create_reminder_requires_due_at() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient("+15550020");

    let result = handlers::create_reminder(
        State(TestConfig::with_store_url(&mock_server.uri()).to_arc()),
        TypedHeader(Authorization::bearer("caller-token").unwrap()),
        Extension(user.to_auth_user()),
        Json(CreateReminderRequest {
            message: Some("Take medication".to_string()),
            due_at: None,
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn create_reminder_is_owned_by_the_caller() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient("+15550021");

    Mock::given(method("POST"))
        .and(path("/rest/v1/reminders"))
        .and(body_partial_json(json!({
            "user_id": user.id,
            "message": "Take medication",
            "due_at": "2025-06-01T09:00:00Z"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([reminder_row(Uuid::new_v4(), user.id, false)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = handlers::create_reminder(
        State(TestConfig::with_store_url(&mock_server.uri()).to_arc()),
        TypedHeader(Authorization::bearer("caller-token").unwrap()),
        Extension(user.to_auth_user()),
        Json(CreateReminderRequest {
            message: Some("Take medication".to_string()),
            due_at: Some("2025-06-01T09:00:00Z".parse().unwrap()),
        }),
    )
    .await;

    let (status, _) = result.expect("reminder should be created");
    assert_eq!(status, axum::http::StatusCode::CREATED);
}
