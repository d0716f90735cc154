use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub sent: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReminderRequest {
    pub message: Option<String>,
    #[serde(alias = "dueAt")]
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}
