use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{encode_param, timestamp, StoreClient};
use shared_utils::notify::Notifier;

use crate::models::{Reminder, ReminderError};

/// Periodic dispatcher for due reminders.
///
/// One instance runs one spawned task, so cycles never overlap within a
/// process. Across processes the guarded mark (`sent=eq.false`) is the claim:
/// a row is delivered only by the dispatcher that flipped it.
pub struct ReminderDispatcher {
    store: StoreClient,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
}

impl ReminderDispatcher {
    pub fn new(config: &AppConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store: StoreClient::new(config),
            notifier,
            interval: Duration::from_secs(config.reminder_interval_seconds),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                "Reminder dispatcher running every {}s",
                self.interval.as_secs()
            );
            loop {
                ticker.tick().await;
                match self.run_cycle().await {
                    Ok(0) => {}
                    Ok(n) => info!("Dispatched {} reminder(s)", n),
                    Err(e) => warn!("Reminder cycle failed: {}", e),
                }
            }
        })
    }

    /// One sweep: fetch unsent due rows, claim each by flipping `sent` while
    /// it is still false, deliver the claimed ones. Delivery failures are
    /// logged and not retried.
    pub async fn run_cycle(&self) -> Result<usize, ReminderError> {
        let now = timestamp(Utc::now());
        let due: Vec<Reminder> = self
            .store
            .request(
                Method::GET,
                &format!(
                    "/rest/v1/reminders?sent=eq.false&due_at=lte.{}&order=due_at.asc",
                    encode_param(&now)
                ),
                None,
                None,
            )
            .await
            .map_err(|e| ReminderError::DatabaseError(e.to_string()))?;

        if due.is_empty() {
            return Ok(0);
        }

        let recipients = self.recipients(&due).await?;
        let mut dispatched = 0;

        for reminder in due {
            let claimed: Vec<Reminder> = self
                .store
                .update_returning(
                    &format!("/rest/v1/reminders?id=eq.{}&sent=eq.false", reminder.id),
                    None,
                    json!({ "sent": true }),
                )
                .await
                .map_err(|e| ReminderError::DatabaseError(e.to_string()))?;

            if claimed.is_empty() {
                debug!("Reminder {} already claimed elsewhere", reminder.id);
                continue;
            }

            let recipient = recipients
                .iter()
                .find(|(id, _)| *id == reminder.user_id)
                .map(|(_, phone)| phone.clone())
                .unwrap_or_else(|| reminder.user_id.to_string());

            if let Err(e) = self.notifier.deliver(&recipient, &reminder.message).await {
                warn!("Reminder {} delivery failed: {}", reminder.id, e);
            }
            dispatched += 1;
        }

        Ok(dispatched)
    }

    async fn recipients(
        &self,
        due: &[Reminder],
    ) -> Result<Vec<(Uuid, String)>, ReminderError> {
        let id_list = due
            .iter()
            .map(|r| r.user_id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let users: Vec<Value> = self
            .store
            .request(
                Method::GET,
                &format!("/rest/v1/users?id=in.({})&select=id,username", id_list),
                None,
                None,
            )
            .await
            .map_err(|e| ReminderError::DatabaseError(e.to_string()))?;

        Ok(users
            .iter()
            .filter_map(|u| {
                let id = u.get("id").and_then(|v| v.as_str())?;
                let username = u.get("username").and_then(|v| v.as_str())?;
                Some((Uuid::parse_str(id).ok()?, username.to_string()))
            })
            .collect())
    }
}
