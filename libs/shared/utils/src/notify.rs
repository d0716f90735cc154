use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Out-of-band delivery seam for OTP codes and reminder messages. Production
/// would put an SMS or push gateway behind this; development logs instead.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), NotifyError>;
}

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        info!("Notification -> {}: {}", recipient, message);
        Ok(())
    }
}
