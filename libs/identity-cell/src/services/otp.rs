use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tokio::sync::RwLock;

pub const OTP_TTL_SECONDS: i64 = 300;

#[derive(Debug, Clone)]
pub struct OtpEntry {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// One active code per phone. Injected so tests and future multi-instance
/// deployments can swap the backing store; the in-memory implementation is
/// intentionally non-durable and instance-local.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Store a code, replacing any previous one for the phone.
    async fn put(&self, phone: &str, code: String, ttl_seconds: i64);

    /// Fetch the active entry. Expired entries are evicted and not returned.
    async fn get(&self, phone: &str) -> Option<OtpEntry>;

    /// Drop the entry, making a verified code single-use.
    async fn remove(&self, phone: &str);
}

pub struct InMemoryOtpStore {
    entries: RwLock<HashMap<String, OtpEntry>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryOtpStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(&self, phone: &str, code: String, ttl_seconds: i64) {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            phone.to_string(),
            OtpEntry {
                code,
                expires_at: now + Duration::seconds(ttl_seconds),
            },
        );
    }

    async fn get(&self, phone: &str) -> Option<OtpEntry> {
        let entry = self.entries.read().await.get(phone).cloned()?;
        if entry.expires_at <= Utc::now() {
            self.entries.write().await.remove(phone);
            return None;
        }
        Some(entry)
    }

    async fn remove(&self, phone: &str) {
        self.entries.write().await.remove(phone);
    }
}

/// Six digit numeric code, never starting with zero.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}
