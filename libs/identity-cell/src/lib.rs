//! # Identity Cell
//!
//! Registration, password and OTP login, token issuance, and the
//! patient/doctor profile directory.
//!
//! OTP codes live behind the injected [`services::OtpStore`], one active code
//! per phone with a five minute TTL. The in-memory implementation is
//! instance-local: a horizontally scaled deployment needs a shared backing
//! store or session affinity, otherwise verification lands on an instance
//! that never issued the code.

use std::sync::Arc;

use shared_config::AppConfig;
use shared_utils::notify::Notifier;

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::identity_routes;
pub use services::{InMemoryOtpStore, OtpStore};

/// Shared state for the identity routes. The OTP store and the notifier are
/// injected so tests can observe delivery and multi-instance deployments can
/// swap the OTP backend.
pub struct IdentityState {
    pub config: Arc<AppConfig>,
    pub otp: Arc<dyn OtpStore>,
    pub notifier: Arc<dyn Notifier>,
}
