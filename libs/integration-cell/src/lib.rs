//! # Integration Cell
//!
//! Outward-facing integrations: Twilio-shaped video access tokens, the proxy
//! to the internal chat service, and the JSON-file-backed inventory lookups.
//! All routes here are public; the video token route validates its inputs and
//! the chat route normalizes legacy body shapes before forwarding.

use std::sync::Arc;

use shared_config::AppConfig;

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::integration_routes;
pub use services::InventoryStore;

pub struct IntegrationState {
    pub config: Arc<AppConfig>,
    pub inventory: Arc<InventoryStore>,
}
