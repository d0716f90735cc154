pub mod chat;
pub mod inventory;
pub mod video;

pub use chat::ChatProxyService;
pub use inventory::{InventoryItem, InventoryStore};
pub use video::VideoTokenService;
