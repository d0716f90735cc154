use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::models::IntegrationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub product_code: String,
    pub name: String,
    pub quantity: i64,
}

/// In-memory product inventory backed by a JSON side file. Lookups are case
/// insensitive on the product code; `reload` re-reads the file in place.
pub struct InventoryStore {
    path: String,
    items: RwLock<HashMap<String, InventoryItem>>,
}

impl InventoryStore {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            items: RwLock::new(HashMap::new()),
        }
    }

    pub async fn load(&self) -> Result<usize, IntegrationError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| IntegrationError::Inventory(e.to_string()))?;
        let parsed: Vec<InventoryItem> =
            serde_json::from_str(&raw).map_err(|e| IntegrationError::Inventory(e.to_string()))?;

        let mut items = self.items.write().await;
        items.clear();
        for item in parsed {
            items.insert(item.product_code.to_uppercase(), item);
        }

        info!("Loaded {} inventory item(s) from {}", items.len(), self.path);
        Ok(items.len())
    }

    pub async fn lookup(&self, product_code: &str) -> Option<InventoryItem> {
        self.items
            .read()
            .await
            .get(&product_code.to_uppercase())
            .cloned()
    }
}
