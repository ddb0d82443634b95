//! Inventory item model.
//!
//! Items are opaque collaborator payloads; the core only requires an `id`
//! and a `name` and carries everything else through untouched.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// An inventory item. `id` and `name` are the shape check; all other wire
/// fields ride along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Item {
    /// Validate and accept an item payload. Missing or non-string `id` or
    /// `name` fails the shape check.
    pub fn from_payload(payload: serde_json::Value) -> Result<Self, EngineError> {
        let item: Self = serde_json::from_value(payload)
            .map_err(|e| EngineError::InvalidItem(e.to_string()))?;
        if item.id.is_empty() {
            return Err(EngineError::InvalidItem("id is empty".to_string()));
        }
        if item.name.is_empty() {
            return Err(EngineError::InvalidItem("name is empty".to_string()));
        }
        Ok(item)
    }
}
