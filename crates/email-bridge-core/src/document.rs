//! Editor document model.
//!
//! An editor configuration is a flat map from block id to block. The block
//! with id [`ROOT_BLOCK_ID`] is the layout that every other block hangs off.
//! Block `data` is opaque to the bridge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Id of the layout block every document starts from.
pub const ROOT_BLOCK_ID: &str = "root";

/// A single editor block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    /// Keys the bridge does not interpret, kept as written.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EditorBlock {
    pub fn new(block_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            block_type: block_type.into(),
            data,
            extra: serde_json::Map::new(),
        }
    }
}

/// A complete editor document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditorConfiguration {
    blocks: BTreeMap<String, EditorBlock>,
}

impl EditorConfiguration {
    /// Parse a serialized document. The input must be a JSON object of
    /// blocks and must contain a root block.
    pub fn parse(json: &str) -> Result<Self> {
        let config: EditorConfiguration = serde_json::from_str(json)?;
        if config.root().is_none() {
            return Err(BridgeError::Protocol(format!(
                "editor configuration has no '{ROOT_BLOCK_ID}' block"
            )));
        }
        Ok(config)
    }

    /// An empty email layout with default colors and no content.
    pub fn empty_layout() -> Self {
        let mut config = Self::default();
        config.insert(
            ROOT_BLOCK_ID,
            EditorBlock::new(
                "EmailLayout",
                serde_json::json!({
                    "backdropColor": "#F5F5F5",
                    "canvasColor": "#FFFFFF",
                    "textColor": "#262626",
                    "fontFamily": "MODERN_SANS",
                    "childrenIds": [],
                }),
            ),
        );
        config
    }

    pub fn root(&self) -> Option<&EditorBlock> {
        self.blocks.get(ROOT_BLOCK_ID)
    }

    pub fn get(&self, id: &str) -> Option<&EditorBlock> {
        self.blocks.get(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, block: EditorBlock) {
        self.blocks.insert(id.into(), block);
    }

    pub fn block_ids(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Serialize the document the way it is stored as `builderJson`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
