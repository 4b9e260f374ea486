// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::ItemId;

/// Circulation status of an item: a short code used for matching plus a
/// human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatus {
    pub value: String,

    #[serde(rename = "desc", alias = "description", default)]
    pub description: String,
}

impl ItemStatus {
    pub fn new(value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: description.into(),
        }
    }

    pub fn on_loan() -> Self {
        Self::new("ON_LOAN", "ITEM_STATUS_ON_LOAN")
    }

    pub fn available() -> Self {
        Self::new("AVAILABLE", "ITEM_STATUS_AVAILABLE")
    }
}

/// Snapshot of a loanable catalog item.
///
/// The core never owns item state. Workflows fetch a snapshot, change the
/// status and write the whole record back, so unknown fields are carried in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,

    #[serde(default)]
    pub barcode: String,

    #[serde(rename = "type", alias = "itemType", default)]
    pub item_type: String,

    #[serde(rename = "itemStatus", alias = "status")]
    pub status: ItemStatus,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(
        id: impl Into<ItemId>,
        barcode: impl Into<String>,
        item_type: impl Into<String>,
        status: ItemStatus,
    ) -> Self {
        Self {
            id: id.into(),
            barcode: barcode.into(),
            item_type: item_type.into(),
            status,
            extra: Map::new(),
        }
    }

    /// Same item with its status replaced; every other field is untouched.
    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }
}
