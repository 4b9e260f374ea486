// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::PatronId;

/// Read-only snapshot of a library member as returned by the catalog.
///
/// Only `status` and `type` take part in policy evaluation. Any other field
/// the catalog sends is kept in `extra` so the snapshot can be echoed back
/// without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patron {
    pub id: PatronId,

    /// Membership status, e.g. `ACTIVE`
    #[serde(default)]
    pub status: String,

    /// Membership type, e.g. `STAFF` or `PUBLIC`
    #[serde(rename = "type", alias = "patronType", default)]
    pub patron_type: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Patron {
    pub fn new(id: impl Into<PatronId>, status: impl Into<String>, patron_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
            patron_type: patron_type.into(),
            extra: Map::new(),
        }
    }
}
