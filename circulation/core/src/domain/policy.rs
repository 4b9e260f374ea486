// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Loan Permission Policies
//!
//! A policy is a named, declarative four-attribute predicate. It permits a
//! checkout when **all** of patron status, patron type, item status value and
//! item type match exactly. Across policies the outcome is a logical OR: any
//! matching policy permits; no match (including an empty store) denies.
//!
//! Evaluation is a pure function of an immutable [`AttributeSnapshot`] and the
//! policy list, so it needs no per-evaluation session and is independent of
//! iteration order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::item::Item;
use super::patron::Patron;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("policy field '{field}' must not be empty")]
    InvalidPolicy { field: &'static str },

    #[error("a policy named '{name}' already exists")]
    DuplicateName { name: String },
}

/// Registration input, as submitted by an administrator or listed in the
/// configuration seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDefinition {
    #[serde(alias = "ruleName")]
    pub name: String,
    pub patron_status: String,
    pub patron_type: String,
    pub item_status: String,
    pub item_type: String,
}

impl PolicyDefinition {
    pub fn new(
        name: impl Into<String>,
        patron_status: impl Into<String>,
        patron_type: impl Into<String>,
        item_status: impl Into<String>,
        item_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            patron_status: patron_status.into(),
            patron_type: patron_type.into(),
            item_status: item_status.into(),
            item_type: item_type.into(),
        }
    }
}

/// A registered policy. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Display name as submitted (trimmed)
    pub name: String,

    /// Uniqueness key, see [`normalize_name`]
    pub key: String,

    pub patron_status: String,
    pub patron_type: String,
    pub item_status: String,
    pub item_type: String,
    pub registered_at: DateTime<Utc>,
}

impl Policy {
    /// Validate a definition and turn it into a policy record.
    ///
    /// Every field must be non-empty after trimming. Match values are stored
    /// trimmed; comparison against snapshots is exact.
    pub fn from_definition(definition: PolicyDefinition, registered_at: DateTime<Utc>) -> Result<Self, PolicyError> {
        let name = required("name", &definition.name)?;
        let patron_status = required("patronStatus", &definition.patron_status)?;
        let patron_type = required("patronType", &definition.patron_type)?;
        let item_status = required("itemStatus", &definition.item_status)?;
        let item_type = required("itemType", &definition.item_type)?;

        Ok(Self {
            key: normalize_name(&name),
            name,
            patron_status,
            patron_type,
            item_status,
            item_type,
            registered_at,
        })
    }

    pub fn matches(&self, snapshot: &AttributeSnapshot) -> bool {
        self.patron_status == snapshot.patron_status
            && self.patron_type == snapshot.patron_type
            && self.item_status == snapshot.item_status
            && self.item_type == snapshot.item_type
    }
}

fn required(field: &'static str, value: &str) -> Result<String, PolicyError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PolicyError::InvalidPolicy { field });
    }
    Ok(trimmed.to_string())
}

/// Canonical uniqueness key: runs of whitespace collapse to a single `_`.
///
/// `"Staff  books"`, `" Staff books "` and `"Staff_books"` share one key.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

/// The four attributes a policy looks at, copied out of the fetched
/// patron and item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeSnapshot {
    pub patron_status: String,
    pub patron_type: String,
    pub item_status: String,
    pub item_type: String,
}

impl AttributeSnapshot {
    pub fn of(patron: &Patron, item: &Item) -> Self {
        Self {
            patron_status: patron.status.clone(),
            patron_type: patron.patron_type.clone(),
            item_status: item.status.value.clone(),
            item_type: item.item_type.clone(),
        }
    }
}

/// Outcome of one evaluation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    permitted: bool,
    matched: Vec<String>,
}

impl Decision {
    pub fn deny() -> Self {
        Self {
            permitted: false,
            matched: Vec::new(),
        }
    }

    /// OR-combination over every policy in `policies`.
    pub fn evaluate<'a>(policies: impl IntoIterator<Item = &'a Policy>, snapshot: &AttributeSnapshot) -> Self {
        let matched: Vec<String> = policies
            .into_iter()
            .filter(|policy| policy.matches(snapshot))
            .map(|policy| policy.name.clone())
            .collect();

        Self {
            permitted: !matched.is_empty(),
            matched,
        }
    }

    pub fn is_permitted(&self) -> bool {
        self.permitted
    }

    /// Names of every matching policy, in registration order.
    pub fn matched_policies(&self) -> &[String] {
        &self.matched
    }
}

/// Registry of loan policies shared by all in-flight requests.
///
/// Implementations must let any number of readers run concurrently, make
/// `add` mutually exclusive with other writers, and publish a stored policy
/// to every later reader atomically.
pub trait PolicyStore: Send + Sync {
    /// Register a policy. Fails without side effects on invalid input or a
    /// name collision.
    fn add(&self, definition: PolicyDefinition) -> Result<Policy, PolicyError>;

    /// Immutable view of all policies in registration order.
    fn snapshot(&self) -> Arc<Vec<Policy>>;

    fn list(&self) -> Vec<Policy> {
        self.snapshot().as_ref().clone()
    }

    fn len(&self) -> usize {
        self.snapshot().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
