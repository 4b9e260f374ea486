// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::catalog::{CatalogError, CatalogOperation};
use super::ids::{ItemId, PatronId};
use super::policy::PolicyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Patron,
    Item,
    Loan,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Patron => "patron",
            Self::Item => "item",
            Self::Loan => "loan",
        })
    }
}

/// Terminal outcome of a failed workflow or administrative call.
///
/// Every variant is final for the request in progress; nothing is retried
/// and no remote mutation already applied is rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CirculationError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    #[error("patron {patron_id} is not permitted to borrow item {item_id}")]
    PermissionDenied { patron_id: PatronId, item_id: ItemId },

    #[error("a policy named '{name}' already exists")]
    DuplicateName { name: String },

    #[error("invalid policy: field '{field}' must not be empty")]
    InvalidPolicy { field: &'static str },

    #[error("catalog call {operation} failed: {cause}")]
    Remote { operation: CatalogOperation, cause: String },

    #[error("catalog call {operation} timed out")]
    Timeout { operation: CatalogOperation },

    #[error("cancelled while waiting for {operation}")]
    Cancelled { operation: CatalogOperation },

    #[error("invalid request: {0}")]
    Validation(String),
}

impl CirculationError {
    pub fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn remote(operation: CatalogOperation, cause: CatalogError) -> Self {
        Self::Remote {
            operation,
            cause: cause.to_string(),
        }
    }

    /// Stable short label, used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::DuplicateName { .. } => "duplicate_name",
            Self::InvalidPolicy { .. } => "invalid_policy",
            Self::Remote { .. } => "remote",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
            Self::Validation(_) => "validation",
        }
    }
}

impl From<PolicyError> for CirculationError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::InvalidPolicy { field } => Self::InvalidPolicy { field },
            PolicyError::DuplicateName { name } => Self::DuplicateName { name },
        }
    }
}
