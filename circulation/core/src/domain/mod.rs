// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: circulation entities, the permission-policy model, the
//! catalog contract and the typed error surface.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and rules; no I/O

pub mod ids;
pub mod patron;
pub mod item;
pub mod loan;
pub mod policy;
pub mod catalog;
pub mod errors;
pub mod events;
pub mod clock;
pub mod config;

pub use ids::{ItemId, LoanId, PatronId, TenantId};
pub use patron::Patron;
pub use item::{Item, ItemStatus};
pub use loan::{Loan, LOAN_PERIOD_SECS};
pub use policy::{AttributeSnapshot, Decision, Policy, PolicyDefinition, PolicyError, PolicyStore};
pub use catalog::{CatalogClient, CatalogError, CatalogOperation, CatalogScope, Credential};
pub use errors::{CirculationError, EntityKind};
