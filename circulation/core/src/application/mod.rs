// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod request_context;
pub mod policy_engine;
pub mod policy_administration;
pub mod transaction;
pub mod catalog_administration;

pub use request_context::{RequestContext, WorkflowKind};
pub use policy_engine::PolicyEngine;
pub use policy_administration::{PolicyAdministration, PolicySummary};
pub use transaction::{CheckoutOutcome, OrchestratorSettings, RenewOutcome, ReturnOutcome, TransactionOrchestrator};
pub use catalog_administration::CatalogAdministration;
