// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Infrastructure Implementations
//!
//! Adapters for the abstractions defined in the domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Policy storage, event fan-out and catalog access
//! - **Pattern:** Adapter (Hexagonal Architecture)

pub mod catalog;
pub mod event_bus;
pub mod policy_store;

pub use catalog::{HttpCatalogClient, InMemoryCatalogClient};
pub use event_bus::{EventBus, EventBusError, EventReceiver};
pub use policy_store::InMemoryPolicyStore;
