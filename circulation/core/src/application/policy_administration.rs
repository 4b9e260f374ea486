// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Policy Administration Use Case
//!
//! Registration and listing of loan policies.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Validate and register policies, announce them
//! - **Collaborators:**
//!   - Domain: PolicyDefinition, PolicyStore
//!   - Infrastructure: EventBus

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::errors::CirculationError;
use crate::domain::events::CirculationEvent;
use crate::domain::policy::{Policy, PolicyDefinition, PolicyStore};
use crate::infrastructure::event_bus::EventBus;

/// What an administrator sees about a registered policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummary {
    pub name: String,
    pub patron_status: String,
    pub patron_type: String,
    pub item_status: String,
    pub item_type: String,
    pub registered_at: DateTime<Utc>,
}

impl From<&Policy> for PolicySummary {
    fn from(policy: &Policy) -> Self {
        Self {
            name: policy.name.clone(),
            patron_status: policy.patron_status.clone(),
            patron_type: policy.patron_type.clone(),
            item_status: policy.item_status.clone(),
            item_type: policy.item_type.clone(),
            registered_at: policy.registered_at,
        }
    }
}

pub struct PolicyAdministration {
    store: Arc<dyn PolicyStore>,
    event_bus: Arc<EventBus>,
}

impl PolicyAdministration {
    pub fn new(store: Arc<dyn PolicyStore>, event_bus: Arc<EventBus>) -> Self {
        Self { store, event_bus }
    }

    /// Register a policy. It takes part in every evaluation that starts after
    /// this returns.
    pub fn create_policy(&self, definition: PolicyDefinition) -> Result<PolicySummary, CirculationError> {
        let policy = self.store.add(definition).map_err(|e| {
            warn!(error = %e, "Policy registration rejected");
            CirculationError::from(e)
        })?;

        info!(policy = %policy.name, "Registered loan policy");
        self.event_bus.publish(CirculationEvent::PolicyRegistered {
            name: policy.name.clone(),
            registered_at: policy.registered_at,
        });

        Ok(PolicySummary::from(&policy))
    }

    /// All registered policies in registration order.
    pub fn list_policies(&self) -> Vec<PolicySummary> {
        self.store.snapshot().iter().map(PolicySummary::from).collect()
    }

    /// Register a batch of policies, e.g. from configuration. Stops at the
    /// first rejected definition; earlier ones stay registered.
    pub fn seed(&self, definitions: &[PolicyDefinition]) -> Result<usize, CirculationError> {
        for definition in definitions {
            self.create_policy(definition.clone())?;
        }
        Ok(definitions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::policy_store::InMemoryPolicyStore;

    fn administration() -> (PolicyAdministration, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new(16));
        let admin = PolicyAdministration::new(Arc::new(InMemoryPolicyStore::new()), bus.clone());
        (admin, bus)
    }

    #[tokio::test]
    async fn test_create_publishes_event() {
        let (admin, bus) = administration();
        let mut events = bus.subscribe();

        let summary = admin
            .create_policy(PolicyDefinition::new("Staff books", "ACTIVE", "STAFF", "AVAILABLE", "BOOK"))
            .unwrap();
        assert_eq!(summary.name, "Staff books");

        match events.recv().await.unwrap() {
            CirculationEvent::PolicyRegistered { name, .. } => assert_eq!(name, "Staff books"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_maps_to_circulation_error() {
        let (admin, _) = administration();
        let definition = PolicyDefinition::new("Staff books", "ACTIVE", "STAFF", "AVAILABLE", "BOOK");
        admin.create_policy(definition.clone()).unwrap();

        assert_eq!(
            admin.create_policy(definition),
            Err(CirculationError::DuplicateName { name: "Staff books".into() })
        );
        assert_eq!(admin.list_policies().len(), 1);
    }

    #[test]
    fn test_seed_stops_at_first_invalid_definition() {
        let (admin, _) = administration();
        let result = admin.seed(&[
            PolicyDefinition::new("One", "ACTIVE", "STAFF", "AVAILABLE", "BOOK"),
            PolicyDefinition::new("Two", "", "STAFF", "AVAILABLE", "BOOK"),
            PolicyDefinition::new("Three", "ACTIVE", "STAFF", "AVAILABLE", "DVD"),
        ]);

        assert_eq!(result, Err(CirculationError::InvalidPolicy { field: "patronStatus" }));
        let names: Vec<_> = admin.list_policies().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["One"]);
    }
}
