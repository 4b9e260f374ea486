// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Service wiring for one CLI invocation.
//!
//! Builds the policy store, event bus, orchestrator and catalog
//! administration from a configuration manifest, and registers the policies
//! listed in the manifest before any command runs.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use circulation_core::application::{
    CatalogAdministration, OrchestratorSettings, PolicyAdministration, PolicyEngine, TransactionOrchestrator,
};
use circulation_core::domain::catalog::{CatalogClient, CatalogScope};
use circulation_core::domain::config::CirculationConfigManifest;
use circulation_core::infrastructure::{EventBus, HttpCatalogClient, InMemoryPolicyStore};

pub struct CirculationRuntime {
    pub scope: CatalogScope,
    pub event_bus: Arc<EventBus>,
    pub policies: PolicyAdministration,
    pub orchestrator: TransactionOrchestrator,
    pub catalog: CatalogAdministration,
}

impl CirculationRuntime {
    /// Wire services against the HTTP catalog named in the manifest.
    pub fn from_config(manifest: &CirculationConfigManifest) -> Result<Self> {
        manifest.validate().context("Configuration validation failed")?;

        let scope = manifest
            .spec
            .catalog
            .scope()
            .context("Failed to resolve catalog credential")?;
        let client = HttpCatalogClient::from_config(&manifest.spec.catalog)
            .context("Failed to build catalog HTTP client")?;

        Self::with_catalog(manifest, Arc::new(client), scope)
    }

    /// Wire services against an arbitrary catalog implementation.
    pub fn with_catalog(
        manifest: &CirculationConfigManifest,
        catalog: Arc<dyn CatalogClient>,
        scope: CatalogScope,
    ) -> Result<Self> {
        let settings = OrchestratorSettings::from_config(&manifest.spec.orchestrator)
            .context("Invalid orchestrator settings")?;

        let store = Arc::new(InMemoryPolicyStore::new());
        let event_bus = Arc::new(EventBus::with_default_capacity());

        let policies = PolicyAdministration::new(store.clone(), event_bus.clone());
        let seeded = policies
            .seed(&manifest.spec.policies)
            .context("Failed to register configured policies")?;
        info!(policies = seeded, tenant = %scope.tenant, "Circulation services ready");

        let catalog_admin = CatalogAdministration::new(catalog.clone(), settings.call_timeout);
        let orchestrator = TransactionOrchestrator::new(catalog, PolicyEngine::new(store), event_bus.clone())
            .with_settings(settings);

        Ok(Self {
            scope,
            event_bus,
            policies,
            orchestrator,
            catalog: catalog_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circulation_core::domain::catalog::Credential;
    use circulation_core::domain::policy::PolicyDefinition;
    use circulation_core::infrastructure::InMemoryCatalogClient;

    #[test]
    fn test_seeds_policies_from_manifest() {
        let mut manifest = CirculationConfigManifest::default();
        manifest.spec.policies = vec![
            PolicyDefinition::new("Staff books", "ACTIVE", "STAFF", "AVAILABLE", "BOOK"),
            PolicyDefinition::new("Public dvds", "ACTIVE", "PUBLIC", "AVAILABLE", "DVD"),
        ];

        let runtime = CirculationRuntime::with_catalog(
            &manifest,
            Arc::new(InMemoryCatalogClient::new()),
            CatalogScope::new("hbz", Credential::new("aaaaa")),
        )
        .unwrap();

        let names: Vec<_> = runtime.policies.list_policies().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Staff books", "Public dvds"]);
    }

    #[test]
    fn test_duplicate_seed_policies_are_rejected() {
        let mut manifest = CirculationConfigManifest::default();
        manifest.spec.policies = vec![
            PolicyDefinition::new("Staff books", "ACTIVE", "STAFF", "AVAILABLE", "BOOK"),
            PolicyDefinition::new("Staff  books", "ACTIVE", "STAFF", "AVAILABLE", "DVD"),
        ];

        let result = CirculationRuntime::with_catalog(
            &manifest,
            Arc::new(InMemoryCatalogClient::new()),
            CatalogScope::new("hbz", Credential::new("aaaaa")),
        );
        assert!(result.is_err());
    }
}
