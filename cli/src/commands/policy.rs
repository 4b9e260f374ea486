// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Loan policy commands
//!
//! Commands: create, list
//!
//! Policies live in the `spec.policies` list of the configuration file. A
//! new policy is checked against the configured ones (validity and name
//! uniqueness) before the file is rewritten.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use circulation_core::application::{PolicyAdministration, PolicySummary};
use circulation_core::domain::config::CirculationConfigManifest;
use circulation_core::domain::policy::PolicyDefinition;
use circulation_core::infrastructure::{EventBus, InMemoryPolicyStore};

use super::{load_config, print_json, OutputFormat};

#[derive(Subcommand)]
pub enum PolicyCommand {
    /// Register a loan policy and save it to the configuration file
    Create {
        /// Unique policy name
        #[arg(long)]
        name: String,

        /// Required patron status (e.g. ACTIVE)
        #[arg(long)]
        patron_status: String,

        /// Required patron type (e.g. STAFF)
        #[arg(long)]
        patron_type: String,

        /// Required item status value (e.g. AVAILABLE)
        #[arg(long)]
        item_status: String,

        /// Required item type (e.g. BOOK)
        #[arg(long)]
        item_type: String,
    },

    /// List configured loan policies
    List,
}

pub async fn handle_command(command: PolicyCommand, config_override: Option<PathBuf>, output: OutputFormat) -> Result<()> {
    match command {
        PolicyCommand::Create {
            name,
            patron_status,
            patron_type,
            item_status,
            item_type,
        } => {
            let path = config_target(config_override);
            let definition = PolicyDefinition::new(name, patron_status, patron_type, item_status, item_type);
            let summary = create(&path, definition)?;
            match output {
                OutputFormat::Json => print_json(&summary),
                OutputFormat::Text => {
                    println!(
                        "{}",
                        format!("✓ Policy '{}' saved to {}", summary.name, path.display()).green()
                    );
                    Ok(())
                }
            }
        }
        PolicyCommand::List => {
            let manifest = load_config(config_override)?;
            let policies = administration(&manifest)?.list_policies();
            match output {
                OutputFormat::Json => print_json(&policies),
                OutputFormat::Text => {
                    print_table(&policies);
                    Ok(())
                }
            }
        }
    }
}

/// File a new policy is written to: explicit path, discovered file, or
/// `./circulation-config.yaml`.
fn config_target(config_override: Option<PathBuf>) -> PathBuf {
    config_override
        .or_else(CirculationConfigManifest::discover_config)
        .unwrap_or_else(|| PathBuf::from("./circulation-config.yaml"))
}

fn administration(manifest: &CirculationConfigManifest) -> Result<PolicyAdministration> {
    let admin = PolicyAdministration::new(
        Arc::new(InMemoryPolicyStore::new()),
        Arc::new(EventBus::with_default_capacity()),
    );
    admin
        .seed(&manifest.spec.policies)
        .context("Configured policies are invalid")?;
    Ok(admin)
}

/// Register `definition` next to the policies already in `path` and persist
/// the extended list.
pub fn create(path: &Path, definition: PolicyDefinition) -> Result<PolicySummary> {
    let mut manifest = if path.exists() {
        CirculationConfigManifest::from_yaml_file(path)
            .with_context(|| format!("Failed to load config at {:?}", path))?
    } else {
        CirculationConfigManifest::default()
    };

    let summary = administration(&manifest)?
        .create_policy(definition.clone())
        .context("Policy rejected")?;

    manifest.spec.policies.push(definition);
    manifest
        .to_yaml_file(path)
        .with_context(|| format!("Failed to write config to {:?}", path))?;

    Ok(summary)
}

fn print_table(policies: &[PolicySummary]) {
    if policies.is_empty() {
        println!("{}", "No policies configured; every checkout will be denied.".yellow());
        return;
    }

    println!(
        "{:<24} {:<14} {:<12} {:<14} {:<10}",
        "NAME".bold(),
        "PATRON STATUS".bold(),
        "PATRON TYPE".bold(),
        "ITEM STATUS".bold(),
        "ITEM TYPE".bold()
    );
    for policy in policies {
        println!(
            "{:<24} {:<14} {:<12} {:<14} {:<10}",
            policy.name, policy.patron_status, policy.patron_type, policy.item_status, policy.item_type
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_appends_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circulation-config.yaml");

        create(&path, PolicyDefinition::new("Staff books", "ACTIVE", "STAFF", "AVAILABLE", "BOOK")).unwrap();
        create(&path, PolicyDefinition::new("Staff dvds", "ACTIVE", "STAFF", "AVAILABLE", "DVD")).unwrap();

        let manifest = CirculationConfigManifest::from_yaml_file(&path).unwrap();
        let names: Vec<_> = manifest.spec.policies.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Staff books", "Staff dvds"]);
    }

    #[test]
    fn test_duplicate_name_leaves_file_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circulation-config.yaml");
        create(&path, PolicyDefinition::new("Staff books", "ACTIVE", "STAFF", "AVAILABLE", "BOOK")).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let result = create(&path, PolicyDefinition::new(" Staff   books", "ACTIVE", "PUBLIC", "AVAILABLE", "BOOK"));

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_invalid_policy_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circulation-config.yaml");

        let result = create(&path, PolicyDefinition::new("Broken", "ACTIVE", "STAFF", "AVAILABLE", " "));

        assert!(result.is_err());
        assert!(!path.exists());
    }
}
