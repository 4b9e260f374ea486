// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use circulation_core::domain::config::{CirculationConfigManifest, LoggingConfig, ObservabilityConfig};
use circulation_core::domain::policy::PolicyDefinition;

use super::{load_config, print_json, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./circulation-config.yaml)
        #[arg(short, long, default_value = "./circulation-config.yaml")]
        output: PathBuf,

        /// Include a sample policy and logging section
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
    output: OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths, output),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(&output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool, output: OutputFormat) -> Result<()> {
    let config = load_config(config_override.clone())?;

    if output == OutputFormat::Json {
        return print_json(&config);
    }

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. CIRCULATION_CONFIG_PATH: {}",
            std::env::var("CIRCULATION_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./circulation-config.yaml");
        println!("  4. ~/.circulation/config.yaml");
        println!("  5. /etc/circulation/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    let catalog = &config.spec.catalog;
    println!("{}", "Catalog:".bold());
    println!("  Endpoint: {}", catalog.endpoint);
    println!("  Patrons path: {}", catalog.patrons_path);
    println!("  Items path: {}", catalog.items_path);
    println!("  Tenant: {}", catalog.tenant);
    println!(
        "  Credential: {}",
        match &catalog.credential {
            Some(value) if value.starts_with("env:") => value.as_str(),
            Some(_) => "(set)",
            None => "(not set)",
        }
    );
    println!("  Connect timeout: {:?}", catalog.connect_timeout);
    println!();

    let orchestrator = &config.spec.orchestrator;
    println!("{}", "Orchestrator:".bold());
    println!("  Call timeout: {:?}", orchestrator.call_timeout);
    println!("  Loan period: {:?}", orchestrator.loan_period);
    println!(
        "  Item status on checkout: {} ({})",
        orchestrator.on_loan_status.value, orchestrator.on_loan_status.description
    );
    println!(
        "  Item status on return: {} ({})",
        orchestrator.available_status.value, orchestrator.available_status.description
    );
    println!();

    println!("{}", "Policies:".bold());
    if config.spec.policies.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for policy in &config.spec.policies {
        println!(
            "  {} → {}/{} borrowing {}/{}",
            policy.name.bold(),
            policy.patron_status,
            policy.patron_type,
            policy.item_status,
            policy.item_type
        );
    }
    println!();

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = load_config(config_path)?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

/// Manifest written by `config generate`.
pub fn sample_manifest(with_examples: bool) -> CirculationConfigManifest {
    let mut manifest = CirculationConfigManifest::default();
    if with_examples {
        manifest.spec.catalog.credential = Some("env:CIRCULATION_CATALOG_TOKEN".to_string());
        manifest.spec.policies = vec![
            PolicyDefinition::new("Staff books", "ACTIVE", "STAFF", "AVAILABLE", "BOOK"),
            PolicyDefinition::new("Public books", "ACTIVE", "PUBLIC", "AVAILABLE", "BOOK"),
        ];
        manifest.spec.observability = Some(ObservabilityConfig {
            logging: Some(LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            }),
        });
    }
    manifest
}

fn generate(output: &Path, with_examples: bool) -> Result<()> {
    sample_manifest(with_examples)
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
