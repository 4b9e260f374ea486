// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Circulation CLI
//!
//! The `circulation` binary runs library circulation transactions against a
//! remote catalog.
//!
//! ## Commands
//!
//! - `circulation policy create|list` - Loan policy management
//! - `circulation checkout|return|renew|loans` - Circulation workflows
//! - `circulation catalog patrons|items|create-*|delete-*` - Catalog records
//! - `circulation config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;

use circulation_cli::commands::circulation::{parse_id, CirculationAction};
use circulation_cli::commands::{self, CatalogCommand, ConfigCommand, OutputFormat, PolicyCommand};
use circulation_core::domain::config::CirculationConfigManifest;

/// Library circulation - checkout, return and renewal against a remote catalog
#[derive(Parser)]
#[command(name = "circulation")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "CIRCULATION_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CIRCULATION_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, global = true, env = "CIRCULATION_LOG_FORMAT")]
    log_format: Option<String>,

    /// Output format for command results
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Print the run's Prometheus metrics to stderr on exit
    #[arg(long, global = true, env = "CIRCULATION_METRICS")]
    metrics: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Loan policy management
    #[command(name = "policy")]
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },

    /// Lend an item to a patron
    #[command(name = "checkout")]
    Checkout {
        /// Patron id
        patron: String,
        /// Item id
        item: String,
    },

    /// Close a loan and make its item available again
    #[command(name = "return")]
    Return {
        /// Patron id
        patron: String,
        /// Loan id
        loan: String,
    },

    /// Extend a loan by one loan period
    #[command(name = "renew")]
    Renew {
        /// Patron id
        patron: String,
        /// Loan id
        loan: String,
    },

    /// List a patron's open loans
    #[command(name = "loans")]
    Loans {
        /// Patron id
        patron: String,
    },

    /// Catalog record management
    #[command(name = "catalog")]
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let (level, format) = logging_settings(&cli);
    init_logging(&level, &format)?;

    let metrics = if cli.metrics {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install metrics recorder")?;
        Some(handle)
    } else {
        None
    };

    let result = dispatch(cli.command, cli.config, cli.output).await;

    if let Some(handle) = metrics {
        eprint!("{}", handle.render());
    }
    result
}

async fn dispatch(command: Option<Commands>, config: Option<PathBuf>, output: OutputFormat) -> Result<()> {
    match command {
        Some(Commands::Policy { command }) => commands::policy::handle_command(command, config, output).await,
        Some(Commands::Checkout { patron, item }) => {
            let action = CirculationAction::Checkout {
                patron: parse_id(patron, "patron")?,
                item: parse_id(item, "item")?,
            };
            commands::circulation::handle_command(action, config, output).await
        }
        Some(Commands::Return { patron, loan }) => {
            let action = CirculationAction::Return {
                patron: parse_id(patron, "patron")?,
                loan: parse_id(loan, "loan")?,
            };
            commands::circulation::handle_command(action, config, output).await
        }
        Some(Commands::Renew { patron, loan }) => {
            let action = CirculationAction::Renew {
                patron: parse_id(patron, "patron")?,
                loan: parse_id(loan, "loan")?,
            };
            commands::circulation::handle_command(action, config, output).await
        }
        Some(Commands::Loans { patron }) => {
            let action = CirculationAction::Loans {
                patron: parse_id(patron, "patron")?,
            };
            commands::circulation::handle_command(action, config, output).await
        }
        Some(Commands::Catalog { command }) => commands::catalog::handle_command(command, config, output).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, config, output).await,
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Flags win over the `observability.logging` section of the config file.
fn logging_settings(cli: &Cli) -> (String, String) {
    let path = cli
        .config
        .clone()
        .or_else(CirculationConfigManifest::discover_config);
    let configured = path
        .and_then(|p| CirculationConfigManifest::from_yaml_file(p).ok())
        .and_then(|m| m.spec.observability)
        .and_then(|o| o.logging);

    let level = cli
        .log_level
        .clone()
        .or_else(|| configured.as_ref().map(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let format = cli
        .log_format
        .clone()
        .or_else(|| configured.map(|l| l.format))
        .unwrap_or_else(|| "text".to_string());
    (level, format)
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
