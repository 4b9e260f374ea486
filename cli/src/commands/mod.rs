// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the circulation CLI

pub mod catalog;
pub mod circulation;
pub mod config;
pub mod policy;

pub use self::catalog::CatalogCommand;
pub use self::config::ConfigCommand;
pub use self::policy::PolicyCommand;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::path::PathBuf;

use circulation_core::domain::config::CirculationConfigManifest;

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON output")?;
    println!("{}", rendered);
    Ok(())
}

pub(crate) fn load_config(config_override: Option<PathBuf>) -> Result<CirculationConfigManifest> {
    CirculationConfigManifest::load_or_default(config_override).context("Failed to load configuration")
}
