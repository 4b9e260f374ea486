// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Catalog record commands
//!
//! Commands: patrons, items, create-patron, create-item, delete-patron, delete-item

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use circulation_core::domain::ids::{ItemId, PatronId};
use circulation_core::domain::item::Item;
use circulation_core::domain::patron::Patron;

use super::circulation::parse_id;
use super::{load_config, print_json, OutputFormat};
use crate::runtime::CirculationRuntime;

#[derive(Subcommand)]
pub enum CatalogCommand {
    /// List patrons
    Patrons,

    /// List items
    Items,

    /// Create a patron from a JSON document
    #[command(name = "create-patron")]
    CreatePatron {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Create an item from a JSON document
    #[command(name = "create-item")]
    CreateItem {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Delete a patron without open loans
    #[command(name = "delete-patron")]
    DeletePatron { id: String },

    /// Delete an item
    #[command(name = "delete-item")]
    DeleteItem { id: String },
}

pub async fn handle_command(
    command: CatalogCommand,
    config_override: Option<PathBuf>,
    output: OutputFormat,
) -> Result<()> {
    let manifest = load_config(config_override)?;
    let runtime = CirculationRuntime::from_config(&manifest)?;
    run(&runtime, command, output).await
}

pub async fn run(runtime: &CirculationRuntime, command: CatalogCommand, output: OutputFormat) -> Result<()> {
    let scope = &runtime.scope;
    let admin = &runtime.catalog;

    match command {
        CatalogCommand::Patrons => {
            let patrons = admin.list_patrons(scope).await.context("Failed to list patrons")?;
            match output {
                OutputFormat::Json => print_json(&patrons)?,
                OutputFormat::Text => print_patrons(&patrons),
            }
        }
        CatalogCommand::Items => {
            let items = admin.list_items(scope).await.context("Failed to list items")?;
            match output {
                OutputFormat::Json => print_json(&items)?,
                OutputFormat::Text => print_items(&items),
            }
        }
        CatalogCommand::CreatePatron { file } => {
            let record = read_record(&file)?;
            admin
                .create_patron(scope, &record)
                .await
                .context("Failed to create patron")?;
            println!("{}", "✓ Patron created".green());
        }
        CatalogCommand::CreateItem { file } => {
            let record = read_record(&file)?;
            admin
                .create_item(scope, &record)
                .await
                .context("Failed to create item")?;
            println!("{}", "✓ Item created".green());
        }
        CatalogCommand::DeletePatron { id } => {
            let id: PatronId = parse_id(id, "patron")?;
            admin
                .delete_patron(scope, &id)
                .await
                .with_context(|| format!("Failed to delete patron {}", id))?;
            println!("{}", format!("✓ Patron {} deleted", id).green());
        }
        CatalogCommand::DeleteItem { id } => {
            let id: ItemId = parse_id(id, "item")?;
            admin
                .delete_item(scope, &id)
                .await
                .with_context(|| format!("Failed to delete item {}", id))?;
            println!("{}", format!("✓ Item {} deleted", id).green());
        }
    }

    Ok(())
}

fn read_record(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let record: Value =
        serde_json::from_str(&content).with_context(|| format!("{:?} is not valid JSON", path))?;
    if !record.is_object() {
        anyhow::bail!("{:?} must contain a JSON object", path);
    }
    Ok(record)
}

fn print_patrons(patrons: &[Patron]) {
    println!("{:<38} {:<12} {:<12}", "ID".bold(), "STATUS".bold(), "TYPE".bold());
    for patron in patrons {
        println!("{:<38} {:<12} {:<12}", patron.id, patron.status, patron.patron_type);
    }
}

fn print_items(items: &[Item]) {
    println!(
        "{:<38} {:<12} {:<10} {:<12}",
        "ID".bold(),
        "BARCODE".bold(),
        "TYPE".bold(),
        "STATUS".bold()
    );
    for item in items {
        println!(
            "{:<38} {:<12} {:<10} {:<12}",
            item.id, item.barcode, item.item_type, item.status.value
        );
    }
}
