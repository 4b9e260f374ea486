// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Circulation commands
//!
//! Commands: checkout, return, renew, loans
//!
//! Each command runs one workflow against the configured catalog. Ctrl-C
//! cancels the workflow between catalog calls.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use circulation_core::domain::errors::CirculationError;
use circulation_core::domain::ids::{ItemId, LoanId, PatronId};
use circulation_core::domain::loan::Loan;

use super::{load_config, print_json, OutputFormat};
use crate::runtime::CirculationRuntime;

pub enum CirculationAction {
    Checkout { patron: PatronId, item: ItemId },
    Return { patron: PatronId, loan: LoanId },
    Renew { patron: PatronId, loan: LoanId },
    Loans { patron: PatronId },
}

pub async fn handle_command(
    action: CirculationAction,
    config_override: Option<PathBuf>,
    output: OutputFormat,
) -> Result<()> {
    let manifest = load_config(config_override)?;
    let runtime = CirculationRuntime::from_config(&manifest)?;
    let cancellation = cancel_on_ctrl_c();

    run(&runtime, action, cancellation, output).await
}

/// Token cancelled when the user presses Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling request");
            child.cancel();
        }
    });
    token
}

pub async fn run(
    runtime: &CirculationRuntime,
    action: CirculationAction,
    cancellation: CancellationToken,
    output: OutputFormat,
) -> Result<()> {
    let scope = &runtime.scope;
    let orchestrator = &runtime.orchestrator;

    match action {
        CirculationAction::Checkout { patron, item } => {
            let outcome = orchestrator
                .checkout_with_cancellation(scope, &patron, &item, cancellation)
                .await
                .map_err(describe)?;
            if output == OutputFormat::Json {
                return print_json(&outcome);
            }
            println!(
                "{}",
                format!(
                    "✓ Item {} checked out to patron {}",
                    outcome.item.id, outcome.loan.patron_id
                )
                .green()
            );
            if let Some(loan_id) = outcome.loan_id() {
                println!("  Loan: {}", loan_id);
            }
            println!("  Due: {}", outcome.loan.due_date.to_rfc3339());
            println!("  Item status: {}", outcome.item_status());
            println!("  Matched policies: {}", outcome.matched_policies.join(", "));
        }
        CirculationAction::Return { patron, loan } => {
            let outcome = orchestrator
                .return_item_with_cancellation(scope, &patron, &loan, cancellation)
                .await
                .map_err(describe)?;
            if output == OutputFormat::Json {
                return print_json(&outcome);
            }
            println!(
                "{}",
                format!("✓ Loan {} returned", outcome.loan_id).green()
            );
            println!(
                "  Item {} is now {}",
                outcome.item.id, outcome.item.status.description
            );
        }
        CirculationAction::Renew { patron, loan } => {
            let outcome = orchestrator
                .renew_with_cancellation(scope, &patron, &loan, cancellation)
                .await
                .map_err(describe)?;
            if output == OutputFormat::Json {
                return print_json(&outcome);
            }
            println!("{}", format!("✓ Loan {} renewed", loan).green());
            println!("  Previous due date: {}", outcome.previous_due_date.to_rfc3339());
            println!("  New due date: {}", outcome.loan.due_date.to_rfc3339());
        }
        CirculationAction::Loans { patron } => {
            let loans = runtime
                .catalog
                .loans_for_patron(scope, &patron)
                .await
                .map_err(describe)?;
            if output == OutputFormat::Json {
                return print_json(&loans);
            }
            print_loans(&patron, &loans);
        }
    }

    Ok(())
}

fn describe(err: CirculationError) -> anyhow::Error {
    let kind = err.kind();
    anyhow::Error::new(err).context(format!("Request failed ({})", kind))
}

fn print_loans(patron: &PatronId, loans: &[Loan]) {
    if loans.is_empty() {
        println!("{}", format!("Patron {} has no open loans.", patron).yellow());
        return;
    }

    println!(
        "{:<38} {:<20} {:<12} {:<26}",
        "LOAN".bold(),
        "ITEM".bold(),
        "BARCODE".bold(),
        "DUE".bold()
    );
    for loan in loans {
        let id = loan.id.as_ref().map(|id| id.as_str()).unwrap_or("-");
        println!(
            "{:<38} {:<20} {:<12} {:<26}",
            id,
            loan.item_id,
            loan.item_barcode.as_deref().unwrap_or("-"),
            loan.due_date.to_rfc3339()
        );
    }
}

/// Trimmed identifier given on the command line; blank values are rejected.
pub fn parse_id<T: From<String>>(value: String, what: &str) -> Result<T> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        anyhow::bail!("{} id must not be empty", what);
    }
    Ok(T::from(trimmed.to_string()))
}
