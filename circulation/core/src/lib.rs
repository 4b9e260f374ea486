// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `circulation-core` - Library Circulation Transactions
//!
//! Checkout, return and renewal of catalog items, gated by a registrable
//! permission-policy engine.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Patron`, `Item`, `Loan`, `Policy`, `CatalogClient` contract, configuration |
//! | [`application`] | Application | `PolicyEngine`, `TransactionOrchestrator`, `RequestContext`, administration services |
//! | [`infrastructure`] | Infrastructure | policy store, event bus, HTTP and in-memory catalog adapters |
//!
//! The catalog (patrons, items, loans) is an external system of record; this
//! crate only talks to it through [`domain::catalog::CatalogClient`].

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
