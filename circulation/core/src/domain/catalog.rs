// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Catalog Client Contract
//!
//! The catalog is the external system of record for patrons, items and
//! loans. The core reaches it only through [`CatalogClient`]; adapters live in
//! `crate::infrastructure::catalog`.
//!
//! | Implementation | Use |
//! |----------------|-----|
//! | `HttpCatalogClient` | legacy REST catalog (production) |
//! | `InMemoryCatalogClient` | tests, demos, call recording |
//!
//! Lookups report absence as `Ok(None)`; every other failure is a
//! [`CatalogError`]. Each call carries a [`CatalogScope`] that is forwarded
//! unchanged.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use super::ids::{ItemId, LoanId, PatronId, TenantId};
use super::item::Item;
use super::loan::Loan;
use super::patron::Patron;

/// Opaque credential forwarded as the `authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Tenant and credential pair attached to every catalog call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogScope {
    pub tenant: TenantId,
    pub credential: Credential,
}

impl CatalogScope {
    pub fn new(tenant: impl Into<TenantId>, credential: Credential) -> Self {
        Self {
            tenant: tenant.into(),
            credential,
        }
    }
}

/// Names every remote call, for error context, logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogOperation {
    GetPatron,
    GetItem,
    CreateLoan,
    GetLoan,
    DeleteLoan,
    UpdateItem,
    UpdateLoan,
    ListPatrons,
    ListItems,
    ListLoans,
    CreatePatron,
    CreateItem,
    DeletePatron,
    DeleteItem,
}

impl CatalogOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetPatron => "get_patron",
            Self::GetItem => "get_item",
            Self::CreateLoan => "create_loan",
            Self::GetLoan => "get_loan",
            Self::DeleteLoan => "delete_loan",
            Self::UpdateItem => "update_item",
            Self::UpdateLoan => "update_loan",
            Self::ListPatrons => "list_patrons",
            Self::ListItems => "list_items",
            Self::ListLoans => "list_loans",
            Self::CreatePatron => "create_patron",
            Self::CreateItem => "create_item",
            Self::DeletePatron => "delete_patron",
            Self::DeleteItem => "delete_item",
        }
    }
}

impl fmt::Display for CatalogOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog-side failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog unreachable: {0}")]
    Transport(String),

    #[error("catalog answered with unexpected status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("malformed catalog response: {0}")]
    Decode(String),

    #[error("catalog rejected the request: {0}")]
    Rejected(String),

    #[error("identifier '{0}' cannot address a catalog record")]
    InvalidIdentifier(String),
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn get_patron(&self, scope: &CatalogScope, id: &PatronId) -> Result<Option<Patron>, CatalogError>;

    async fn get_item(&self, scope: &CatalogScope, id: &ItemId) -> Result<Option<Item>, CatalogError>;

    /// Persist a new loan for `patron_id`; returns the stored loan with its identifier.
    async fn create_loan(&self, scope: &CatalogScope, patron_id: &PatronId, loan: &Loan) -> Result<Loan, CatalogError>;

    async fn get_loan(&self, scope: &CatalogScope, patron_id: &PatronId, loan_id: &LoanId) -> Result<Option<Loan>, CatalogError>;

    async fn delete_loan(&self, scope: &CatalogScope, patron_id: &PatronId, loan_id: &LoanId) -> Result<(), CatalogError>;

    /// Replace the stored item record.
    async fn update_item(&self, scope: &CatalogScope, id: &ItemId, item: &Item) -> Result<(), CatalogError>;

    /// Replace the stored loan record.
    async fn update_loan(
        &self,
        scope: &CatalogScope,
        patron_id: &PatronId,
        loan_id: &LoanId,
        loan: &Loan,
    ) -> Result<(), CatalogError>;

    async fn list_patrons(&self, scope: &CatalogScope) -> Result<Vec<Patron>, CatalogError>;

    async fn list_items(&self, scope: &CatalogScope) -> Result<Vec<Item>, CatalogError>;

    /// Open loans of one patron.
    async fn list_loans(&self, scope: &CatalogScope, patron_id: &PatronId) -> Result<Vec<Loan>, CatalogError>;

    async fn create_patron(&self, scope: &CatalogScope, raw: &Value) -> Result<(), CatalogError>;

    async fn create_item(&self, scope: &CatalogScope, raw: &Value) -> Result<(), CatalogError>;

    /// Remove a patron. Does not check for open loans; callers must.
    async fn delete_patron(&self, scope: &CatalogScope, id: &PatronId) -> Result<(), CatalogError>;

    async fn delete_item(&self, scope: &CatalogScope, id: &ItemId) -> Result<(), CatalogError>;
}
