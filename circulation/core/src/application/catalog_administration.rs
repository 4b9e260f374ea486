// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Catalog Administration
//!
//! Listing and maintenance calls that sit next to the circulation workflows:
//! a patron's open loans, patron/item creation and deletion. Each call gets
//! the same deadline and error mapping as a workflow step.
//!
//! Deleting a patron is refused while the patron still has open loans.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::request_context::{RequestContext, WorkflowKind};
use crate::domain::catalog::{CatalogClient, CatalogOperation, CatalogScope};
use crate::domain::errors::CirculationError;
use crate::domain::ids::{ItemId, PatronId};
use crate::domain::item::Item;
use crate::domain::loan::Loan;
use crate::domain::patron::Patron;

pub struct CatalogAdministration {
    catalog: Arc<dyn CatalogClient>,
    call_timeout: Duration,
}

impl CatalogAdministration {
    pub fn new(catalog: Arc<dyn CatalogClient>, call_timeout: Duration) -> Self {
        Self { catalog, call_timeout }
    }

    fn context(&self, workflow: WorkflowKind, scope: &CatalogScope) -> RequestContext {
        RequestContext::new(workflow, scope.clone(), self.call_timeout, CancellationToken::new())
    }

    /// Open loans of one patron; empty when there are none.
    pub async fn loans_for_patron(&self, scope: &CatalogScope, patron_id: &PatronId) -> Result<Vec<Loan>, CirculationError> {
        if patron_id.is_blank() {
            return Err(CirculationError::Validation("patron id must not be empty".to_string()));
        }
        let ctx = self.context(WorkflowKind::ListLoans, scope);
        let loans = ctx
            .call(CatalogOperation::ListLoans, self.catalog.list_loans(&ctx.scope, patron_id))
            .await?;
        Ok(loans)
    }

    pub async fn list_patrons(&self, scope: &CatalogScope) -> Result<Vec<Patron>, CirculationError> {
        let ctx = self.context(WorkflowKind::Administration, scope);
        let patrons = ctx
            .call(CatalogOperation::ListPatrons, self.catalog.list_patrons(&ctx.scope))
            .await?;
        Ok(patrons)
    }

    pub async fn list_items(&self, scope: &CatalogScope) -> Result<Vec<Item>, CirculationError> {
        let ctx = self.context(WorkflowKind::Administration, scope);
        let items = ctx
            .call(CatalogOperation::ListItems, self.catalog.list_items(&ctx.scope))
            .await?;
        Ok(items)
    }

    pub async fn create_patron(&self, scope: &CatalogScope, raw: &Value) -> Result<(), CirculationError> {
        let ctx = self.context(WorkflowKind::Administration, scope);
        ctx.call(CatalogOperation::CreatePatron, self.catalog.create_patron(&ctx.scope, raw))
            .await?;
        info!(request_id = %ctx.request_id, "Patron created");
        Ok(())
    }

    pub async fn create_item(&self, scope: &CatalogScope, raw: &Value) -> Result<(), CirculationError> {
        let ctx = self.context(WorkflowKind::Administration, scope);
        ctx.call(CatalogOperation::CreateItem, self.catalog.create_item(&ctx.scope, raw))
            .await?;
        info!(request_id = %ctx.request_id, "Item created");
        Ok(())
    }

    /// Delete a patron that has no open loans.
    pub async fn delete_patron(&self, scope: &CatalogScope, patron_id: &PatronId) -> Result<(), CirculationError> {
        if patron_id.is_blank() {
            return Err(CirculationError::Validation("patron id must not be empty".to_string()));
        }
        let ctx = self.context(WorkflowKind::Administration, scope);

        let open = ctx
            .call(CatalogOperation::ListLoans, self.catalog.list_loans(&ctx.scope, patron_id))
            .await?;
        if !open.is_empty() {
            warn!(%patron_id, open_loans = open.len(), "Refusing to delete patron with open loans");
            return Err(CirculationError::Validation(format!(
                "patron {} still has {} open loan(s); return the items first",
                patron_id,
                open.len()
            )));
        }

        ctx.call(CatalogOperation::DeletePatron, self.catalog.delete_patron(&ctx.scope, patron_id))
            .await?;
        info!(%patron_id, "Patron deleted");
        Ok(())
    }

    pub async fn delete_item(&self, scope: &CatalogScope, item_id: &ItemId) -> Result<(), CirculationError> {
        if item_id.is_blank() {
            return Err(CirculationError::Validation("item id must not be empty".to_string()));
        }
        let ctx = self.context(WorkflowKind::Administration, scope);
        ctx.call(CatalogOperation::DeleteItem, self.catalog.delete_item(&ctx.scope, item_id))
            .await?;
        info!(%item_id, "Item deleted");
        Ok(())
    }
}
