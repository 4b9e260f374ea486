// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Transaction Orchestrator
//!
//! Checkout, return and renewal workflows over the catalog.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Sequence dependent catalog calls for one circulation
//!   transaction and gate checkouts through the [`PolicyEngine`]
//! - **Collaborators:**
//!   - Domain: Patron, Item, Loan, CatalogClient, Clock
//!   - Application: PolicyEngine, RequestContext
//!   - Infrastructure: EventBus
//!
//! # Workflow Steps
//!
//! ```text
//! checkout: get_patron → get_item → evaluate → create_loan → update_item(on loan)
//! return:   get_loan → delete_loan → get_item → update_item(available)
//! renew:    get_patron → get_loan → update_loan(new due date)
//! ```
//!
//! Every step awaits the previous one. The first failure ends the workflow
//! and nothing already written to the catalog is undone, so a caller retrying
//! a failed workflow may find a loan without its item update (checkout) or a
//! deleted loan whose item is still on loan (return).
//!
//! Renewal does not re-evaluate loan policies.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::application::policy_engine::PolicyEngine;
use crate::application::request_context::{RequestContext, WorkflowKind};
use crate::domain::catalog::{CatalogClient, CatalogOperation, CatalogScope};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::config::OrchestratorConfig;
use crate::domain::errors::{CirculationError, EntityKind};
use crate::domain::events::CirculationEvent;
use crate::domain::ids::{ItemId, LoanId, PatronId};
use crate::domain::item::{Item, ItemStatus};
use crate::domain::loan::{default_loan_period, Loan};
use crate::domain::patron::Patron;
use crate::infrastructure::event_bus::EventBus;

/// Timing and status values used by the workflows.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub call_timeout: Duration,
    pub loan_period: TimeDelta,
    pub on_loan_status: ItemStatus,
    pub available_status: ItemStatus,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            loan_period: default_loan_period(),
            on_loan_status: ItemStatus::on_loan(),
            available_status: ItemStatus::available(),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &OrchestratorConfig) -> anyhow::Result<Self> {
        Ok(Self {
            call_timeout: config.call_timeout,
            loan_period: TimeDelta::from_std(config.loan_period)?,
            on_loan_status: config.on_loan_status.clone(),
            available_status: config.available_status.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutcome {
    pub request_id: Uuid,
    pub loan: Loan,
    pub item: Item,
    pub matched_policies: Vec<String>,
}

impl CheckoutOutcome {
    pub fn loan_id(&self) -> Option<&LoanId> {
        self.loan.id.as_ref()
    }

    /// Description of the status the item was moved to.
    pub fn item_status(&self) -> &str {
        &self.item.status.description
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnOutcome {
    pub request_id: Uuid,
    pub loan_id: LoanId,
    pub item: Item,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewOutcome {
    pub request_id: Uuid,
    pub loan: Loan,
    pub previous_due_date: DateTime<Utc>,
}

pub struct TransactionOrchestrator {
    catalog: Arc<dyn CatalogClient>,
    engine: PolicyEngine,
    event_bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    settings: OrchestratorSettings,
}

impl TransactionOrchestrator {
    pub fn new(catalog: Arc<dyn CatalogClient>, engine: PolicyEngine, event_bus: Arc<EventBus>) -> Self {
        Self {
            catalog,
            engine,
            event_bus,
            clock: Arc::new(SystemClock),
            settings: OrchestratorSettings::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub async fn checkout(
        &self,
        scope: &CatalogScope,
        patron_id: &PatronId,
        item_id: &ItemId,
    ) -> Result<CheckoutOutcome, CirculationError> {
        self.checkout_with_cancellation(scope, patron_id, item_id, CancellationToken::new())
            .await
    }

    pub async fn checkout_with_cancellation(
        &self,
        scope: &CatalogScope,
        patron_id: &PatronId,
        item_id: &ItemId,
        cancellation: CancellationToken,
    ) -> Result<CheckoutOutcome, CirculationError> {
        let mut ctx = self.context(WorkflowKind::Checkout, scope, cancellation);
        ctx.patron_id = Some(patron_id.clone());
        ctx.item_id = Some(item_id.clone());

        let span = info_span!("checkout", request_id = %ctx.request_id, %patron_id, %item_id);
        let result = self
            .run_checkout(&mut ctx, patron_id, item_id)
            .instrument(span)
            .await;
        self.finish(&ctx, result)
    }

    pub async fn return_item(
        &self,
        scope: &CatalogScope,
        patron_id: &PatronId,
        loan_id: &LoanId,
    ) -> Result<ReturnOutcome, CirculationError> {
        self.return_item_with_cancellation(scope, patron_id, loan_id, CancellationToken::new())
            .await
    }

    pub async fn return_item_with_cancellation(
        &self,
        scope: &CatalogScope,
        patron_id: &PatronId,
        loan_id: &LoanId,
        cancellation: CancellationToken,
    ) -> Result<ReturnOutcome, CirculationError> {
        let mut ctx = self.context(WorkflowKind::Return, scope, cancellation);
        ctx.patron_id = Some(patron_id.clone());
        ctx.loan_id = Some(loan_id.clone());

        let span = info_span!("return", request_id = %ctx.request_id, %patron_id, %loan_id);
        let result = self
            .run_return(&mut ctx, patron_id, loan_id)
            .instrument(span)
            .await;
        self.finish(&ctx, result)
    }

    pub async fn renew(
        &self,
        scope: &CatalogScope,
        patron_id: &PatronId,
        loan_id: &LoanId,
    ) -> Result<RenewOutcome, CirculationError> {
        self.renew_with_cancellation(scope, patron_id, loan_id, CancellationToken::new())
            .await
    }

    pub async fn renew_with_cancellation(
        &self,
        scope: &CatalogScope,
        patron_id: &PatronId,
        loan_id: &LoanId,
        cancellation: CancellationToken,
    ) -> Result<RenewOutcome, CirculationError> {
        let mut ctx = self.context(WorkflowKind::Renew, scope, cancellation);
        ctx.patron_id = Some(patron_id.clone());
        ctx.loan_id = Some(loan_id.clone());

        let span = info_span!("renew", request_id = %ctx.request_id, %patron_id, %loan_id);
        let result = self
            .run_renew(&mut ctx, patron_id, loan_id)
            .instrument(span)
            .await;
        self.finish(&ctx, result)
    }

    fn context(&self, workflow: WorkflowKind, scope: &CatalogScope, cancellation: CancellationToken) -> RequestContext {
        RequestContext::new(workflow, scope.clone(), self.settings.call_timeout, cancellation)
    }

    async fn run_checkout(
        &self,
        ctx: &mut RequestContext,
        patron_id: &PatronId,
        item_id: &ItemId,
    ) -> Result<CheckoutOutcome, CirculationError> {
        require_id("patron", patron_id.is_blank())?;
        require_id("item", item_id.is_blank())?;

        // Step 1-2: snapshots
        let patron = self.fetch_patron(ctx, patron_id).await?;
        ctx.patron = Some(patron);

        let item = self.fetch_item(ctx, item_id).await?;
        ctx.item = Some(item);

        // Step 3-4: permission
        let decision = self.engine.evaluate(ctx.patron()?, ctx.item()?);
        if !decision.is_permitted() {
            info!("Checkout denied: no policy permits this patron/item combination");
            self.event_bus.publish(CirculationEvent::CheckoutDenied {
                request_id: ctx.request_id,
                patron_id: patron_id.clone(),
                item_id: item_id.clone(),
                denied_at: self.clock.now(),
            });
            return Err(CirculationError::PermissionDenied {
                patron_id: patron_id.clone(),
                item_id: item_id.clone(),
            });
        }

        // Step 5: loan
        let draft = Loan::open(patron_id, ctx.item()?, self.clock.now(), self.settings.loan_period);
        let created = ctx
            .call(
                CatalogOperation::CreateLoan,
                self.catalog.create_loan(&ctx.scope, patron_id, &draft),
            )
            .await?;
        info!(loan_id = ?created.id, due_date = %created.due_date, "Created loan");

        self.event_bus.publish(CirculationEvent::LoanCreated {
            request_id: ctx.request_id,
            loan_id: created.id.clone(),
            patron_id: patron_id.clone(),
            item_id: item_id.clone(),
            due_date: created.due_date,
            created_at: self.clock.now(),
        });
        ctx.loan_id = created.id.clone();
        ctx.loan = Some(created);

        // Step 6: item status
        let updated = ctx.item()?.clone().with_status(self.settings.on_loan_status.clone());
        ctx.call(
            CatalogOperation::UpdateItem,
            self.catalog.update_item(&ctx.scope, &updated.id, &updated),
        )
        .await?;
        info!(status = %updated.status.value, "Updated item status");
        ctx.item = Some(updated);

        Ok(CheckoutOutcome {
            request_id: ctx.request_id,
            loan: ctx.loan()?.clone(),
            item: ctx.item()?.clone(),
            matched_policies: decision.matched_policies().to_vec(),
        })
    }

    async fn run_return(
        &self,
        ctx: &mut RequestContext,
        patron_id: &PatronId,
        loan_id: &LoanId,
    ) -> Result<ReturnOutcome, CirculationError> {
        require_id("patron", patron_id.is_blank())?;
        require_id("loan", loan_id.is_blank())?;

        // Step 1: loan
        let loan = self.fetch_loan(ctx, patron_id, loan_id).await?;
        let item_id = loan.item_id.clone();
        ctx.item_id = Some(item_id.clone());
        ctx.loan = Some(loan);

        // Step 2: delete
        ctx.call(
            CatalogOperation::DeleteLoan,
            self.catalog.delete_loan(&ctx.scope, patron_id, loan_id),
        )
        .await?;
        info!(%item_id, "Deleted loan");

        // Step 3: item (loan is already gone if this fails)
        let item = self.fetch_item(ctx, &item_id).await?;
        ctx.item = Some(item);

        // Step 4: item status
        let updated = ctx.item()?.clone().with_status(self.settings.available_status.clone());
        ctx.call(
            CatalogOperation::UpdateItem,
            self.catalog.update_item(&ctx.scope, &updated.id, &updated),
        )
        .await?;
        info!(%item_id, status = %updated.status.value, "Updated item status");
        ctx.item = Some(updated);

        self.event_bus.publish(CirculationEvent::ItemReturned {
            request_id: ctx.request_id,
            loan_id: loan_id.clone(),
            patron_id: patron_id.clone(),
            item_id,
            returned_at: self.clock.now(),
        });

        Ok(ReturnOutcome {
            request_id: ctx.request_id,
            loan_id: loan_id.clone(),
            item: ctx.item()?.clone(),
        })
    }

    async fn run_renew(
        &self,
        ctx: &mut RequestContext,
        patron_id: &PatronId,
        loan_id: &LoanId,
    ) -> Result<RenewOutcome, CirculationError> {
        require_id("patron", patron_id.is_blank())?;
        require_id("loan", loan_id.is_blank())?;

        // Step 1-2: snapshots
        let patron = self.fetch_patron(ctx, patron_id).await?;
        ctx.patron = Some(patron);

        let loan = self.fetch_loan(ctx, patron_id, loan_id).await?;
        ctx.item_id = Some(loan.item_id.clone());
        ctx.loan = Some(loan);

        // Step 3: due date
        let previous_due_date = ctx.loan()?.due_date;
        let renewed = ctx.loan()?.clone().renewed(self.clock.now(), self.settings.loan_period);

        ctx.call(
            CatalogOperation::UpdateLoan,
            self.catalog.update_loan(&ctx.scope, patron_id, loan_id, &renewed),
        )
        .await?;
        info!(%previous_due_date, due_date = %renewed.due_date, "Renewed loan");

        self.event_bus.publish(CirculationEvent::LoanRenewed {
            request_id: ctx.request_id,
            loan_id: loan_id.clone(),
            patron_id: patron_id.clone(),
            due_date: renewed.due_date,
            renewed_at: self.clock.now(),
        });
        ctx.loan = Some(renewed);

        Ok(RenewOutcome {
            request_id: ctx.request_id,
            loan: ctx.loan()?.clone(),
            previous_due_date,
        })
    }

    async fn fetch_patron(&self, ctx: &RequestContext, id: &PatronId) -> Result<Patron, CirculationError> {
        let patron = ctx
            .call(CatalogOperation::GetPatron, self.catalog.get_patron(&ctx.scope, id))
            .await?
            .ok_or_else(|| CirculationError::not_found(EntityKind::Patron, id))?;
        debug!(status = %patron.status, patron_type = %patron.patron_type, "Fetched patron");
        Ok(patron)
    }

    async fn fetch_item(&self, ctx: &RequestContext, id: &ItemId) -> Result<Item, CirculationError> {
        let item = ctx
            .call(CatalogOperation::GetItem, self.catalog.get_item(&ctx.scope, id))
            .await?
            .ok_or_else(|| CirculationError::not_found(EntityKind::Item, id))?;
        debug!(item_id = %item.id, status = %item.status.value, item_type = %item.item_type, "Fetched item");
        Ok(item)
    }

    async fn fetch_loan(
        &self,
        ctx: &RequestContext,
        patron_id: &PatronId,
        loan_id: &LoanId,
    ) -> Result<Loan, CirculationError> {
        let loan = ctx
            .call(
                CatalogOperation::GetLoan,
                self.catalog.get_loan(&ctx.scope, patron_id, loan_id),
            )
            .await?
            .ok_or_else(|| CirculationError::not_found(EntityKind::Loan, loan_id))?;
        // A loan held by someone else is reported as missing.
        if loan.patron_id != *patron_id {
            warn!(owner = %loan.patron_id, "Loan belongs to another patron");
            return Err(CirculationError::not_found(EntityKind::Loan, loan_id));
        }
        debug!(item_id = %loan.item_id, due_date = %loan.due_date, "Fetched loan");
        Ok(loan)
    }

    fn finish<T>(
        &self,
        ctx: &RequestContext,
        result: Result<T, CirculationError>,
    ) -> Result<T, CirculationError> {
        let workflow = ctx.workflow.as_str();
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };

        metrics::counter!("circulation_workflows_total", "workflow" => workflow, "outcome" => outcome).increment(1);
        metrics::histogram!("circulation_workflow_duration_seconds", "workflow" => workflow)
            .record(ctx.started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            warn!(request_id = %ctx.request_id, workflow, error = %e, "Workflow failed");
            if !matches!(e, CirculationError::PermissionDenied { .. }) {
                self.event_bus.publish(CirculationEvent::WorkflowFailed {
                    request_id: ctx.request_id,
                    workflow: workflow.to_string(),
                    error_kind: e.kind().to_string(),
                    message: e.to_string(),
                    failed_at: self.clock.now(),
                });
            }
        }

        result
    }
}

fn require_id(entity: &str, blank: bool) -> Result<(), CirculationError> {
    if blank {
        return Err(CirculationError::Validation(format!("{} id must not be empty", entity)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{CatalogError, Credential};
    use crate::domain::clock::FixedClock;
    use crate::domain::loan::LOAN_PERIOD_SECS;
    use crate::domain::policy::{PolicyDefinition, PolicyStore};
    use crate::infrastructure::catalog::InMemoryCatalogClient;
    use crate::infrastructure::policy_store::InMemoryPolicyStore;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn scope() -> CatalogScope {
        CatalogScope::new("hbz", Credential::new("aaaaa"))
    }

    struct Fixture {
        catalog: Arc<InMemoryCatalogClient>,
        store: Arc<InMemoryPolicyStore>,
        bus: Arc<EventBus>,
        orchestrator: TransactionOrchestrator,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(InMemoryCatalogClient::new());
        let store = Arc::new(InMemoryPolicyStore::new());
        let bus = Arc::new(EventBus::new(64));
        let orchestrator = TransactionOrchestrator::new(catalog.clone(), PolicyEngine::new(store.clone()), bus.clone())
            .with_clock(Arc::new(FixedClock(now())));

        catalog.insert_patron(Patron::new("p-1", "ACTIVE", "STAFF"));
        catalog.insert_item(Item::new("i-1", "0001", "BOOK", ItemStatus::available()));

        Fixture { catalog, store, bus, orchestrator }
    }

    fn permit_staff_books(store: &InMemoryPolicyStore) {
        store
            .add(PolicyDefinition::new("Staff books", "ACTIVE", "STAFF", "AVAILABLE", "BOOK"))
            .unwrap();
    }

    #[tokio::test]
    async fn test_blank_ids_fail_validation_without_calls() {
        let f = fixture();
        let err = f
            .orchestrator
            .checkout(&scope(), &PatronId::new(" "), &ItemId::new("i-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, CirculationError::Validation(_)));
        assert_eq!(f.catalog.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_checkout_takes_loan_window_from_clock() {
        let f = fixture();
        permit_staff_books(&f.store);

        let outcome = f
            .orchestrator
            .checkout(&scope(), &PatronId::new("p-1"), &ItemId::new("i-1"))
            .await
            .unwrap();

        assert_eq!(outcome.loan.loan_date, now());
        assert_eq!(outcome.loan.due_date, now() + TimeDelta::seconds(LOAN_PERIOD_SECS));
        assert_eq!(outcome.item_status(), "ITEM_STATUS_ON_LOAN");
        assert_eq!(outcome.matched_policies, ["Staff books".to_string()]);
        assert!(outcome.loan_id().is_some());
    }

    #[tokio::test]
    async fn test_missing_patron_stops_before_item_lookup() {
        let f = fixture();
        let err = f
            .orchestrator
            .checkout(&scope(), &PatronId::new("p-404"), &ItemId::new("i-1"))
            .await
            .unwrap_err();

        assert_eq!(err, CirculationError::not_found(EntityKind::Patron, "p-404"));
        assert_eq!(f.catalog.calls(CatalogOperation::GetItem), 0);
    }

    #[tokio::test]
    async fn test_failed_item_update_keeps_created_loan() {
        let f = fixture();
        permit_staff_books(&f.store);
        f.catalog
            .fail_on(CatalogOperation::UpdateItem, CatalogError::UnexpectedStatus { status: 500 });

        let err = f
            .orchestrator
            .checkout(&scope(), &PatronId::new("p-1"), &ItemId::new("i-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, CirculationError::Remote { operation: CatalogOperation::UpdateItem, .. }));
        assert_eq!(f.catalog.loans_of(&PatronId::new("p-1")).len(), 1);
        assert_eq!(f.catalog.calls(CatalogOperation::DeleteLoan), 0);
    }

    #[tokio::test]
    async fn test_return_with_missing_item_leaves_loan_deleted() {
        let f = fixture();
        let mut orphan = Loan::open(
            &PatronId::new("p-1"),
            &Item::new("i-gone", "", "BOOK", ItemStatus::on_loan()),
            now(),
            default_loan_period(),
        );
        orphan.id = Some(LoanId::new("l-1"));
        f.catalog.insert_loan(orphan);

        let err = f
            .orchestrator
            .return_item(&scope(), &PatronId::new("p-1"), &LoanId::new("l-1"))
            .await
            .unwrap_err();

        assert_eq!(err, CirculationError::not_found(EntityKind::Item, "i-gone"));
        assert!(f.catalog.loans_of(&PatronId::new("p-1")).is_empty());
    }

    #[tokio::test]
    async fn test_failure_publishes_workflow_failed() {
        let f = fixture();
        let mut events = f.bus.subscribe();

        let _ = f
            .orchestrator
            .renew(&scope(), &PatronId::new("p-1"), &LoanId::new("l-404"))
            .await;

        match events.recv().await.unwrap() {
            CirculationEvent::WorkflowFailed { workflow, error_kind, .. } => {
                assert_eq!(workflow, "renew");
                assert_eq!(error_kind, "not_found");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_denied_checkout_publishes_denial_only() {
        let f = fixture();
        let mut events = f.bus.subscribe();

        let err = f
            .orchestrator
            .checkout(&scope(), &PatronId::new("p-1"), &ItemId::new("i-1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "permission_denied");

        assert!(matches!(events.try_recv(), Ok(CirculationEvent::CheckoutDenied { .. })));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_settings_from_config() {
        let settings = OrchestratorSettings::from_config(&OrchestratorConfig::default()).unwrap();
        assert_eq!(settings.loan_period, default_loan_period());
        assert_eq!(settings.call_timeout, Duration::from_secs(10));
    }
}
