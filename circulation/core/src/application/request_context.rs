// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Per-request workflow state.
//!
//! One [`RequestContext`] is created for each checkout, return or renewal and
//! owned by that invocation alone. Entity snapshots fetched along the way are
//! stored here and nowhere else, so concurrent requests can never observe each
//! other's patrons, items or loans.
//!
//! Every catalog call goes through [`RequestContext::call`], which applies the
//! per-call deadline and aborts promptly when the request is cancelled.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::catalog::{CatalogError, CatalogOperation, CatalogScope};
use crate::domain::errors::{CirculationError, EntityKind};
use crate::domain::ids::{ItemId, LoanId, PatronId};
use crate::domain::item::Item;
use crate::domain::loan::Loan;
use crate::domain::patron::Patron;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowKind {
    Checkout,
    Return,
    Renew,
    ListLoans,
    Administration,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checkout => "checkout",
            Self::Return => "return",
            Self::Renew => "renew",
            Self::ListLoans => "list_loans",
            Self::Administration => "administration",
        }
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one in-flight workflow invocation. Deliberately not `Clone`.
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub workflow: WorkflowKind,
    pub scope: CatalogScope,
    pub started: Instant,

    pub patron_id: Option<PatronId>,
    pub item_id: Option<ItemId>,
    pub loan_id: Option<LoanId>,

    pub patron: Option<Patron>,
    pub item: Option<Item>,
    pub loan: Option<Loan>,

    call_timeout: Duration,
    cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new(
        workflow: WorkflowKind,
        scope: CatalogScope,
        call_timeout: Duration,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            workflow,
            scope,
            started: Instant::now(),
            patron_id: None,
            item_id: None,
            loan_id: None,
            patron: None,
            item: None,
            loan: None,
            call_timeout,
            cancellation,
        }
    }

    pub fn patron(&self) -> Result<&Patron, CirculationError> {
        self.patron
            .as_ref()
            .ok_or_else(|| CirculationError::not_found(EntityKind::Patron, display_id(&self.patron_id)))
    }

    pub fn item(&self) -> Result<&Item, CirculationError> {
        self.item
            .as_ref()
            .ok_or_else(|| CirculationError::not_found(EntityKind::Item, display_id(&self.item_id)))
    }

    pub fn loan(&self) -> Result<&Loan, CirculationError> {
        self.loan
            .as_ref()
            .ok_or_else(|| CirculationError::not_found(EntityKind::Loan, display_id(&self.loan_id)))
    }

    /// Run one catalog call under the request's deadline and cancellation.
    ///
    /// Cancellation is checked before the call starts and raced against it
    /// while it runs. An abandoned call is dropped; whatever it already did on
    /// the catalog side stays done.
    pub async fn call<T, F>(&self, operation: CatalogOperation, fut: F) -> Result<T, CirculationError>
    where
        F: Future<Output = Result<T, CatalogError>>,
    {
        if self.cancellation.is_cancelled() {
            return Err(CirculationError::Cancelled { operation });
        }

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => {
                tracing::warn!(request_id = %self.request_id, %operation, "Catalog call cancelled");
                Err(CirculationError::Cancelled { operation })
            }
            outcome = tokio::time::timeout(self.call_timeout, fut) => match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(cause)) => {
                    tracing::warn!(request_id = %self.request_id, %operation, error = %cause, "Catalog call failed");
                    Err(CirculationError::remote(operation, cause))
                }
                Err(_) => {
                    tracing::warn!(
                        request_id = %self.request_id,
                        %operation,
                        timeout_ms = self.call_timeout.as_millis() as u64,
                        "Catalog call timed out"
                    );
                    Err(CirculationError::Timeout { operation })
                }
            }
        }
    }
}

fn display_id<T: std::fmt::Display>(id: &Option<T>) -> String {
    id.as_ref().map(ToString::to_string).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Credential;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn context(timeout: Duration, token: CancellationToken) -> RequestContext {
        RequestContext::new(
            WorkflowKind::Checkout,
            CatalogScope::new("hbz", Credential::new("aaaaa")),
            timeout,
            token,
        )
    }

    #[tokio::test]
    async fn test_call_passes_value_through() {
        let ctx = context(Duration::from_secs(1), CancellationToken::new());
        let value = ctx
            .call(CatalogOperation::GetPatron, async { Ok::<_, CatalogError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_catalog_error_becomes_remote() {
        let ctx = context(Duration::from_secs(1), CancellationToken::new());
        let err = ctx
            .call(CatalogOperation::UpdateItem, async {
                Err::<(), _>(CatalogError::UnexpectedStatus { status: 500 })
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "remote");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let ctx = context(Duration::from_millis(50), CancellationToken::new());
        let err = ctx
            .call(CatalogOperation::GetItem, async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, CatalogError>(())
            })
            .await
            .unwrap_err();
        assert_eq!(err, CirculationError::Timeout { operation: CatalogOperation::GetItem });
    }

    #[tokio::test]
    async fn test_cancelled_before_call_never_polls_it() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = context(Duration::from_secs(1), token);

        let polled = AtomicBool::new(false);
        let err = ctx
            .call(CatalogOperation::CreateLoan, async {
                polled.store(true, Ordering::SeqCst);
                Ok::<_, CatalogError>(())
            })
            .await
            .unwrap_err();
        assert_eq!(err, CirculationError::Cancelled { operation: CatalogOperation::CreateLoan });
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_running_call() {
        let token = CancellationToken::new();
        let ctx = context(Duration::from_secs(60), token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let err = ctx
            .call(CatalogOperation::GetLoan, async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, CatalogError>(())
            })
            .await
            .unwrap_err();

        canceller.await.unwrap();
        assert_eq!(err, CirculationError::Cancelled { operation: CatalogOperation::GetLoan });
    }

    #[test]
    fn test_missing_snapshot_reports_requested_id() {
        let mut ctx = context(Duration::from_secs(1), CancellationToken::new());
        ctx.item_id = Some(ItemId::new("i-404"));
        assert_eq!(
            ctx.item().unwrap_err(),
            CirculationError::not_found(EntityKind::Item, "i-404")
        );
    }
}
