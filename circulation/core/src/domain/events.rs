// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::{ItemId, LoanId, PatronId};

/// Circulation domain events, published after the corresponding catalog
/// mutation has been acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CirculationEvent {
    PolicyRegistered {
        name: String,
        registered_at: DateTime<Utc>,
    },
    CheckoutDenied {
        request_id: Uuid,
        patron_id: PatronId,
        item_id: ItemId,
        denied_at: DateTime<Utc>,
    },
    LoanCreated {
        request_id: Uuid,
        loan_id: Option<LoanId>,
        patron_id: PatronId,
        item_id: ItemId,
        due_date: DateTime<Utc>,
        created_at: DateTime<Utc>,
    },
    ItemReturned {
        request_id: Uuid,
        loan_id: LoanId,
        patron_id: PatronId,
        item_id: ItemId,
        returned_at: DateTime<Utc>,
    },
    LoanRenewed {
        request_id: Uuid,
        loan_id: LoanId,
        patron_id: PatronId,
        due_date: DateTime<Utc>,
        renewed_at: DateTime<Utc>,
    },
    WorkflowFailed {
        request_id: Uuid,
        workflow: String,
        error_kind: String,
        message: String,
        failed_at: DateTime<Utc>,
    },
}
