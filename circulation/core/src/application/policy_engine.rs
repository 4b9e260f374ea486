// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Loan permission evaluation.
//!
//! Evaluates a patron/item pair against the current policy snapshot. The
//! engine keeps no per-evaluation state; any number of evaluations may run
//! at once, concurrently with policy registration.

use std::sync::Arc;
use tracing::debug;

use crate::domain::item::Item;
use crate::domain::patron::Patron;
use crate::domain::policy::{AttributeSnapshot, Decision, PolicyStore};

#[derive(Clone)]
pub struct PolicyEngine {
    store: Arc<dyn PolicyStore>,
}

impl PolicyEngine {
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self { store }
    }

    /// Decide whether `patron` may borrow `item`. Denies when no policy matches.
    pub fn evaluate(&self, patron: &Patron, item: &Item) -> Decision {
        let snapshot = AttributeSnapshot::of(patron, item);
        let policies = self.store.snapshot();
        let decision = Decision::evaluate(policies.iter(), &snapshot);

        debug!(
            patron_id = %patron.id,
            item_id = %item.id,
            policies = policies.len(),
            permitted = decision.is_permitted(),
            matched = ?decision.matched_policies(),
            "Evaluated loan permission"
        );

        decision
    }
}
