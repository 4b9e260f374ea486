// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory policy registry.
//!
//! Readers clone an `Arc` to the current list and evaluate against it without
//! holding the lock. `add` builds a new list under the write lock and swaps it
//! in, so a concurrent evaluation sees either all of a new policy or none of it.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::policy::{Policy, PolicyDefinition, PolicyError, PolicyStore};

#[derive(Default)]
struct Inner {
    policies: Arc<Vec<Policy>>,
    keys: HashSet<String>,
}

#[derive(Default)]
pub struct InMemoryPolicyStore {
    inner: RwLock<Inner>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn add(&self, definition: PolicyDefinition) -> Result<Policy, PolicyError> {
        let policy = Policy::from_definition(definition, Utc::now())?;

        let mut inner = self.inner.write();
        if inner.keys.contains(&policy.key) {
            return Err(PolicyError::DuplicateName { name: policy.name });
        }

        let mut next = Vec::with_capacity(inner.policies.len() + 1);
        next.extend(inner.policies.iter().cloned());
        next.push(policy.clone());

        inner.keys.insert(policy.key.clone());
        inner.policies = Arc::new(next);

        tracing::debug!(policy = %policy.name, total = inner.policies.len(), "Policy stored");
        Ok(policy)
    }

    fn snapshot(&self) -> Arc<Vec<Policy>> {
        Arc::clone(&self.inner.read().policies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(name: &str) -> PolicyDefinition {
        PolicyDefinition::new(name, "ACTIVE", "STAFF", "AVAILABLE", "BOOK")
    }

    #[test]
    fn test_add_and_list_in_registration_order() {
        let store = InMemoryPolicyStore::new();
        store.add(definition("Staff books")).unwrap();
        store.add(definition("Student books")).unwrap();

        let names: Vec<_> = store.list().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Staff books", "Student books"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_duplicate_after_normalization_is_rejected() {
        let store = InMemoryPolicyStore::new();
        store.add(definition("Staff books")).unwrap();

        let err = store.add(definition("  Staff   books ")).unwrap_err();
        assert!(matches!(err, PolicyError::DuplicateName { .. }));

        let err = store.add(definition("Staff_books")).unwrap_err();
        assert!(matches!(err, PolicyError::DuplicateName { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_invalid_definition_leaves_store_untouched() {
        let store = InMemoryPolicyStore::new();
        let err = store
            .add(PolicyDefinition::new("Broken", "ACTIVE", "STAFF", "", "BOOK"))
            .unwrap_err();

        assert_eq!(err, PolicyError::InvalidPolicy { field: "itemStatus" });
        assert!(store.is_empty());

        // the name is still free
        store.add(definition("Broken")).unwrap();
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_adds() {
        let store = InMemoryPolicyStore::new();
        store.add(definition("First")).unwrap();

        let before = store.snapshot();
        store.add(definition("Second")).unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_concurrent_adds_with_same_name_admit_exactly_one() {
        let store = Arc::new(InMemoryPolicyStore::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let name = if i % 2 == 0 { "Shared name" } else { "Shared  name" };
                    store.add(definition(name)).is_ok()
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(admitted, 1);
        assert_eq!(store.len(), 1);
    }
}
