// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Process-local catalog.
//!
//! Backs tests and demos. Besides storing records it counts calls per
//! operation, remembers every scope it was called with, and can be told to
//! fail or stall a given operation.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::catalog::{CatalogClient, CatalogError, CatalogOperation, CatalogScope};
use crate::domain::ids::{ItemId, LoanId, PatronId};
use crate::domain::item::Item;
use crate::domain::loan::Loan;
use crate::domain::patron::Patron;

#[derive(Default)]
struct Records {
    patrons: BTreeMap<PatronId, Patron>,
    items: BTreeMap<ItemId, Item>,
    loans: BTreeMap<PatronId, BTreeMap<LoanId, Loan>>,
}

#[derive(Default)]
struct Behaviour {
    calls: HashMap<CatalogOperation, usize>,
    failures: HashMap<CatalogOperation, CatalogError>,
    delays: HashMap<CatalogOperation, Duration>,
    scopes: Vec<CatalogScope>,
}

#[derive(Default)]
pub struct InMemoryCatalogClient {
    records: Mutex<Records>,
    behaviour: Mutex<Behaviour>,
}

impl InMemoryCatalogClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_patron(&self, patron: Patron) {
        self.records.lock().patrons.insert(patron.id.clone(), patron);
    }

    pub fn insert_item(&self, item: Item) {
        self.records.lock().items.insert(item.id.clone(), item);
    }

    /// Store a loan directly, assigning an id when it has none.
    pub fn insert_loan(&self, mut loan: Loan) -> LoanId {
        let id = loan.id.clone().unwrap_or_else(|| LoanId::new(Uuid::new_v4().to_string()));
        loan.id = Some(id.clone());
        self.records
            .lock()
            .loans
            .entry(loan.patron_id.clone())
            .or_default()
            .insert(id.clone(), loan);
        id
    }

    pub fn patron(&self, id: &PatronId) -> Option<Patron> {
        self.records.lock().patrons.get(id).cloned()
    }

    pub fn item(&self, id: &ItemId) -> Option<Item> {
        self.records.lock().items.get(id).cloned()
    }

    pub fn loan(&self, patron_id: &PatronId, loan_id: &LoanId) -> Option<Loan> {
        self.records
            .lock()
            .loans
            .get(patron_id)
            .and_then(|loans| loans.get(loan_id))
            .cloned()
    }

    pub fn loans_of(&self, patron_id: &PatronId) -> Vec<Loan> {
        self.records
            .lock()
            .loans
            .get(patron_id)
            .map(|loans| loans.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Make every later call of `operation` fail with `error`.
    pub fn fail_on(&self, operation: CatalogOperation, error: CatalogError) {
        self.behaviour.lock().failures.insert(operation, error);
    }

    pub fn clear_failure(&self, operation: CatalogOperation) {
        self.behaviour.lock().failures.remove(&operation);
    }

    /// Stall every later call of `operation` for `delay` before it runs.
    pub fn delay_on(&self, operation: CatalogOperation, delay: Duration) {
        self.behaviour.lock().delays.insert(operation, delay);
    }

    /// Number of calls made to `operation`, including failed ones.
    pub fn calls(&self, operation: CatalogOperation) -> usize {
        self.behaviour.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.behaviour.lock().calls.values().sum()
    }

    /// Every scope seen so far, in call order.
    pub fn scopes_seen(&self) -> Vec<CatalogScope> {
        self.behaviour.lock().scopes.clone()
    }

    async fn enter(&self, scope: &CatalogScope, operation: CatalogOperation) -> Result<(), CatalogError> {
        let delay = {
            let mut behaviour = self.behaviour.lock();
            *behaviour.calls.entry(operation).or_insert(0) += 1;
            behaviour.scopes.push(scope.clone());
            behaviour.delays.get(&operation).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.behaviour.lock().failures.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

fn missing() -> CatalogError {
    CatalogError::UnexpectedStatus { status: 404 }
}

#[async_trait]
impl CatalogClient for InMemoryCatalogClient {
    async fn get_patron(&self, scope: &CatalogScope, id: &PatronId) -> Result<Option<Patron>, CatalogError> {
        self.enter(scope, CatalogOperation::GetPatron).await?;
        Ok(self.patron(id))
    }

    async fn get_item(&self, scope: &CatalogScope, id: &ItemId) -> Result<Option<Item>, CatalogError> {
        self.enter(scope, CatalogOperation::GetItem).await?;
        Ok(self.item(id))
    }

    async fn create_loan(&self, scope: &CatalogScope, patron_id: &PatronId, loan: &Loan) -> Result<Loan, CatalogError> {
        self.enter(scope, CatalogOperation::CreateLoan).await?;

        let mut stored = loan.clone();
        stored.patron_id = patron_id.clone();
        stored.id = None;
        let id = self.insert_loan(stored.clone());
        stored.id = Some(id);
        Ok(stored)
    }

    async fn get_loan(&self, scope: &CatalogScope, patron_id: &PatronId, loan_id: &LoanId) -> Result<Option<Loan>, CatalogError> {
        self.enter(scope, CatalogOperation::GetLoan).await?;
        Ok(self.loan(patron_id, loan_id))
    }

    async fn delete_loan(&self, scope: &CatalogScope, patron_id: &PatronId, loan_id: &LoanId) -> Result<(), CatalogError> {
        self.enter(scope, CatalogOperation::DeleteLoan).await?;
        self.records
            .lock()
            .loans
            .get_mut(patron_id)
            .and_then(|loans| loans.remove(loan_id))
            .map(|_| ())
            .ok_or_else(missing)
    }

    async fn update_item(&self, scope: &CatalogScope, id: &ItemId, item: &Item) -> Result<(), CatalogError> {
        self.enter(scope, CatalogOperation::UpdateItem).await?;
        let mut records = self.records.lock();
        let slot = records.items.get_mut(id).ok_or_else(missing)?;
        *slot = item.clone();
        Ok(())
    }

    async fn update_loan(
        &self,
        scope: &CatalogScope,
        patron_id: &PatronId,
        loan_id: &LoanId,
        loan: &Loan,
    ) -> Result<(), CatalogError> {
        self.enter(scope, CatalogOperation::UpdateLoan).await?;
        let mut records = self.records.lock();
        let slot = records
            .loans
            .get_mut(patron_id)
            .and_then(|loans| loans.get_mut(loan_id))
            .ok_or_else(missing)?;
        *slot = loan.clone();
        Ok(())
    }

    async fn list_patrons(&self, scope: &CatalogScope) -> Result<Vec<Patron>, CatalogError> {
        self.enter(scope, CatalogOperation::ListPatrons).await?;
        Ok(self.records.lock().patrons.values().cloned().collect())
    }

    async fn list_items(&self, scope: &CatalogScope) -> Result<Vec<Item>, CatalogError> {
        self.enter(scope, CatalogOperation::ListItems).await?;
        Ok(self.records.lock().items.values().cloned().collect())
    }

    async fn list_loans(&self, scope: &CatalogScope, patron_id: &PatronId) -> Result<Vec<Loan>, CatalogError> {
        self.enter(scope, CatalogOperation::ListLoans).await?;
        Ok(self.loans_of(patron_id))
    }

    async fn create_patron(&self, scope: &CatalogScope, raw: &Value) -> Result<(), CatalogError> {
        self.enter(scope, CatalogOperation::CreatePatron).await?;
        let patron: Patron =
            serde_json::from_value(raw.clone()).map_err(|e| CatalogError::Rejected(e.to_string()))?;

        let mut records = self.records.lock();
        if records.patrons.contains_key(&patron.id) {
            return Err(CatalogError::Rejected(format!("patron {} already exists", patron.id)));
        }
        records.patrons.insert(patron.id.clone(), patron);
        Ok(())
    }

    async fn create_item(&self, scope: &CatalogScope, raw: &Value) -> Result<(), CatalogError> {
        self.enter(scope, CatalogOperation::CreateItem).await?;
        let item: Item = serde_json::from_value(raw.clone()).map_err(|e| CatalogError::Rejected(e.to_string()))?;

        let mut records = self.records.lock();
        if records.items.contains_key(&item.id) {
            return Err(CatalogError::Rejected(format!("item {} already exists", item.id)));
        }
        records.items.insert(item.id.clone(), item);
        Ok(())
    }

    async fn delete_patron(&self, scope: &CatalogScope, id: &PatronId) -> Result<(), CatalogError> {
        self.enter(scope, CatalogOperation::DeletePatron).await?;
        let mut records = self.records.lock();
        records.loans.remove(id);
        records.patrons.remove(id).map(|_| ()).ok_or_else(missing)
    }

    async fn delete_item(&self, scope: &CatalogScope, id: &ItemId) -> Result<(), CatalogError> {
        self.enter(scope, CatalogOperation::DeleteItem).await?;
        self.records.lock().items.remove(id).map(|_| ()).ok_or_else(missing)
    }
}
