// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::ids::{ItemId, LoanId, PatronId};
use super::item::Item;

/// Standard loan window: 14 days.
pub const LOAN_PERIOD_SECS: i64 = 1_209_600;

/// Title recorded on new loans until the catalog resolves the real one.
pub const PLACEHOLDER_TITLE: &str = "title";

/// A record linking a patron to an item for a bounded period.
///
/// `id` is `None` until the catalog has persisted the loan. Timestamps travel
/// as Unix seconds. Optional attributes the catalog left out stay out when
/// the loan is written back, and timestamps that were not changed are
/// written back exactly as they were read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LoanRecord", into = "LoanRecord")]
pub struct Loan {
    pub id: Option<LoanId>,
    pub patron_id: PatronId,
    pub item_id: ItemId,
    pub item_barcode: Option<String>,
    pub title: Option<String>,
    pub due_date: DateTime<Utc>,
    pub loan_date: DateTime<Utc>,
    pub renew_count: Option<u32>,
    pub renewable: Option<bool>,
    pub loan_fine: Option<i64>,
    pub extra: Map<String, Value>,
    received: ReceivedTimestamps,
}

impl Loan {
    /// Build a new, not yet persisted loan of `item` to `patron_id` starting
    /// at `now`.
    pub fn open(patron_id: &PatronId, item: &Item, now: DateTime<Utc>, period: TimeDelta) -> Self {
        Self {
            id: None,
            patron_id: patron_id.clone(),
            item_id: item.id.clone(),
            item_barcode: Some(item.barcode.clone()),
            title: Some(PLACEHOLDER_TITLE.to_string()),
            due_date: now + period,
            loan_date: now,
            renew_count: Some(0),
            renewable: Some(true),
            loan_fine: Some(0),
            extra: Map::new(),
            received: ReceivedTimestamps::default(),
        }
    }

    /// Same loan with the due date recomputed from `now`. Nothing else
    /// changes, including the renew counter.
    pub fn renewed(mut self, now: DateTime<Utc>, period: TimeDelta) -> Self {
        self.due_date = now + period;
        self
    }
}

/// Default loan window as a [`TimeDelta`].
pub fn default_loan_period() -> TimeDelta {
    TimeDelta::seconds(LOAN_PERIOD_SECS)
}

/// Timestamp numbers as the catalog sent them, next to the instant each
/// one was read as.
#[derive(Debug, Clone, Default, PartialEq)]
struct ReceivedTimestamps {
    due_date: Option<(DateTime<Utc>, Number)>,
    loan_date: Option<(DateTime<Utc>, Number)>,
}

/// Wire form of a loan.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoanRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<LoanId>,

    patron_id: PatronId,

    item_id: ItemId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    item_barcode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,

    due_date: Number,

    loan_date: Number,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    renew_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    renewable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    loan_fine: Option<i64>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<LoanRecord> for Loan {
    type Error = String;

    fn try_from(record: LoanRecord) -> Result<Self, Self::Error> {
        let due_date = instant_of(&record.due_date)?;
        let loan_date = instant_of(&record.loan_date)?;
        Ok(Self {
            id: record.id,
            patron_id: record.patron_id,
            item_id: record.item_id,
            item_barcode: record.item_barcode,
            title: record.title,
            due_date,
            loan_date,
            renew_count: record.renew_count,
            renewable: record.renewable,
            loan_fine: record.loan_fine,
            extra: record.extra,
            received: ReceivedTimestamps {
                due_date: Some((due_date, record.due_date)),
                loan_date: Some((loan_date, record.loan_date)),
            },
        })
    }
}

impl From<Loan> for LoanRecord {
    fn from(loan: Loan) -> Self {
        Self {
            due_date: number_for(loan.due_date, loan.received.due_date),
            loan_date: number_for(loan.loan_date, loan.received.loan_date),
            id: loan.id,
            patron_id: loan.patron_id,
            item_id: loan.item_id,
            item_barcode: loan.item_barcode,
            title: loan.title,
            renew_count: loan.renew_count,
            renewable: loan.renewable,
            loan_fine: loan.loan_fine,
            extra: loan.extra,
        }
    }
}

// The legacy catalog writes timestamps as JSON doubles; accept any number.
fn instant_of(raw: &Number) -> Result<DateTime<Utc>, String> {
    let out_of_range = || format!("timestamp out of range: {}", raw);
    if let Some(secs) = raw.as_i64() {
        return DateTime::from_timestamp(secs, 0).ok_or_else(out_of_range);
    }
    let value = raw
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| "timestamp is not a finite number".to_string())?;
    let secs = value.floor();
    let nanos = (((value - secs) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(secs as i64, nanos).ok_or_else(out_of_range)
}

fn number_for(instant: DateTime<Utc>, received: Option<(DateTime<Utc>, Number)>) -> Number {
    match received {
        Some((read_as, raw)) if read_as == instant => raw,
        _ => Number::from(instant.timestamp()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::ItemStatus;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_open_sets_fourteen_day_window() {
        let item = Item::new("i-1", "0001", "BOOK", ItemStatus::available());
        let loan = Loan::open(&PatronId::new("p-1"), &item, at(1_700_000_000), default_loan_period());

        assert_eq!(loan.id, None);
        assert_eq!(loan.item_barcode.as_deref(), Some("0001"));
        assert_eq!((loan.due_date - loan.loan_date).num_seconds(), LOAN_PERIOD_SECS);
        assert_eq!(loan.renew_count, Some(0));
        assert_eq!(loan.renewable, Some(true));
        assert_eq!(loan.loan_fine, Some(0));
    }

    #[test]
    fn test_renewed_only_moves_due_date() {
        let item = Item::new("i-1", "0001", "BOOK", ItemStatus::available());
        let mut loan = Loan::open(&PatronId::new("p-1"), &item, at(1_700_000_000), default_loan_period());
        loan.id = Some(LoanId::new("l-1"));
        loan.renew_count = Some(2);

        let renewed = loan.clone().renewed(at(1_700_500_000), default_loan_period());

        assert_eq!(renewed.due_date, at(1_700_500_000 + LOAN_PERIOD_SECS));
        assert_eq!(
            Loan { due_date: loan.due_date, ..renewed },
            loan
        );
    }

    #[test]
    fn test_accepts_floating_point_timestamps() {
        let loan: Loan = serde_json::from_value(json!({
            "id": "l-9",
            "patronId": "p-1",
            "itemId": "i-1",
            "dueDate": 1.7012096E9,
            "loanDate": 1700000000,
            "loanStatus": "open"
        }))
        .unwrap();

        assert_eq!(loan.due_date, at(1_701_209_600));
        assert_eq!(loan.loan_date, at(1_700_000_000));
        assert_eq!(loan.extra.get("loanStatus"), Some(&json!("open")));
    }

    #[test]
    fn test_accepts_fractional_timestamps() {
        let loan: Loan = serde_json::from_value(json!({
            "patronId": "p-1",
            "itemId": "i-1",
            "dueDate": 1701209600,
            "loanDate": 1700000000.25
        }))
        .unwrap();

        assert_eq!(loan.loan_date, DateTime::from_timestamp(1_700_000_000, 250_000_000).unwrap());
    }

    #[test]
    fn test_renewal_writes_back_only_the_due_date() {
        let received = json!({
            "patronId": "p-1",
            "itemId": "i-1",
            "dueDate": 1.7012096E9,
            "loanDate": 1700000000.5,
            "renewCount": 0,
            "loanStatus": "open"
        });
        let loan: Loan = serde_json::from_value(received.clone()).unwrap();
        assert_eq!(loan.id, None);
        assert_eq!(loan.renewable, None);

        let untouched = serde_json::to_value(&loan).unwrap();
        assert_eq!(untouched, received);

        let renewed = serde_json::to_value(loan.renewed(at(1_700_500_000), default_loan_period())).unwrap();
        let mut expected = received;
        expected["dueDate"] = json!(1_700_500_000 + LOAN_PERIOD_SECS);
        assert_eq!(renewed, expected);
    }
}
