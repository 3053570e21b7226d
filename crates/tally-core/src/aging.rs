//! # Receivables Aging
//!
//! Groups what customers still owe on credit sales by how far past due it is.
//!
//! ```text
//!   days overdue:   ≤30        31-60       61-90       >90
//!                ┌─────────┬───────────┬───────────┬─────────┐
//!                │ current │ 31-60     │ 61-90     │ 90+     │
//!                └─────────┴───────────┴───────────┴─────────┘
//! ```
//! Sales that are not due yet count as current.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::money::Money;

/// Unpaid remainder of one credit sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenReceivable {
    pub sale_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub due_date: DateTime<Utc>,
    pub amount_remaining: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AgingBucket {
    Current,
    Days31To60,
    Days61To90,
    Over90,
}

impl AgingBucket {
    pub fn for_days_overdue(days: i64) -> Self {
        match days {
            d if d <= 30 => AgingBucket::Current,
            d if d <= 60 => AgingBucket::Days31To60,
            d if d <= 90 => AgingBucket::Days61To90,
            _ => AgingBucket::Over90,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerAging {
    pub customer_id: String,
    pub customer_name: String,
    pub current: Money,
    pub days_31_60: Money,
    pub days_61_90: Money,
    pub over_90: Money,
    pub total_due: Money,
}

impl CustomerAging {
    fn add(&mut self, bucket: AgingBucket, amount: Money) {
        match bucket {
            AgingBucket::Current => self.current += amount,
            AgingBucket::Days31To60 => self.days_31_60 += amount,
            AgingBucket::Days61To90 => self.days_61_90 += amount,
            AgingBucket::Over90 => self.over_90 += amount,
        }
        self.total_due += amount;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AgingReport {
    #[ts(as = "String")]
    pub as_of: DateTime<Utc>,
    pub total_receivables: Money,
    pub customer_count: usize,
    /// One row per customer, ordered by customer name.
    pub customers: Vec<CustomerAging>,
}

/// Buckets open receivables as of the given instant.
///
/// Days overdue are counted in whole calendar days between the due date and
/// `as_of`.
pub fn bucket_receivables(open: &[OpenReceivable], as_of: DateTime<Utc>) -> AgingReport {
    let mut rows: BTreeMap<(String, String), CustomerAging> = BTreeMap::new();
    let today = as_of.date_naive();

    for receivable in open {
        let days_overdue = (today - receivable.due_date.date_naive()).num_days();
        let bucket = AgingBucket::for_days_overdue(days_overdue);

        rows.entry((
            receivable.customer_name.clone(),
            receivable.customer_id.clone(),
        ))
        .or_insert_with(|| CustomerAging {
            customer_id: receivable.customer_id.clone(),
            customer_name: receivable.customer_name.clone(),
            ..Default::default()
        })
        .add(bucket, receivable.amount_remaining);
    }

    let customers: Vec<CustomerAging> = rows.into_values().collect();
    AgingReport {
        as_of,
        total_receivables: customers.iter().map(|c| c.total_due).sum(),
        customer_count: customers.len(),
        customers,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
