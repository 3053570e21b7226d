//! # Counterparty Ledger
//!
//! Derives a chronological debit/credit statement with a running balance
//! for one customer or supplier.
//!
//! ## Posting Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CUSTOMER (positive = they owe us)                                      │
//! │    credit sale .............. debit total                               │
//! │    cash/card sale ........... debit total, credit total (settled)       │
//! │    payment received ......... credit amount                             │
//! │                                                                         │
//! │  SUPPLIER (positive = we owe them)                                      │
//! │    received purchase ........ debit total                               │
//! │    ordered purchase ......... (not posted)                              │
//! │    payment made ............. credit amount                             │
//! │                                                                         │
//! │  balance(n) = balance(n-1) + debit(n) − credit(n)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! These are the same rules the orchestrator applies to the stored
//! outstanding balance, so folding a complete ledger always lands on that
//! stored value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Payment, Purchase, Sale};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    Sale,
    Purchase,
    Payment,
}

/// One line of a counterparty statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerEntry {
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub kind: LedgerEntryKind,
    /// Id of the sale, purchase or payment behind this line.
    pub document_id: String,
    /// Invoice number, or the payment reference when there is one.
    pub reference: String,
    pub debit: Money,
    pub credit: Money,
    /// Running balance after this line.
    pub balance: Money,
}

/// An unsorted posting, before the running balance is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub date: DateTime<Utc>,
    /// Tie-breaker for postings sharing a date.
    pub created_at: DateTime<Utc>,
    pub kind: LedgerEntryKind,
    pub document_id: String,
    pub reference: String,
    pub debit: Money,
    pub credit: Money,
}

// =============================================================================
// Posting Builders
// =============================================================================

/// Postings for a customer statement.
pub fn customer_postings(sales: &[Sale], payments: &[Payment]) -> Vec<Posting> {
    let sales = sales.iter().map(|sale| Posting {
        date: sale.date,
        created_at: sale.created_at,
        kind: LedgerEntryKind::Sale,
        document_id: sale.id.clone(),
        reference: sale.invoice_number.clone(),
        debit: sale.total(),
        // Settled at the till: the sale nets to zero on the statement
        credit: if sale.payment_method.is_credit() {
            Money::zero()
        } else {
            sale.total()
        },
    });

    sales.chain(payments.iter().map(payment_posting)).collect()
}

/// Postings for a supplier statement. Purchases still on order are skipped.
pub fn supplier_postings(purchases: &[Purchase], payments: &[Payment]) -> Vec<Posting> {
    let purchases = purchases
        .iter()
        .filter(|p| p.is_received())
        .map(|p| Posting {
            date: p.date,
            created_at: p.created_at,
            kind: LedgerEntryKind::Purchase,
            document_id: p.id.clone(),
            reference: p.invoice_number.clone(),
            debit: p.total(),
            credit: Money::zero(),
        });

    purchases.chain(payments.iter().map(payment_posting)).collect()
}

fn payment_posting(payment: &Payment) -> Posting {
    Posting {
        date: payment.date,
        created_at: payment.created_at,
        kind: LedgerEntryKind::Payment,
        document_id: payment.id.clone(),
        reference: payment
            .reference
            .clone()
            .unwrap_or_else(|| format!("PAY-{}", short_id(&payment.id))),
        debit: Money::zero(),
        credit: payment.amount(),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

// =============================================================================
// Fold
// =============================================================================

/// Sorts postings by date (ties by creation time, then input order) and
/// folds the running balance.
///
/// ## Example
/// ```rust,ignore
/// let entries = build_ledger(customer_postings(&sales, &payments));
/// assert_eq!(entries.last().map(|e| e.balance), Some(customer.outstanding_balance()));
/// ```
pub fn build_ledger(mut postings: Vec<Posting>) -> Vec<LedgerEntry> {
    // sort_by is stable, so equal keys keep their input order
    postings.sort_by(|a, b| (a.date, a.created_at).cmp(&(b.date, b.created_at)));

    let mut balance = Money::zero();
    postings
        .into_iter()
        .map(|p| {
            balance += p.debit - p.credit;
            LedgerEntry {
                date: p.date,
                kind: p.kind,
                document_id: p.document_id,
                reference: p.reference,
                debit: p.debit,
                credit: p.credit,
                balance,
            }
        })
        .collect()
}

/// Closing balance of a statement (zero when empty).
pub fn closing_balance(entries: &[LedgerEntry]) -> Money {
    entries.last().map(|e| e.balance).unwrap_or_default()
}

// =============================================================================
// Unit Tests
// =============================================================================
