//! # Invoice Numbers
//!
//! Sales and purchases draw from one tenant-scoped counter per document kind.
//! The counter value is rendered zero-padded so numbers sort lexically:
//!
//! ```text
//! sale     #1   → INV-000001
//! purchase #42  → PO-000042
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Width of the numeric part. Wider values are rendered in full.
pub const INVOICE_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    Sale,
    Purchase,
}

impl InvoiceKind {
    pub const fn prefix(&self) -> &'static str {
        match self {
            InvoiceKind::Sale => "INV",
            InvoiceKind::Purchase => "PO",
        }
    }

    /// Renders a counter value as an invoice number.
    ///
    /// ```rust
    /// use tally_core::invoice::InvoiceKind;
    ///
    /// assert_eq!(InvoiceKind::Sale.render(1), "INV-000001");
    /// assert_eq!(InvoiceKind::Purchase.render(1234567), "PO-1234567");
    /// ```
    pub fn render(&self, sequence: i64) -> String {
        format!("{}-{:0width$}", self.prefix(), sequence, width = INVOICE_DIGITS)
    }
}

impl fmt::Display for InvoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceKind::Sale => write!(f, "sale"),
            InvoiceKind::Purchase => write!(f, "purchase"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_numbers_sort_in_sequence_order() {
        let mut numbers: Vec<String> = [10, 2, 100, 1].iter().map(|n| InvoiceKind::Sale.render(*n)).collect();
        numbers.sort();
        assert_eq!(
            numbers,
            vec!["INV-000001", "INV-000002", "INV-000010", "INV-000100"]
        );
    }
}
