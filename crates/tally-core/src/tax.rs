//! # Tax Summary
//!
//! Tax charged on sales against tax paid on purchases over a range of days.
//!
//! ```text
//!   from 00:00                              to 23:59:59   to+1 00:00
//!      [─────────────── included ───────────────────────────)
//!
//!   net payable = output tax (sales) − input tax (purchases)
//! ```
//! A negative net means more tax was paid to suppliers than was collected.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::TaxRate;

/// Inclusive range of calendar days, queried as the half-open instant range
/// `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxPeriod {
    from: NaiveDate,
    to: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TaxPeriod {
    pub fn new(from: NaiveDate, to: NaiveDate) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidPeriod { from, to };

        if to < from {
            return Err(invalid());
        }

        let start = from.and_hms_opt(0, 0, 0).ok_or_else(invalid)?.and_utc();
        let end = to
            .succ_opt()
            .and_then(|next| next.and_hms_opt(0, 0, 0))
            .ok_or_else(invalid)?
            .and_utc();

        Ok(TaxPeriod { from, to, start, end })
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// First instant inside the period.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// First instant after the period.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxSummary {
    #[ts(as = "String")]
    pub from: NaiveDate,
    #[ts(as = "String")]
    pub to: NaiveDate,
    /// Tax paid on purchases.
    pub input_tax: Money,
    /// Tax charged on sales.
    pub output_tax: Money,
    pub net_tax_payable: Money,
    /// The tenant's current rate, for display.
    pub tax_rate: TaxRate,
}

impl TaxSummary {
    pub fn new(period: &TaxPeriod, output_tax: Money, input_tax: Money, tax_rate: TaxRate) -> Self {
        TaxSummary {
            from: period.from(),
            to: period.to(),
            input_tax,
            output_tax,
            net_tax_payable: output_tax - input_tax,
            tax_rate,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_bounds_are_half_open() {
        let period = TaxPeriod::new(day(2026, 6, 1), day(2026, 6, 30)).unwrap();
        assert_eq!(period.start().to_rfc3339(), "2026-06-01T00:00:00+00:00");
        assert_eq!(period.end().to_rfc3339(), "2026-07-01T00:00:00+00:00");
    }

    #[test]
    fn test_single_day_period() {
        let period = TaxPeriod::new(day(2026, 2, 28), day(2026, 2, 28)).unwrap();
        assert_eq!(period.end().date_naive(), day(2026, 3, 1));
    }

    #[test]
    fn test_reversed_period_rejected() {
        let err = TaxPeriod::new(day(2026, 6, 30), day(2026, 6, 1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPeriod { .. }));
    }

    #[test]
    fn test_net_can_be_negative() {
        let period = TaxPeriod::new(day(2026, 6, 1), day(2026, 6, 30)).unwrap();
        let summary = TaxSummary::new(
            &period,
            Money::from_cents(1_150),
            Money::from_cents(4_000),
            TaxRate::from_bps(1000),
        );
        assert_eq!(summary.net_tax_payable.cents(), -2_850);
        assert_eq!(summary.from, day(2026, 6, 1));
    }
}
