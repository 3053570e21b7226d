//! # Document Totals
//!
//! Pure tax and discount arithmetic for sales and purchases.
//!
//! ## Sale Totals
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  2 × $50.00 (line discount $0)   ──►  $100.00                          │
//! │  1 × $20.00 (line discount $0)   ──►   $20.00                          │
//! │                                       ───────                           │
//! │  subtotal                              $120.00                          │
//! │  − cart discount                        −$5.00                          │
//! │  = after discount                      $115.00                          │
//! │  + tax (10% of after discount)          $11.50                          │
//! │  = grand total                         $126.50                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Tax is always computed on the discounted amount, never before the discount.
//!
//! ## Purchase Totals
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  10 × $8.00                      ──►   $80.00  subtotal                 │
//! │  + tax (5% of subtotal)                 $4.00                           │
//! │  + transport (untaxed)                 $15.00                           │
//! │  = grand total                         $99.00                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::TaxRate;

// =============================================================================
// Inputs
// =============================================================================

/// One priced line fed into the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    pub unit_price: Money,
    pub quantity: i64,
    /// Per-line discount (sales only, zero for purchases).
    pub discount: Money,
}

impl LineAmount {
    pub fn new(unit_price: Money, quantity: i64) -> Self {
        LineAmount {
            unit_price,
            quantity,
            discount: Money::zero(),
        }
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    /// Line total after its own discount.
    pub fn net(&self, index: usize) -> CoreResult<Money> {
        let gross = self.gross(index)?;
        if self.discount.is_negative() {
            return Err(CoreError::NegativeLineValue {
                index,
                field: "discount",
            });
        }
        if self.discount > gross {
            return Err(CoreError::LineDiscountTooLarge {
                index,
                discount_cents: self.discount.cents(),
                gross_cents: gross.cents(),
            });
        }
        Ok(gross - self.discount)
    }

    /// `unit_price × quantity`, rejecting negative inputs.
    pub fn gross(&self, index: usize) -> CoreResult<Money> {
        if self.quantity < 0 {
            return Err(CoreError::NegativeLineValue {
                index,
                field: "quantity",
            });
        }
        if self.unit_price.is_negative() {
            return Err(CoreError::NegativeLineValue {
                index,
                field: "price",
            });
        }
        self.unit_price
            .checked_multiply_quantity(self.quantity)
            .ok_or(CoreError::Overflow {
                context: "line total",
            })
    }
}

// =============================================================================
// Outputs
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub total_after_discount: Money,
    pub tax: Money,
    pub grand_total: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub transport: Money,
    pub grand_total: Money,
}

// =============================================================================
// Calculators
// =============================================================================

/// Computes sale totals.
///
/// ## Example
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::totals::{sale_totals, LineAmount};
/// use tally_core::types::TaxRate;
///
/// let lines = [
///     LineAmount::new(Money::from_cents(5000), 2),
///     LineAmount::new(Money::from_cents(2000), 1),
/// ];
/// let totals = sale_totals(&lines, Money::from_cents(500), TaxRate::from_bps(1000)).unwrap();
/// assert_eq!(totals.subtotal.cents(), 12000);
/// assert_eq!(totals.total_after_discount.cents(), 11500);
/// assert_eq!(totals.tax.cents(), 1150);
/// assert_eq!(totals.grand_total.cents(), 12650);
/// ```
pub fn sale_totals(
    lines: &[LineAmount],
    cart_discount: Money,
    rate: TaxRate,
) -> CoreResult<SaleTotals> {
    if cart_discount.is_negative() {
        return Err(CoreError::NegativeAmount { field: "discount" });
    }

    let subtotal = sum_lines(lines, LineAmount::net)?;
    if cart_discount > subtotal {
        return Err(CoreError::DiscountTooLarge {
            discount_cents: cart_discount.cents(),
            subtotal_cents: subtotal.cents(),
        });
    }

    let total_after_discount = subtotal - cart_discount;
    let tax = total_after_discount.calculate_tax(rate);

    Ok(SaleTotals {
        subtotal,
        discount: cart_discount,
        total_after_discount,
        tax,
        grand_total: total_after_discount + tax,
    })
}

/// Computes purchase totals. Transport charges are added after tax.
pub fn purchase_totals(
    lines: &[LineAmount],
    transport: Money,
    rate: TaxRate,
) -> CoreResult<PurchaseTotals> {
    if transport.is_negative() {
        return Err(CoreError::NegativeAmount {
            field: "transport charges",
        });
    }

    let subtotal = sum_lines(lines, LineAmount::gross)?;
    let tax = subtotal.calculate_tax(rate);
    let grand_total = (subtotal + tax)
        .checked_add(transport)
        .ok_or(CoreError::Overflow {
            context: "purchase total",
        })?;

    Ok(PurchaseTotals {
        subtotal,
        tax,
        transport,
        grand_total,
    })
}

fn sum_lines(
    lines: &[LineAmount],
    amount: fn(&LineAmount, usize) -> CoreResult<Money>,
) -> CoreResult<Money> {
    lines
        .iter()
        .enumerate()
        .try_fold(Money::zero(), |acc, (index, line)| {
            acc.checked_add(amount(line, index)?)
                .ok_or(CoreError::Overflow { context: "subtotal" })
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    #[test]
    fn test_sale_scenario_ten_percent() {
        let lines = [LineAmount::new(cents(5000), 2), LineAmount::new(cents(2000), 1)];
        let totals = sale_totals(&lines, cents(500), TaxRate::from_bps(1000)).unwrap();

        assert_eq!(totals.subtotal, cents(12000));
        assert_eq!(totals.total_after_discount, cents(11500));
        assert_eq!(totals.tax, cents(1150));
        assert_eq!(totals.grand_total, cents(12650));
    }

    #[test]
    fn test_purchase_scenario_transport_untaxed() {
        let lines = [LineAmount::new(cents(800), 10)];
        let totals = purchase_totals(&lines, cents(1500), TaxRate::from_bps(500)).unwrap();

        assert_eq!(totals.subtotal, cents(8000));
        assert_eq!(totals.tax, cents(400));
        assert_eq!(totals.grand_total, cents(9900));
    }

    #[test]
    fn test_line_discount_reduces_subtotal_before_tax() {
        let lines = [LineAmount::new(cents(1000), 3).with_discount(cents(500))];
        let totals = sale_totals(&lines, Money::zero(), TaxRate::from_bps(1000)).unwrap();

        assert_eq!(totals.subtotal, cents(2500));
        assert_eq!(totals.tax, cents(250));
        assert_eq!(totals.grand_total, cents(2750));
    }

    #[test]
    fn test_empty_lines_yield_zero() {
        let totals = sale_totals(&[], Money::zero(), TaxRate::from_bps(1000)).unwrap();
        assert_eq!(totals.grand_total, Money::zero());

        let totals = purchase_totals(&[], Money::zero(), TaxRate::from_bps(500)).unwrap();
        assert_eq!(totals.subtotal, Money::zero());
        assert_eq!(totals.grand_total, Money::zero());
    }

    #[test]
    fn test_negative_inputs_rejected() {
        let rate = TaxRate::zero();

        let err = sale_totals(&[LineAmount::new(cents(100), -1)], Money::zero(), rate).unwrap_err();
        assert_eq!(
            err,
            CoreError::NegativeLineValue {
                index: 0,
                field: "quantity"
            }
        );

        let lines = [LineAmount::new(cents(100), 1), LineAmount::new(cents(-5), 1)];
        let err = purchase_totals(&lines, Money::zero(), rate).unwrap_err();
        assert_eq!(
            err,
            CoreError::NegativeLineValue {
                index: 1,
                field: "price"
            }
        );

        assert!(purchase_totals(&[], cents(-1), rate).is_err());
        assert!(sale_totals(&[], cents(-1), rate).is_err());
    }

    #[test]
    fn test_oversized_discounts_rejected() {
        let rate = TaxRate::zero();

        let lines = [LineAmount::new(cents(100), 1).with_discount(cents(101))];
        assert!(matches!(
            sale_totals(&lines, Money::zero(), rate),
            Err(CoreError::LineDiscountTooLarge { .. })
        ));

        let lines = [LineAmount::new(cents(100), 1)];
        assert!(matches!(
            sale_totals(&lines, cents(101), rate),
            Err(CoreError::DiscountTooLarge { .. })
        ));

        // Discounting to exactly zero is allowed
        let totals = sale_totals(&lines, cents(100), TaxRate::from_bps(1000)).unwrap();
        assert_eq!(totals.grand_total, Money::zero());
    }

    #[test]
    fn test_totals_law_holds_across_rates() {
        let lines = [
            LineAmount::new(cents(1999), 3).with_discount(cents(99)),
            LineAmount::new(cents(1), 7),
            LineAmount::new(cents(123456), 2),
        ];
        for bps in [0, 1, 333, 825, 1000, 1750, 10000] {
            let rate = TaxRate::from_bps(bps);
            for discount in [0, 1, 250, 9999] {
                let t = sale_totals(&lines, cents(discount), rate).unwrap();
                let after = t.subtotal - t.discount;
                assert_eq!(t.grand_total, after + after.calculate_tax(rate));
                assert_eq!(t.tax, after.calculate_tax(rate));
            }
        }
    }

    #[test]
    fn test_overflow_is_reported() {
        let lines = [LineAmount::new(cents(i64::MAX / 2), 3)];
        assert!(matches!(
            purchase_totals(&lines, Money::zero(), TaxRate::zero()),
            Err(CoreError::Overflow { .. })
        ));
    }
}
