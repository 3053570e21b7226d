//! # Request Types
//!
//! Typed inputs to [`LedgerService`](crate::LedgerService). Each request
//! validates its own shape; ownership and existence checks happen inside the
//! operation's transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::validation::{
    validate_invoice_number, validate_line_count, validate_payment_amount, validate_price_cents,
    validate_quantity,
};
use tally_core::{Money, PaymentMethod, PaymentTarget};

use crate::error::{LedgerError, LedgerResult};

/// Who an operation runs for. Every read and write is scoped to
/// `tenant_id`; `user_id` is recorded on documents and in the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub tenant_id: String,
    pub user_id: String,
}

impl Actor {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Actor {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
        }
    }
}

// =============================================================================
// Sales
// =============================================================================

/// One line of a sale. The unit price is taken from the item at sale time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub item_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

impl SaleLine {
    pub fn new(item_id: impl Into<String>, quantity: i64) -> Self {
        SaleLine {
            item_id: item_id.into(),
            quantity,
            discount_cents: 0,
        }
    }

    pub fn with_discount(mut self, cents: i64) -> Self {
        self.discount_cents = cents;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub customer_id: Option<String>,
    pub lines: Vec<SaleLine>,
    /// Whole-cart discount, applied before tax.
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub payment_account_id: Option<String>,
    /// Defaults to now.
    pub date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewSale {
    pub fn new(lines: Vec<SaleLine>) -> Self {
        NewSale {
            customer_id: None,
            lines,
            discount_cents: 0,
            payment_method: PaymentMethod::Cash,
            payment_account_id: None,
            date: None,
            notes: None,
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        validate_line_count(self.lines.len())?;
        for line in &self.lines {
            validate_quantity(line.quantity)?;
            if line.discount_cents < 0 {
                return Err(LedgerError::invalid("line discount must not be negative"));
            }
        }
        if self.discount_cents < 0 {
            return Err(LedgerError::invalid("discount must not be negative"));
        }
        if self.payment_method.is_credit() && self.customer_id.is_none() {
            return Err(LedgerError::invalid("a credit sale requires a customer"));
        }
        Ok(())
    }
}

// =============================================================================
// Purchases
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub item_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl PurchaseLine {
    pub fn new(item_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        PurchaseLine {
            item_id: item_id.into(),
            quantity,
            unit_price_cents,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchase {
    pub supplier_id: String,
    /// Supplier's own invoice number. Generated (`PO-000001`) when absent.
    pub invoice_number: Option<String>,
    pub lines: Vec<PurchaseLine>,
    #[serde(default)]
    pub transport_cents: i64,
    pub payment_account_id: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewPurchase {
    pub fn new(supplier_id: impl Into<String>, lines: Vec<PurchaseLine>) -> Self {
        NewPurchase {
            supplier_id: supplier_id.into(),
            invoice_number: None,
            lines,
            transport_cents: 0,
            payment_account_id: None,
            date: None,
            notes: None,
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        validate_line_count(self.lines.len())?;
        for line in &self.lines {
            validate_quantity(line.quantity)?;
            validate_price_cents(line.unit_price_cents)?;
        }
        if let Some(number) = &self.invoice_number {
            validate_invoice_number(number)?;
        }
        if self.transport_cents < 0 {
            return Err(LedgerError::invalid("transport charges must not be negative"));
        }
        Ok(())
    }
}

// =============================================================================
// Payments
// =============================================================================

/// A payment against one specific sale or purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount_cents: i64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub payment_account_id: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl PaymentRequest {
    pub fn new(amount: Money) -> Self {
        PaymentRequest {
            amount_cents: amount.cents(),
            payment_method: PaymentMethod::Cash,
            payment_account_id: None,
            reference: None,
            notes: None,
            date: None,
        }
    }

    pub fn from_account(mut self, account_id: impl Into<String>) -> Self {
        self.payment_account_id = Some(account_id.into());
        self
    }

    pub fn validate(&self) -> LedgerResult<()> {
        validate_payment_amount(self.amount_cents)?;
        if self.payment_method.is_credit() {
            return Err(LedgerError::invalid("a payment cannot be made on credit"));
        }
        Ok(())
    }
}

/// A payment on account: money received from a customer or paid to a
/// supplier, not tied to a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub target: PaymentTarget,
    #[serde(flatten)]
    pub details: PaymentRequest,
}

impl NewPayment {
    pub fn customer(customer_id: impl Into<String>, amount: Money) -> Self {
        NewPayment {
            target: PaymentTarget::Customer(customer_id.into()),
            details: PaymentRequest::new(amount),
        }
    }

    pub fn supplier(supplier_id: impl Into<String>, amount: Money) -> Self {
        NewPayment {
            target: PaymentTarget::Supplier(supplier_id.into()),
            details: PaymentRequest::new(amount),
        }
    }

    /// Builds a payment from the loose `customer_id` / `supplier_id` pair a
    /// form carries. Exactly one must be set.
    pub fn from_parts(
        customer_id: Option<String>,
        supplier_id: Option<String>,
        details: PaymentRequest,
    ) -> LedgerResult<Self> {
        Ok(NewPayment {
            target: PaymentTarget::from_parts(customer_id, supplier_id)?,
            details,
        })
    }

    pub fn from_account(mut self, account_id: impl Into<String>) -> Self {
        self.details.payment_account_id = Some(account_id.into());
        self
    }

    pub fn validate(&self) -> LedgerResult<()> {
        self.details.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sale_rejected() {
        assert!(NewSale::new(vec![]).validate().is_err());
    }

    #[test]
    fn test_credit_sale_requires_customer() {
        let mut sale = NewSale::new(vec![SaleLine::new("i1", 1)]);
        sale.payment_method = PaymentMethod::Credit;
        assert!(matches!(sale.validate(), Err(LedgerError::InvalidInput(_))));

        sale.customer_id = Some("c1".to_string());
        assert!(sale.validate().is_ok());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let sale = NewSale::new(vec![SaleLine::new("i1", 0)]);
        assert!(sale.validate().is_err());

        let purchase = NewPurchase::new("s1", vec![PurchaseLine::new("i1", -2, 100)]);
        assert!(purchase.validate().is_err());
    }

    #[test]
    fn test_payment_target_must_be_unambiguous() {
        let details = PaymentRequest::new(Money::from_cents(100));
        assert!(NewPayment::from_parts(Some("c".into()), Some("s".into()), details.clone()).is_err());
        assert!(NewPayment::from_parts(None, None, details.clone()).is_err());
        assert!(NewPayment::from_parts(None, Some("s".into()), details).is_ok());
    }

    #[test]
    fn test_non_positive_payment_rejected() {
        assert!(NewPayment::customer("c", Money::zero()).validate().is_err());
        assert!(NewPayment::customer("c", Money::from_cents(-5)).validate().is_err());
    }
}
