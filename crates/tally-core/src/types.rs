//! # Domain Types
//!
//! Entities shared by the storage layer and the ledger orchestrator.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │    Purchase     │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  invoice_number │   │  invoice_number │   │  target ────────┼──┐    │
//! │  │  customer_id?   │   │  supplier_id    │   │  account_id?    │  │    │
//! │  │  payment_status │   │  status         │   │  sale_id?       │  │    │
//! │  │  SaleItem[]     │   │  PurchaseItem[] │   │  purchase_id?   │  │    │
//! │  └────────┬────────┘   └────────┬────────┘   └─────────────────┘  │    │
//! │           │ credit               │ received                        │    │
//! │           ▼                      ▼                                 ▼    │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────────┐  │
//! │  │    Customer     │   │    Supplier     │   │   PaymentTarget      │  │
//! │  │ outstanding (+) │   │ outstanding (+) │   │ Customer(id)         │  │
//! │  │ = they owe us   │   │ = we owe them   │   │ Supplier(id)         │  │
//! │  └─────────────────┘   └─────────────────┘   └──────────────────────┘  │
//! │                                                                         │
//! │  InventoryItem.quantity   ◄── sale decrements / receipt increments     │
//! │  PaymentAccount.balance   ◄── cash in / cash out                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All amounts are stored as `*_cents: i64`; accessor methods wrap them in
//! [`Money`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1000 bps = 10%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Tenants & Users
// =============================================================================

/// An isolated business account. Every other entity is partitioned by it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Per-tenant settings consumed by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TenantSettings {
    pub tenant_id: String,
    pub tax_rate_bps: u32,
    pub currency: String,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl TenantSettings {
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    Staff,
}

/// A tenant user. Only the role matters to the ledger: admins receive
/// low-stock notifications.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub role: UserRole,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory
// =============================================================================

/// A stocked item.
///
/// `quantity` only changes through sale decrements and purchase receipts.
/// It may be negative when the tenant runs with backorders allowed.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub quantity: i64,
    pub min_stock: i64,
    /// Cost of the most recent received purchase.
    pub purchase_price_cents: i64,
    pub selling_price_cents: i64,
    pub tax_rate_bps: u32,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }
}

// =============================================================================
// Counterparties
// =============================================================================

/// A customer. Positive balance means the customer owes the business.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub outstanding_balance_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn outstanding_balance(&self) -> Money {
        Money::from_cents(self.outstanding_balance_cents)
    }
}

/// A supplier. Positive balance means the business owes the supplier.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub outstanding_balance_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Supplier {
    #[inline]
    pub fn outstanding_balance(&self) -> Money {
        Money::from_cents(self.outstanding_balance_cents)
    }
}

// =============================================================================
// Payment Accounts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Cash,
    Bank,
    Mobile,
}

/// A cash drawer, bank or mobile wallet. Money received increments the
/// balance, money paid out decrements it. The balance may go negative.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentAccount {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub account_type: AccountType,
    pub balance_cents: i64,
    pub currency: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl PaymentAccount {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

// =============================================================================
// Payment Method & Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Mobile,
    /// Sold on account: the customer's outstanding balance absorbs the total.
    Credit,
}

impl PaymentMethod {
    #[inline]
    pub const fn is_credit(&self) -> bool {
        matches!(self, PaymentMethod::Credit)
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

/// Settlement state of a sale or purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Derives the status from what has been paid against a document total.
    ///
    /// ```rust
    /// use tally_core::{Money, PaymentStatus};
    ///
    /// let total = Money::from_cents(20000);
    /// assert_eq!(PaymentStatus::from_amounts(Money::zero(), total), PaymentStatus::Pending);
    /// assert_eq!(PaymentStatus::from_amounts(Money::from_cents(8000), total), PaymentStatus::Partial);
    /// assert_eq!(PaymentStatus::from_amounts(total, total), PaymentStatus::Paid);
    /// ```
    pub fn from_amounts(amount_paid: Money, total: Money) -> Self {
        if amount_paid >= total {
            PaymentStatus::Paid
        } else if amount_paid.is_positive() {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale. Sales are created once and never voided.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub invoice_number: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    /// `None` is a walk-in sale.
    pub customer_id: Option<String>,
    /// Σ(price × qty − line discount).
    pub subtotal_cents: i64,
    /// Cart-level discount.
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_account_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub amount_paid_cents: i64,
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    /// What is still owed on this sale.
    #[inline]
    pub fn amount_remaining(&self) -> Money {
        self.total() - self.amount_paid()
    }
}

/// A sale line. `price_cents` is the item's selling price frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub item_id: String,
    pub quantity: i64,
    pub price_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

// =============================================================================
// Purchase
// =============================================================================

/// Purchase lifecycle: `Ordered → Received`, one way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Ordered,
    Received,
}

impl Default for PurchaseStatus {
    fn default() -> Self {
        PurchaseStatus::Ordered
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub tenant_id: String,
    pub invoice_number: String,
    pub supplier_id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    /// Not taxed.
    pub transport_cents: i64,
    pub total_cents: i64,
    pub status: PurchaseStatus,
    pub payment_status: PaymentStatus,
    pub amount_paid_cents: i64,
    pub payment_account_id: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    #[inline]
    pub fn is_received(&self) -> bool {
        self.status == PurchaseStatus::Received
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub item_id: String,
    pub quantity: i64,
    pub price_cents: i64,
    pub total_cents: i64,
}

// =============================================================================
// Payment
// =============================================================================

/// Who a payment settles with. Exactly one counterparty per payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum PaymentTarget {
    /// Money received from a customer.
    Customer(String),
    /// Money paid out to a supplier.
    Supplier(String),
}

impl PaymentTarget {
    /// Builds a target from the two optional ids a form or API body carries.
    ///
    /// ```rust
    /// use tally_core::PaymentTarget;
    ///
    /// assert!(PaymentTarget::from_parts(Some("c1".into()), None).is_ok());
    /// assert!(PaymentTarget::from_parts(Some("c1".into()), Some("s1".into())).is_err());
    /// assert!(PaymentTarget::from_parts(None, None).is_err());
    /// ```
    pub fn from_parts(customer_id: Option<String>, supplier_id: Option<String>) -> CoreResult<Self> {
        match (customer_id, supplier_id) {
            (Some(c), None) => Ok(PaymentTarget::Customer(c)),
            (None, Some(s)) => Ok(PaymentTarget::Supplier(s)),
            _ => Err(CoreError::AmbiguousPaymentTarget),
        }
    }

    pub fn customer_id(&self) -> Option<&str> {
        match self {
            PaymentTarget::Customer(id) => Some(id),
            PaymentTarget::Supplier(_) => None,
        }
    }

    pub fn supplier_id(&self) -> Option<&str> {
        match self {
            PaymentTarget::Supplier(id) => Some(id),
            PaymentTarget::Customer(_) => None,
        }
    }
}

/// A payment between the business and a counterparty.
///
/// Immutable once created; deleting it reverses every balance effect. When
/// it settles a specific document, `sale_id` or `purchase_id` links it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub tenant_id: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub target: PaymentTarget,
    pub payment_account_id: Option<String>,
    pub sale_id: Option<String>,
    pub purchase_id: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
