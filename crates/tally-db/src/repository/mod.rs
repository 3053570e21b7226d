//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Two Kinds of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Pool methods (&self)                 Transaction functions (conn)      │
//! │  ─────────────────────                ────────────────────────────      │
//! │  db.sales().get(tenant, id)           sale::insert(conn, &sale)         │
//! │  db.items().create(tenant, new)       item::decrement_quantity(conn,..) │
//! │  db.payments().list_for_customer(..)  customer::adjust_balance(conn,..) │
//! │                                                                         │
//! │  Reads and setup writes that stand    Writes that must commit or roll   │
//! │  on their own                         back together with others. The    │
//! │                                       caller owns the transaction and   │
//! │                                       passes `&mut *tx`.                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every query filters on `tenant_id`. A row owned by another tenant is
//! indistinguishable from a missing row.
//!
//! ## Available Repositories
//!
//! - [`TenantRepository`](tenant::TenantRepository) - Tenants and tenant settings
//! - [`UserRepository`](user::UserRepository) - Users and roles
//! - [`ItemRepository`](item::ItemRepository) - Inventory items and stock levels
//! - [`CustomerRepository`](customer::CustomerRepository) / [`SupplierRepository`](supplier::SupplierRepository)
//! - [`PaymentAccountRepository`](account::PaymentAccountRepository) - Cash and bank accounts
//! - [`SaleRepository`](sale::SaleRepository) / [`PurchaseRepository`](purchase::PurchaseRepository)
//! - [`PaymentRepository`](payment::PaymentRepository)
//! - [`sequence`] - Invoice counters

pub mod account;
pub mod customer;
pub mod item;
pub mod payment;
pub mod purchase;
pub mod sale;
pub mod sequence;
pub mod supplier;
pub mod tenant;
pub mod user;

/// Paid-so-far and total of a sale or purchase, as returned by the
/// `add_payment` delta updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct DocumentBalance {
    pub amount_paid_cents: i64,
    pub total_cents: i64,
}

impl DocumentBalance {
    pub fn payment_status(&self) -> tally_core::PaymentStatus {
        tally_core::PaymentStatus::from_amounts(
            tally_core::Money::from_cents(self.amount_paid_cents),
            tally_core::Money::from_cents(self.total_cents),
        )
    }
}
