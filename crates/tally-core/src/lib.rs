//! # tally-core: Pure Ledger Logic
//!
//! Everything in the ledger that can be computed without touching storage.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               tally-ledger (orchestrator)                       │   │
//! │  │    create_sale, receive_purchase, create_payment, ledgers       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐           │   │
//! │  │   │  money  │  │ totals  │  │ ledger  │  │  aging  │           │   │
//! │  │   │  Money  │  │ sale /  │  │ postings│  │ buckets │           │   │
//! │  │   │ TaxRate │  │ purchase│  │ + fold  │  │         │           │   │
//! │  │   └─────────┘  └─────────┘  └─────────┘  └─────────┘           │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Sale, Purchase, Payment, InventoryItem, ...)
//! - [`money`] - Integer-cent money
//! - [`totals`] - Sale and purchase totals
//! - [`ledger`] - Counterparty statements with running balance
//! - [`aging`] - Receivables aging buckets
//! - [`tax`] - Input/output tax summary over a period
//! - [`invoice`] - Invoice number rendering
//! - [`validation`] - Boundary validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::totals::{purchase_totals, LineAmount};
//! use tally_core::types::TaxRate;
//!
//! let lines = [LineAmount::new(Money::from_cents(800), 10)];
//! let totals = purchase_totals(&lines, Money::from_cents(1500), TaxRate::from_bps(500)).unwrap();
//! assert_eq!(totals.grand_total.cents(), 9900);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aging;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod tax;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::InvoiceKind;
pub use ledger::{LedgerEntry, LedgerEntryKind};
pub use money::Money;
pub use tax::{TaxPeriod, TaxSummary};
pub use totals::{LineAmount, PurchaseTotals, SaleTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines on a single sale or purchase.
pub const MAX_DOCUMENT_LINES: usize = 500;

/// Maximum quantity on a single line.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;
