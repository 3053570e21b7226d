//! # tally-ledger: Transaction Orchestrator
//!
//! Sales, purchases and payments as all-or-nothing SQLite transactions over
//! stock, counterparty balances and payment accounts.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  caller (API handler, CLI, tally-report)                                │
//! │       │  Actor + typed request                                          │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               tally-ledger (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   LedgerService ──► stock    (decrements, receipts, low stock)  │   │
//! │  │        │        ──► balance  (customer/supplier/account deltas) │   │
//! │  │        │                                                        │   │
//! │  │        └─ commit ──► EventDispatcher ──► NotificationSink       │   │
//! │  │                                      └─► ActivityLogSink        │   │
//! │  └───────────────┬─────────────────────────────────┬───────────────┘   │
//! │                  ▼                                 ▼                    │
//! │           tally-core (totals, ledger fold)   tally-db (SQLite)          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_ledger::{Actor, LedgerConfig, LedgerService, NewSale, SaleLine};
//!
//! let service = LedgerService::connect(LedgerConfig::load()?).await?;
//! let actor = Actor::new(tenant_id, user_id);
//!
//! let sale = service
//!     .create_sale(&actor, NewSale::new(vec![SaleLine::new(item_id, 2)]))
//!     .await?;
//! println!("{} {}", sale.invoice_number, sale.total());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod balance;
pub mod config;
pub mod error;
pub mod events;
pub mod requests;
pub mod service;
pub mod sinks;
pub mod stock;
pub mod telemetry;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::LedgerConfig;
pub use error::{ErrorCode, LedgerError, LedgerResult};
pub use events::{ActivityRecord, EventDispatcher, LedgerEvent};
pub use requests::{Actor, NewPayment, NewPurchase, NewSale, PaymentRequest, PurchaseLine, SaleLine};
pub use service::{LedgerService, PurchaseDetail, SaleDetail};
pub use sinks::{
    ActivityLogSink, DbSettingsProvider, FixedTaxRate, NotificationSink, RecordingSink,
    SettingsProvider, Severity, SinkError, TracingSink,
};
pub use stock::{LowStockAlert, StockPolicy};
