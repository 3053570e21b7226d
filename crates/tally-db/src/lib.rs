//! # tally-db: Database Layer for Tally
//!
//! SQLite storage for the ledger, accessed through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  LedgerService::create_sale                                            │
//! │       │  db.begin() → &mut *tx                                          │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ item::        │    │              │  │   │
//! │  │   │ SqlitePool    │    │  decrement_   │    │ 0001_initial │  │   │
//! │  │   │ busy_timeout  │◄───│  quantity     │    │ _schema.sql  │  │   │
//! │  │   │ begin()       │    │ sequence::    │    │              │  │   │
//! │  │   │               │    │  next_value   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, lock timeout, transactions
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//! use tally_db::repository::item;
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! let level = item::decrement_quantity(&mut tx, &tenant_id, &item_id, 2, false).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::account::{NewPaymentAccount, PaymentAccountRepository};
pub use repository::customer::{CustomerRepository, NewCounterparty};
pub use repository::item::{ItemRepository, NewItem, StockLevel};
pub use repository::payment::PaymentRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::sale::SaleRepository;
pub use repository::supplier::SupplierRepository;
pub use repository::tenant::TenantRepository;
pub use repository::user::UserRepository;
pub use repository::DocumentBalance;
