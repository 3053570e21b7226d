//! # Balance Reconciliation
//!
//! Every money movement the ledger records, expressed as signed deltas on
//! three kinds of balance.
//!
//! ## Effects Table
//! ```text
//! ┌──────────────────────────────┬──────────────────┬──────────────────────┐
//! │ Event                        │ Counterparty     │ Payment account      │
//! ├──────────────────────────────┼──────────────────┼──────────────────────┤
//! │ Credit sale                  │ customer  + total│  (none)              │
//! │ Cash / card / ... sale       │  (none)          │ + total (if given)   │
//! │ Purchase received            │ supplier  + total│  (none)              │
//! │ Customer payment             │ customer  − amt  │ + amt (if given)     │
//! │ Supplier payment             │ supplier  − amt  │ − amt (if given)     │
//! │ Payment deleted              │ exact opposite of the row above          │
//! └──────────────────────────────┴──────────────────┴──────────────────────┘
//! ```
//!
//! Balances have no floor. An account can be overdrawn and a customer can
//! end up in credit.

use sqlx::SqliteConnection;
use tally_core::{Money, Payment, PaymentTarget, Purchase, Sale};
use tally_db::repository::sale::SalePaymentUpdate;
use tally_db::repository::{account, customer, purchase, sale, supplier};
use tally_db::DocumentBalance;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

/// Signed changes a payment of `amount` makes: (counterparty, account).
pub fn payment_deltas(target: &PaymentTarget, amount: Money) -> (Money, Money) {
    match target {
        PaymentTarget::Customer(_) => (-amount, amount),
        PaymentTarget::Supplier(_) => (-amount, -amount),
    }
}

pub async fn on_sale_created(conn: &mut SqliteConnection, sale: &Sale) -> LedgerResult<()> {
    if sale.payment_method.is_credit() {
        let customer_id = sale
            .customer_id
            .as_deref()
            .ok_or_else(|| LedgerError::invalid("a credit sale requires a customer"))?;
        adjust_customer(conn, &sale.tenant_id, customer_id, sale.total()).await?;
    } else if let Some(account_id) = sale.payment_account_id.as_deref() {
        adjust_account(conn, &sale.tenant_id, account_id, sale.total()).await?;
    }
    Ok(())
}

pub async fn on_purchase_received(conn: &mut SqliteConnection, purchase: &Purchase) -> LedgerResult<()> {
    adjust_supplier(conn, &purchase.tenant_id, &purchase.supplier_id, purchase.total()).await?;
    Ok(())
}

/// Applies a payment's counterparty and account effects.
///
/// The counterparty update runs first: for a standalone payment it is the
/// operation's first write.
pub async fn apply_payment(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    target: &PaymentTarget,
    amount: Money,
    account_id: Option<&str>,
) -> LedgerResult<()> {
    let (counterparty_delta, account_delta) = payment_deltas(target, amount);

    match target {
        PaymentTarget::Customer(id) => adjust_customer(conn, tenant_id, id, counterparty_delta).await?,
        PaymentTarget::Supplier(id) => adjust_supplier(conn, tenant_id, id, counterparty_delta).await?,
    };

    if let Some(account_id) = account_id {
        adjust_account(conn, tenant_id, account_id, account_delta).await?;
    }

    Ok(())
}

/// Undoes everything [`apply_payment`] and a document settlement did for
/// this payment.
pub async fn reverse_payment(conn: &mut SqliteConnection, payment: &Payment) -> LedgerResult<()> {
    apply_payment(
        conn,
        &payment.tenant_id,
        &payment.target,
        -payment.amount(),
        payment.payment_account_id.as_deref(),
    )
    .await?;

    if let Some(sale_id) = payment.sale_id.as_deref() {
        settle_sale(conn, &payment.tenant_id, sale_id, -payment.amount()).await?;
    }
    if let Some(purchase_id) = payment.purchase_id.as_deref() {
        settle_purchase(conn, &payment.tenant_id, purchase_id, -payment.amount()).await?;
    }

    Ok(())
}

/// Moves a sale's paid amount by `delta` and recomputes its status.
pub async fn settle_sale(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    sale_id: &str,
    delta: Money,
) -> LedgerResult<SalePaymentUpdate> {
    let update = sale::add_payment(conn, tenant_id, sale_id, delta.cents())
        .await?
        .ok_or_else(|| LedgerError::not_found("Sale", sale_id))?;

    sale::set_payment_status(conn, tenant_id, sale_id, update.balance().payment_status()).await?;
    Ok(update)
}

/// Moves a purchase's paid amount by `delta` and recomputes its status.
pub async fn settle_purchase(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    purchase_id: &str,
    delta: Money,
) -> LedgerResult<DocumentBalance> {
    let balance = purchase::add_payment(conn, tenant_id, purchase_id, delta.cents())
        .await?
        .ok_or_else(|| LedgerError::not_found("Purchase", purchase_id))?;

    purchase::set_payment_status(conn, tenant_id, purchase_id, balance.payment_status()).await?;
    Ok(balance)
}

// =============================================================================
// Balance deltas
// =============================================================================

async fn adjust_customer(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    delta: Money,
) -> LedgerResult<i64> {
    let balance = customer::adjust_balance(conn, tenant_id, id, delta.cents())
        .await?
        .ok_or_else(|| LedgerError::not_found("Customer", id))?;
    debug!(customer_id = %id, delta = delta.cents(), balance, "Customer balance");
    Ok(balance)
}

async fn adjust_supplier(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    delta: Money,
) -> LedgerResult<i64> {
    let balance = supplier::adjust_balance(conn, tenant_id, id, delta.cents())
        .await?
        .ok_or_else(|| LedgerError::not_found("Supplier", id))?;
    debug!(supplier_id = %id, delta = delta.cents(), balance, "Supplier balance");
    Ok(balance)
}

async fn adjust_account(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    delta: Money,
) -> LedgerResult<i64> {
    let balance = account::adjust_balance(conn, tenant_id, id, delta.cents())
        .await?
        .ok_or_else(|| LedgerError::not_found("PaymentAccount", id))?;
    debug!(account_id = %id, delta = delta.cents(), balance, "Account balance");
    Ok(balance)
}
