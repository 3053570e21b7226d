//! # Purchase Repository
//!
//! Purchase orders and their lines.
//!
//! ## Receipt Is a Compare-and-Set
//! ```text
//!   UPDATE purchases SET status = 'received' ...
//!   WHERE id = ? AND tenant_id = ? AND status = 'ordered'
//!   RETURNING ...
//!
//!   row back  → this call owns the receipt, apply stock + supplier balance
//!   no row    → already received (or missing); apply nothing
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::DocumentBalance;
use crate::error::DbResult;
use tally_core::{Money, PaymentStatus, Purchase, PurchaseItem};

const PURCHASE_COLUMNS: &str = "id, tenant_id, invoice_number, supplier_id, date, subtotal_cents, \
     tax_cents, transport_cents, total_cents, status, payment_status, amount_paid_cents, \
     payment_account_id, notes, received_at, created_by, created_at, updated_at";

const PURCHASE_ITEM_COLUMNS: &str = "id, purchase_id, item_id, quantity, price_cents, total_cents";

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Purchase>> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, tenant_id, id).await
    }

    pub async fn get_items(&self, tenant_id: &str, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
        let mut conn = self.pool.acquire().await?;
        get_items(&mut conn, tenant_id, purchase_id).await
    }

    /// Every purchase from one supplier, received or not.
    pub async fn list_for_supplier(&self, tenant_id: &str, supplier_id: &str) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE tenant_id = ?1 AND supplier_id = ?2"
        ))
        .bind(tenant_id)
        .bind(supplier_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }

    /// Sum of tax on purchases dated in `[start, end)`, received or not.
    pub async fn tax_paid(
        &self,
        tenant_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(tax_cents), 0) FROM purchases \
             WHERE tenant_id = ?1 AND date >= ?2 AND date < ?3",
        )
        .bind(tenant_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents))
    }
}

// =============================================================================
// Transaction Functions
// =============================================================================

pub async fn get(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<Purchase>> {
    let purchase = sqlx::query_as::<_, Purchase>(&format!(
        "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1 AND tenant_id = ?2"
    ))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(purchase)
}

pub async fn get_items(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    purchase_id: &str,
) -> DbResult<Vec<PurchaseItem>> {
    let items = sqlx::query_as::<_, PurchaseItem>(
        r#"
        SELECT pi.id, pi.purchase_id, pi.item_id, pi.quantity, pi.price_cents, pi.total_cents
        FROM purchase_items pi
        JOIN purchases p ON p.id = pi.purchase_id
        WHERE pi.purchase_id = ?1 AND p.tenant_id = ?2
        ORDER BY pi.rowid
        "#,
    )
    .bind(purchase_id)
    .bind(tenant_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

pub async fn insert(conn: &mut SqliteConnection, purchase: &Purchase) -> DbResult<()> {
    debug!(
        id = %purchase.id,
        invoice = %purchase.invoice_number,
        total = purchase.total_cents,
        "Inserting purchase"
    );

    sqlx::query(&format!(
        "INSERT INTO purchases ({PURCHASE_COLUMNS}) VALUES \
         (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
    ))
    .bind(&purchase.id)
    .bind(&purchase.tenant_id)
    .bind(&purchase.invoice_number)
    .bind(&purchase.supplier_id)
    .bind(purchase.date)
    .bind(purchase.subtotal_cents)
    .bind(purchase.tax_cents)
    .bind(purchase.transport_cents)
    .bind(purchase.total_cents)
    .bind(purchase.status)
    .bind(purchase.payment_status)
    .bind(purchase.amount_paid_cents)
    .bind(&purchase.payment_account_id)
    .bind(&purchase.notes)
    .bind(purchase.received_at)
    .bind(&purchase.created_by)
    .bind(purchase.created_at)
    .bind(purchase.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_item(conn: &mut SqliteConnection, item: &PurchaseItem) -> DbResult<()> {
    sqlx::query(&format!(
        "INSERT INTO purchase_items ({PURCHASE_ITEM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
    ))
    .bind(&item.id)
    .bind(&item.purchase_id)
    .bind(&item.item_id)
    .bind(item.quantity)
    .bind(item.price_cents)
    .bind(item.total_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Flips an ordered purchase to received. Returns the updated purchase, or
/// `None` when it is missing or was already received.
pub async fn mark_received(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    received_at: DateTime<Utc>,
) -> DbResult<Option<Purchase>> {
    let purchase = sqlx::query_as::<_, Purchase>(&format!(
        "UPDATE purchases SET status = 'received', received_at = ?3, updated_at = ?3 \
         WHERE id = ?1 AND tenant_id = ?2 AND status = 'ordered' \
         RETURNING {PURCHASE_COLUMNS}"
    ))
    .bind(id)
    .bind(tenant_id)
    .bind(received_at)
    .fetch_optional(&mut *conn)
    .await?;

    if purchase.is_some() {
        debug!(id = %id, "Purchase marked received");
    }

    Ok(purchase)
}

/// Adds `delta_cents` to what has been paid on the purchase. Returns
/// `None` if no such purchase.
pub async fn add_payment(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    delta_cents: i64,
) -> DbResult<Option<DocumentBalance>> {
    debug!(id = %id, delta_cents, "Applying payment to purchase");

    let balance = sqlx::query_as::<_, DocumentBalance>(
        r#"
        UPDATE purchases SET
            amount_paid_cents = amount_paid_cents + ?3,
            updated_at = ?4
        WHERE id = ?1 AND tenant_id = ?2
        RETURNING amount_paid_cents, total_cents
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(delta_cents)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(balance)
}

pub async fn set_payment_status(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    status: PaymentStatus,
) -> DbResult<()> {
    sqlx::query("UPDATE purchases SET payment_status = ?3 WHERE id = ?1 AND tenant_id = ?2")
        .bind(id)
        .bind(tenant_id)
        .bind(status)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
