//! # Sale Repository
//!
//! Sale headers and lines. A sale is written once by the ledger and after
//! that only its `amount_paid_cents` / `payment_status` pair changes.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::DocumentBalance;
use crate::error::DbResult;
use tally_core::aging::OpenReceivable;
use tally_core::{Money, PaymentMethod, PaymentStatus, Sale, SaleItem};

const SALE_COLUMNS: &str = "id, tenant_id, invoice_number, date, customer_id, subtotal_cents, \
     discount_cents, tax_cents, total_cents, payment_method, payment_account_id, payment_status, \
     amount_paid_cents, due_date, notes, created_by, created_at, updated_at";

const SALE_ITEM_COLUMNS: &str =
    "id, sale_id, item_id, quantity, price_cents, discount_cents, total_cents";

/// Result of a sale payment delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct SalePaymentUpdate {
    pub amount_paid_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
}

impl SalePaymentUpdate {
    pub fn balance(&self) -> DocumentBalance {
        DocumentBalance {
            amount_paid_cents: self.amount_paid_cents,
            total_cents: self.total_cents,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OpenReceivableRow {
    sale_id: String,
    customer_id: String,
    customer_name: String,
    due_date: DateTime<Utc>,
    remaining_cents: i64,
}

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, tenant_id, id).await
    }

    /// Lines of a sale, in insertion order. Empty for another tenant's sale.
    pub async fn get_items(&self, tenant_id: &str, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT si.id, si.sale_id, si.item_id, si.quantity, si.price_cents,
                   si.discount_cents, si.total_cents
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            WHERE si.sale_id = ?1 AND s.tenant_id = ?2
            ORDER BY si.rowid
            "#,
        )
        .bind(sale_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Every sale for one customer. Ordering is left to the statement
    /// builder.
    pub async fn list_for_customer(&self, tenant_id: &str, customer_id: &str) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE tenant_id = ?1 AND customer_id = ?2"
        ))
        .bind(tenant_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Sum of tax charged on sales dated in `[start, end)`.
    pub async fn tax_collected(
        &self,
        tenant_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(tax_cents), 0) FROM sales \
             WHERE tenant_id = ?1 AND date >= ?2 AND date < ?3",
        )
        .bind(tenant_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents))
    }

    /// Credit sales that still have money outstanding, with the customer's
    /// name attached.
    pub async fn list_open_receivables(&self, tenant_id: &str) -> DbResult<Vec<OpenReceivable>> {
        let rows = sqlx::query_as::<_, OpenReceivableRow>(
            r#"
            SELECT s.id AS sale_id,
                   s.customer_id AS customer_id,
                   c.name AS customer_name,
                   s.due_date AS due_date,
                   s.total_cents - s.amount_paid_cents AS remaining_cents
            FROM sales s
            JOIN customers c ON c.id = s.customer_id AND c.tenant_id = s.tenant_id
            WHERE s.tenant_id = ?1
              AND s.payment_method = 'credit'
              AND s.payment_status IN ('pending', 'partial')
              AND s.due_date IS NOT NULL
              AND s.total_cents > s.amount_paid_cents
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| OpenReceivable {
                sale_id: row.sale_id,
                customer_id: row.customer_id,
                customer_name: row.customer_name,
                due_date: row.due_date,
                amount_remaining: Money::from_cents(row.remaining_cents),
            })
            .collect())
    }
}

// =============================================================================
// Transaction Functions
// =============================================================================

pub async fn get(conn: &mut SqliteConnection, tenant_id: &str, id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1 AND tenant_id = ?2"
    ))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(sale)
}

pub async fn insert(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, invoice = %sale.invoice_number, total = sale.total_cents, "Inserting sale");

    sqlx::query(&format!(
        "INSERT INTO sales ({SALE_COLUMNS}) VALUES \
         (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
    ))
    .bind(&sale.id)
    .bind(&sale.tenant_id)
    .bind(&sale.invoice_number)
    .bind(sale.date)
    .bind(&sale.customer_id)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.tax_cents)
    .bind(sale.total_cents)
    .bind(sale.payment_method)
    .bind(&sale.payment_account_id)
    .bind(sale.payment_status)
    .bind(sale.amount_paid_cents)
    .bind(sale.due_date)
    .bind(&sale.notes)
    .bind(&sale.created_by)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(&format!(
        "INSERT INTO sale_items ({SALE_ITEM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
    ))
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.item_id)
    .bind(item.quantity)
    .bind(item.price_cents)
    .bind(item.discount_cents)
    .bind(item.total_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Adds `delta_cents` (negative when a payment is reversed) to what has
/// been paid on the sale. Returns `None` if no such sale.
pub async fn add_payment(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    delta_cents: i64,
) -> DbResult<Option<SalePaymentUpdate>> {
    debug!(id = %id, delta_cents, "Applying payment to sale");

    let update = sqlx::query_as::<_, SalePaymentUpdate>(
        r#"
        UPDATE sales SET
            amount_paid_cents = amount_paid_cents + ?3,
            updated_at = ?4
        WHERE id = ?1 AND tenant_id = ?2
        RETURNING amount_paid_cents, total_cents, payment_method
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(delta_cents)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(update)
}

pub async fn set_payment_status(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    status: PaymentStatus,
) -> DbResult<()> {
    sqlx::query("UPDATE sales SET payment_status = ?3 WHERE id = ?1 AND tenant_id = ?2")
        .bind(id)
        .bind(tenant_id)
        .bind(status)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
