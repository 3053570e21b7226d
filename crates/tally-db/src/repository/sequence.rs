//! # Invoice Sequences
//!
//! One counter row per `(tenant_id, kind)`. The upsert below both creates
//! the row on first use and increments it, in one statement, and its write
//! lock is held until the surrounding transaction ends. A rolled-back sale
//! therefore gives its number back.
//!
//! Purchases may also carry the supplier's own number, which can look like a
//! generated one. [`next_unused_invoice_number`] steps past any value that is
//! already stored, so one such number never blocks the counter.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use tally_core::InvoiceKind;

/// Reserves the next value of the tenant's counter for `kind`.
pub async fn next_value(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    kind: InvoiceKind,
) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_sequences (tenant_id, kind, last_value)
        VALUES (?1, ?2, 1)
        ON CONFLICT(tenant_id, kind) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(tenant_id)
    .bind(kind)
    .fetch_one(&mut *conn)
    .await?;

    debug!(tenant_id = %tenant_id, kind = %kind, value, "Reserved invoice sequence");

    Ok(value)
}

/// Reserves and renders the next invoice number, e.g. `INV-000007`.
pub async fn next_invoice_number(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    kind: InvoiceKind,
) -> DbResult<String> {
    Ok(kind.render(next_value(conn, tenant_id, kind).await?))
}

/// Like [`next_invoice_number`], but skips numbers already stored for the
/// tenant. Skipped values stay consumed.
pub async fn next_unused_invoice_number(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    kind: InvoiceKind,
) -> DbResult<String> {
    loop {
        let number = next_invoice_number(conn, tenant_id, kind).await?;
        if !invoice_number_taken(conn, tenant_id, kind, &number).await? {
            return Ok(number);
        }
        debug!(tenant_id = %tenant_id, number = %number, "Invoice number already stored, skipping");
    }
}

async fn invoice_number_taken(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    kind: InvoiceKind,
    number: &str,
) -> DbResult<bool> {
    let table = match kind {
        InvoiceKind::Sale => "sales",
        InvoiceKind::Purchase => "purchases",
    };

    let taken: bool = sqlx::query_scalar(&format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE tenant_id = ?1 AND invoice_number = ?2)"
    ))
    .bind(tenant_id)
    .bind(number)
    .fetch_one(&mut *conn)
    .await?;

    Ok(taken)
}
