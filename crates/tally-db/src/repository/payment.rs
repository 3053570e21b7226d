//! # Payment Repository
//!
//! Payments are stored with two nullable counterparty columns and read back
//! as a [`PaymentTarget`]. The table's CHECK constraint guarantees exactly
//! one is set; a row that breaks that is reported as an internal error.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{Payment, PaymentMethod, PaymentTarget};

const PAYMENT_COLUMNS: &str = "id, tenant_id, amount_cents, date, payment_method, customer_id, \
     supplier_id, payment_account_id, sale_id, purchase_id, reference, notes, created_by, created_at";

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    tenant_id: String,
    amount_cents: i64,
    date: DateTime<Utc>,
    payment_method: PaymentMethod,
    customer_id: Option<String>,
    supplier_id: Option<String>,
    payment_account_id: Option<String>,
    sale_id: Option<String>,
    purchase_id: Option<String>,
    reference: Option<String>,
    notes: Option<String>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DbError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let target = PaymentTarget::from_parts(row.customer_id, row.supplier_id)
            .map_err(|_| DbError::Internal(format!("payment {} has no single counterparty", row.id)))?;

        Ok(Payment {
            id: row.id,
            tenant_id: row.tenant_id,
            amount_cents: row.amount_cents,
            date: row.date,
            payment_method: row.payment_method,
            target,
            payment_account_id: row.payment_account_id,
            sale_id: row.sale_id,
            purchase_id: row.purchase_id,
            reference: row.reference,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

fn into_payments(rows: Vec<PaymentRow>) -> DbResult<Vec<Payment>> {
    rows.into_iter().map(Payment::try_from).collect()
}

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1 AND tenant_id = ?2"
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Payment::try_from).transpose()
    }

    pub async fn list_for_customer(&self, tenant_id: &str, customer_id: &str) -> DbResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE tenant_id = ?1 AND customer_id = ?2"
        ))
        .bind(tenant_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        into_payments(rows)
    }

    pub async fn list_for_supplier(&self, tenant_id: &str, supplier_id: &str) -> DbResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE tenant_id = ?1 AND supplier_id = ?2"
        ))
        .bind(tenant_id)
        .bind(supplier_id)
        .fetch_all(&self.pool)
        .await?;

        into_payments(rows)
    }

    /// Payments allocated to one sale.
    pub async fn list_for_sale(&self, tenant_id: &str, sale_id: &str) -> DbResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE tenant_id = ?1 AND sale_id = ?2 \
             ORDER BY created_at, id"
        ))
        .bind(tenant_id)
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        into_payments(rows)
    }

    /// Payments allocated to one purchase.
    pub async fn list_for_purchase(&self, tenant_id: &str, purchase_id: &str) -> DbResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE tenant_id = ?1 AND purchase_id = ?2 \
             ORDER BY created_at, id"
        ))
        .bind(tenant_id)
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        into_payments(rows)
    }
}

// =============================================================================
// Transaction Functions
// =============================================================================

pub async fn insert(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
    debug!(id = %payment.id, amount = payment.amount_cents, target = ?payment.target, "Inserting payment");

    sqlx::query(&format!(
        "INSERT INTO payments ({PAYMENT_COLUMNS}) VALUES \
         (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
    ))
    .bind(&payment.id)
    .bind(&payment.tenant_id)
    .bind(payment.amount_cents)
    .bind(payment.date)
    .bind(payment.payment_method)
    .bind(payment.target.customer_id())
    .bind(payment.target.supplier_id())
    .bind(&payment.payment_account_id)
    .bind(&payment.sale_id)
    .bind(&payment.purchase_id)
    .bind(&payment.reference)
    .bind(&payment.notes)
    .bind(&payment.created_by)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Deletes a payment and hands back what was deleted, so the caller can
/// reverse its effects. `None` if no such payment.
pub async fn delete(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<Payment>> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
        "DELETE FROM payments WHERE id = ?1 AND tenant_id = ?2 RETURNING {PAYMENT_COLUMNS}"
    ))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?;

    if row.is_some() {
        debug!(id = %id, "Payment deleted");
    }

    row.map(Payment::try_from).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::customer::NewCounterparty;
    use crate::{Database, DbConfig};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_delete_returns_typed_target() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = db.tenants().create("Shop").await.unwrap();
        let customer = db
            .customers()
            .create(&tenant.id, NewCounterparty::named("Bilal"))
            .await
            .unwrap();

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant.id.clone(),
            amount_cents: 5000,
            date: now,
            payment_method: PaymentMethod::Cash,
            target: PaymentTarget::Customer(customer.id.clone()),
            payment_account_id: None,
            sale_id: None,
            purchase_id: None,
            reference: Some("RCPT-1".to_string()),
            notes: None,
            created_by: None,
            created_at: now,
        };

        let other = db.tenants().create("Other").await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, &payment).await.unwrap();

        assert!(delete(&mut conn, &other.id, &payment.id).await.unwrap().is_none());

        let deleted = delete(&mut conn, &tenant.id, &payment.id).await.unwrap().unwrap();
        assert_eq!(deleted.target, PaymentTarget::Customer(customer.id));
        assert_eq!(deleted.amount_cents, 5000);
        assert!(delete(&mut conn, &tenant.id, &payment.id).await.unwrap().is_none());
    }
}
