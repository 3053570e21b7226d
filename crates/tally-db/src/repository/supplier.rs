//! # Supplier Repository
//!
//! Mirror of the customer repository. A positive balance is money the
//! tenant owes the supplier.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::customer::NewCounterparty;
use tally_core::Supplier;

const SUPPLIER_COLUMNS: &str = "id, tenant_id, name, phone, email, address, \
     outstanding_balance_cents, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn create(&self, tenant_id: &str, new: NewCounterparty) -> DbResult<Supplier> {
        let now = Utc::now();
        let supplier = Supplier {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: new.name.trim().to_string(),
            phone: new.phone,
            email: new.email,
            address: new.address,
            outstanding_balance_cents: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %supplier.id, name = %supplier.name, "Creating supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, tenant_id, name, phone, email, address,
                outstanding_balance_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.tenant_id)
        .bind(&supplier.name)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.address)
        .bind(supplier.outstanding_balance_cents)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(supplier)
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Supplier>> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, tenant_id, id).await
    }

    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE tenant_id = ?1 ORDER BY name, id"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }
}

// =============================================================================
// Transaction Functions
// =============================================================================

pub async fn get(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<Supplier>> {
    let supplier = sqlx::query_as::<_, Supplier>(&format!(
        "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = ?1 AND tenant_id = ?2"
    ))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(supplier)
}

/// Adds `delta_cents` to what the tenant owes the supplier. Returns the new
/// balance, or `None` if no such supplier.
pub async fn adjust_balance(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    delta_cents: i64,
) -> DbResult<Option<i64>> {
    debug!(id = %id, delta_cents, "Adjusting supplier balance");

    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE suppliers SET
            outstanding_balance_cents = outstanding_balance_cents + ?3,
            updated_at = ?4
        WHERE id = ?1 AND tenant_id = ?2
        RETURNING outstanding_balance_cents
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
