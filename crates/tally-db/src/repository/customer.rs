//! # Customer Repository
//!
//! `outstanding_balance_cents` is only ever changed by [`adjust_balance`],
//! a single delta update inside the ledger's transaction.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::Customer;

const CUSTOMER_COLUMNS: &str = "id, tenant_id, name, phone, email, address, \
     outstanding_balance_cents, created_at, updated_at";

/// Contact details for a new customer or supplier. Balances start at zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCounterparty {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl NewCounterparty {
    pub fn named(name: impl Into<String>) -> Self {
        NewCounterparty {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn create(&self, tenant_id: &str, new: NewCounterparty) -> DbResult<Customer> {
        let now = Utc::now();
        let customer = Customer {
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

        debug!(id = %customer.id, name = %customer.name, "Creating customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, tenant_id, name, phone, email, address,
                outstanding_balance_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.tenant_id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(customer.outstanding_balance_cents)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, tenant_id, id).await
    }

    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE tenant_id = ?1 ORDER BY name, id"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }
}

// =============================================================================
// Transaction Functions
// =============================================================================

pub async fn get(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1 AND tenant_id = ?2"
    ))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

/// Adds `delta_cents` (may be negative) to the customer's outstanding
/// balance. Returns the new balance, or `None` if no such customer.
pub async fn adjust_balance(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    delta_cents: i64,
) -> DbResult<Option<i64>> {
    debug!(id = %id, delta_cents, "Adjusting customer balance");

    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE customers SET
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_adjust_balance_is_cumulative() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = db.tenants().create("Shop").await.unwrap();
        let customer = db
            .customers()
            .create(&tenant.id, NewCounterparty::named("Ayesha"))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(
            adjust_balance(&mut conn, &tenant.id, &customer.id, 20000).await.unwrap(),
            Some(20000)
        );
        assert_eq!(
            adjust_balance(&mut conn, &tenant.id, &customer.id, -8000).await.unwrap(),
            Some(12000)
        );
        assert_eq!(
            adjust_balance(&mut conn, &tenant.id, "missing", 1).await.unwrap(),
            None
        );
    }
}
