//! # Payment Account Repository
//!
//! Cash drawers, bank accounts and wallets. Balances move only through
//! [`adjust_balance`]; there is no floor, an account may be overdrawn.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::{AccountType, PaymentAccount};

const ACCOUNT_COLUMNS: &str =
    "id, tenant_id, name, account_type, balance_cents, currency, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaymentAccount {
    pub name: String,
    pub account_type: AccountType,
    pub opening_balance_cents: i64,
    pub currency: String,
}

impl NewPaymentAccount {
    pub fn cash(name: impl Into<String>) -> Self {
        NewPaymentAccount {
            name: name.into(),
            account_type: AccountType::Cash,
            opening_balance_cents: 0,
            currency: "USD".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentAccountRepository {
    pool: SqlitePool,
}

impl PaymentAccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentAccountRepository { pool }
    }

    pub async fn create(&self, tenant_id: &str, new: NewPaymentAccount) -> DbResult<PaymentAccount> {
        let now = Utc::now();
        let account = PaymentAccount {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: new.name.trim().to_string(),
            account_type: new.account_type,
            balance_cents: new.opening_balance_cents,
            currency: new.currency,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %account.id, name = %account.name, "Creating payment account");

        sqlx::query(
            r#"
            INSERT INTO payment_accounts (
                id, tenant_id, name, account_type, balance_cents, currency,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&account.id)
        .bind(&account.tenant_id)
        .bind(&account.name)
        .bind(account.account_type)
        .bind(account.balance_cents)
        .bind(&account.currency)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(account)
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<PaymentAccount>> {
        let account = sqlx::query_as::<_, PaymentAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM payment_accounts WHERE id = ?1 AND tenant_id = ?2"
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<PaymentAccount>> {
        let accounts = sqlx::query_as::<_, PaymentAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM payment_accounts WHERE tenant_id = ?1 ORDER BY name, id"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }
}

/// Adds `delta_cents` (negative for money paid out). Returns the new
/// balance, or `None` if no such account.
pub async fn adjust_balance(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    delta_cents: i64,
) -> DbResult<Option<i64>> {
    debug!(id = %id, delta_cents, "Adjusting account balance");

    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE payment_accounts SET
            balance_cents = balance_cents + ?3,
            updated_at = ?4
        WHERE id = ?1 AND tenant_id = ?2
        RETURNING balance_cents
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
