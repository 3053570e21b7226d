//! # Inventory Item Repository
//!
//! Item setup plus the two stock mutations the ledger performs.
//!
//! ## Delta Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WRONG (read-modify-write, loses updates):                              │
//! │     SELECT quantity → 10                                                │
//! │     UPDATE items SET quantity = 8                                       │
//! │                                                                         │
//! │  RIGHT (delta with guard, one statement):                               │
//! │     UPDATE items SET quantity = quantity - 2                            │
//! │     WHERE id = ? AND tenant_id = ? AND quantity >= 2                    │
//! │     RETURNING quantity, min_stock                                       │
//! │                                                                         │
//! │  No row back → item missing, other tenant, or not enough stock.         │
//! │  The caller tells these apart with a follow-up read in the same         │
//! │  transaction.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::InventoryItem;

const ITEM_COLUMNS: &str = "id, tenant_id, name, quantity, min_stock, purchase_price_cents, \
     selling_price_cents, tax_rate_bps, created_at, updated_at";

/// Fields needed to create an item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub quantity: i64,
    pub min_stock: i64,
    pub purchase_price_cents: i64,
    pub selling_price_cents: i64,
    pub tax_rate_bps: u32,
}

/// Stock position returned by a quantity update.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StockLevel {
    pub id: String,
    pub name: String,
    pub quantity: i64,
    pub min_stock: i64,
}

impl StockLevel {
    pub fn is_low(&self) -> bool {
        self.quantity <= self.min_stock
    }
}

#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Creates an item with an opening quantity.
    pub async fn create(&self, tenant_id: &str, new: NewItem) -> DbResult<InventoryItem> {
        let now = Utc::now();
        let item = InventoryItem {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: new.name.trim().to_string(),
            quantity: new.quantity,
            min_stock: new.min_stock,
            purchase_price_cents: new.purchase_price_cents,
            selling_price_cents: new.selling_price_cents,
            tax_rate_bps: new.tax_rate_bps,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %item.id, name = %item.name, quantity = item.quantity, "Creating item");

        sqlx::query(
            r#"
            INSERT INTO items (
                id, tenant_id, name, quantity, min_stock,
                purchase_price_cents, selling_price_cents, tax_rate_bps,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.tenant_id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.min_stock)
        .bind(item.purchase_price_cents)
        .bind(item.selling_price_cents)
        .bind(item.tax_rate_bps)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(item)
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<InventoryItem>> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, tenant_id, id).await
    }

    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE tenant_id = ?1 ORDER BY name, id"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

// =============================================================================
// Transaction Functions
// =============================================================================

/// Reads an item inside the caller's transaction.
pub async fn get(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<InventoryItem>> {
    let item = sqlx::query_as::<_, InventoryItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1 AND tenant_id = ?2"
    ))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(item)
}

/// Takes `qty` units out of stock.
///
/// With `allow_negative == false` the update only applies when at least
/// `qty` units are on hand. Returns `None` when no row was updated.
pub async fn decrement_quantity(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    qty: i64,
    allow_negative: bool,
) -> DbResult<Option<StockLevel>> {
    debug!(id = %id, qty, allow_negative, "Decrementing stock");

    let level = sqlx::query_as::<_, StockLevel>(
        r#"
        UPDATE items SET
            quantity = quantity - ?3,
            updated_at = ?5
        WHERE id = ?1 AND tenant_id = ?2 AND (?4 OR quantity >= ?3)
        RETURNING id, name, quantity, min_stock
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(qty)
    .bind(allow_negative)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(level)
}

/// Puts `qty` units into stock and records `unit_price_cents` as the
/// item's purchase price (the most recent receipt wins).
pub async fn receive_quantity(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    qty: i64,
    unit_price_cents: i64,
) -> DbResult<Option<StockLevel>> {
    debug!(id = %id, qty, unit_price_cents, "Receiving stock");

    let level = sqlx::query_as::<_, StockLevel>(
        r#"
        UPDATE items SET
            quantity = quantity + ?3,
            purchase_price_cents = ?4,
            updated_at = ?5
        WHERE id = ?1 AND tenant_id = ?2
        RETURNING id, name, quantity, min_stock
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(qty)
    .bind(unit_price_cents)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(level)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn setup() -> (Database, String, InventoryItem) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = db.tenants().create("Shop").await.unwrap();
        let item = db
            .items()
            .create(
                &tenant.id,
                NewItem {
                    name: "Rice 5kg".to_string(),
                    quantity: 5,
                    min_stock: 2,
                    selling_price_cents: 1200,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        (db, tenant.id, item)
    }

    #[tokio::test]
    async fn test_decrement_guard() {
        let (db, tenant, item) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let level = decrement_quantity(&mut conn, &tenant, &item.id, 3, false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(level.quantity, 2);
        assert!(level.is_low());

        // Only 2 left: guarded decrement of 3 does nothing
        assert!(decrement_quantity(&mut conn, &tenant, &item.id, 3, false)
            .await
            .unwrap()
            .is_none());

        // Backorders allowed: goes negative
        let level = decrement_quantity(&mut conn, &tenant, &item.id, 3, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(level.quantity, -1);
    }

    #[tokio::test]
    async fn test_other_tenant_cannot_touch_stock() {
        let (db, _tenant, item) = setup().await;
        let other = db.tenants().create("Other").await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        assert!(decrement_quantity(&mut conn, &other.id, &item.id, 1, true)
            .await
            .unwrap()
            .is_none());
        drop(conn);

        assert!(db.items().get(&other.id, &item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_receive_overwrites_purchase_price() {
        let (db, tenant, item) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        receive_quantity(&mut conn, &tenant, &item.id, 10, 800).await.unwrap();
        drop(conn);

        let item = db.items().get(&tenant, &item.id).await.unwrap().unwrap();
        assert_eq!(item.quantity, 15);
        assert_eq!(item.purchase_price_cents, 800);
    }
}
