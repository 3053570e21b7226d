//! # Stock Adjustment
//!
//! Quantity changes driven by sales and purchase receipts. Both run on the
//! caller's transaction connection and use single-statement delta updates,
//! so two operations touching the same item can never lose an update.
//!
//! ## Oversell Policy
//! ```text
//!   on hand: 3, line asks for 5
//!
//!   RejectOversell  → InsufficientStock { available: 3, requested: 5 },
//!                     whole sale rolled back
//!   AllowBackorder  → quantity becomes -2, sale goes through
//! ```

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::collections::BTreeMap;
use tally_core::{Purchase, PurchaseItem, SaleItem};
use tally_db::repository::item;
use tally_db::StockLevel;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    #[default]
    RejectOversell,
    AllowBackorder,
}

impl StockPolicy {
    pub fn allows_negative(&self) -> bool {
        matches!(self, StockPolicy::AllowBackorder)
    }
}

/// An item at or below its minimum after a decrement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockAlert {
    pub item_id: String,
    pub item_name: String,
    pub quantity: i64,
    pub min_stock: i64,
}

impl From<StockLevel> for LowStockAlert {
    fn from(level: StockLevel) -> Self {
        LowStockAlert {
            item_id: level.id,
            item_name: level.name,
            quantity: level.quantity,
            min_stock: level.min_stock,
        }
    }
}

/// Takes each sale line out of stock.
///
/// Returns one alert per item that ended at or below its minimum, however
/// many lines referenced it.
pub async fn apply_sale_stock(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    lines: &[SaleItem],
    policy: StockPolicy,
) -> LedgerResult<Vec<LowStockAlert>> {
    let mut low: BTreeMap<String, LowStockAlert> = BTreeMap::new();

    for line in lines {
        let level = item::decrement_quantity(
            conn,
            tenant_id,
            &line.item_id,
            line.quantity,
            policy.allows_negative(),
        )
        .await?;

        let level = match level {
            Some(level) => level,
            None => return Err(explain_rejected_decrement(conn, tenant_id, line).await),
        };

        if level.is_low() {
            low.insert(level.id.clone(), level.into());
        } else {
            low.remove(&level.id);
        }
    }

    Ok(low.into_values().collect())
}

/// The guarded update matched nothing: either the item is gone or there
/// was not enough on hand.
async fn explain_rejected_decrement(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    line: &SaleItem,
) -> LedgerError {
    match item::get(conn, tenant_id, &line.item_id).await {
        Ok(Some(current)) => {
            debug!(
                item_id = %line.item_id,
                available = current.quantity,
                requested = line.quantity,
                "Oversell rejected"
            );
            LedgerError::InsufficientStock {
                item_id: line.item_id.clone(),
                available: current.quantity,
                requested: line.quantity,
            }
        }
        Ok(None) => LedgerError::not_found("Item", &line.item_id),
        Err(e) => e.into(),
    }
}

/// Puts a received purchase's lines into stock, recording each line's unit
/// price as the item's purchase price.
///
/// Only call this after the purchase's ordered → received transition
/// succeeded in the same transaction.
pub async fn apply_purchase_receipt(
    conn: &mut SqliteConnection,
    purchase: &Purchase,
    lines: &[PurchaseItem],
) -> LedgerResult<()> {
    for line in lines {
        item::receive_quantity(
            conn,
            &purchase.tenant_id,
            &line.item_id,
            line.quantity,
            line.price_cents,
        )
        .await?
        .ok_or_else(|| LedgerError::not_found("Item", &line.item_id))?;
    }

    debug!(purchase_id = %purchase.id, lines = lines.len(), "Purchase stock received");
    Ok(())
}
