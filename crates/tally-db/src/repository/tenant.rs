//! # Tenant Repository
//!
//! Tenants and their ledger settings (tax rate, currency).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::{Tenant, TenantSettings};

#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: SqlitePool,
}

impl TenantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TenantRepository { pool }
    }

    /// Creates a tenant.
    pub async fn create(&self, name: &str) -> DbResult<Tenant> {
        let tenant = Tenant {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };

        debug!(id = %tenant.id, name = %tenant.name, "Creating tenant");

        sqlx::query("INSERT INTO tenants (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&tenant.id)
            .bind(&tenant.name)
            .bind(tenant.created_at)
            .execute(&self.pool)
            .await?;

        Ok(tenant)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, created_at FROM tenants WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    /// Returns the tenant's settings row, if one has been written.
    pub async fn settings(&self, tenant_id: &str) -> DbResult<Option<TenantSettings>> {
        let settings = sqlx::query_as::<_, TenantSettings>(
            r#"
            SELECT tenant_id, tax_rate_bps, currency, updated_at
            FROM tenant_settings
            WHERE tenant_id = ?1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings)
    }

    /// Inserts or replaces the tenant's settings.
    pub async fn upsert_settings(
        &self,
        tenant_id: &str,
        tax_rate_bps: u32,
        currency: &str,
    ) -> DbResult<TenantSettings> {
        debug!(tenant_id = %tenant_id, tax_rate_bps, "Updating tenant settings");

        let settings = sqlx::query_as::<_, TenantSettings>(
            r#"
            INSERT INTO tenant_settings (tenant_id, tax_rate_bps, currency, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(tenant_id) DO UPDATE SET
                tax_rate_bps = excluded.tax_rate_bps,
                currency = excluded.currency,
                updated_at = excluded.updated_at
            RETURNING tenant_id, tax_rate_bps, currency, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(tax_rate_bps)
        .bind(currency)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(settings)
    }
}
