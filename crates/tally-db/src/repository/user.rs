//! # User Repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::{User, UserRole};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn create(&self, tenant_id: &str, name: &str, role: UserRole) -> DbResult<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: name.trim().to_string(),
            role,
            created_at: Utc::now(),
        };

        debug!(id = %user.id, tenant_id = %tenant_id, role = ?role, "Creating user");

        sqlx::query(
            "INSERT INTO users (id, tenant_id, name, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&user.id)
        .bind(&user.tenant_id)
        .bind(&user.name)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Users of a tenant holding the given role, oldest first.
    pub async fn list_by_role(&self, tenant_id: &str, role: UserRole) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, tenant_id, name, role, created_at
            FROM users
            WHERE tenant_id = ?1 AND role = ?2
            ORDER BY created_at, id
            "#,
        )
        .bind(tenant_id)
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
