//! # Collaborator Traits
//!
//! The ledger reads one thing from outside (the tenant's tax rate) and
//! pushes two things out (notifications, activity records).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   SettingsProvider ──tax_rate──►  LedgerService                        │
//! │                                        │ commit                         │
//! │                                        ▼                                │
//! │                                  EventDispatcher (background task)      │
//! │                                   │                 │                   │
//! │                                   ▼                 ▼                   │
//! │                          NotificationSink     ActivityLogSink           │
//! │                                                                         │
//! │   Sink failures are logged with warn! and dropped. They never reach    │
//! │   the caller and never undo a committed operation.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use tally_core::TaxRate;
use tally_db::Database;
use thiserror::Error;

use crate::error::LedgerResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

// =============================================================================
// Traits
// =============================================================================

#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Tax rate applied to the tenant's sales and purchases.
    async fn tax_rate(&self, tenant_id: &str) -> LedgerResult<TaxRate>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        tenant_id: &str,
        user_id: &str,
        title: &str,
        message: &str,
        severity: Severity,
    ) -> Result<(), SinkError>;
}

#[async_trait]
pub trait ActivityLogSink: Send + Sync {
    async fn log_action(
        &self,
        tenant_id: &str,
        user_id: &str,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        details: &Value,
    ) -> Result<(), SinkError>;
}

// =============================================================================
// Settings from the database
// =============================================================================

/// Reads `tenant_settings`, falling back to a fixed default rate for tenants
/// that have none.
#[derive(Debug, Clone)]
pub struct DbSettingsProvider {
    db: Database,
    default_rate: TaxRate,
}

impl DbSettingsProvider {
    pub fn new(db: Database, default_rate: TaxRate) -> Self {
        DbSettingsProvider { db, default_rate }
    }
}

#[async_trait]
impl SettingsProvider for DbSettingsProvider {
    async fn tax_rate(&self, tenant_id: &str) -> LedgerResult<TaxRate> {
        let settings = self.db.tenants().settings(tenant_id).await?;
        Ok(settings.map(|s| s.tax_rate()).unwrap_or(self.default_rate))
    }
}

/// Same rate for every tenant.
#[derive(Debug, Clone, Copy)]
pub struct FixedTaxRate(pub TaxRate);

#[async_trait]
impl SettingsProvider for FixedTaxRate {
    async fn tax_rate(&self, _tenant_id: &str) -> LedgerResult<TaxRate> {
        Ok(self.0)
    }
}

// =============================================================================
// Logging and recording sinks
// =============================================================================

/// Writes notifications and activity to the tracing log. The default when no
/// delivery channel is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn notify(
        &self,
        tenant_id: &str,
        user_id: &str,
        title: &str,
        message: &str,
        severity: Severity,
    ) -> Result<(), SinkError> {
        tracing::info!(tenant_id, user_id, ?severity, title, body = message, "Notification");
        Ok(())
    }
}

#[async_trait]
impl ActivityLogSink for TracingSink {
    async fn log_action(
        &self,
        tenant_id: &str,
        user_id: &str,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        details: &Value,
    ) -> Result<(), SinkError> {
        tracing::info!(tenant_id, user_id, action, entity_type, entity_id, %details, "Activity");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedNotification {
    pub tenant_id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedActivity {
    pub tenant_id: String,
    pub user_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub details: Value,
}

/// Keeps everything it receives in memory. Used by tests and by callers that
/// want to inspect what an operation emitted.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<RecordedNotification>>,
    activities: Mutex<Vec<RecordedActivity>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<RecordedNotification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn activities(&self) -> Vec<RecordedActivity> {
        self.activities
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(
        &self,
        tenant_id: &str,
        user_id: &str,
        title: &str,
        message: &str,
        severity: Severity,
    ) -> Result<(), SinkError> {
        let mut notifications = self
            .notifications
            .lock()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        notifications.push(RecordedNotification {
            tenant_id: tenant_id.to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            severity,
        });
        Ok(())
    }
}

#[async_trait]
impl ActivityLogSink for RecordingSink {
    async fn log_action(
        &self,
        tenant_id: &str,
        user_id: &str,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        details: &Value,
    ) -> Result<(), SinkError> {
        let mut activities = self
            .activities
            .lock()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        activities.push(RecordedActivity {
            tenant_id: tenant_id.to_string(),
            user_id: user_id.to_string(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            details: details.clone(),
        });
        Ok(())
    }
}

/// Fails every call. Lets tests check that sink failures stay contained.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn notify(
        &self,
        _tenant_id: &str,
        _user_id: &str,
        _title: &str,
        _message: &str,
        _severity: Severity,
    ) -> Result<(), SinkError> {
        Err(SinkError::DeliveryFailed("notification channel down".into()))
    }
}

#[async_trait]
impl ActivityLogSink for FailingSink {
    async fn log_action(
        &self,
        _tenant_id: &str,
        _user_id: &str,
        _action: &str,
        _entity_type: &str,
        _entity_id: &str,
        _details: &Value,
    ) -> Result<(), SinkError> {
        Err(SinkError::DeliveryFailed("activity log down".into()))
    }
}
