//! # Post-Commit Events
//!
//! Low-stock alerts and activity records are handed to a background task
//! once the operation's transaction has committed.
//!
//! ## Dispatcher Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  LedgerService                 mpsc (bounded)          dispatcher task  │
//! │  ─────────────                 ──────────────          ───────────────  │
//! │  tx.commit() ──► dispatch() ──► [ev][ev][ev] ──► recv ─┬─► LowStock     │
//! │                  (try_send,                            │   admins of    │
//! │                   never waits)                         │   tenant →     │
//! │                                                        │   notify()     │
//! │                                                        │                │
//! │                                                        ├─► Activity     │
//! │                                                        │   log_action() │
//! │                                                        │                │
//! │  flush().await ──► [Flush(oneshot)] ───────────────────┴─► reply        │
//! │                                                                         │
//! │  A full queue drops the event with a warning; the caller's result is   │
//! │  already decided by then.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::Value;
use std::sync::Arc;
use tally_core::UserRole;
use tally_db::Database;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::sinks::{ActivityLogSink, NotificationSink, Severity};
use crate::stock::LowStockAlert;

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    LowStock {
        tenant_id: String,
        alert: LowStockAlert,
    },
    Activity(ActivityRecord),
}

/// One activity-log entry: who did what to which document.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub tenant_id: String,
    pub user_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub details: Value,
}

enum Command {
    Event(LedgerEvent),
    Flush(oneshot::Sender<()>),
}

/// Handle to the dispatcher task. Cheap to clone; the task exits when the
/// last handle is dropped.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    tx: mpsc::Sender<Command>,
}

impl EventDispatcher {
    /// Spawns the dispatcher task. Must be called inside a tokio runtime.
    pub fn spawn(
        db: Database,
        notifications: Arc<dyn NotificationSink>,
        activity: Arc<dyn ActivityLogSink>,
        buffer: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        tokio::spawn(run(rx, db, notifications, activity));
        EventDispatcher { tx }
    }

    /// Queues an event without waiting.
    pub fn dispatch(&self, event: LedgerEvent) {
        if let Err(e) = self.tx.try_send(Command::Event(event)) {
            warn!(error = %e, "Dropping ledger event");
        }
    }

    /// Waits until every event queued before this call has been handled.
    pub async fn flush(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(reply_tx)).await.is_err() {
            return;
        }
        let _ = reply_rx.await;
    }
}

async fn run(
    mut rx: mpsc::Receiver<Command>,
    db: Database,
    notifications: Arc<dyn NotificationSink>,
    activity: Arc<dyn ActivityLogSink>,
) {
    debug!("Event dispatcher started");

    while let Some(command) = rx.recv().await {
        match command {
            Command::Event(LedgerEvent::LowStock { tenant_id, alert }) => {
                notify_admins(&db, notifications.as_ref(), &tenant_id, &alert).await;
            }
            Command::Event(LedgerEvent::Activity(record)) => {
                if let Err(e) = activity
                    .log_action(
                        &record.tenant_id,
                        &record.user_id,
                        &record.action,
                        &record.entity_type,
                        &record.entity_id,
                        &record.details,
                    )
                    .await
                {
                    warn!(error = %e, action = %record.action, "Activity log write failed");
                }
            }
            Command::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }

    debug!("Event dispatcher stopped");
}

async fn notify_admins(
    db: &Database,
    notifications: &dyn NotificationSink,
    tenant_id: &str,
    alert: &LowStockAlert,
) {
    let admins = match db.users().list_by_role(tenant_id, UserRole::Admin).await {
        Ok(admins) => admins,
        Err(e) => {
            warn!(error = %e, tenant_id, "Could not load admins for low-stock alert");
            return;
        }
    };

    info!(
        tenant_id,
        item_id = %alert.item_id,
        quantity = alert.quantity,
        recipients = admins.len(),
        "Low stock"
    );

    let title = format!("Low stock: {}", alert.item_name);
    let message = format!(
        "{} is down to {} (minimum {}).",
        alert.item_name, alert.quantity, alert.min_stock
    );
    let severity = if alert.quantity <= 0 {
        Severity::Critical
    } else {
        Severity::Warning
    };

    for admin in admins {
        if let Err(e) = notifications
            .notify(tenant_id, &admin.id, &title, &message, severity)
            .await
        {
            warn!(error = %e, user_id = %admin.id, "Low-stock notification failed");
        }
    }
}
