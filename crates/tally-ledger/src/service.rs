//! # Ledger Service
//!
//! The orchestrator. Each operation is one SQLite transaction that either
//! applies every effect (document, stock, balances) or none of them.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  validate request ──► tax rate (sales/purchases) ──► BEGIN              │
//! │                                                        │                │
//! │        first statement is always a write ◄─────────────┘                │
//! │        ┌────────────────────┬──────────────────────────────┐            │
//! │        │ create_sale        │ invoice counter bump         │            │
//! │        │ create_purchase    │ supplier row touch           │            │
//! │        │ receive_purchase   │ ordered → received CAS       │            │
//! │        │ record_*_payment   │ document amount_paid delta   │            │
//! │        │ create_payment     │ counterparty balance delta   │            │
//! │        │ delete_payment     │ DELETE ... RETURNING         │            │
//! │        └────────────────────┴──────────────────────────────┘            │
//! │                        │                                                │
//! │                        ▼                                                │
//! │           reads + delta updates ──► COMMIT ──► events (post-commit)     │
//! │                        │                                                │
//! │                   any error: Transaction dropped = ROLLBACK             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Taking the write lock first means concurrent operations on the same
//! tenant queue up behind SQLite's busy timeout instead of reading stale
//! rows and failing at commit.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tally_core::aging::{bucket_receivables, AgingReport};
use tally_core::ledger::{build_ledger, customer_postings, supplier_postings};
use tally_core::totals::{purchase_totals, sale_totals};
use tally_core::{
    InvoiceKind, LedgerEntry, LineAmount, Money, Payment, PaymentStatus, PaymentTarget, Purchase,
    PurchaseItem, PurchaseStatus, Sale, SaleItem, TaxPeriod, TaxRate, TaxSummary,
};
use tally_db::repository::{customer, item, payment, purchase, sale, sequence, supplier};
use tally_db::Database;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::balance;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::events::{ActivityRecord, EventDispatcher, LedgerEvent};
use crate::requests::{Actor, NewPayment, NewPurchase, NewSale, PaymentRequest};
use crate::sinks::{
    ActivityLogSink, DbSettingsProvider, NotificationSink, SettingsProvider, TracingSink,
};
use crate::stock;

/// A sale with its lines and the payments recorded against it.
#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseDetail {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
    pub payments: Vec<Payment>,
}

/// Entry point for every ledger operation. Cheap to clone.
#[derive(Clone)]
pub struct LedgerService {
    db: Database,
    config: LedgerConfig,
    settings: Arc<dyn SettingsProvider>,
    events: EventDispatcher,
}

impl LedgerService {
    /// Builds the service and spawns its event dispatcher. Must be called
    /// inside a tokio runtime.
    pub fn new(
        db: Database,
        config: LedgerConfig,
        settings: Arc<dyn SettingsProvider>,
        notifications: Arc<dyn NotificationSink>,
        activity: Arc<dyn ActivityLogSink>,
    ) -> Self {
        let events = EventDispatcher::spawn(db.clone(), notifications, activity, config.event_buffer);
        LedgerService {
            db,
            config,
            settings,
            events,
        }
    }

    /// Tax rates from `tenant_settings`, notifications and activity to the
    /// tracing log.
    pub fn with_defaults(db: Database, config: LedgerConfig) -> Self {
        let settings = Arc::new(DbSettingsProvider::new(
            db.clone(),
            TaxRate::from_bps(config.default_tax_rate_bps),
        ));
        Self::new(db, config, settings, Arc::new(TracingSink), Arc::new(TracingSink))
    }

    /// Opens the configured database and builds a service with default
    /// collaborators.
    pub async fn connect(config: LedgerConfig) -> LedgerResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(Self::with_defaults(db, config))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Waits for every event emitted so far to reach the sinks.
    pub async fn flush_events(&self) {
        self.events.flush().await;
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a sale: prices each line from the item, computes totals with
    /// the tenant's tax rate, takes the stock and applies balance effects.
    #[instrument(skip(self, request), fields(tenant_id = %actor.tenant_id))]
    pub async fn create_sale(&self, actor: &Actor, request: NewSale) -> LedgerResult<Sale> {
        request.validate()?;
        let tenant_id = actor.tenant_id.as_str();
        let rate = self.settings.tax_rate(tenant_id).await?;

        let mut tx = self.db.begin().await?;
        let invoice_number = sequence::next_invoice_number(&mut tx, tenant_id, InvoiceKind::Sale).await?;

        if let Some(customer_id) = request.customer_id.as_deref() {
            customer::get(&mut tx, tenant_id, customer_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("Customer", customer_id))?;
        }

        let mut amounts = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let stocked = item::get(&mut tx, tenant_id, &line.item_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("Item", &line.item_id))?;
            amounts.push(
                LineAmount::new(stocked.selling_price(), line.quantity)
                    .with_discount(Money::from_cents(line.discount_cents)),
            );
        }

        let totals = sale_totals(&amounts, Money::from_cents(request.discount_cents), rate)?;

        let now = Utc::now();
        let date = request.date.unwrap_or(now);
        let on_credit = request.payment_method.is_credit();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            invoice_number,
            date,
            customer_id: request.customer_id,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.grand_total.cents(),
            payment_method: request.payment_method,
            payment_account_id: request.payment_account_id,
            payment_status: if on_credit {
                PaymentStatus::Pending
            } else {
                PaymentStatus::Paid
            },
            amount_paid_cents: if on_credit { 0 } else { totals.grand_total.cents() },
            due_date: on_credit.then(|| date + Duration::days(self.config.credit_terms_days)),
            notes: request.notes,
            created_by: Some(actor.user_id.clone()),
            created_at: now,
            updated_at: now,
        };
        sale::insert(&mut tx, &sale).await?;

        let mut lines = Vec::with_capacity(request.lines.len());
        for (index, (line, amount)) in request.lines.iter().zip(&amounts).enumerate() {
            let sale_item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                item_id: line.item_id.clone(),
                quantity: line.quantity,
                price_cents: amount.unit_price.cents(),
                discount_cents: amount.discount.cents(),
                total_cents: amount.net(index)?.cents(),
            };
            sale::insert_item(&mut tx, &sale_item).await?;
            lines.push(sale_item);
        }

        let alerts = stock::apply_sale_stock(&mut tx, tenant_id, &lines, self.config.stock_policy).await?;
        balance::on_sale_created(&mut tx, &sale).await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            invoice = %sale.invoice_number,
            total = sale.total_cents,
            method = ?sale.payment_method,
            "Sale created"
        );

        for alert in alerts {
            self.events.dispatch(LedgerEvent::LowStock {
                tenant_id: tenant_id.to_string(),
                alert,
            });
        }
        self.record_activity(
            actor,
            "sale.created",
            "sale",
            &sale.id,
            json!({
                "invoice_number": sale.invoice_number,
                "total_cents": sale.total_cents,
                "payment_method": sale.payment_method,
                "lines": lines.len(),
            }),
        );

        Ok(sale)
    }

    /// Records a payment against a credit sale.
    #[instrument(skip(self, request), fields(tenant_id = %actor.tenant_id))]
    pub async fn record_sale_payment(
        &self,
        actor: &Actor,
        sale_id: &str,
        request: PaymentRequest,
    ) -> LedgerResult<Sale> {
        request.validate()?;
        let tenant_id = actor.tenant_id.as_str();
        let amount = Money::from_cents(request.amount_cents);

        let mut tx = self.db.begin().await?;
        let update = balance::settle_sale(&mut tx, tenant_id, sale_id, amount).await?;
        if !update.payment_method.is_credit() {
            return Err(LedgerError::conflict(format!(
                "sale {sale_id} was settled at the till and takes no further payments"
            )));
        }

        let settled = sale::get(&mut tx, tenant_id, sale_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Sale", sale_id))?;
        let customer_id = settled
            .customer_id
            .clone()
            .ok_or_else(|| LedgerError::conflict(format!("sale {sale_id} has no customer")))?;

        let payment = self.new_payment(
            actor,
            PaymentTarget::Customer(customer_id),
            request,
            Some(sale_id.to_string()),
            None,
        );
        balance::apply_payment(
            &mut tx,
            tenant_id,
            &payment.target,
            amount,
            payment.payment_account_id.as_deref(),
        )
        .await?;
        payment::insert(&mut tx, &payment).await?;

        tx.commit().await?;

        info!(
            sale_id = %settled.id,
            amount = amount.cents(),
            status = ?settled.payment_status,
            "Sale payment recorded"
        );
        self.record_activity(
            actor,
            "sale.payment_recorded",
            "sale",
            &settled.id,
            json!({ "payment_id": payment.id, "amount_cents": amount.cents() }),
        );

        Ok(settled)
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    /// Records an ordered purchase. Stock and the supplier balance only move
    /// when it is received.
    #[instrument(skip(self, request), fields(tenant_id = %actor.tenant_id))]
    pub async fn create_purchase(&self, actor: &Actor, request: NewPurchase) -> LedgerResult<Purchase> {
        request.validate()?;
        let tenant_id = actor.tenant_id.as_str();
        let rate = self.settings.tax_rate(tenant_id).await?;

        let mut tx = self.db.begin().await?;

        // Zero-delta touch: takes the write lock and proves the supplier exists
        supplier::adjust_balance(&mut tx, tenant_id, &request.supplier_id, 0)
            .await?
            .ok_or_else(|| LedgerError::not_found("Supplier", &request.supplier_id))?;

        let invoice_number = match request.invoice_number {
            Some(number) => number.trim().to_string(),
            None => sequence::next_unused_invoice_number(&mut tx, tenant_id, InvoiceKind::Purchase).await?,
        };

        let mut amounts = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            item::get(&mut tx, tenant_id, &line.item_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("Item", &line.item_id))?;
            amounts.push(LineAmount::new(Money::from_cents(line.unit_price_cents), line.quantity));
        }

        let totals = purchase_totals(&amounts, Money::from_cents(request.transport_cents), rate)?;

        let now = Utc::now();
        let purchase = Purchase {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            invoice_number,
            supplier_id: request.supplier_id,
            date: request.date.unwrap_or(now),
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            transport_cents: totals.transport.cents(),
            total_cents: totals.grand_total.cents(),
            status: PurchaseStatus::Ordered,
            payment_status: PaymentStatus::Pending,
            amount_paid_cents: 0,
            payment_account_id: request.payment_account_id,
            notes: request.notes,
            received_at: None,
            created_by: Some(actor.user_id.clone()),
            created_at: now,
            updated_at: now,
        };
        purchase::insert(&mut tx, &purchase).await?;

        for (index, (line, amount)) in request.lines.iter().zip(&amounts).enumerate() {
            let purchase_item = PurchaseItem {
                id: Uuid::new_v4().to_string(),
                purchase_id: purchase.id.clone(),
                item_id: line.item_id.clone(),
                quantity: line.quantity,
                price_cents: line.unit_price_cents,
                total_cents: amount.gross(index)?.cents(),
            };
            purchase::insert_item(&mut tx, &purchase_item).await?;
        }

        tx.commit().await?;

        info!(
            purchase_id = %purchase.id,
            invoice = %purchase.invoice_number,
            total = purchase.total_cents,
            "Purchase ordered"
        );
        self.record_activity(
            actor,
            "purchase.created",
            "purchase",
            &purchase.id,
            json!({
                "invoice_number": purchase.invoice_number,
                "supplier_id": purchase.supplier_id,
                "total_cents": purchase.total_cents,
            }),
        );

        Ok(purchase)
    }

    /// Marks a purchase received, putting its lines into stock and adding its
    /// total to the supplier's balance. Receiving twice is a no-op that
    /// returns the purchase as stored.
    #[instrument(skip(self), fields(tenant_id = %actor.tenant_id))]
    pub async fn receive_purchase(&self, actor: &Actor, purchase_id: &str) -> LedgerResult<Purchase> {
        let tenant_id = actor.tenant_id.as_str();
        let mut tx = self.db.begin().await?;

        let received = match purchase::mark_received(&mut tx, tenant_id, purchase_id, Utc::now()).await? {
            Some(received) => received,
            None => {
                let existing = purchase::get(&mut tx, tenant_id, purchase_id)
                    .await?
                    .ok_or_else(|| LedgerError::not_found("Purchase", purchase_id))?;
                debug!(purchase_id, "Purchase already received");
                return Ok(existing);
            }
        };

        let lines = purchase::get_items(&mut tx, tenant_id, purchase_id).await?;
        stock::apply_purchase_receipt(&mut tx, &received, &lines).await?;
        balance::on_purchase_received(&mut tx, &received).await?;

        tx.commit().await?;

        info!(
            purchase_id = %received.id,
            lines = lines.len(),
            total = received.total_cents,
            "Purchase received"
        );
        self.record_activity(
            actor,
            "purchase.received",
            "purchase",
            &received.id,
            json!({ "invoice_number": received.invoice_number, "lines": lines.len() }),
        );

        Ok(received)
    }

    /// Records a payment to the supplier against one purchase.
    #[instrument(skip(self, request), fields(tenant_id = %actor.tenant_id))]
    pub async fn record_purchase_payment(
        &self,
        actor: &Actor,
        purchase_id: &str,
        request: PaymentRequest,
    ) -> LedgerResult<Purchase> {
        request.validate()?;
        let tenant_id = actor.tenant_id.as_str();
        let amount = Money::from_cents(request.amount_cents);

        let mut tx = self.db.begin().await?;
        balance::settle_purchase(&mut tx, tenant_id, purchase_id, amount).await?;

        let settled = purchase::get(&mut tx, tenant_id, purchase_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Purchase", purchase_id))?;

        let payment = self.new_payment(
            actor,
            PaymentTarget::Supplier(settled.supplier_id.clone()),
            request,
            None,
            Some(purchase_id.to_string()),
        );
        balance::apply_payment(
            &mut tx,
            tenant_id,
            &payment.target,
            amount,
            payment.payment_account_id.as_deref(),
        )
        .await?;
        payment::insert(&mut tx, &payment).await?;

        tx.commit().await?;

        info!(
            purchase_id = %settled.id,
            amount = amount.cents(),
            status = ?settled.payment_status,
            "Purchase payment recorded"
        );
        self.record_activity(
            actor,
            "purchase.payment_recorded",
            "purchase",
            &settled.id,
            json!({ "payment_id": payment.id, "amount_cents": amount.cents() }),
        );

        Ok(settled)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Records a payment on account with a customer or supplier.
    #[instrument(skip(self, request), fields(tenant_id = %actor.tenant_id))]
    pub async fn create_payment(&self, actor: &Actor, request: NewPayment) -> LedgerResult<Payment> {
        request.validate()?;
        let tenant_id = actor.tenant_id.as_str();
        let amount = Money::from_cents(request.details.amount_cents);

        let mut tx = self.db.begin().await?;
        balance::apply_payment(
            &mut tx,
            tenant_id,
            &request.target,
            amount,
            request.details.payment_account_id.as_deref(),
        )
        .await?;

        let payment = self.new_payment(actor, request.target, request.details, None, None);
        payment::insert(&mut tx, &payment).await?;

        tx.commit().await?;

        info!(payment_id = %payment.id, amount = amount.cents(), target = ?payment.target, "Payment recorded");
        self.record_activity(
            actor,
            "payment.created",
            "payment",
            &payment.id,
            json!({ "target": payment.target, "amount_cents": amount.cents() }),
        );

        Ok(payment)
    }

    /// Deletes a payment and reverses every balance it moved, including the
    /// paid amount of a linked sale or purchase.
    #[instrument(skip(self), fields(tenant_id = %actor.tenant_id))]
    pub async fn delete_payment(&self, actor: &Actor, payment_id: &str) -> LedgerResult<Payment> {
        let tenant_id = actor.tenant_id.as_str();
        let mut tx = self.db.begin().await?;

        let deleted = payment::delete(&mut tx, tenant_id, payment_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Payment", payment_id))?;
        balance::reverse_payment(&mut tx, &deleted).await?;

        tx.commit().await?;

        info!(payment_id = %deleted.id, amount = deleted.amount_cents, "Payment deleted");
        self.record_activity(
            actor,
            "payment.deleted",
            "payment",
            &deleted.id,
            json!({ "target": deleted.target, "amount_cents": deleted.amount_cents }),
        );

        Ok(deleted)
    }

    // =========================================================================
    // Statements and reports
    // =========================================================================

    pub async fn customer_ledger(&self, actor: &Actor, customer_id: &str) -> LedgerResult<Vec<LedgerEntry>> {
        let tenant_id = actor.tenant_id.as_str();
        self.db
            .customers()
            .get(tenant_id, customer_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Customer", customer_id))?;

        let sales = self.db.sales().list_for_customer(tenant_id, customer_id).await?;
        let payments = self.db.payments().list_for_customer(tenant_id, customer_id).await?;
        Ok(build_ledger(customer_postings(&sales, &payments)))
    }

    pub async fn supplier_ledger(&self, actor: &Actor, supplier_id: &str) -> LedgerResult<Vec<LedgerEntry>> {
        let tenant_id = actor.tenant_id.as_str();
        self.db
            .suppliers()
            .get(tenant_id, supplier_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Supplier", supplier_id))?;

        let purchases = self.db.purchases().list_for_supplier(tenant_id, supplier_id).await?;
        let payments = self.db.payments().list_for_supplier(tenant_id, supplier_id).await?;
        Ok(build_ledger(supplier_postings(&purchases, &payments)))
    }

    /// Outstanding credit sales grouped by how far past due they are.
    pub async fn receivables_aging(&self, actor: &Actor, as_of: DateTime<Utc>) -> LedgerResult<AgingReport> {
        let open = self.db.sales().list_open_receivables(&actor.tenant_id).await?;
        Ok(bucket_receivables(&open, as_of))
    }

    /// Output tax on sales, input tax on purchases and the net payable for
    /// the days `from..=to`.
    #[instrument(skip(self), fields(tenant_id = %actor.tenant_id))]
    pub async fn tax_summary(&self, actor: &Actor, from: NaiveDate, to: NaiveDate) -> LedgerResult<TaxSummary> {
        let period = TaxPeriod::new(from, to)?;
        let tenant_id = actor.tenant_id.as_str();

        let output_tax = self.db.sales().tax_collected(tenant_id, period.start(), period.end()).await?;
        let input_tax = self.db.purchases().tax_paid(tenant_id, period.start(), period.end()).await?;
        let rate = self.settings.tax_rate(tenant_id).await?;

        Ok(TaxSummary::new(&period, output_tax, input_tax, rate))
    }

    pub async fn sale_detail(&self, actor: &Actor, sale_id: &str) -> LedgerResult<SaleDetail> {
        let tenant_id = actor.tenant_id.as_str();
        let sale = self
            .db
            .sales()
            .get(tenant_id, sale_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Sale", sale_id))?;

        Ok(SaleDetail {
            items: self.db.sales().get_items(tenant_id, sale_id).await?,
            payments: self.db.payments().list_for_sale(tenant_id, sale_id).await?,
            sale,
        })
    }

    pub async fn purchase_detail(&self, actor: &Actor, purchase_id: &str) -> LedgerResult<PurchaseDetail> {
        let tenant_id = actor.tenant_id.as_str();
        let purchase = self
            .db
            .purchases()
            .get(tenant_id, purchase_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Purchase", purchase_id))?;

        Ok(PurchaseDetail {
            items: self.db.purchases().get_items(tenant_id, purchase_id).await?,
            payments: self.db.payments().list_for_purchase(tenant_id, purchase_id).await?,
            purchase,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn new_payment(
        &self,
        actor: &Actor,
        target: PaymentTarget,
        details: PaymentRequest,
        sale_id: Option<String>,
        purchase_id: Option<String>,
    ) -> Payment {
        let now = Utc::now();
        Payment {
            id: Uuid::new_v4().to_string(),
            tenant_id: actor.tenant_id.clone(),
            amount_cents: details.amount_cents,
            date: details.date.unwrap_or(now),
            payment_method: details.payment_method,
            target,
            payment_account_id: details.payment_account_id,
            sale_id,
            purchase_id,
            reference: details.reference,
            notes: details.notes,
            created_by: Some(actor.user_id.clone()),
            created_at: now,
        }
    }

    fn record_activity(&self, actor: &Actor, action: &str, entity_type: &str, entity_id: &str, details: Value) {
        self.events.dispatch(LedgerEvent::Activity(ActivityRecord {
            tenant_id: actor.tenant_id.clone(),
            user_id: actor.user_id.clone(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            details,
        }));
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::{PurchaseLine, SaleLine};
    use crate::sinks::{FailingSink, FixedTaxRate, RecordingSink, Severity};
    use crate::stock::StockPolicy;
    use tally_core::ledger::closing_balance;
    use tally_core::{PaymentMethod, UserRole};
    use crate::error::ErrorCode;
    use tally_db::{DbConfig, DbError, NewCounterparty, NewItem, NewPaymentAccount};

    struct Fixture {
        db: Database,
        service: LedgerService,
        sink: Arc<RecordingSink>,
        actor: Actor,
        admin_id: String,
    }

    async fn fixture_with(config: LedgerConfig) -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = db.tenants().create("Corner Shop").await.unwrap();
        db.tenants().upsert_settings(&tenant.id, 1000, "USD").await.unwrap();
        let admin = db.users().create(&tenant.id, "Owner", UserRole::Admin).await.unwrap();
        let clerk = db.users().create(&tenant.id, "Clerk", UserRole::Staff).await.unwrap();

        let sink = Arc::new(RecordingSink::new());
        let settings = Arc::new(DbSettingsProvider::new(db.clone(), TaxRate::zero()));
        let service = LedgerService::new(db.clone(), config, settings, sink.clone(), sink.clone());

        Fixture {
            db,
            service,
            sink,
            actor: Actor::new(tenant.id, clerk.id),
            admin_id: admin.id,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(LedgerConfig::default()).await
    }

    impl Fixture {
        async fn item(&self, name: &str, price_cents: i64, quantity: i64, min_stock: i64) -> String {
            self.db
                .items()
                .create(
                    &self.actor.tenant_id,
                    NewItem {
                        name: name.to_string(),
                        quantity,
                        min_stock,
                        selling_price_cents: price_cents,
                        ..Default::default()
                    },
                )
                .await
                .unwrap()
                .id
        }

        async fn customer(&self, name: &str) -> String {
            self.db
                .customers()
                .create(&self.actor.tenant_id, NewCounterparty::named(name))
                .await
                .unwrap()
                .id
        }

        async fn supplier(&self, name: &str) -> String {
            self.db
                .suppliers()
                .create(&self.actor.tenant_id, NewCounterparty::named(name))
                .await
                .unwrap()
                .id
        }

        async fn account(&self, opening_cents: i64) -> String {
            let mut new = NewPaymentAccount::cash("Till");
            new.opening_balance_cents = opening_cents;
            self.db.accounts().create(&self.actor.tenant_id, new).await.unwrap().id
        }

        async fn quantity(&self, item_id: &str) -> i64 {
            self.db
                .items()
                .get(&self.actor.tenant_id, item_id)
                .await
                .unwrap()
                .unwrap()
                .quantity
        }

        async fn customer_balance(&self, id: &str) -> i64 {
            self.db
                .customers()
                .get(&self.actor.tenant_id, id)
                .await
                .unwrap()
                .unwrap()
                .outstanding_balance_cents
        }

        async fn supplier_balance(&self, id: &str) -> i64 {
            self.db
                .suppliers()
                .get(&self.actor.tenant_id, id)
                .await
                .unwrap()
                .unwrap()
                .outstanding_balance_cents
        }

        async fn account_balance(&self, id: &str) -> i64 {
            self.db
                .accounts()
                .get(&self.actor.tenant_id, id)
                .await
                .unwrap()
                .unwrap()
                .balance_cents
        }

        async fn credit_sale(&self, customer_id: &str, item_id: &str, quantity: i64) -> Sale {
            let mut request = NewSale::new(vec![SaleLine::new(item_id, quantity)]);
            request.customer_id = Some(customer_id.to_string());
            request.payment_method = PaymentMethod::Credit;
            self.service.create_sale(&self.actor, request).await.unwrap()
        }
    }

    // -------------------------------------------------------------------------
    // Sales
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_sale_totals_with_discount_and_tax() {
        let f = fixture().await;
        let rice = f.item("Rice", 5000, 10, 0).await;
        let oil = f.item("Oil", 2000, 10, 0).await;
        let till = f.account(0).await;

        let mut request = NewSale::new(vec![SaleLine::new(&rice, 2), SaleLine::new(&oil, 1)]);
        request.discount_cents = 500;
        request.payment_account_id = Some(till.clone());

        let sale = f.service.create_sale(&f.actor, request).await.unwrap();

        assert_eq!(sale.invoice_number, "INV-000001");
        assert_eq!(sale.subtotal_cents, 12000);
        assert_eq!(sale.discount_cents, 500);
        assert_eq!(sale.tax_cents, 1150);
        assert_eq!(sale.total_cents, 12650);
        assert_eq!(sale.total_cents, sale.subtotal_cents - sale.discount_cents + sale.tax_cents);
        assert_eq!(sale.payment_status, PaymentStatus::Paid);
        assert_eq!(sale.amount_paid_cents, 12650);

        assert_eq!(f.quantity(&rice).await, 8);
        assert_eq!(f.quantity(&oil).await, 9);
        assert_eq!(f.account_balance(&till).await, 12650);

        let detail = f.service.sale_detail(&f.actor, &sale.id).await.unwrap();
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].price_cents, 5000);
        assert_eq!(detail.items[0].total_cents, 10000);
        assert!(detail.payments.is_empty());
    }

    #[tokio::test]
    async fn test_invoice_numbers_increment() {
        let f = fixture().await;
        let tea = f.item("Tea", 100, 10, 0).await;

        let first = f.service.create_sale(&f.actor, NewSale::new(vec![SaleLine::new(&tea, 1)])).await.unwrap();
        let second = f.service.create_sale(&f.actor, NewSale::new(vec![SaleLine::new(&tea, 1)])).await.unwrap();

        assert_eq!(first.invoice_number, "INV-000001");
        assert_eq!(second.invoice_number, "INV-000002");
    }

    #[tokio::test]
    async fn test_oversell_rejected_rolls_back_everything() {
        let f = fixture().await;
        let tea = f.item("Tea", 100, 3, 0).await;
        let sugar = f.item("Sugar", 100, 10, 0).await;

        let request = NewSale::new(vec![SaleLine::new(&sugar, 2), SaleLine::new(&tea, 5)]);
        let err = f.service.create_sale(&f.actor, request).await.unwrap_err();

        match err {
            LedgerError::InsufficientStock { item_id, available, requested } => {
                assert_eq!(item_id, tea);
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(f.quantity(&sugar).await, 10);
        assert_eq!(f.quantity(&tea).await, 3);

        // The rolled-back sale gave its number back
        let sale = f.service.create_sale(&f.actor, NewSale::new(vec![SaleLine::new(&tea, 1)])).await.unwrap();
        assert_eq!(sale.invoice_number, "INV-000001");
    }

    #[tokio::test]
    async fn test_backorder_policy_allows_negative_stock() {
        let config = LedgerConfig {
            stock_policy: StockPolicy::AllowBackorder,
            ..LedgerConfig::default()
        };
        let f = fixture_with(config).await;
        let tea = f.item("Tea", 100, 3, 0).await;

        f.service.create_sale(&f.actor, NewSale::new(vec![SaleLine::new(&tea, 5)])).await.unwrap();
        assert_eq!(f.quantity(&tea).await, -2);
    }

    #[tokio::test]
    async fn test_discount_larger_than_subtotal_is_invalid() {
        let f = fixture().await;
        let tea = f.item("Tea", 100, 3, 0).await;

        let mut request = NewSale::new(vec![SaleLine::new(&tea, 1)]);
        request.discount_cents = 101;
        let err = f.service.create_sale(&f.actor, request).await.unwrap_err();

        assert!(matches!(err, LedgerError::InvalidInput(_)));
        assert_eq!(f.quantity(&tea).await, 3);
    }

    #[tokio::test]
    async fn test_credit_sale_payment_and_ledger() {
        let f = fixture().await;
        f.db.tenants().upsert_settings(&f.actor.tenant_id, 0, "USD").await.unwrap();
        let widget = f.item("Widget", 20000, 5, 0).await;
        let customer = f.customer("Asha").await;
        let till = f.account(0).await;

        let sale = f.credit_sale(&customer, &widget, 1).await;
        assert_eq!(sale.total_cents, 20000);
        assert_eq!(sale.payment_status, PaymentStatus::Pending);
        assert!(sale.due_date.is_some());
        assert_eq!(f.customer_balance(&customer).await, 20000);

        let payment = f
            .service
            .create_payment(
                &f.actor,
                NewPayment::customer(&customer, Money::from_cents(8000)).from_account(&till),
            )
            .await
            .unwrap();
        assert_eq!(payment.target, PaymentTarget::Customer(customer.clone()));
        assert_eq!(f.customer_balance(&customer).await, 12000);
        assert_eq!(f.account_balance(&till).await, 8000);

        let ledger = f.service.customer_ledger(&f.actor, &customer).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].debit.cents(), 20000);
        assert_eq!(ledger[0].balance.cents(), 20000);
        assert_eq!(ledger[1].credit.cents(), 8000);
        assert_eq!(closing_balance(&ledger).cents(), 12000);
    }

    #[tokio::test]
    async fn test_record_sale_payment_updates_status() {
        let f = fixture().await;
        f.db.tenants().upsert_settings(&f.actor.tenant_id, 0, "USD").await.unwrap();
        let widget = f.item("Widget", 10000, 5, 0).await;
        let customer = f.customer("Asha").await;

        let sale = f.credit_sale(&customer, &widget, 1).await;

        let partial = f
            .service
            .record_sale_payment(&f.actor, &sale.id, PaymentRequest::new(Money::from_cents(4000)))
            .await
            .unwrap();
        assert_eq!(partial.payment_status, PaymentStatus::Partial);
        assert_eq!(partial.amount_paid_cents, 4000);

        let paid = f
            .service
            .record_sale_payment(&f.actor, &sale.id, PaymentRequest::new(Money::from_cents(6000)))
            .await
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(f.customer_balance(&customer).await, 0);

        let detail = f.service.sale_detail(&f.actor, &sale.id).await.unwrap();
        assert_eq!(detail.payments.len(), 2);

        let ledger = f.service.customer_ledger(&f.actor, &customer).await.unwrap();
        assert_eq!(closing_balance(&ledger).cents(), 0);
    }

    #[tokio::test]
    async fn test_cash_sale_takes_no_payments() {
        let f = fixture().await;
        let tea = f.item("Tea", 100, 3, 0).await;
        let sale = f.service.create_sale(&f.actor, NewSale::new(vec![SaleLine::new(&tea, 1)])).await.unwrap();

        let err = f
            .service
            .record_sale_payment(&f.actor, &sale.id, PaymentRequest::new(Money::from_cents(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        let stored = f.service.sale_detail(&f.actor, &sale.id).await.unwrap().sale;
        assert_eq!(stored.amount_paid_cents, stored.total_cents);
    }

    #[tokio::test]
    async fn test_cash_sale_to_customer_nets_to_zero_on_ledger() {
        let f = fixture().await;
        let tea = f.item("Tea", 1000, 10, 0).await;
        let customer = f.customer("Walk-in regular").await;

        let mut cash = NewSale::new(vec![SaleLine::new(&tea, 2)]);
        cash.customer_id = Some(customer.clone());
        f.service.create_sale(&f.actor, cash).await.unwrap();
        f.credit_sale(&customer, &tea, 1).await;

        let ledger = f.service.customer_ledger(&f.actor, &customer).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(closing_balance(&ledger).cents(), f.customer_balance(&customer).await);
        assert_eq!(f.customer_balance(&customer).await, 1100);
    }

    // -------------------------------------------------------------------------
    // Purchases
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_purchase_receive_updates_stock_price_and_supplier() {
        let f = fixture().await;
        f.db.tenants().upsert_settings(&f.actor.tenant_id, 500, "USD").await.unwrap();
        let flour = f.item("Flour", 1200, 4, 0).await;
        let supplier = f.supplier("Mill Co").await;

        let mut request = NewPurchase::new(&supplier, vec![PurchaseLine::new(&flour, 10, 800)]);
        request.transport_cents = 1500;
        let purchase = f.service.create_purchase(&f.actor, request).await.unwrap();

        assert_eq!(purchase.invoice_number, "PO-000001");
        assert_eq!(purchase.subtotal_cents, 8000);
        assert_eq!(purchase.tax_cents, 400);
        assert_eq!(purchase.total_cents, 9900);
        assert_eq!(purchase.status, PurchaseStatus::Ordered);

        // Nothing moves until the goods arrive
        assert_eq!(f.quantity(&flour).await, 4);
        assert_eq!(f.supplier_balance(&supplier).await, 0);

        let received = f.service.receive_purchase(&f.actor, &purchase.id).await.unwrap();
        assert_eq!(received.status, PurchaseStatus::Received);
        assert!(received.received_at.is_some());

        assert_eq!(f.quantity(&flour).await, 14);
        assert_eq!(f.supplier_balance(&supplier).await, 9900);
        let item = f.db.items().get(&f.actor.tenant_id, &flour).await.unwrap().unwrap();
        assert_eq!(item.purchase_price_cents, 800);
    }

    #[tokio::test]
    async fn test_receive_is_idempotent() {
        let f = fixture().await;
        let flour = f.item("Flour", 1200, 0, 0).await;
        let supplier = f.supplier("Mill Co").await;
        let purchase = f
            .service
            .create_purchase(&f.actor, NewPurchase::new(&supplier, vec![PurchaseLine::new(&flour, 3, 500)]))
            .await
            .unwrap();

        let first = f.service.receive_purchase(&f.actor, &purchase.id).await.unwrap();
        let second = f.service.receive_purchase(&f.actor, &purchase.id).await.unwrap();

        assert_eq!(first.received_at, second.received_at);
        assert_eq!(f.quantity(&flour).await, 3);
        assert_eq!(f.supplier_balance(&supplier).await, first.total_cents);
    }

    #[tokio::test]
    async fn test_receive_unknown_purchase_is_not_found() {
        let f = fixture().await;
        let err = f.service.receive_purchase(&f.actor, "missing").await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { ref entity, .. } if entity == "Purchase"));
    }

    #[tokio::test]
    async fn test_duplicate_supplier_invoice_is_conflict() {
        let f = fixture().await;
        let flour = f.item("Flour", 1200, 0, 0).await;
        let supplier = f.supplier("Mill Co").await;

        let mut request = NewPurchase::new(&supplier, vec![PurchaseLine::new(&flour, 1, 500)]);
        request.invoice_number = Some("MILL-0042".to_string());

        f.service.create_purchase(&f.actor, request.clone()).await.unwrap();
        let err = f.service.create_purchase(&f.actor, request).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_generated_purchase_number_skips_supplier_supplied_one() {
        let f = fixture().await;
        let flour = f.item("Flour", 1200, 0, 0).await;
        let supplier = f.supplier("Mill Co").await;

        let mut request = NewPurchase::new(&supplier, vec![PurchaseLine::new(&flour, 1, 500)]);
        request.invoice_number = Some("PO-000001".to_string());
        f.service.create_purchase(&f.actor, request).await.unwrap();

        let mut generated = Vec::new();
        for _ in 0..2 {
            let purchase = f
                .service
                .create_purchase(&f.actor, NewPurchase::new(&supplier, vec![PurchaseLine::new(&flour, 1, 500)]))
                .await
                .unwrap();
            generated.push(purchase.invoice_number);
        }
        assert_eq!(generated, ["PO-000002", "PO-000003"]);
    }

    #[tokio::test]
    async fn test_purchase_payment_and_supplier_ledger() {
        let f = fixture().await;
        f.db.tenants().upsert_settings(&f.actor.tenant_id, 0, "USD").await.unwrap();
        let flour = f.item("Flour", 1200, 0, 0).await;
        let supplier = f.supplier("Mill Co").await;
        let bank = f.account(100_000).await;

        let purchase = f
            .service
            .create_purchase(&f.actor, NewPurchase::new(&supplier, vec![PurchaseLine::new(&flour, 10, 1000)]))
            .await
            .unwrap();
        f.service.receive_purchase(&f.actor, &purchase.id).await.unwrap();

        let partial = f
            .service
            .record_purchase_payment(
                &f.actor,
                &purchase.id,
                PaymentRequest::new(Money::from_cents(4000)).from_account(&bank),
            )
            .await
            .unwrap();
        assert_eq!(partial.payment_status, PaymentStatus::Partial);
        assert_eq!(f.supplier_balance(&supplier).await, 6000);
        assert_eq!(f.account_balance(&bank).await, 96_000);

        let paid = f
            .service
            .record_purchase_payment(&f.actor, &purchase.id, PaymentRequest::new(Money::from_cents(6000)))
            .await
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);

        let ledger = f.service.supplier_ledger(&f.actor, &supplier).await.unwrap();
        assert_eq!(ledger.len(), 3);
        assert_eq!(closing_balance(&ledger).cents(), f.supplier_balance(&supplier).await);
        assert_eq!(closing_balance(&ledger).cents(), 0);

        let detail = f.service.purchase_detail(&f.actor, &purchase.id).await.unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.payments.len(), 2);
    }

    #[tokio::test]
    async fn test_ordered_purchase_not_on_supplier_ledger() {
        let f = fixture().await;
        let flour = f.item("Flour", 1200, 0, 0).await;
        let supplier = f.supplier("Mill Co").await;
        f.service
            .create_purchase(&f.actor, NewPurchase::new(&supplier, vec![PurchaseLine::new(&flour, 1, 500)]))
            .await
            .unwrap();

        let ledger = f.service.supplier_ledger(&f.actor, &supplier).await.unwrap();
        assert!(ledger.is_empty());
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_delete_supplier_payment_reverses_balances() {
        let f = fixture().await;
        let supplier = f.supplier("Mill Co").await;
        let bank = f.account(50_000).await;

        let payment = f
            .service
            .create_payment(
                &f.actor,
                NewPayment::supplier(&supplier, Money::from_cents(2500)).from_account(&bank),
            )
            .await
            .unwrap();
        assert_eq!(f.supplier_balance(&supplier).await, -2500);
        assert_eq!(f.account_balance(&bank).await, 47_500);

        let deleted = f.service.delete_payment(&f.actor, &payment.id).await.unwrap();
        assert_eq!(deleted.id, payment.id);
        assert_eq!(f.supplier_balance(&supplier).await, 0);
        assert_eq!(f.account_balance(&bank).await, 50_000);

        let err = f.service.delete_payment(&f.actor, &payment.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_allocated_payment_reverts_document() {
        let f = fixture().await;
        f.db.tenants().upsert_settings(&f.actor.tenant_id, 0, "USD").await.unwrap();
        let widget = f.item("Widget", 20000, 5, 0).await;
        let customer = f.customer("Asha").await;
        let till = f.account(0).await;

        let sale = f.credit_sale(&customer, &widget, 1).await;
        f.service
            .record_sale_payment(
                &f.actor,
                &sale.id,
                PaymentRequest::new(Money::from_cents(8000)).from_account(&till),
            )
            .await
            .unwrap();

        let payments = f.service.sale_detail(&f.actor, &sale.id).await.unwrap().payments;
        f.service.delete_payment(&f.actor, &payments[0].id).await.unwrap();

        let restored = f.service.sale_detail(&f.actor, &sale.id).await.unwrap().sale;
        assert_eq!(restored.amount_paid_cents, 0);
        assert_eq!(restored.payment_status, PaymentStatus::Pending);
        assert_eq!(f.customer_balance(&customer).await, 20000);
        assert_eq!(f.account_balance(&till).await, 0);
    }

    #[tokio::test]
    async fn test_payment_to_unknown_counterparty_is_not_found() {
        let f = fixture().await;
        let err = f
            .service
            .create_payment(&f.actor, NewPayment::customer("ghost", Money::from_cents(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { ref entity, .. } if entity == "Customer"));
    }

    #[tokio::test]
    async fn test_payment_from_unknown_account_rolls_back() {
        let f = fixture().await;
        let customer = f.customer("Asha").await;

        let err = f
            .service
            .create_payment(
                &f.actor,
                NewPayment::customer(&customer, Money::from_cents(100)).from_account("no-such-account"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::NotFound { ref entity, .. } if entity == "PaymentAccount"));
        assert_eq!(f.customer_balance(&customer).await, 0);
    }

    // -------------------------------------------------------------------------
    // Tenancy
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_other_tenant_cannot_touch_documents() {
        let f = fixture().await;
        let other = f.db.tenants().create("Rival").await.unwrap();
        let intruder = Actor::new(other.id, "someone");
        let tea = f.item("Tea", 100, 10, 0).await;
        let customer = f.customer("Asha").await;

        let err = f
            .service
            .create_sale(&intruder, NewSale::new(vec![SaleLine::new(&tea, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { ref entity, .. } if entity == "Item"));

        let err = f.service.customer_ledger(&intruder, &customer).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));

        assert_eq!(f.quantity(&tea).await, 10);
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_low_stock_notifies_admins_only() {
        let f = fixture().await;
        let tea = f.item("Tea", 100, 5, 2).await;

        f.service.create_sale(&f.actor, NewSale::new(vec![SaleLine::new(&tea, 4)])).await.unwrap();
        f.service.flush_events().await;

        let notifications = f.sink.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].user_id, f.admin_id);
        assert_eq!(notifications[0].title, "Low stock: Tea");
        assert_eq!(notifications[0].severity, Severity::Warning);

        let activities = f.sink.activities();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].action, "sale.created");
        assert_eq!(activities[0].user_id, f.actor.user_id);
    }

    #[tokio::test]
    async fn test_no_events_for_failed_operation() {
        let f = fixture().await;
        let tea = f.item("Tea", 100, 1, 5).await;

        f.service
            .create_sale(&f.actor, NewSale::new(vec![SaleLine::new(&tea, 2)]))
            .await
            .unwrap_err();
        f.service.flush_events().await;

        assert!(f.sink.notifications().is_empty());
        assert!(f.sink.activities().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failures_do_not_fail_operations() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = db.tenants().create("Shop").await.unwrap();
        db.users().create(&tenant.id, "Owner", UserRole::Admin).await.unwrap();
        let tea = db
            .items()
            .create(
                &tenant.id,
                NewItem {
                    name: "Tea".to_string(),
                    quantity: 2,
                    min_stock: 5,
                    selling_price_cents: 100,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let service = LedgerService::new(
            db.clone(),
            LedgerConfig::default(),
            Arc::new(FixedTaxRate(TaxRate::zero())),
            Arc::new(FailingSink),
            Arc::new(FailingSink),
        );
        let actor = Actor::new(&tenant.id, "clerk");

        let sale = service
            .create_sale(&actor, NewSale::new(vec![SaleLine::new(&tea.id, 2)]))
            .await
            .unwrap();
        service.flush_events().await;

        assert_eq!(sale.total_cents, 200);
        let stored = db.items().get(&tenant.id, &tea.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 0);
    }

    // -------------------------------------------------------------------------
    // Reports
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_receivables_aging_buckets() {
        let f = fixture().await;
        f.db.tenants().upsert_settings(&f.actor.tenant_id, 0, "USD").await.unwrap();
        let widget = f.item("Widget", 1000, 100, 0).await;
        let customer = f.customer("Asha").await;
        let now = Utc::now();

        for (days_ago, quantity) in [(10, 1), (100, 2)] {
            let mut request = NewSale::new(vec![SaleLine::new(&widget, quantity)]);
            request.customer_id = Some(customer.clone());
            request.payment_method = PaymentMethod::Credit;
            request.date = Some(now - Duration::days(days_ago));
            f.service.create_sale(&f.actor, request).await.unwrap();
        }

        let report = f.service.receivables_aging(&f.actor, now).await.unwrap();
        assert_eq!(report.customer_count, 1);
        assert_eq!(report.total_receivables.cents(), 3000);

        let row = &report.customers[0];
        // Due in 20 days, and 70 days overdue
        assert_eq!(row.current.cents(), 1000);
        assert_eq!(row.days_61_90.cents(), 2000);
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, sec: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, sec)
            .unwrap()
            .and_utc()
    }

    #[tokio::test]
    async fn test_tax_summary_over_period() {
        let f = fixture().await;
        let widget = f.item("Widget", 1000, 10, 0).await;
        let supplier = f.supplier("Mill Co").await;

        // 10% tax on 10.00: two sales inside June, one on the first instant of July
        for date in [at(2026, 6, 10, 12, 0, 0), at(2026, 6, 30, 23, 59, 59), at(2026, 7, 1, 0, 0, 0)] {
            let mut request = NewSale::new(vec![SaleLine::new(&widget, 1)]);
            request.date = Some(date);
            f.service.create_sale(&f.actor, request).await.unwrap();
        }

        let mut purchase = NewPurchase::new(&supplier, vec![PurchaseLine::new(&widget, 1, 500)]);
        purchase.transport_cents = 300;
        purchase.date = Some(at(2026, 6, 15, 9, 0, 0));
        f.service.create_purchase(&f.actor, purchase).await.unwrap();

        // Same month, other tenant
        let other = f.db.tenants().create("Other Shop").await.unwrap();
        f.db.tenants().upsert_settings(&other.id, 1000, "USD").await.unwrap();
        let other_item = f
            .db
            .items()
            .create(
                &other.id,
                NewItem {
                    name: "Widget".to_string(),
                    quantity: 10,
                    selling_price_cents: 5000,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let mut request = NewSale::new(vec![SaleLine::new(&other_item.id, 1)]);
        request.date = Some(at(2026, 6, 12, 10, 0, 0));
        f.service.create_sale(&Actor::new(&other.id, "clerk"), request).await.unwrap();

        let june_1 = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let june_30 = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        let summary = f.service.tax_summary(&f.actor, june_1, june_30).await.unwrap();

        assert_eq!(summary.output_tax.cents(), 200);
        assert_eq!(summary.input_tax.cents(), 50);
        assert_eq!(summary.net_tax_payable.cents(), 150);
        assert_eq!(summary.tax_rate.bps(), 1000);

        let err = f.service.tax_summary(&f.actor, june_30, june_1).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let path = std::env::temp_dir().join(format!("tally-concurrency-{}.db", Uuid::new_v4()));
        let config = LedgerConfig {
            database_path: path.clone(),
            max_connections: 4,
            ..LedgerConfig::default()
        };

        let db = Database::new(config.db_config()).await.unwrap();
        let tenant = db.tenants().create("Busy Shop").await.unwrap();
        let tea = db
            .items()
            .create(
                &tenant.id,
                NewItem {
                    name: "Tea".to_string(),
                    quantity: 10,
                    selling_price_cents: 100,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let service = LedgerService::new(
            db.clone(),
            config,
            Arc::new(FixedTaxRate(TaxRate::zero())),
            Arc::new(TracingSink),
            Arc::new(TracingSink),
        );
        let actor = Actor::new(&tenant.id, "clerk");

        let mut handles = Vec::new();
        for _ in 0..20 {
            let service = service.clone();
            let actor = actor.clone();
            let item_id = tea.id.clone();
            handles.push(tokio::spawn(async move {
                service
                    .create_sale(&actor, NewSale::new(vec![SaleLine::new(item_id, 1)]))
                    .await
            }));
        }

        let mut invoices = Vec::new();
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(sale) => invoices.push(sale.invoice_number),
                Err(LedgerError::InsufficientStock { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        let stored = db.items().get(&tenant.id, &tea.id).await.unwrap().unwrap();

        invoices.sort();
        invoices.dedup();
        assert_eq!(invoices.len(), 10);
        assert_eq!(rejected, 10);
        assert_eq!(stored.quantity, 0);

        service.flush_events().await;
        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            std::fs::remove_file(file).ok();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lock_timeout_rolls_back_sale() {
        let path = std::env::temp_dir().join(format!("tally-lock-{}.db", Uuid::new_v4()));
        let config = LedgerConfig {
            database_path: path.clone(),
            max_connections: 2,
            lock_timeout_secs: 1,
            ..LedgerConfig::default()
        };

        let db = Database::new(config.db_config()).await.unwrap();
        let tenant = db.tenants().create("Busy Shop").await.unwrap();
        let tea = db
            .items()
            .create(
                &tenant.id,
                NewItem {
                    name: "Tea".to_string(),
                    quantity: 10,
                    selling_price_cents: 100,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let service = LedgerService::new(
            db.clone(),
            config,
            Arc::new(FixedTaxRate(TaxRate::zero())),
            Arc::new(TracingSink),
            Arc::new(TracingSink),
        );
        let actor = Actor::new(&tenant.id, "clerk");

        // Another writer holds the write lock for longer than the timeout
        let mut blocker = db.begin().await.unwrap();
        sqlx::query("UPDATE items SET quantity = quantity WHERE id = ?1")
            .bind(&tea.id)
            .execute(&mut *blocker)
            .await
            .unwrap();

        let err = service
            .create_sale(&actor, NewSale::new(vec![SaleLine::new(&tea.id, 3)]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Storage(DbError::LockTimeout)));
        assert_eq!(err.code(), ErrorCode::LockTimeout);

        blocker.rollback().await.unwrap();

        let stored = db.items().get(&tenant.id, &tea.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 10);

        let sale = service
            .create_sale(&actor, NewSale::new(vec![SaleLine::new(&tea.id, 1)]))
            .await
            .unwrap();
        assert_eq!(sale.invoice_number, "INV-000001");

        service.flush_events().await;
        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            std::fs::remove_file(file).ok();
        }
    }

    // -------------------------------------------------------------------------
    // Conservation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_stock_conservation_across_operations() {
        let f = fixture().await;
        let flour = f.item("Flour", 1200, 20, 0).await;
        let supplier = f.supplier("Mill Co").await;

        f.service.create_sale(&f.actor, NewSale::new(vec![SaleLine::new(&flour, 7)])).await.unwrap();
        let purchase = f
            .service
            .create_purchase(&f.actor, NewPurchase::new(&supplier, vec![PurchaseLine::new(&flour, 12, 700)]))
            .await
            .unwrap();
        f.service.receive_purchase(&f.actor, &purchase.id).await.unwrap();
        f.service.create_sale(&f.actor, NewSale::new(vec![SaleLine::new(&flour, 3)])).await.unwrap();
        // Rejected sale leaves stock alone
        f.service
            .create_sale(&f.actor, NewSale::new(vec![SaleLine::new(&flour, 1000)]))
            .await
            .unwrap_err();

        assert_eq!(f.quantity(&flour).await, 20 - 7 + 12 - 3);
    }
}
