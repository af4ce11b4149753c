//! The store itself: CRUD operations plus the consistency pass that keeps
//! customer balances and stock levels correct as invoices and receipts
//! mutate.

use std::sync::{Arc, RwLock, RwLockWriteGuard};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use ledgerline_analytics::{ArAging, DashboardStats, ReceivablesSummary, StatsConfig, StatsInputs};
use ledgerline_core::{DomainError, DomainResult, Entity, EntityId};
use ledgerline_customers::{Customer, CustomerId, CustomerPatch, NewCustomer};
use ledgerline_invoicing::{
    Invoice, InvoiceId, InvoiceNumber, InvoicePatch, InvoiceStatus, NewInvoice,
};
use ledgerline_notifications::{
    Feed, FeedInputs, ManualNotification, Notification, NotificationConfig, NotificationId,
    generate,
};
use ledgerline_products::{NewProduct, Product, ProductId, ProductPatch, StockAdjustment};
use ledgerline_receipts::{NewReceipt, Receipt, ReceiptId, ReceiptNumber};

use crate::alert::{AlertSink, NullAlertSink};
use crate::persist::SnapshotStore;
use crate::state::{StoreState, customer_by_name_mut, product_by_name_mut, sorted_by_creation};

/// A gap between requested and available stock, reported when an invoice
/// transition to `sent` could not deduct everything it asked for.
///
/// Shortages accompany a successful result: stock that was available has
/// already been deducted, and partial application is accepted policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortage {
    pub name: String,
    pub requested: i64,
    pub available: i64,
}

/// The shared business-entity store.
///
/// Owns the canonical collections; all mutation goes through these
/// methods, and every cross-entity side effect completes inside the same
/// write-lock scope before the call returns.
pub struct BusinessStore {
    state: RwLock<StoreState>,
    feed: RwLock<Feed>,
    alerts: Arc<dyn AlertSink>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    notification_config: NotificationConfig,
    stats_config: StatsConfig,
}

impl Default for BusinessStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BusinessStore {
    /// A fresh, empty, volatile store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::new()),
            feed: RwLock::new(Feed::new()),
            alerts: Arc::new(NullAlertSink),
            snapshots: None,
            notification_config: NotificationConfig::default(),
            stats_config: StatsConfig::default(),
        }
    }

    /// A store backed by a snapshot store: loads the latest snapshot now
    /// and saves after every committed mutation.
    pub fn open(snapshots: Arc<dyn SnapshotStore>) -> anyhow::Result<Self> {
        let snapshot = snapshots.load()?.unwrap_or_default();
        Ok(Self {
            state: RwLock::new(StoreState::from_snapshot(snapshot)),
            feed: RwLock::new(Feed::new()),
            alerts: Arc::new(NullAlertSink),
            snapshots: Some(snapshots),
            notification_config: NotificationConfig::default(),
            stats_config: StatsConfig::default(),
        })
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_notification_config(mut self, config: NotificationConfig) -> Self {
        self.notification_config = config;
        self
    }

    pub fn with_stats_config(mut self, config: StatsConfig) -> Self {
        self.stats_config = config;
        self
    }

    // ----- customers -------------------------------------------------------

    pub fn create_customer(
        &self,
        new: NewCustomer,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<CustomerId> {
        let mut guard = self.write()?;
        let id = CustomerId::new(EntityId::new());
        let customer = Customer::create(id, new, occurred_at)?;
        tracing::info!("created customer {} ({})", customer.name(), id);
        guard.customers.insert(id, customer);
        self.persist_after_mutation(&guard);
        Ok(id)
    }

    pub fn update_customer(
        &self,
        id: CustomerId,
        patch: CustomerPatch,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut guard = self.write()?;
        let customer = guard
            .customers
            .get_mut(&id)
            .ok_or_else(DomainError::not_found)?;
        customer.apply_patch(patch, occurred_at)?;
        self.persist_after_mutation(&guard);
        Ok(())
    }

    /// Delete a customer after confirmation, cascading to every invoice it
    /// back-references. Returns `false` when the user declined.
    pub fn delete_customer(
        &self,
        id: CustomerId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let name = self.get_customer(id)?.name().to_string();
        if !self
            .alerts
            .confirm_destructive(&format!("Delete {name} and all their invoices?"))
        {
            return Ok(false);
        }

        let mut guard = self.write()?;
        let state = &mut *guard;
        let customer = state
            .customers
            .get(&id)
            .ok_or_else(DomainError::not_found)?;

        let invoice_ids: Vec<InvoiceId> = customer.invoice_ids().to_vec();
        for invoice_id in invoice_ids {
            // Dangling back-references are tolerated; each cascading delete
            // reverses its own consistency effects.
            let _ = delete_invoice_locked(state, invoice_id, occurred_at);
        }
        state.customers.remove(&id);
        tracing::info!("deleted customer {name} ({id})");
        self.persist_after_mutation(state);
        Ok(true)
    }

    pub fn get_customer(&self, id: CustomerId) -> DomainResult<Customer> {
        let guard = self.read()?;
        guard
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(DomainError::not_found)
    }

    pub fn list_customers(&self) -> Vec<Customer> {
        match self.read() {
            Ok(guard) => sorted_by_creation(&guard.customers),
            Err(_) => Vec::new(),
        }
    }

    /// First exact name match in creation order, if any.
    pub fn find_customer_by_name(&self, name: &str) -> Option<Customer> {
        let guard = self.read().ok()?;
        guard
            .customers
            .values()
            .filter(|c| c.name() == name)
            .min_by_key(|c| (c.created_at(), *c.id_typed().0.as_uuid()))
            .cloned()
    }

    // ----- products --------------------------------------------------------

    pub fn create_product(
        &self,
        new: NewProduct,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<ProductId> {
        let mut guard = self.write()?;
        let id = ProductId::new(EntityId::new());
        let product = Product::create(id, new, occurred_at)?;
        tracing::info!("created product {} ({})", product.name(), id);
        guard.products.insert(id, product);
        self.persist_after_mutation(&guard);
        Ok(id)
    }

    pub fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut guard = self.write()?;
        let product = guard
            .products
            .get_mut(&id)
            .ok_or_else(DomainError::not_found)?;
        product.apply_patch(patch, occurred_at)?;
        self.persist_after_mutation(&guard);
        Ok(())
    }

    pub fn delete_product(&self, id: ProductId) -> DomainResult<()> {
        let mut guard = self.write()?;
        guard
            .products
            .remove(&id)
            .ok_or_else(DomainError::not_found)?;
        self.persist_after_mutation(&guard);
        Ok(())
    }

    pub fn get_product(&self, id: ProductId) -> DomainResult<Product> {
        let guard = self.read()?;
        guard
            .products
            .get(&id)
            .cloned()
            .ok_or_else(DomainError::not_found)
    }

    pub fn list_products(&self) -> Vec<Product> {
        match self.read() {
            Ok(guard) => sorted_by_creation(&guard.products),
            Err(_) => Vec::new(),
        }
    }

    /// Apply a stock adjustment; returns the new quantity.
    pub fn adjust_stock(
        &self,
        id: ProductId,
        adjustment: StockAdjustment,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<i64> {
        let mut guard = self.write()?;
        let product = guard
            .products
            .get_mut(&id)
            .ok_or_else(|| DomainError::validation("cannot adjust stock for unknown product"))?;
        let quantity = product.adjust_stock(adjustment, occurred_at)?;
        tracing::debug!("adjusted stock of {} to {}", product.name(), quantity);
        self.persist_after_mutation(&guard);
        Ok(quantity)
    }

    // ----- invoices --------------------------------------------------------

    /// Create an invoice; a customer with a matching name immediately sees
    /// its `outstanding`/`total_spent` grow by the invoice total.
    pub fn create_invoice(
        &self,
        new: NewInvoice,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<InvoiceId> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        let year = occurred_at.year();
        let seq = state.invoice_numbering.get(&year).copied().unwrap_or(0) + 1;
        let id = InvoiceId::new(EntityId::new());
        let invoice = Invoice::create(id, InvoiceNumber::generate(year, seq), new, occurred_at)?;
        state.invoice_numbering.insert(year, seq);

        if let Some(customer) = customer_by_name_mut(&mut state.customers, invoice.customer_name())
        {
            customer.record_invoice_issued(id, invoice.amount_cents(), occurred_at);
        }

        tracing::info!(
            "created invoice {} for {} ({})",
            invoice.number(),
            invoice.customer_name(),
            id
        );
        state.invoices.insert(id, invoice);
        self.persist_after_mutation(state);
        Ok(id)
    }

    pub fn update_invoice(
        &self,
        id: InvoiceId,
        patch: InvoicePatch,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut guard = self.write()?;
        let invoice = guard
            .invoices
            .get_mut(&id)
            .ok_or_else(DomainError::not_found)?;
        invoice.apply_patch(patch, occurred_at)?;
        self.persist_after_mutation(&guard);
        Ok(())
    }

    /// Delete an invoice, releasing its unpaid remainder from the owning
    /// customer's outstanding balance.
    pub fn delete_invoice(&self, id: InvoiceId, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let invoice = delete_invoice_locked(state, id, occurred_at)?;
        tracing::info!("deleted invoice {} ({})", invoice.number(), id);
        self.persist_after_mutation(state);
        Ok(())
    }

    /// Change an invoice's status.
    ///
    /// The first transition to `Sent` deducts stock for each line item,
    /// resolving products by id or by exact name against the item
    /// description. What cannot be deducted is reported as shortages next
    /// to the successful result; deductions already applied stand, and the
    /// invoice is marked inventory-adjusted either way so a re-send never
    /// deducts twice.
    pub fn set_invoice_status(
        &self,
        id: InvoiceId,
        status: InvoiceStatus,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<StockShortage>> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let StoreState {
            invoices, products, ..
        } = state;
        let invoice = invoices.get_mut(&id).ok_or_else(DomainError::not_found)?;

        let mut shortages = Vec::new();
        if status == InvoiceStatus::Sent && !invoice.inventory_adjusted() {
            for item in invoice.items() {
                let product = match item.product_id {
                    Some(product_id) => products.get_mut(&product_id),
                    None => product_by_name_mut(products, &item.description),
                };
                match product {
                    Some(product) => {
                        let applied = product.deduct_available(item.quantity, occurred_at);
                        if applied < item.quantity {
                            shortages.push(StockShortage {
                                name: product.name().to_string(),
                                requested: item.quantity,
                                available: applied,
                            });
                        }
                    }
                    None => shortages.push(StockShortage {
                        name: item.description.clone(),
                        requested: item.quantity,
                        available: 0,
                    }),
                }
            }
            invoice.mark_inventory_adjusted(occurred_at);
        }

        invoice.set_status(status, occurred_at);
        if !shortages.is_empty() {
            tracing::warn!(
                "invoice {} sent with {} stock shortage(s)",
                invoice.number(),
                shortages.len()
            );
        }
        self.persist_after_mutation(state);
        Ok(shortages)
    }

    /// Register a payment: grows the invoice's paid amount (overpayment is
    /// accepted), flips it to `Paid` once covered, and shrinks the owning
    /// customer's outstanding balance (floored at 0).
    pub fn record_payment(
        &self,
        id: InvoiceId,
        amount_cents: u64,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let StoreState {
            invoices, customers, ..
        } = state;
        let invoice = invoices.get_mut(&id).ok_or_else(DomainError::not_found)?;

        invoice.record_payment(amount_cents, occurred_at)?;
        if let Some(customer) = customer_by_name_mut(customers, invoice.customer_name()) {
            customer.record_payment(amount_cents, occurred_at);
        }

        tracing::info!(
            "recorded payment of {} on invoice {}",
            amount_cents,
            invoice.number()
        );
        self.persist_after_mutation(state);
        Ok(())
    }

    /// Promote sent/pending invoices past their due date to `Overdue`.
    ///
    /// Idempotent; hosts call this from a periodic timer, tests call it
    /// directly with a simulated clock.
    pub fn run_overdue_sweep(&self, now: DateTime<Utc>) -> usize {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("overdue sweep skipped: store lock poisoned");
                return 0;
            }
        };

        let mut promoted = 0;
        for invoice in guard.invoices.values_mut() {
            if invoice.overdue_candidate(now) {
                invoice.set_status(InvoiceStatus::Overdue, now);
                promoted += 1;
            }
        }
        if promoted > 0 {
            tracing::info!("overdue sweep promoted {promoted} invoice(s)");
            self.persist_after_mutation(&guard);
        }
        promoted
    }

    pub fn get_invoice(&self, id: InvoiceId) -> DomainResult<Invoice> {
        let guard = self.read()?;
        guard
            .invoices
            .get(&id)
            .cloned()
            .ok_or_else(DomainError::not_found)
    }

    pub fn list_invoices(&self) -> Vec<Invoice> {
        match self.read() {
            Ok(guard) => sorted_by_creation(&guard.invoices),
            Err(_) => Vec::new(),
        }
    }

    // ----- receipts --------------------------------------------------------

    /// Record a sale: deducts stock for items matching products by name
    /// (floored at 0, no shortage tracking on this path) and credits the
    /// matched customer's lifetime spend unless this is a walk-in sale.
    pub fn create_receipt(
        &self,
        new: NewReceipt,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<ReceiptId> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        let seq = state.receipt_numbering + 1;
        let id = ReceiptId::new(EntityId::new());
        let receipt = Receipt::create(id, ReceiptNumber::generate(seq), new, occurred_at)?;
        state.receipt_numbering = seq;

        for item in receipt.items() {
            if let Some(product) = product_by_name_mut(&mut state.products, &item.name) {
                product.deduct_available(item.quantity, occurred_at);
            }
        }
        if let Some(name) = receipt.linked_customer_name() {
            if let Some(customer) = customer_by_name_mut(&mut state.customers, name) {
                customer.record_sale(receipt.amount_cents(), occurred_at);
            }
        }

        tracing::info!(
            "created receipt {} for {} ({})",
            receipt.number(),
            receipt.customer_name(),
            id
        );
        state.receipts.insert(id, receipt);
        self.persist_after_mutation(state);
        Ok(id)
    }

    /// Delete a receipt: the exact inverse of creation. Stock comes back,
    /// the customer's lifetime spend shrinks (floored at 0).
    pub fn delete_receipt(&self, id: ReceiptId, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let receipt = state
            .receipts
            .remove(&id)
            .ok_or_else(DomainError::not_found)?;

        for item in receipt.items() {
            if let Some(product) = product_by_name_mut(&mut state.products, &item.name) {
                product.restore_stock(item.quantity, occurred_at);
            }
        }
        if let Some(name) = receipt.linked_customer_name() {
            if let Some(customer) = customer_by_name_mut(&mut state.customers, name) {
                customer.revert_sale(receipt.amount_cents(), occurred_at);
            }
        }

        tracing::info!("deleted receipt {} ({})", receipt.number(), id);
        self.persist_after_mutation(state);
        Ok(())
    }

    pub fn get_receipt(&self, id: ReceiptId) -> DomainResult<Receipt> {
        let guard = self.read()?;
        guard
            .receipts
            .get(&id)
            .cloned()
            .ok_or_else(DomainError::not_found)
    }

    pub fn list_receipts(&self) -> Vec<Receipt> {
        match self.read() {
            Ok(guard) => sorted_by_creation(&guard.receipts),
            Err(_) => Vec::new(),
        }
    }

    // ----- derived views ---------------------------------------------------

    /// Recompute the dashboard snapshot from current entity state.
    pub fn dashboard_stats(&self, now: DateTime<Utc>) -> DashboardStats {
        let (customers, products, invoices, receipts) = self.snapshot_collections();
        DashboardStats::compute(
            StatsInputs {
                customers: &customers,
                products: &products,
                invoices: &invoices,
                receipts: &receipts,
            },
            now,
            &self.stats_config,
        )
    }

    pub fn ar_aging(&self, now: DateTime<Utc>) -> ArAging {
        ArAging::compute(&self.list_invoices(), now)
    }

    pub fn receivables_summary(&self, now: DateTime<Utc>) -> ReceivablesSummary {
        ReceivablesSummary::compute(&self.list_invoices(), now)
    }

    /// The notification feed for the current entity state.
    ///
    /// Regenerates the candidate list, merges it against the previous feed
    /// so read flags survive, prunes entries past retention, and returns
    /// the ordered result. Reads happen after a batch of mutations has
    /// settled, so the generator never observes a half-applied change.
    pub fn notifications(&self, now: DateTime<Utc>) -> Vec<Notification> {
        let (customers, products, invoices, receipts) = self.snapshot_collections();
        let candidates = generate(
            FeedInputs {
                customers: &customers,
                products: &products,
                invoices: &invoices,
                receipts: &receipts,
            },
            now,
            &self.notification_config,
        );

        let mut feed = match self.feed.write() {
            Ok(feed) => feed,
            Err(_) => return Vec::new(),
        };
        feed.refresh(candidates, now, &self.notification_config);
        feed.entries().to_vec()
    }

    pub fn unread_notification_count(&self, now: DateTime<Utc>) -> usize {
        self.notifications(now).iter().filter(|n| !n.read).count()
    }

    pub fn mark_notification_read(&self, id: &NotificationId) -> DomainResult<()> {
        let mut feed = self
            .feed
            .write()
            .map_err(|_| DomainError::invariant("feed lock poisoned"))?;
        if feed.mark_read(id) {
            Ok(())
        } else {
            Err(DomainError::not_found())
        }
    }

    pub fn mark_all_notifications_read(&self) {
        if let Ok(mut feed) = self.feed.write() {
            feed.mark_all_read();
        }
    }

    /// Push a manual entry (bypasses generation; random id, unread).
    pub fn push_notification(
        &self,
        manual: ManualNotification,
        now: DateTime<Utc>,
    ) -> DomainResult<NotificationId> {
        let mut feed = self
            .feed
            .write()
            .map_err(|_| DomainError::invariant("feed lock poisoned"))?;
        Ok(feed.push_manual(manual, now))
    }

    /// Auto-read pass for manual entries; see
    /// [`NotificationConfig::auto_read_after`]. Returns how many flipped.
    pub fn tick_notifications(&self, now: DateTime<Utc>) -> usize {
        match self.feed.write() {
            Ok(mut feed) => feed.tick(now, &self.notification_config),
            Err(_) => 0,
        }
    }

    // ----- internals -------------------------------------------------------

    fn read(&self) -> DomainResult<std::sync::RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| DomainError::invariant("store lock poisoned"))
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| DomainError::invariant("store lock poisoned"))
    }

    fn snapshot_collections(&self) -> (Vec<Customer>, Vec<Product>, Vec<Invoice>, Vec<Receipt>) {
        match self.read() {
            Ok(guard) => (
                sorted_by_creation(&guard.customers),
                sorted_by_creation(&guard.products),
                sorted_by_creation(&guard.invoices),
                sorted_by_creation(&guard.receipts),
            ),
            Err(_) => (Vec::new(), Vec::new(), Vec::new(), Vec::new()),
        }
    }

    /// Save a snapshot when persistence is configured. The mutation has
    /// already committed; a backend failure is surfaced, not rolled back.
    fn persist_after_mutation(&self, state: &StoreState) {
        if let Some(snapshots) = &self.snapshots {
            if let Err(err) = snapshots.save(&state.to_snapshot()) {
                tracing::warn!("snapshot save failed: {err:#}");
                self.alerts
                    .report_error(&format!("Failed to save your data: {err}"));
            }
        }
    }
}

/// Remove an invoice and reverse its consistency effects on the owning
/// customer. Shared by direct deletion and customer-cascade deletion.
fn delete_invoice_locked(
    state: &mut StoreState,
    id: InvoiceId,
    occurred_at: DateTime<Utc>,
) -> DomainResult<Invoice> {
    let invoice = state
        .invoices
        .remove(&id)
        .ok_or_else(DomainError::not_found)?;
    if let Some(customer) = customer_by_name_mut(&mut state.customers, invoice.customer_name()) {
        customer.release_invoice(id, invoice.outstanding_cents(), occurred_at);
    }
    Ok(invoice)
}
