//! Feed generation and merge.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use ledgerline_core::Entity;
use ledgerline_customers::Customer;
use ledgerline_invoicing::{Invoice, InvoiceStatus};
use ledgerline_products::{Product, StockStatus};
use ledgerline_receipts::Receipt;

use crate::notification::{
    ManualNotification, Notification, NotificationAction, NotificationConfig, NotificationId,
    NotificationKind, Priority,
};

/// Borrowed entity snapshots the generator scans.
#[derive(Debug, Clone, Copy)]
pub struct FeedInputs<'a> {
    pub customers: &'a [Customer],
    pub products: &'a [Product],
    pub invoices: &'a [Invoice],
    pub receipts: &'a [Receipt],
}

/// Synthesize the full candidate list from current entity state.
///
/// One entry per qualifying condition; ids are deterministic so a second
/// run over unchanged state produces the identical list.
pub fn generate(
    inputs: FeedInputs<'_>,
    now: DateTime<Utc>,
    config: &NotificationConfig,
) -> Vec<Notification> {
    let mut out = Vec::new();

    for invoice in inputs.invoices {
        let number = invoice.number();
        let customer = invoice.customer_name();

        if invoice.status() == InvoiceStatus::Overdue {
            out.push(derived(
                NotificationKind::InvoiceOverdue,
                invoice,
                invoice.updated_at(),
                "Invoice overdue".to_string(),
                format!(
                    "{number} for {customer} is overdue ({} outstanding)",
                    fmt_cents(invoice.outstanding_cents())
                ),
                Priority::High,
                false,
                Some(view_invoice_action(invoice)),
            ));
        }

        if invoice.status() == InvoiceStatus::Paid
            && within(invoice.updated_at(), now, config.recent_activity)
        {
            out.push(derived(
                NotificationKind::PaymentReceived,
                invoice,
                invoice.updated_at(),
                "Payment received".to_string(),
                format!(
                    "{number} was paid by {customer} ({})",
                    fmt_cents(invoice.paid_amount_cents())
                ),
                Priority::Medium,
                true,
                None,
            ));

            if invoice.amount_cents() >= config.high_value_threshold_cents {
                out.push(derived(
                    NotificationKind::HighValuePayment,
                    invoice,
                    invoice.updated_at(),
                    "High-value payment".to_string(),
                    format!(
                        "{number} from {customer} settled at {}",
                        fmt_cents(invoice.paid_amount_cents())
                    ),
                    Priority::Medium,
                    true,
                    None,
                ));
            }
        }

        if invoice.status() != InvoiceStatus::Draft
            && within(invoice.created_at(), now, config.recent_creation)
        {
            out.push(derived(
                NotificationKind::InvoiceCreated,
                invoice,
                invoice.updated_at(),
                "Invoice created".to_string(),
                format!(
                    "{number} for {customer} ({})",
                    fmt_cents(invoice.amount_cents())
                ),
                Priority::Low,
                true,
                None,
            ));
        }

        if !invoice.status().is_terminal()
            && invoice.due_date() > now
            && invoice.due_date() <= now + config.due_soon
        {
            out.push(derived(
                NotificationKind::PaymentDue,
                invoice,
                invoice.updated_at(),
                "Payment due soon".to_string(),
                format!(
                    "{number} for {customer} is due {}",
                    invoice.due_date().format("%Y-%m-%d")
                ),
                Priority::Medium,
                false,
                Some(view_invoice_action(invoice)),
            ));
        }
    }

    for product in inputs.products {
        match product.status() {
            StockStatus::OutOfStock => out.push(derived(
                NotificationKind::OutOfStock,
                product,
                product.updated_at(),
                "Out of stock".to_string(),
                format!("{} is out of stock", product.name()),
                Priority::High,
                false,
                Some(restock_action(product)),
            )),
            StockStatus::LowStock => out.push(derived(
                NotificationKind::LowStock,
                product,
                product.updated_at(),
                "Low stock".to_string(),
                format!(
                    "{} is running low ({} left)",
                    product.name(),
                    product.quantity()
                ),
                Priority::Medium,
                false,
                Some(restock_action(product)),
            )),
            StockStatus::InStock => {}
        }
    }

    for customer in inputs.customers {
        if within(customer.created_at(), now, config.recent_creation) {
            out.push(derived(
                NotificationKind::NewCustomer,
                customer,
                customer.updated_at(),
                "New customer".to_string(),
                format!("{} was added", customer.name()),
                Priority::Low,
                true,
                None,
            ));
        }
    }

    for receipt in inputs.receipts {
        if within(receipt.created_at(), now, config.recent_activity) {
            out.push(derived(
                NotificationKind::ReceiptCreated,
                receipt,
                receipt.updated_at(),
                "Sale recorded".to_string(),
                format!(
                    "{} for {} ({})",
                    receipt.number(),
                    receipt.customer_name(),
                    fmt_cents(receipt.amount_cents())
                ),
                Priority::Low,
                true,
                None,
            ));
        }
    }

    out
}

/// The notification feed: merged generation output plus manual entries.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    entries: Vec<Notification>,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Notification] {
        &self.entries
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.read).count()
    }

    /// Replace derived entries with a freshly generated candidate list.
    ///
    /// Read flags are carried over for every id already present; ids seen
    /// for the first time keep their generated flag. Manual entries
    /// survive untouched. Entries older than the retention window are
    /// dropped, and the result is ordered by priority then recency.
    pub fn refresh(
        &mut self,
        candidates: Vec<Notification>,
        now: DateTime<Utc>,
        config: &NotificationConfig,
    ) {
        let previous_read: HashMap<NotificationId, bool> = self
            .entries
            .iter()
            .map(|n| (n.id.clone(), n.read))
            .collect();

        let mut next: Vec<Notification> = candidates
            .into_iter()
            .map(|mut n| {
                if let Some(read) = previous_read.get(&n.id) {
                    n.read = *read;
                }
                n
            })
            .collect();

        next.extend(self.entries.drain(..).filter(|n| n.manual));
        next.retain(|n| now.signed_duration_since(n.created_at) <= config.retention);
        sort_feed(&mut next);
        self.entries = next;
    }

    /// Mark one entry read. Returns false if the id is unknown.
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        match self.entries.iter_mut().find(|n| &n.id == id) {
            Some(entry) => {
                entry.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        for entry in &mut self.entries {
            entry.read = true;
        }
    }

    /// Append a manually pushed entry (unread, random id).
    pub fn push_manual(&mut self, manual: ManualNotification, now: DateTime<Utc>) -> NotificationId {
        let id = NotificationId::random();
        self.entries.push(Notification {
            id: id.clone(),
            kind: manual.kind,
            title: manual.title,
            message: manual.message,
            read: false,
            priority: manual.priority,
            created_at: now,
            action: manual.action,
            data_id: None,
            manual: true,
        });
        sort_feed(&mut self.entries);
        id
    }

    /// Auto-read pass for manual entries: every non-error manual entry
    /// whose auto-read delay has elapsed is marked read. Returns how many
    /// flipped. Deterministic; hosts call this from their timer.
    pub fn tick(&mut self, now: DateTime<Utc>, config: &NotificationConfig) -> usize {
        let mut flipped = 0;
        for entry in &mut self.entries {
            if entry.manual
                && !entry.read
                && entry.kind != NotificationKind::Error
                && now.signed_duration_since(entry.created_at) >= config.auto_read_after
            {
                entry.read = true;
                flipped += 1;
            }
        }
        flipped
    }
}

fn sort_feed(entries: &mut [Notification]) {
    entries.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then(b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });
}

fn within(at: DateTime<Utc>, now: DateTime<Utc>, window: chrono::Duration) -> bool {
    let elapsed = now.signed_duration_since(at);
    elapsed >= chrono::Duration::zero() && elapsed <= window
}

#[allow(clippy::too_many_arguments)]
fn derived<E: Entity>(
    kind: NotificationKind,
    entity: &E,
    entity_updated_at: DateTime<Utc>,
    title: String,
    message: String,
    priority: Priority,
    read: bool,
    action: Option<NotificationAction>,
) -> Notification
where
    E::Id: core::fmt::Display,
{
    Notification {
        id: NotificationId::derived(kind, entity.id(), entity_updated_at),
        kind,
        title,
        message,
        read,
        priority,
        created_at: entity_updated_at,
        action,
        data_id: Some(entity.id().to_string()),
        manual: false,
    }
}

fn view_invoice_action(invoice: &Invoice) -> NotificationAction {
    NotificationAction {
        label: "View invoice".to_string(),
        target: format!("invoice:{}", invoice.id_typed()),
    }
}

fn restock_action(product: &Product) -> NotificationAction {
    NotificationAction {
        label: "Restock".to_string(),
        target: format!("product:{}", product.id_typed()),
    }
}

fn fmt_cents(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ledgerline_core::EntityId;
    use ledgerline_invoicing::{InvoiceId, InvoiceItem, InvoiceNumber, NewInvoice};
    use ledgerline_products::{NewProduct, ProductId};

    fn test_config() -> NotificationConfig {
        NotificationConfig::default()
    }

    fn test_invoice(status: InvoiceStatus, at: DateTime<Utc>) -> Invoice {
        let mut invoice = Invoice::create(
            InvoiceId::new(EntityId::new()),
            InvoiceNumber::generate(2026, 1),
            NewInvoice {
                customer_name: "Acme Ltd".to_string(),
                items: vec![InvoiceItem {
                    product_id: None,
                    description: "Widget".to_string(),
                    quantity: 1,
                    unit_price_cents: 5000,
                }],
                due_date: at + Duration::days(14),
                status: InvoiceStatus::Pending,
            },
            at,
        )
        .unwrap();
        if status != InvoiceStatus::Pending {
            invoice.set_status(status, at);
        }
        invoice
    }

    fn low_stock_product(at: DateTime<Utc>) -> Product {
        Product::create(
            ProductId::new(EntityId::new()),
            NewProduct {
                name: "Widget".to_string(),
                sku: "WID-001".to_string(),
                price_cents: 100,
                cost_price_cents: 50,
                quantity: 2,
                low_stock_threshold: 5,
            },
            at,
        )
        .unwrap()
    }

    fn inputs<'a>(
        customers: &'a [Customer],
        products: &'a [Product],
        invoices: &'a [Invoice],
        receipts: &'a [Receipt],
    ) -> FeedInputs<'a> {
        FeedInputs {
            customers,
            products,
            invoices,
            receipts,
        }
    }

    #[test]
    fn overdue_invoice_generates_high_priority_unread_entry() {
        let now = Utc::now();
        let invoice = test_invoice(InvoiceStatus::Overdue, now - Duration::days(1));

        let feed = generate(inputs(&[], &[], std::slice::from_ref(&invoice), &[]), now, &test_config());

        let entry = feed
            .iter()
            .find(|n| n.kind == NotificationKind::InvoiceOverdue)
            .unwrap();
        assert_eq!(entry.priority, Priority::High);
        assert!(!entry.read);
        assert_eq!(entry.data_id.as_deref(), Some(invoice.id_typed().to_string().as_str()));
    }

    #[test]
    fn recently_paid_invoice_is_pre_marked_read() {
        let now = Utc::now();
        let invoice = test_invoice(InvoiceStatus::Paid, now - Duration::days(1));

        let feed = generate(inputs(&[], &[], std::slice::from_ref(&invoice), &[]), now, &test_config());

        let entry = feed
            .iter()
            .find(|n| n.kind == NotificationKind::PaymentReceived)
            .unwrap();
        assert!(entry.read);
        assert_eq!(entry.priority, Priority::Medium);
    }

    #[test]
    fn high_value_settlement_gets_its_own_entry() {
        let now = Utc::now();
        let config = NotificationConfig::default().with_high_value_threshold(10_000);

        let mut invoice = test_invoice(InvoiceStatus::Pending, now - Duration::days(1));
        invoice.record_payment(invoice.amount_cents(), now - Duration::hours(2)).unwrap();
        let invoices = [invoice];

        let feed = generate(inputs(&[], &[], &invoices, &[]), now, &config);
        assert!(!feed.iter().any(|n| n.kind == NotificationKind::HighValuePayment));

        // Same state, lower bar: the settlement now qualifies.
        let config = config.with_high_value_threshold(5000);
        let feed = generate(inputs(&[], &[], &invoices, &[]), now, &config);
        let entry = feed
            .iter()
            .find(|n| n.kind == NotificationKind::HighValuePayment)
            .unwrap();
        assert!(entry.read);
        assert_eq!(entry.priority, Priority::Medium);
    }

    #[test]
    fn generation_is_deterministic_for_unchanged_state() {
        let now = Utc::now();
        let invoice = test_invoice(InvoiceStatus::Overdue, now - Duration::days(1));
        let product = low_stock_product(now - Duration::days(2));

        let products = [product];
        let invoices = [invoice];
        let first = generate(inputs(&[], &products, &invoices, &[]), now, &test_config());
        let second = generate(inputs(&[], &products, &invoices, &[]), now, &test_config());
        assert_eq!(first, second);
    }

    #[test]
    fn refresh_preserves_read_flags_for_known_ids() {
        let now = Utc::now();
        let invoice = test_invoice(InvoiceStatus::Overdue, now - Duration::days(1));
        let invoices = [invoice];

        let mut feed = Feed::new();
        feed.refresh(
            generate(inputs(&[], &[], &invoices, &[]), now, &test_config()),
            now,
            &test_config(),
        );
        let id = feed.entries()[0].id.clone();
        assert!(feed.mark_read(&id));

        // Same entity state: regeneration must not revert the flag.
        feed.refresh(
            generate(inputs(&[], &[], &invoices, &[]), now, &test_config()),
            now,
            &test_config(),
        );
        assert!(feed.entries().iter().find(|n| n.id == id).unwrap().read);
    }

    #[test]
    fn refresh_drops_entries_past_retention() {
        let now = Utc::now();
        let config = NotificationConfig::default().with_retention(Duration::days(30));
        let old_invoice = test_invoice(InvoiceStatus::Overdue, now - Duration::days(40));
        let invoices = [old_invoice];

        let mut feed = Feed::new();
        feed.refresh(
            generate(inputs(&[], &[], &invoices, &[]), now, &config),
            now,
            &config,
        );
        assert!(feed.entries().is_empty());

        // The default 60-day window would still have kept it.
        feed.refresh(
            generate(inputs(&[], &[], &invoices, &[]), now, &test_config()),
            now,
            &test_config(),
        );
        assert_eq!(feed.entries().len(), 1);
    }

    #[test]
    fn feed_orders_by_priority_then_recency() {
        let now = Utc::now();
        let overdue = test_invoice(InvoiceStatus::Overdue, now - Duration::days(2));
        let product = low_stock_product(now - Duration::days(1));

        let products = [product];
        let invoices = [overdue];
        let mut feed = Feed::new();
        feed.refresh(
            generate(inputs(&[], &products, &invoices, &[]), now, &test_config()),
            now,
            &test_config(),
        );

        let ranks: Vec<u8> = feed.entries().iter().map(|n| n.priority.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);
    }

    #[test]
    fn manual_entries_survive_refresh_and_auto_read_on_tick() {
        let now = Utc::now();
        let config = test_config();
        let mut feed = Feed::new();

        let info_id = feed.push_manual(
            ManualNotification {
                kind: NotificationKind::Info,
                title: "Backup".to_string(),
                message: "Backup finished".to_string(),
                priority: Priority::Low,
                action: None,
            },
            now,
        );
        let error_id = feed.push_manual(
            ManualNotification {
                kind: NotificationKind::Error,
                title: "Export failed".to_string(),
                message: "Could not export report".to_string(),
                priority: Priority::High,
                action: None,
            },
            now,
        );

        feed.refresh(Vec::new(), now, &config);
        assert_eq!(feed.entries().len(), 2);
        assert_eq!(feed.unread_count(), 2);

        // Before the delay nothing flips; after it, only the non-error entry.
        assert_eq!(feed.tick(now, &config), 0);
        let later = now + config.auto_read_after + Duration::seconds(1);
        assert_eq!(feed.tick(later, &config), 1);

        let by_id = |id: &NotificationId| feed.entries().iter().find(|n| &n.id == id).unwrap();
        assert!(by_id(&info_id).read);
        assert!(!by_id(&error_id).read);
    }
}
