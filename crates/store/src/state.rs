//! Internal mutable state guarded by the store's lock.

use std::collections::HashMap;

use ledgerline_core::Entity;
use ledgerline_customers::{Customer, CustomerId};
use ledgerline_invoicing::{Invoice, InvoiceId};
use ledgerline_products::{Product, ProductId};
use ledgerline_receipts::{Receipt, ReceiptId};

use crate::persist::StoreSnapshot;

/// The four entity collections plus number counters.
///
/// One struct behind one lock: a mutating operation takes the write guard
/// once and applies the entity change and all of its consistency side
/// effects before releasing it.
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub customers: HashMap<CustomerId, Customer>,
    pub products: HashMap<ProductId, Product>,
    pub invoices: HashMap<InvoiceId, Invoice>,
    pub receipts: HashMap<ReceiptId, Receipt>,
    /// Monotonic per-year invoice sequence; replaces length-based
    /// numbering, which collides under concurrent creates.
    pub invoice_numbering: HashMap<i32, u64>,
    pub receipt_numbering: u64,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            customers: snapshot
                .customers
                .into_iter()
                .map(|c| (c.id_typed(), c))
                .collect(),
            products: snapshot
                .products
                .into_iter()
                .map(|p| (p.id_typed(), p))
                .collect(),
            invoices: snapshot
                .invoices
                .into_iter()
                .map(|i| (i.id_typed(), i))
                .collect(),
            receipts: snapshot
                .receipts
                .into_iter()
                .map(|r| (r.id_typed(), r))
                .collect(),
            invoice_numbering: snapshot.invoice_numbering,
            receipt_numbering: snapshot.receipt_numbering,
        }
    }

    pub fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            customers: sorted_by_creation(&self.customers),
            products: sorted_by_creation(&self.products),
            invoices: sorted_by_creation(&self.invoices),
            receipts: sorted_by_creation(&self.receipts),
            invoice_numbering: self.invoice_numbering.clone(),
            receipt_numbering: self.receipt_numbering,
        }
    }
}

/// Clone collection values ordered by creation time (id as tie-break) so
/// listings and snapshots are deterministic.
pub(crate) fn sorted_by_creation<K, V>(map: &HashMap<K, V>) -> Vec<V>
where
    V: Entity + Clone,
    V::Id: core::fmt::Display,
{
    let mut values: Vec<V> = map.values().cloned().collect();
    values.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().to_string().cmp(&b.id().to_string()))
    });
    values
}

/// First customer with an exact name match, in creation order.
///
/// Name-based references are a deliberate carry-over from the consuming
/// app; when two customers share a name the earliest one wins, which is a
/// documented limitation.
pub(crate) fn customer_by_name_mut<'a>(
    customers: &'a mut HashMap<CustomerId, Customer>,
    name: &str,
) -> Option<&'a mut Customer> {
    let id = customers
        .values()
        .filter(|c| c.name() == name)
        .min_by_key(|c| (c.created_at(), *c.id_typed().0.as_uuid()))
        .map(Customer::id_typed)?;
    customers.get_mut(&id)
}

/// First product with an exact name match, in creation order.
pub(crate) fn product_by_name_mut<'a>(
    products: &'a mut HashMap<ProductId, Product>,
    name: &str,
) -> Option<&'a mut Product> {
    let id = products
        .values()
        .filter(|p| p.name() == name)
        .min_by_key(|p| (p.created_at(), *p.id_typed().0.as_uuid()))
        .map(Product::id_typed)?;
    products.get_mut(&id)
}
