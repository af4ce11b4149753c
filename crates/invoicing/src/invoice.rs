use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use ledgerline_core::{DomainError, Entity, EntityId};
use ledgerline_products::ProductId;

/// Invoice identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub EntityId);

impl InvoiceId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Human-readable invoice number (`INV-<year>-<seq>`).
///
/// Sequence values come from the store's per-year monotonic counter, so two
/// concurrent creates can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    pub fn generate(year: i32, seq: u64) -> Self {
        Self(format!("INV-{year}-{seq:04}"))
    }

    pub fn for_date(date: DateTime<Utc>, seq: u64) -> Self {
        Self::generate(date.year(), seq)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Statuses that contribute to a customer's outstanding balance.
    pub fn is_open(self) -> bool {
        matches!(self, InvoiceStatus::Pending | InvoiceStatus::Overdue)
    }

    /// Statuses the overdue sweep never touches.
    pub fn is_terminal(self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

/// Invoice line item.
///
/// Items reference a product either by id or, failing that, by exact name
/// match against `description` at fulfilment time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub product_id: Option<ProductId>,
    pub description: String,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price_cents: u64,
}

/// Input for creating an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoice {
    /// Name-based customer reference; resolved against the customer
    /// collection by exact match. Kept deliberately (the consuming UI
    /// captures free-form names), see design notes.
    pub customer_name: String,
    pub items: Vec<InvoiceItem>,
    pub due_date: DateTime<Utc>,
    /// Initial status; must be `Draft` or `Pending`.
    pub status: InvoiceStatus,
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePatch {
    pub customer_name: Option<String>,
    pub items: Option<Vec<InvoiceItem>>,
    pub due_date: Option<DateTime<Utc>>,
}

/// An invoice issued to a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    number: InvoiceNumber,
    customer_name: String,
    /// Total in smallest currency unit; derived from line items.
    amount_cents: u64,
    paid_amount_cents: u64,
    status: InvoiceStatus,
    items: Vec<InvoiceItem>,
    due_date: DateTime<Utc>,
    /// Guard against double stock deduction when an invoice is re-sent.
    inventory_adjusted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn create(
        id: InvoiceId,
        number: InvoiceNumber,
        new: NewInvoice,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if new.customer_name.trim().is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }
        if !matches!(new.status, InvoiceStatus::Draft | InvoiceStatus::Pending) {
            return Err(DomainError::validation(
                "invoices start in draft or pending status",
            ));
        }
        let amount_cents = total_of(&new.items)?;

        Ok(Self {
            id,
            number,
            customer_name: new.customer_name,
            amount_cents,
            paid_amount_cents: 0,
            status: new.status,
            items: new.items,
            due_date: new.due_date,
            inventory_adjusted: false,
            created_at: occurred_at,
            updated_at: occurred_at,
        })
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn number(&self) -> &InvoiceNumber {
        &self.number
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn amount_cents(&self) -> u64 {
        self.amount_cents
    }

    pub fn paid_amount_cents(&self) -> u64 {
        self.paid_amount_cents
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn items(&self) -> &[InvoiceItem] {
        &self.items
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn inventory_adjusted(&self) -> bool {
        self.inventory_adjusted
    }

    pub fn outstanding_cents(&self) -> u64 {
        self.amount_cents.saturating_sub(self.paid_amount_cents)
    }

    /// Whether the sweep should promote this invoice to `Overdue`.
    pub fn overdue_candidate(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, InvoiceStatus::Sent | InvoiceStatus::Pending)
            && self.due_date < now
    }

    /// Merge a partial update; line-item changes re-derive the total.
    pub fn apply_patch(
        &mut self,
        patch: InvoicePatch,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if let Some(name) = patch.customer_name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("customer name cannot be empty"));
            }
            self.customer_name = name;
        }
        if let Some(items) = patch.items {
            self.amount_cents = total_of(&items)?;
            self.items = items;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        self.updated_at = occurred_at;
        Ok(())
    }

    /// Register a payment against this invoice.
    ///
    /// `paid_amount` is allowed to exceed the total (the consuming app
    /// accepts overpayment); crossing the total flips status to `Paid`.
    pub fn record_payment(
        &mut self,
        amount_cents: u64,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if amount_cents == 0 {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        self.paid_amount_cents = self
            .paid_amount_cents
            .checked_add(amount_cents)
            .ok_or_else(|| DomainError::invariant("payment total overflow"))?;
        if self.paid_amount_cents >= self.amount_cents {
            self.status = InvoiceStatus::Paid;
        }
        self.updated_at = occurred_at;
        Ok(())
    }

    pub fn set_status(&mut self, status: InvoiceStatus, occurred_at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = occurred_at;
    }

    pub fn mark_inventory_adjusted(&mut self, occurred_at: DateTime<Utc>) {
        self.inventory_adjusted = true;
        self.updated_at = occurred_at;
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Sum line items with overflow checks.
fn total_of(items: &[InvoiceItem]) -> Result<u64, DomainError> {
    if items.is_empty() {
        return Err(DomainError::validation(
            "cannot create invoice without items",
        ));
    }

    let mut total: u64 = 0;
    for item in items {
        if item.quantity <= 0 {
            return Err(DomainError::validation(
                "invoice item quantity must be positive",
            ));
        }
        let line_total = (item.quantity as u128)
            .checked_mul(item.unit_price_cents as u128)
            .ok_or_else(|| DomainError::invariant("invoice line amount overflow"))?;
        let line_total = u64::try_from(line_total)
            .map_err(|_| DomainError::invariant("invoice line amount overflow"))?;
        total = total
            .checked_add(line_total)
            .ok_or_else(|| DomainError::invariant("invoice total overflow"))?;
    }
    Ok(total)
}
