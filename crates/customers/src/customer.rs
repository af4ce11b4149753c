use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerline_core::{DomainError, Entity, EntityId};
use ledgerline_invoicing::InvoiceId;

/// Customer identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub EntityId);

impl CustomerId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Customer status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Active,
    Inactive,
}

/// Contact information for a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Input for creating a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub contact: Option<ContactInfo>,
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub contact: Option<ContactInfo>,
    pub status: Option<CustomerStatus>,
}

/// A customer record with running receivables totals.
///
/// `outstanding_cents` and `total_spent_cents` are maintained by the store's
/// consistency pass as invoices and receipts referencing this customer are
/// created, paid and deleted; they are never written directly by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    name: String,
    contact: ContactInfo,
    outstanding_cents: u64,
    total_spent_cents: u64,
    last_transaction: Option<DateTime<Utc>>,
    /// Weak back-references to invoices raised against this customer.
    invoice_ids: Vec<InvoiceId>,
    status: CustomerStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn create(
        id: CustomerId,
        new: NewCustomer,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }

        Ok(Self {
            id,
            name: new.name,
            contact: new.contact.unwrap_or_default(),
            outstanding_cents: 0,
            total_spent_cents: 0,
            last_transaction: None,
            invoice_ids: Vec::new(),
            status: CustomerStatus::Active,
            created_at: occurred_at,
            updated_at: occurred_at,
        })
    }

    pub fn id_typed(&self) -> CustomerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn outstanding_cents(&self) -> u64 {
        self.outstanding_cents
    }

    pub fn total_spent_cents(&self) -> u64 {
        self.total_spent_cents
    }

    pub fn last_transaction(&self) -> Option<DateTime<Utc>> {
        self.last_transaction
    }

    pub fn invoice_ids(&self) -> &[InvoiceId] {
        &self.invoice_ids
    }

    pub fn status(&self) -> CustomerStatus {
        self.status
    }

    /// Merge a partial update.
    pub fn apply_patch(
        &mut self,
        patch: CustomerPatch,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("customer name cannot be empty"));
            }
            self.name = name;
        }
        if let Some(contact) = patch.contact {
            self.contact = contact;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = occurred_at;
        Ok(())
    }

    /// Consistency hook: an invoice was raised against this customer.
    ///
    /// Both `outstanding` and `total_spent` grow by the invoice amount, the
    /// invoice id is back-referenced, and the transaction clock moves.
    pub fn record_invoice_issued(
        &mut self,
        invoice_id: InvoiceId,
        amount_cents: u64,
        occurred_at: DateTime<Utc>,
    ) {
        self.outstanding_cents = self.outstanding_cents.saturating_add(amount_cents);
        self.total_spent_cents = self.total_spent_cents.saturating_add(amount_cents);
        if !self.invoice_ids.contains(&invoice_id) {
            self.invoice_ids.push(invoice_id);
        }
        self.last_transaction = Some(occurred_at);
        self.updated_at = occurred_at;
    }

    /// Consistency hook: a payment was registered on one of this customer's
    /// invoices. Outstanding floors at 0.
    pub fn record_payment(&mut self, amount_cents: u64, occurred_at: DateTime<Utc>) {
        self.outstanding_cents = self.outstanding_cents.saturating_sub(amount_cents);
        self.last_transaction = Some(occurred_at);
        self.updated_at = occurred_at;
    }

    /// Consistency hook: an invoice referencing this customer was deleted.
    ///
    /// Releases the invoice's unpaid remainder from `outstanding` (floored at
    /// 0) and drops the back-reference.
    pub fn release_invoice(
        &mut self,
        invoice_id: InvoiceId,
        outstanding_cents: u64,
        occurred_at: DateTime<Utc>,
    ) {
        self.outstanding_cents = self.outstanding_cents.saturating_sub(outstanding_cents);
        self.invoice_ids.retain(|id| *id != invoice_id);
        self.updated_at = occurred_at;
    }

    /// Consistency hook: a receipt sale was recorded for this customer.
    pub fn record_sale(&mut self, amount_cents: u64, occurred_at: DateTime<Utc>) {
        self.total_spent_cents = self.total_spent_cents.saturating_add(amount_cents);
        self.last_transaction = Some(occurred_at);
        self.updated_at = occurred_at;
    }

    /// Consistency hook: a receipt sale was deleted. Floors at 0.
    pub fn revert_sale(&mut self, amount_cents: u64, occurred_at: DateTime<Utc>) {
        self.total_spent_cents = self.total_spent_cents.saturating_sub(amount_cents);
        self.updated_at = occurred_at;
    }
}

impl Entity for Customer {
    type Id = CustomerId;

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

#[cfg(test)]
mod tests {
    use super::*;

    fn test_customer_id() -> CustomerId {
        CustomerId::new(EntityId::new())
    }

    fn test_invoice_id() -> InvoiceId {
        InvoiceId::new(EntityId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_customer() -> Customer {
        Customer::create(
            test_customer_id(),
            NewCustomer {
                name: "Acme Ltd".to_string(),
                contact: None,
            },
            test_time(),
        )
        .unwrap()
    }

    #[test]
    fn create_rejects_empty_name() {
        let err = Customer::create(
            test_customer_id(),
            NewCustomer {
                name: "   ".to_string(),
                contact: None,
            },
            test_time(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn new_customer_starts_active_with_zero_balances() {
        let customer = test_customer();
        assert_eq!(customer.status(), CustomerStatus::Active);
        assert_eq!(customer.outstanding_cents(), 0);
        assert_eq!(customer.total_spent_cents(), 0);
        assert!(customer.last_transaction().is_none());
        assert!(customer.invoice_ids().is_empty());
    }

    #[test]
    fn invoice_issue_grows_both_totals_and_back_references() {
        let mut customer = test_customer();
        let invoice_id = test_invoice_id();
        let at = test_time();

        customer.record_invoice_issued(invoice_id, 1000, at);

        assert_eq!(customer.outstanding_cents(), 1000);
        assert_eq!(customer.total_spent_cents(), 1000);
        assert_eq!(customer.invoice_ids(), &[invoice_id]);
        assert_eq!(customer.last_transaction(), Some(at));
    }

    #[test]
    fn payment_reduces_outstanding_and_floors_at_zero() {
        let mut customer = test_customer();
        customer.record_invoice_issued(test_invoice_id(), 500, test_time());

        customer.record_payment(200, test_time());
        assert_eq!(customer.outstanding_cents(), 300);

        customer.record_payment(1000, test_time());
        assert_eq!(customer.outstanding_cents(), 0);
    }

    #[test]
    fn release_invoice_drops_reference_and_remainder() {
        let mut customer = test_customer();
        let invoice_id = test_invoice_id();
        customer.record_invoice_issued(invoice_id, 800, test_time());
        customer.record_payment(300, test_time());

        customer.release_invoice(invoice_id, 500, test_time());
        assert_eq!(customer.outstanding_cents(), 0);
        assert!(customer.invoice_ids().is_empty());
        // total_spent is unaffected by invoice deletion.
        assert_eq!(customer.total_spent_cents(), 800);
    }

    #[test]
    fn sale_and_revert_round_trip() {
        let mut customer = test_customer();
        customer.record_sale(250, test_time());
        assert_eq!(customer.total_spent_cents(), 250);

        customer.revert_sale(400, test_time());
        assert_eq!(customer.total_spent_cents(), 0);
    }

    #[test]
    fn patch_updates_status() {
        let mut customer = test_customer();
        customer
            .apply_patch(
                CustomerPatch {
                    status: Some(CustomerStatus::Inactive),
                    ..CustomerPatch::default()
                },
                test_time(),
            )
            .unwrap();
        assert_eq!(customer.status(), CustomerStatus::Inactive);
    }
}
