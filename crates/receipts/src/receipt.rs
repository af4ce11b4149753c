use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerline_core::{DomainError, Entity, EntityId};

/// Sentinel customer name for over-the-counter sales with no linked
/// customer record.
pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

/// Receipt identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(pub EntityId);

impl ReceiptId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Human-readable receipt number (`RCP-<seq>`), from the store's monotonic
/// counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptNumber(String);

impl ReceiptNumber {
    pub fn generate(seq: u64) -> Self {
        Self(format!("RCP-{seq:04}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ReceiptNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the sale was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    MobileMoney,
}

/// Receipt status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Completed,
    Refunded,
    Pending,
}

/// Receipt line item.
///
/// The `name` doubles as an optional product link: stock adjustment resolves
/// it by exact match against the product collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub name: String,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price_cents: u64,
    pub quantity: i64,
}

/// Input for creating a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReceipt {
    /// `None` records a walk-in sale.
    pub customer_name: Option<String>,
    pub items: Vec<ReceiptItem>,
    pub tax_cents: u64,
    pub discount_cents: u64,
    pub payment_method: PaymentMethod,
}

/// A completed point-of-sale transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    id: ReceiptId,
    number: ReceiptNumber,
    customer_name: String,
    subtotal_cents: u64,
    tax_cents: u64,
    discount_cents: u64,
    /// `subtotal + tax - discount`, floored at 0.
    amount_cents: u64,
    payment_method: PaymentMethod,
    status: ReceiptStatus,
    items: Vec<ReceiptItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Receipt {
    pub fn create(
        id: ReceiptId,
        number: ReceiptNumber,
        new: NewReceipt,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if new.items.is_empty() {
            return Err(DomainError::validation(
                "cannot create receipt without items",
            ));
        }

        let mut subtotal: u64 = 0;
        for item in &new.items {
            if item.name.trim().is_empty() {
                return Err(DomainError::validation("receipt item name cannot be empty"));
            }
            if item.quantity <= 0 {
                return Err(DomainError::validation(
                    "receipt item quantity must be positive",
                ));
            }
            let line_total = (item.quantity as u128)
                .checked_mul(item.unit_price_cents as u128)
                .ok_or_else(|| DomainError::invariant("receipt line amount overflow"))?;
            let line_total = u64::try_from(line_total)
                .map_err(|_| DomainError::invariant("receipt line amount overflow"))?;
            subtotal = subtotal
                .checked_add(line_total)
                .ok_or_else(|| DomainError::invariant("receipt total overflow"))?;
        }

        let customer_name = match new.customer_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => WALK_IN_CUSTOMER.to_string(),
        };

        let amount_cents = subtotal
            .checked_add(new.tax_cents)
            .ok_or_else(|| DomainError::invariant("receipt total overflow"))?
            .saturating_sub(new.discount_cents);

        Ok(Self {
            id,
            number,
            customer_name,
            subtotal_cents: subtotal,
            tax_cents: new.tax_cents,
            discount_cents: new.discount_cents,
            amount_cents,
            payment_method: new.payment_method,
            status: ReceiptStatus::Completed,
            items: new.items,
            created_at: occurred_at,
            updated_at: occurred_at,
        })
    }

    pub fn id_typed(&self) -> ReceiptId {
        self.id
    }

    pub fn number(&self) -> &ReceiptNumber {
        &self.number
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    /// The linked customer name, unless this is a walk-in sale.
    pub fn linked_customer_name(&self) -> Option<&str> {
        (self.customer_name != WALK_IN_CUSTOMER).then_some(self.customer_name.as_str())
    }

    pub fn subtotal_cents(&self) -> u64 {
        self.subtotal_cents
    }

    pub fn tax_cents(&self) -> u64 {
        self.tax_cents
    }

    pub fn discount_cents(&self) -> u64 {
        self.discount_cents
    }

    pub fn amount_cents(&self) -> u64 {
        self.amount_cents
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn status(&self) -> ReceiptStatus {
        self.status
    }

    pub fn items(&self) -> &[ReceiptItem] {
        &self.items
    }

    pub fn set_status(&mut self, status: ReceiptStatus, occurred_at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = occurred_at;
    }
}

impl Entity for Receipt {
    type Id = ReceiptId;

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

    fn test_receipt_id() -> ReceiptId {
        ReceiptId::new(EntityId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn widget(quantity: i64, unit_price_cents: u64) -> ReceiptItem {
        ReceiptItem {
            name: "Widget".to_string(),
            unit_price_cents,
            quantity,
        }
    }

    #[test]
    fn number_formatting() {
        assert_eq!(ReceiptNumber::generate(12).as_str(), "RCP-0012");
        assert_eq!(ReceiptNumber::generate(98765).as_str(), "RCP-98765");
    }

    #[test]
    fn create_derives_totals() {
        let receipt = Receipt::create(
            test_receipt_id(),
            ReceiptNumber::generate(1),
            NewReceipt {
                customer_name: Some("Acme Ltd".to_string()),
                items: vec![widget(2, 500), widget(1, 250)],
                tax_cents: 100,
                discount_cents: 50,
                payment_method: PaymentMethod::Cash,
            },
            test_time(),
        )
        .unwrap();

        assert_eq!(receipt.subtotal_cents(), 1250);
        assert_eq!(receipt.amount_cents(), 1300);
        assert_eq!(receipt.status(), ReceiptStatus::Completed);
        assert_eq!(receipt.linked_customer_name(), Some("Acme Ltd"));
    }

    #[test]
    fn missing_customer_falls_back_to_walk_in() {
        let receipt = Receipt::create(
            test_receipt_id(),
            ReceiptNumber::generate(1),
            NewReceipt {
                customer_name: None,
                items: vec![widget(1, 100)],
                tax_cents: 0,
                discount_cents: 0,
                payment_method: PaymentMethod::Card,
            },
            test_time(),
        )
        .unwrap();

        assert_eq!(receipt.customer_name(), WALK_IN_CUSTOMER);
        assert_eq!(receipt.linked_customer_name(), None);
    }

    #[test]
    fn discount_larger_than_total_floors_at_zero() {
        let receipt = Receipt::create(
            test_receipt_id(),
            ReceiptNumber::generate(1),
            NewReceipt {
                customer_name: None,
                items: vec![widget(1, 100)],
                tax_cents: 0,
                discount_cents: 500,
                payment_method: PaymentMethod::Cash,
            },
            test_time(),
        )
        .unwrap();
        assert_eq!(receipt.amount_cents(), 0);
    }

    #[test]
    fn refund_updates_status() {
        let mut receipt = Receipt::create(
            test_receipt_id(),
            ReceiptNumber::generate(1),
            NewReceipt {
                customer_name: None,
                items: vec![widget(1, 100)],
                tax_cents: 0,
                discount_cents: 0,
                payment_method: PaymentMethod::Transfer,
            },
            test_time(),
        )
        .unwrap();
        assert_eq!(receipt.status(), ReceiptStatus::Completed);

        receipt.set_status(ReceiptStatus::Refunded, test_time());
        assert_eq!(receipt.status(), ReceiptStatus::Refunded);
    }

    #[test]
    fn create_rejects_empty_items() {
        let err = Receipt::create(
            test_receipt_id(),
            ReceiptNumber::generate(1),
            NewReceipt {
                customer_name: None,
                items: vec![],
                tax_cents: 0,
                discount_cents: 0,
                payment_method: PaymentMethod::Cash,
            },
            test_time(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
