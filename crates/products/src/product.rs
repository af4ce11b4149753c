use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerline_core::{DomainError, Entity, EntityId};

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub EntityId);

impl ProductId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Derived stock level classification.
///
/// Never supplied by callers: it is recomputed from `quantity` and
/// `low_stock_threshold` after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Classify a quantity against a low-stock threshold.
    ///
    /// `OutOfStock` iff `quantity <= 0`; `LowStock` iff
    /// `0 < quantity <= threshold`; `InStock` otherwise.
    pub fn for_quantity(quantity: i64, threshold: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn is_depleted_or_low(self) -> bool {
        matches!(self, StockStatus::LowStock | StockStatus::OutOfStock)
    }
}

/// A stock mutation expressed as intent rather than a raw quantity write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockAdjustment {
    /// Increase quantity by the given amount (must be positive).
    Add(i64),
    /// Decrease quantity by the given amount (must be positive); the
    /// resulting quantity is floored at 0.
    Remove(i64),
    /// Replace quantity with the given value (must be non-negative).
    Set(i64),
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub price_cents: u64,
    pub cost_price_cents: u64,
    pub quantity: i64,
    pub low_stock_threshold: i64,
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price_cents: Option<u64>,
    pub cost_price_cents: Option<u64>,
    pub quantity: Option<i64>,
    pub low_stock_threshold: Option<i64>,
}

/// A catalog product with tracked stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    sku: String,
    /// Price in smallest currency unit (e.g., cents).
    price_cents: u64,
    cost_price_cents: u64,
    quantity: i64,
    low_stock_threshold: i64,
    status: StockStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(
        id: ProductId,
        new: NewProduct,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if new.sku.trim().is_empty() {
            return Err(DomainError::validation("product sku cannot be empty"));
        }
        if new.quantity < 0 {
            return Err(DomainError::validation("initial quantity cannot be negative"));
        }
        if new.low_stock_threshold < 0 {
            return Err(DomainError::validation(
                "low stock threshold cannot be negative",
            ));
        }

        Ok(Self {
            id,
            status: StockStatus::for_quantity(new.quantity, new.low_stock_threshold),
            name: new.name,
            sku: new.sku,
            price_cents: new.price_cents,
            cost_price_cents: new.cost_price_cents,
            quantity: new.quantity,
            low_stock_threshold: new.low_stock_threshold,
            created_at: occurred_at,
            updated_at: occurred_at,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn price_cents(&self) -> u64 {
        self.price_cents
    }

    pub fn cost_price_cents(&self) -> u64 {
        self.cost_price_cents
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn low_stock_threshold(&self) -> i64 {
        self.low_stock_threshold
    }

    pub fn status(&self) -> StockStatus {
        self.status
    }

    /// Merge a partial update and re-derive `status`.
    ///
    /// Caller-supplied status is never accepted; the classification is
    /// recomputed from the merged quantity/threshold.
    pub fn apply_patch(
        &mut self,
        patch: ProductPatch,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("product name cannot be empty"));
            }
            self.name = name;
        }
        if let Some(sku) = patch.sku {
            if sku.trim().is_empty() {
                return Err(DomainError::validation("product sku cannot be empty"));
            }
            self.sku = sku;
        }
        if let Some(price) = patch.price_cents {
            self.price_cents = price;
        }
        if let Some(cost) = patch.cost_price_cents {
            self.cost_price_cents = cost;
        }
        if let Some(quantity) = patch.quantity {
            if quantity < 0 {
                return Err(DomainError::validation("quantity cannot be negative"));
            }
            self.quantity = quantity;
        }
        if let Some(threshold) = patch.low_stock_threshold {
            if threshold < 0 {
                return Err(DomainError::validation(
                    "low stock threshold cannot be negative",
                ));
            }
            self.low_stock_threshold = threshold;
        }

        self.refresh_status(occurred_at);
        Ok(())
    }

    /// Apply a stock adjustment and re-derive `status`.
    ///
    /// Returns the new quantity. `Remove` floors at 0 rather than going
    /// negative.
    pub fn adjust_stock(
        &mut self,
        adjustment: StockAdjustment,
        occurred_at: DateTime<Utc>,
    ) -> Result<i64, DomainError> {
        match adjustment {
            StockAdjustment::Add(amount) => {
                if amount <= 0 {
                    return Err(DomainError::validation("add amount must be positive"));
                }
                self.quantity = self.quantity.saturating_add(amount);
            }
            StockAdjustment::Remove(amount) => {
                if amount <= 0 {
                    return Err(DomainError::validation("remove amount must be positive"));
                }
                self.quantity = (self.quantity - amount).max(0);
            }
            StockAdjustment::Set(quantity) => {
                if quantity < 0 {
                    return Err(DomainError::validation("quantity cannot be negative"));
                }
                self.quantity = quantity;
            }
        }

        self.refresh_status(occurred_at);
        Ok(self.quantity)
    }

    /// Reduce stock by `min(available, requested)`, flooring at 0.
    ///
    /// Returns the amount actually deducted. Used by invoice fulfilment,
    /// where a shortfall is reported to the caller instead of failing.
    pub fn deduct_available(&mut self, requested: i64, occurred_at: DateTime<Utc>) -> i64 {
        let applied = requested.min(self.quantity).max(0);
        self.quantity -= applied;
        self.refresh_status(occurred_at);
        applied
    }

    /// Return previously deducted stock (receipt deletion).
    pub fn restore_stock(&mut self, amount: i64, occurred_at: DateTime<Utc>) {
        if amount > 0 {
            self.quantity = self.quantity.saturating_add(amount);
            self.refresh_status(occurred_at);
        }
    }

    fn refresh_status(&mut self, occurred_at: DateTime<Utc>) {
        self.status = StockStatus::for_quantity(self.quantity, self.low_stock_threshold);
        self.updated_at = occurred_at;
    }
}

impl Entity for Product {
    type Id = ProductId;

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

    fn test_product_id() -> ProductId {
        ProductId::new(EntityId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn new_product(quantity: i64, threshold: i64) -> Product {
        Product::create(
            test_product_id(),
            NewProduct {
                name: "Widget".to_string(),
                sku: "WID-001".to_string(),
                price_cents: 1500,
                cost_price_cents: 900,
                quantity,
                low_stock_threshold: threshold,
            },
            test_time(),
        )
        .unwrap()
    }

    #[test]
    fn create_rejects_empty_name_and_sku() {
        let err = Product::create(
            test_product_id(),
            NewProduct {
                name: "  ".to_string(),
                sku: "SKU".to_string(),
                price_cents: 0,
                cost_price_cents: 0,
                quantity: 0,
                low_stock_threshold: 0,
            },
            test_time(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = Product::create(
            test_product_id(),
            NewProduct {
                name: "Widget".to_string(),
                sku: "".to_string(),
                price_cents: 0,
                cost_price_cents: 0,
                quantity: 0,
                low_stock_threshold: 0,
            },
            test_time(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn status_is_derived_on_create() {
        assert_eq!(new_product(0, 5).status(), StockStatus::OutOfStock);
        assert_eq!(new_product(3, 5).status(), StockStatus::LowStock);
        assert_eq!(new_product(5, 5).status(), StockStatus::LowStock);
        assert_eq!(new_product(6, 5).status(), StockStatus::InStock);
    }

    #[test]
    fn patch_recomputes_status_and_ignores_caller_status() {
        let mut product = new_product(10, 5);
        assert_eq!(product.status(), StockStatus::InStock);

        product
            .apply_patch(
                ProductPatch {
                    quantity: Some(2),
                    ..ProductPatch::default()
                },
                test_time(),
            )
            .unwrap();
        assert_eq!(product.status(), StockStatus::LowStock);

        product
            .apply_patch(
                ProductPatch {
                    low_stock_threshold: Some(1),
                    ..ProductPatch::default()
                },
                test_time(),
            )
            .unwrap();
        assert_eq!(product.status(), StockStatus::InStock);
    }

    #[test]
    fn remove_floors_at_zero() {
        let mut product = new_product(3, 5);
        let qty = product
            .adjust_stock(StockAdjustment::Remove(10), test_time())
            .unwrap();
        assert_eq!(qty, 0);
        assert_eq!(product.status(), StockStatus::OutOfStock);
    }

    #[test]
    fn adjust_rejects_non_positive_amounts() {
        let mut product = new_product(3, 5);
        assert!(product
            .adjust_stock(StockAdjustment::Add(0), test_time())
            .is_err());
        assert!(product
            .adjust_stock(StockAdjustment::Remove(-2), test_time())
            .is_err());
        assert!(product
            .adjust_stock(StockAdjustment::Set(-1), test_time())
            .is_err());
        assert_eq!(product.quantity(), 3);
    }

    #[test]
    fn deduct_available_caps_at_current_stock() {
        let mut product = new_product(3, 5);
        let applied = product.deduct_available(5, test_time());
        assert_eq!(applied, 3);
        assert_eq!(product.quantity(), 0);
        assert_eq!(product.status(), StockStatus::OutOfStock);
    }

    #[test]
    fn restore_stock_reverses_deduction() {
        let mut product = new_product(10, 5);
        product.deduct_available(2, test_time());
        assert_eq!(product.quantity(), 8);
        product.restore_stock(2, test_time());
        assert_eq!(product.quantity(), 10);
        assert_eq!(product.status(), StockStatus::InStock);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: status always matches the quantity/threshold classification.
            #[test]
            fn status_matches_classification(
                quantity in -1000i64..1000,
                threshold in 0i64..100,
            ) {
                let status = StockStatus::for_quantity(quantity, threshold);
                if quantity <= 0 {
                    prop_assert_eq!(status, StockStatus::OutOfStock);
                } else if quantity <= threshold {
                    prop_assert_eq!(status, StockStatus::LowStock);
                } else {
                    prop_assert_eq!(status, StockStatus::InStock);
                }
            }

            /// Property: no sequence of removals drives quantity below zero.
            #[test]
            fn remove_never_goes_negative(
                initial in 0i64..500,
                removals in proptest::collection::vec(1i64..200, 0..20),
            ) {
                let mut product = Product::create(
                    ProductId::new(EntityId::new()),
                    NewProduct {
                        name: "Widget".to_string(),
                        sku: "WID-001".to_string(),
                        price_cents: 100,
                        cost_price_cents: 50,
                        quantity: initial,
                        low_stock_threshold: 5,
                    },
                    Utc::now(),
                ).unwrap();

                for amount in removals {
                    product.adjust_stock(StockAdjustment::Remove(amount), Utc::now()).unwrap();
                    prop_assert!(product.quantity() >= 0);
                    prop_assert_eq!(
                        product.status(),
                        StockStatus::for_quantity(product.quantity(), product.low_stock_threshold())
                    );
                }
            }
        }
    }
}
