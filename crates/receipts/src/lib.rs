//! Receipts domain module.
//!
//! This crate contains business rules for point-of-sale receipts,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage).

pub mod receipt;

pub use receipt::{
    NewReceipt, PaymentMethod, Receipt, ReceiptId, ReceiptItem, ReceiptNumber, ReceiptStatus,
    WALK_IN_CUSTOMER,
};
