//! Invoicing domain module.
//!
//! This crate contains business rules for invoices and accounts receivable,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage).

pub mod invoice;

pub use invoice::{
    Invoice, InvoiceId, InvoiceItem, InvoiceNumber, InvoicePatch, InvoiceStatus, NewInvoice,
};
