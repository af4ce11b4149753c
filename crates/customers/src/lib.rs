//! Customers domain module.
//!
//! This crate contains business rules for customer records and their running
//! balances, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod customer;

pub use customer::{
    ContactInfo, Customer, CustomerId, CustomerPatch, CustomerStatus, NewCustomer,
};
