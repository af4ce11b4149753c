//! The shared business-entity store.
//!
//! One store instance owns the canonical in-memory collections (customers,
//! products, invoices, receipts) and is the only way to mutate them. Every
//! mutating operation applies its cross-entity side effects synchronously
//! before returning, so a caller observing the result always sees customer
//! balances and stock levels that already reflect it. Dashboard stats and
//! the notification feed are derived views recomputed from current state.

pub mod alert;
pub mod persist;
pub mod store;

mod state;

pub use alert::{AlertSink, NullAlertSink};
pub use persist::{JsonFileSnapshotStore, SnapshotStore, StoreSnapshot};
pub use store::{BusinessStore, StockShortage};
