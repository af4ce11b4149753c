//! Dashboard aggregates derived from entity state.
//!
//! Everything here is a pure, stateless recomputation over borrowed entity
//! snapshots; nothing is cached or persisted.

pub mod receivables;
pub mod stats;

pub use receivables::{ArAging, ReceivablesSummary};
pub use stats::{DashboardStats, StatsConfig, StatsInputs, revenue_in_window};
