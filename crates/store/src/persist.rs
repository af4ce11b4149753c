//! Optional snapshot persistence seam.
//!
//! The store is in-memory first: with no snapshot store configured its
//! state is volatile, exactly like the original data layer. Hosts that
//! want durability plug in a [`SnapshotStore`]; the store then loads one
//! snapshot at startup and saves after every committed mutation.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use ledgerline_customers::Customer;
use ledgerline_invoicing::Invoice;
use ledgerline_products::Product;
use ledgerline_receipts::Receipt;

/// Serialized image of the entire store: the four collections plus the
/// number counters. Derived views are not part of it; they are always
/// recomputed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub customers: Vec<Customer>,
    pub products: Vec<Product>,
    pub invoices: Vec<Invoice>,
    pub receipts: Vec<Receipt>,
    /// Per-year invoice number counters.
    pub invoice_numbering: HashMap<i32, u64>,
    pub receipt_numbering: u64,
}

/// Storage backend for [`StoreSnapshot`]s.
///
/// Backend failures are opaque to the domain, hence `anyhow` at this
/// boundary. A save failure after a committed mutation is reported, never
/// rolled back.
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<StoreSnapshot>>;
    fn save(&self, snapshot: &StoreSnapshot) -> anyhow::Result<()>;
}

/// Reference implementation: one pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn load(&self) -> anyhow::Result<Option<StoreSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        let snapshot = serde_json::from_slice(&bytes)?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &StoreSnapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash mid-save never truncates the
        // previous snapshot.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
