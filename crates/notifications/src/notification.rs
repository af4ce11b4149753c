use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification identity.
///
/// Derived entries use a deterministic composite of type tag, source entity
/// id and the entity's last-modified timestamp, which makes regeneration
/// idempotent: the same entity state always produces the same id, so read
/// flags survive the merge. Manual entries get a random id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn derived(
        kind: NotificationKind,
        entity_id: impl core::fmt::Display,
        entity_updated_at: DateTime<Utc>,
    ) -> Self {
        Self(format!(
            "{}:{}:{}",
            kind.tag(),
            entity_id,
            entity_updated_at.timestamp_millis()
        ))
    }

    pub fn random() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What condition (or manual push) produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    InvoiceOverdue,
    PaymentReceived,
    LowStock,
    OutOfStock,
    NewCustomer,
    InvoiceCreated,
    PaymentDue,
    ReceiptCreated,
    HighValuePayment,
    // Manual kinds pushed by collaborators.
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn tag(self) -> &'static str {
        match self {
            NotificationKind::InvoiceOverdue => "invoice_overdue",
            NotificationKind::PaymentReceived => "payment_received",
            NotificationKind::LowStock => "low_stock",
            NotificationKind::OutOfStock => "out_of_stock",
            NotificationKind::NewCustomer => "new_customer",
            NotificationKind::InvoiceCreated => "invoice_created",
            NotificationKind::PaymentDue => "payment_due",
            NotificationKind::ReceiptCreated => "receipt_created",
            NotificationKind::HighValuePayment => "high_value_payment",
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

/// Display priority; feeds sort high before medium before low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

/// Optional call-to-action attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub label: String,
    pub target: String,
}

/// A single feed entry.
///
/// The only field a consumer may mutate (through the feed API) is `read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub action: Option<NotificationAction>,
    /// Back-reference to the source entity, when there is one.
    pub data_id: Option<String>,
    /// Whether this entry was pushed manually (and so survives
    /// regeneration instead of being re-derived).
    pub manual: bool,
}

/// Input for a manually pushed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub action: Option<NotificationAction>,
}

/// Tuning knobs for generation, pruning and the manual auto-read timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Window for "invoice paid recently" / "receipt created recently".
    pub recent_activity: Duration,
    /// Window for "customer created recently" / "invoice created recently".
    pub recent_creation: Duration,
    /// Look-ahead for invoices approaching their due date.
    pub due_soon: Duration,
    /// Paid invoices at or above this total get a high-value entry.
    pub high_value_threshold_cents: u64,
    /// Entries older than this are dropped from the feed.
    pub retention: Duration,
    /// Manual non-error entries are marked read once this has elapsed.
    pub auto_read_after: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            recent_activity: Duration::days(3),
            recent_creation: Duration::days(7),
            due_soon: Duration::days(7),
            high_value_threshold_cents: 100_000,
            retention: Duration::days(60),
            auto_read_after: Duration::seconds(5),
        }
    }
}

impl NotificationConfig {
    pub fn with_high_value_threshold(mut self, cents: u64) -> Self {
        self.high_value_threshold_cents = cents;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_auto_read_after(mut self, delay: Duration) -> Self {
        self.auto_read_after = delay;
        self
    }
}
