//! User-facing alerting seam.

/// Collaborator the store uses to surface failures and to ask for
/// confirmation before destructive actions. The consuming UI supplies the
/// real implementation (dialogs, toasts); the store never blocks on
/// anything beyond these two calls.
pub trait AlertSink: Send + Sync {
    /// Surface a user-visible failure.
    fn report_error(&self, message: &str);

    /// Ask the user to confirm a destructive action (e.g. a customer
    /// deletion that cascades to invoices). Returning `false` aborts it.
    fn confirm_destructive(&self, prompt: &str) -> bool;
}

/// Headless sink: logs errors, confirms everything. Used in tests and by
/// hosts that handle confirmation upstream.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAlertSink;

impl AlertSink for NullAlertSink {
    fn report_error(&self, message: &str) {
        tracing::error!("{message}");
    }

    fn confirm_destructive(&self, _prompt: &str) -> bool {
        true
    }
}
