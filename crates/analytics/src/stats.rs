use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use ledgerline_core::Entity;
use ledgerline_customers::Customer;
use ledgerline_invoicing::{Invoice, InvoiceStatus};
use ledgerline_products::Product;
use ledgerline_receipts::{Receipt, ReceiptStatus};

/// Tuning for period-over-period comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsConfig {
    /// Length of the trailing comparison window.
    pub period: Duration,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            period: Duration::days(30),
        }
    }
}

/// Borrowed entity snapshots the aggregation scans.
#[derive(Debug, Clone, Copy)]
pub struct StatsInputs<'a> {
    pub customers: &'a [Customer],
    pub products: &'a [Product],
    pub invoices: &'a [Invoice],
    pub receipts: &'a [Receipt],
}

/// Dashboard snapshot; a pure function of the four collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Paid-invoice + completed-receipt revenue in the trailing period.
    pub revenue_cents: u64,
    /// Unpaid remainders over pending/overdue invoices.
    pub outstanding_cents: u64,
    /// Products at or below their low-stock threshold (including depleted).
    pub low_stock_count: usize,
    pub customer_count: usize,
    pub invoice_count: usize,
    /// Trailing period vs. the preceding one, in percent.
    pub revenue_change_pct: f64,
    pub invoice_change_pct: f64,
    pub customer_change_pct: f64,
    /// `total paid / total invoiced`, in percent; 100 with no invoices.
    pub payment_collection_rate: f64,
}

impl DashboardStats {
    pub fn compute(inputs: StatsInputs<'_>, now: DateTime<Utc>, config: &StatsConfig) -> Self {
        let period_start = now - config.period;
        let prior_start = period_start - config.period;

        let revenue_cents =
            revenue_in_window(inputs.invoices, inputs.receipts, period_start, now);
        let prior_revenue =
            revenue_in_window(inputs.invoices, inputs.receipts, prior_start, period_start);

        let outstanding_cents = inputs
            .invoices
            .iter()
            .filter(|i| i.status().is_open())
            .map(Invoice::outstanding_cents)
            .sum();

        let low_stock_count = inputs
            .products
            .iter()
            .filter(|p| p.status().is_depleted_or_low())
            .count();

        let invoices_current =
            count_created_between(inputs.invoices, period_start, now);
        let invoices_prior =
            count_created_between(inputs.invoices, prior_start, period_start);
        let customers_current =
            count_created_between(inputs.customers, period_start, now);
        let customers_prior =
            count_created_between(inputs.customers, prior_start, period_start);

        let total_invoiced: u64 = inputs.invoices.iter().map(Invoice::amount_cents).sum();
        let total_paid: u64 = inputs.invoices.iter().map(Invoice::paid_amount_cents).sum();
        let payment_collection_rate = if total_invoiced == 0 {
            100.0
        } else {
            total_paid as f64 / total_invoiced as f64 * 100.0
        };

        Self {
            revenue_cents,
            outstanding_cents,
            low_stock_count,
            customer_count: inputs.customers.len(),
            invoice_count: inputs.invoices.len(),
            revenue_change_pct: percent_change(revenue_cents as f64, prior_revenue as f64),
            invoice_change_pct: percent_change(invoices_current as f64, invoices_prior as f64),
            customer_change_pct: percent_change(customers_current as f64, customers_prior as f64),
            payment_collection_rate,
        }
    }
}

/// Revenue recognized in `[from, to)`: paid-invoice totals plus
/// completed-receipt totals, dated by creation.
pub fn revenue_in_window(
    invoices: &[Invoice],
    receipts: &[Receipt],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> u64 {
    let invoiced: u64 = invoices
        .iter()
        .filter(|i| i.status() == InvoiceStatus::Paid)
        .filter(|i| i.created_at() >= from && i.created_at() < to)
        .map(Invoice::amount_cents)
        .sum();
    let sold: u64 = receipts
        .iter()
        .filter(|r| r.status() == ReceiptStatus::Completed)
        .filter(|r| r.created_at() >= from && r.created_at() < to)
        .map(Receipt::amount_cents)
        .sum();
    invoiced.saturating_add(sold)
}

fn count_created_between<E: Entity>(
    entities: &[E],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> usize {
    entities
        .iter()
        .filter(|e| e.created_at() >= from && e.created_at() < to)
        .count()
}

/// Period-over-period delta in percent.
///
/// A zero prior-period denominator reports a fixed +100% rather than
/// dividing by zero.
fn percent_change(current: f64, prior: f64) -> f64 {
    if prior == 0.0 {
        100.0
    } else {
        (current - prior) / prior * 100.0
    }
}
