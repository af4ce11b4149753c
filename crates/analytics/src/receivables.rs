//! Accounts-receivable views over open invoices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerline_invoicing::Invoice;

/// Outstanding balances grouped by time past due.
///
/// Buckets follow the usual AR aging report: not yet due, then 0–30,
/// 31–60 and 60+ days past the due date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArAging {
    pub current_cents: u64,
    pub overdue_0_30_cents: u64,
    pub overdue_31_60_cents: u64,
    pub overdue_over_60_cents: u64,
}

impl ArAging {
    pub fn compute(invoices: &[Invoice], now: DateTime<Utc>) -> Self {
        let mut aging = ArAging::default();

        for invoice in invoices {
            if !invoice.status().is_open() {
                continue;
            }
            let outstanding = invoice.outstanding_cents();
            if outstanding == 0 {
                continue;
            }

            let days_past_due = now.signed_duration_since(invoice.due_date()).num_days();
            if invoice.due_date() >= now {
                aging.current_cents += outstanding;
            } else if days_past_due <= 30 {
                aging.overdue_0_30_cents += outstanding;
            } else if days_past_due <= 60 {
                aging.overdue_31_60_cents += outstanding;
            } else {
                aging.overdue_over_60_cents += outstanding;
            }
        }

        aging
    }

    pub fn total_cents(&self) -> u64 {
        self.current_cents
            + self.overdue_0_30_cents
            + self.overdue_31_60_cents
            + self.overdue_over_60_cents
    }
}

/// Headline numbers over open invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivablesSummary {
    pub open_count: usize,
    pub outstanding_cents: u64,
    pub overdue_count: usize,
    pub overdue_cents: u64,
}

impl ReceivablesSummary {
    pub fn compute(invoices: &[Invoice], now: DateTime<Utc>) -> Self {
        let mut summary = ReceivablesSummary::default();

        for invoice in invoices {
            if !invoice.status().is_open() {
                continue;
            }
            let outstanding = invoice.outstanding_cents();
            summary.open_count += 1;
            summary.outstanding_cents += outstanding;
            if invoice.due_date() < now {
                summary.overdue_count += 1;
                summary.overdue_cents += outstanding;
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ledgerline_core::EntityId;
    use ledgerline_invoicing::{InvoiceId, InvoiceItem, InvoiceNumber, InvoiceStatus, NewInvoice};

    fn open_invoice(amount_cents: u64, due: DateTime<Utc>) -> Invoice {
        Invoice::create(
            InvoiceId::new(EntityId::new()),
            InvoiceNumber::generate(2026, 1),
            NewInvoice {
                customer_name: "Acme Ltd".to_string(),
                items: vec![InvoiceItem {
                    product_id: None,
                    description: "Widget".to_string(),
                    quantity: 1,
                    unit_price_cents: amount_cents,
                }],
                due_date: due,
                status: InvoiceStatus::Pending,
            },
            due - Duration::days(14),
        )
        .unwrap()
    }

    #[test]
    fn aging_assigns_buckets_by_days_past_due() {
        let now = Utc::now();
        let invoices = [
            open_invoice(100, now + Duration::days(5)),
            open_invoice(200, now - Duration::days(10)),
            open_invoice(300, now - Duration::days(45)),
            open_invoice(400, now - Duration::days(90)),
        ];

        let aging = ArAging::compute(&invoices, now);
        assert_eq!(aging.current_cents, 100);
        assert_eq!(aging.overdue_0_30_cents, 200);
        assert_eq!(aging.overdue_31_60_cents, 300);
        assert_eq!(aging.overdue_over_60_cents, 400);
        assert_eq!(aging.total_cents(), 1000);
    }

    #[test]
    fn settled_invoices_are_excluded() {
        let now = Utc::now();
        let mut paid = open_invoice(500, now - Duration::days(3));
        paid.record_payment(500, now).unwrap();
        let invoices = [paid, open_invoice(250, now - Duration::days(3))];

        let aging = ArAging::compute(&invoices, now);
        assert_eq!(aging.total_cents(), 250);

        let summary = ReceivablesSummary::compute(&invoices, now);
        assert_eq!(summary.open_count, 1);
        assert_eq!(summary.outstanding_cents, 250);
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.overdue_cents, 250);
    }
}
