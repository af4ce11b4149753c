use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, TimeZone, Utc};

use ledgerline_customers::NewCustomer;
use ledgerline_invoicing::{InvoiceItem, InvoiceStatus, NewInvoice};
use ledgerline_store::BusinessStore;

fn base_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
}

fn pending_invoice(amount_cents: u64) -> NewInvoice {
    NewInvoice {
        customer_name: "Acme Ltd".to_string(),
        items: vec![InvoiceItem {
            product_id: None,
            description: "Consulting".to_string(),
            quantity: 1,
            unit_price_cents: amount_cents,
        }],
        due_date: base_time() + Duration::days(14),
        status: InvoiceStatus::Pending,
    }
}

/// Invoice create + full payment, including the customer consistency pass.
fn bench_invoice_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoice_lifecycle");
    group.throughput(Throughput::Elements(1));

    group.bench_function("create_and_pay", |b| {
        let store = BusinessStore::new();
        let at = base_time();
        store
            .create_customer(
                NewCustomer {
                    name: "Acme Ltd".to_string(),
                    contact: None,
                },
                at,
            )
            .unwrap();

        b.iter(|| {
            let id = store
                .create_invoice(black_box(pending_invoice(1000)), at)
                .unwrap();
            store.record_payment(id, 1000, at).unwrap();
        });
    });

    group.finish();
}

/// Derived-view recomputation cost over growing collections.
fn bench_derived_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("derived_views");

    for size in [100usize, 1000] {
        let store = BusinessStore::new();
        let at = base_time();
        store
            .create_customer(
                NewCustomer {
                    name: "Acme Ltd".to_string(),
                    contact: None,
                },
                at,
            )
            .unwrap();
        for i in 0..size {
            let id = store
                .create_invoice(pending_invoice(100 + i as u64), at)
                .unwrap();
            if i % 3 == 0 {
                store.record_payment(id, 100 + i as u64, at).unwrap();
            }
        }

        group.bench_with_input(
            BenchmarkId::new("dashboard_stats", size),
            &size,
            |b, _| {
                b.iter(|| black_box(store.dashboard_stats(at)));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("notifications", size),
            &size,
            |b, _| {
                b.iter(|| black_box(store.notifications(at)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_invoice_lifecycle, bench_derived_views);
criterion_main!(benches);
