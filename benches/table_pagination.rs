//! Pagination benchmarks
//!
//! Measures dry-run plus render time of a report whose table flows over
//! many pages, for several row counts and table batch sizes.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use reportflow::{LayoutConfig, Report, ReportDefinition};
use serde_json::{Value, json};
use std::hint::black_box;

fn invoice_template() -> ReportDefinition {
    let template = json!({
        "version": 4,
        "documentProperties": {
            "pageFormat": "A4",
            "marginLeft": 20, "marginTop": 20, "marginRight": 20, "marginBottom": 20,
            "header": true, "headerSize": 40, "headerDisplay": "always",
            "footer": true, "footerSize": 30, "footerDisplay": "always"
        },
        "parameters": [{
            "id": 1, "name": "items", "type": "array",
            "children": [
                {"id": 2, "name": "name", "type": "string"},
                {"id": 3, "name": "price", "type": "number", "pattern": "#,##0.00"}
            ]
        }],
        "styles": [],
        "docElements": [
            {
                "elementType": "text", "id": 10, "containerId": "0_header",
                "x": 0, "y": 0, "width": 300, "height": 20,
                "content": "Invoice, page ${page_number} of ${page_count}"
            },
            {
                "elementType": "table", "id": 20, "containerId": "0_content",
                "x": 0, "y": 0, "width": 400, "height": 40,
                "dataSource": "${items}", "columns": 2,
                "header": true, "footer": false,
                "headerData": {
                    "id": 21, "height": 20, "repeatHeader": true,
                    "columnData": [
                        {"id": 22, "width": 300, "content": "Item"},
                        {"id": 23, "width": 100, "content": "Price", "horizontalAlignment": "right"}
                    ]
                },
                "contentDataRows": [{
                    "id": 24, "height": 18,
                    "columnData": [
                        {"id": 25, "width": 300, "content": "${name}"},
                        {"id": 26, "width": 100, "content": "${price}", "horizontalAlignment": "right"}
                    ]
                }]
            },
            {
                "elementType": "text", "id": 30, "containerId": "0_footer",
                "x": 0, "y": 0, "width": 300, "height": 20,
                "content": "Thank you for your order"
            }
        ]
    });
    serde_json::from_value(template).expect("Failed to parse template")
}

fn invoice_data(rows: usize) -> Value {
    let items: Vec<Value> = (0..rows)
        .map(|i| json!({"name": format!("Article number {}", i), "price": i as f64 * 1.25}))
        .collect();
    json!({ "items": items })
}

fn benchmark_table_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_rows");
    let definition = invoice_template();

    for rows in [100, 1_000, 5_000] {
        let data = invoice_data(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &rows, |b, _| {
            b.iter(|| {
                let report = Report::new(definition.clone(), data.clone(), LayoutConfig::default())
                    .expect("Failed to build report");
                black_box(report.render_document().expect("Failed to generate report"))
            });
        });
    }

    group.finish();
}

fn benchmark_batch_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_batch_size");
    let definition = invoice_template();
    let data = invoice_data(1_000);

    for batch in [1, 10, 100] {
        let config = LayoutConfig {
            table_batch_size: batch,
            ..LayoutConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("batch", batch), &batch, |b, _| {
            b.iter(|| {
                let report = Report::new(definition.clone(), data.clone(), config).expect("Failed to build report");
                black_box(report.render_document().expect("Failed to generate report"))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_table_rows, benchmark_batch_size);
criterion_main!(benches);
