use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use spacewx_feeds::{parse_kp_table, parse_plasma_table, KpFeed};

fn kp_table(rows: usize) -> Value {
    let mut table = vec![json!(["time_tag", "Kp", "a_running", "station_count"])];
    for i in 0..rows {
        table.push(json!([
            format!("2024-01-{:02} {:02}:00:00.000", i / 8 + 1, (i % 8) * 3),
            format!("{:.2}", (i % 27) as f64 / 3.0),
            "12",
            "8"
        ]));
    }
    Value::Array(table)
}

fn plasma_table(rows: usize) -> Value {
    let mut table = vec![json!(["time_tag", "density", "speed", "temperature"])];
    for i in 0..rows {
        let speed = if i % 50 == 0 {
            Value::Null
        } else {
            json!(format!("{:.1}", 350.0 + (i % 200) as f64))
        };
        table.push(json!([format!("t{}", i), "4.87", speed, "95000"]));
    }
    Value::Array(table)
}

/// Benchmark parsing tables of the sizes SWPC actually serves
fn bench_parse_tables(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_tables");

    // kp 7-day product: ~56 rows; plasma 1-day: ~1440 rows, 7-day: ~10000
    for (name, rows) in [("kp_7day", 56), ("kp_30day", 240)] {
        let table = kp_table(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &table, |b, table| {
            b.iter(|| black_box(parse_kp_table(table).unwrap()));
        });
    }

    for (name, rows) in [("plasma_1day", 1440), ("plasma_7day", 10080)] {
        let table = plasma_table(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &table, |b, table| {
            b.iter(|| black_box(parse_plasma_table(table).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark decoding straight from the response bytes
fn bench_from_slice(c: &mut Criterion) {
    let bytes = serde_json::to_vec(&kp_table(56)).unwrap();

    c.bench_function("kp_from_slice", |b| {
        b.iter(|| black_box(KpFeed::from_slice(&bytes).unwrap()));
    });
}

criterion_group!(benches, bench_parse_tables, bench_from_slice);
criterion_main!(benches);
