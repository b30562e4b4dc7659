//! Throughput of literal parsing, aggregation, and in-memory transfers

use std::sync::Arc;

use bridge_core::{
    aggregate, parse, AggregateOp, Column, ColumnType, Direction, Locator, LocatorKind, Row,
    RowPolicy, RowSource, Schema, TransferConfig, TransferEngine, TransferJob, Unit, UnitValue,
    VecSource,
};
use bridge_core::{BatchSink, CollectingSink, Result};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn literals(n: usize) -> Vec<String> {
    const SUFFIXES: [&str; 4] = ["KB", "MB", "GB", "TB"];
    (0..n)
        .map(|i| format!("{}.{}{}", i % 1000, i % 10, SUFFIXES[i % SUFFIXES.len()]))
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let input = literals(10_000);
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(input.len() as u64));
    group.bench_function("size_literals_10k", |b| {
        b.iter(|| {
            for literal in &input {
                black_box(parse(black_box(literal)).unwrap());
            }
        })
    });
    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let values: Vec<UnitValue> = literals(10_000).iter().map(|l| parse(l).unwrap()).collect();
    let mut group = c.benchmark_group("aggregate");
    group.throughput(Throughput::Elements(values.len() as u64));
    for op in [AggregateOp::Sum, AggregateOp::Avg, AggregateOp::Max] {
        group.bench_with_input(BenchmarkId::from_parameter(op), &values, |b, values| {
            b.iter(|| aggregate(black_box(values), op, Unit::Megabytes).unwrap())
        });
    }
    group.finish();
}

struct MemoryLocator {
    kind: LocatorKind,
    schema: Arc<Schema>,
    rows: Vec<Row>,
}

impl Locator for MemoryLocator {
    fn kind(&self) -> LocatorKind {
        self.kind
    }

    fn describe(&self) -> String {
        format!("memory {}", self.kind)
    }

    fn schema(&self) -> Result<Arc<Schema>> {
        Ok(Arc::clone(&self.schema))
    }

    fn open_for_read(&self) -> Result<Box<dyn RowSource>> {
        Ok(Box::new(VecSource::new(Arc::clone(&self.schema), self.rows.clone())))
    }

    fn open_for_write(&self, _schema: Arc<Schema>) -> Result<Box<dyn BatchSink>> {
        Ok(Box::new(CollectingSink::new()))
    }
}

fn bench_transfer(c: &mut Criterion) {
    let schema = Arc::new(
        Schema::new(vec![
            Column::new("id", ColumnType::Int64),
            Column::new("size", ColumnType::ByteSize),
        ])
        .unwrap(),
    );
    let rows: Vec<Row> = literals(10_000)
        .into_iter()
        .enumerate()
        .map(|(i, size)| {
            Row::from_fields(Arc::clone(&schema), [i.to_string(), size], RowPolicy::Strict)
                .unwrap()
        })
        .collect();

    let mut group = c.benchmark_group("transfer");
    group.throughput(Throughput::Elements(rows.len() as u64));
    for batch_size in [100, 1000] {
        let engine = TransferEngine::new(TransferConfig::with_batch_size(batch_size)).unwrap();
        group.bench_with_input(BenchmarkId::new("batch", batch_size), &rows, |b, rows| {
            b.iter(|| {
                let source: Arc<dyn Locator> = Arc::new(MemoryLocator {
                    kind: LocatorKind::File,
                    schema: Arc::clone(&schema),
                    rows: rows.clone(),
                });
                let sink: Arc<dyn Locator> = Arc::new(MemoryLocator {
                    kind: LocatorKind::Table,
                    schema: Arc::clone(&schema),
                    rows: Vec::new(),
                });
                let job = TransferJob::with_source_columns(Direction::Import, source, sink).unwrap();
                engine.run(job, |_| {}).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_aggregate, bench_transfer);
criterion_main!(benches);
