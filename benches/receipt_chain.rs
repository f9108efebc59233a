// SPDX-License-Identifier: MIT OR Apache-2.0
//! Benchmarks for receipt construction, hashing, and chain digesting.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use corsair_core::Step;
use corsair_receipt::{ReceiptBuilder, chain_digest, compute_hash};

fn build_chain(len: usize) -> Vec<corsair_core::Receipt> {
    let steps = [Step::Ingest, Step::Classify, Step::Chart, Step::Marque];
    let mut receipts = Vec::with_capacity(len);
    let mut prev: Option<corsair_core::Receipt> = None;
    for step in steps.into_iter().cycle().take(len) {
        let mut builder = ReceiptBuilder::new(step).reproducible("bench@1");
        if let Some(p) = &prev {
            builder = builder.previous(p);
        }
        let receipt = builder.with_digest().unwrap();
        prev = Some(receipt.clone());
        receipts.push(receipt);
    }
    receipts
}

fn bench_receipt_hash(c: &mut Criterion) {
    let receipt = build_chain(1).remove(0);
    c.bench_function("receipt_compute_hash", |b| {
        b.iter(|| compute_hash(black_box(&receipt)).unwrap());
    });
}

fn bench_chain_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_digest");
    for len in [1, 4, 16, 64] {
        let receipts = build_chain(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("receipts", len), &receipts, |b, receipts| {
            b.iter(|| chain_digest(black_box(receipts)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_receipt_hash, bench_chain_digest);
criterion_main!(benches);
