//! Allocating-conversion benchmarks.
//!
//! `%ms` over inputs that stay inside the initial buffer, and over inputs
//! that force repeated doubling.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use scanlibc_core::stdio::scanf::{ScanArg, ScanOptions, sscanf_with};

fn bench_alloc_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_string");
    let opts = ScanOptions::strict();

    for len in [16usize, 100, 1_000, 10_000] {
        let input = vec![b'x'; len];
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("ms", len), &input, |b, input| {
            b.iter(|| {
                let mut slot = None;
                let n = sscanf_with(
                    black_box(input),
                    b"%ms",
                    &mut [ScanArg::AllocBytes(&mut slot)],
                    &opts,
                );
                black_box((n, slot))
            });
        });
    }

    let input = vec![b'x'; 1_000];
    let capped = ScanOptions::strict().with_alloc_budget(400);
    group.throughput(Throughput::Bytes(1_000));
    group.bench_function("ms_budget_exhausted", |b| {
        b.iter(|| {
            let mut slot = None;
            let n = sscanf_with(
                black_box(&input),
                b"%ms",
                &mut [ScanArg::AllocBytes(&mut slot)],
                &capped,
            );
            black_box((n, slot))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_alloc_growth);
criterion_main!(benches);
