//! Formatted-input benchmarks.
//!
//! Compares the narrow and wide entry points under each membrane mode,
//! with the host libc `sscanf` as a baseline for the integer case.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use scanlibc_core::stdio::scanf::{ScanArg, ScanOptions, sscanf_with, swscanf_with};
use scanlibc_membrane::config::SafetyLevel;

#[derive(Default)]
struct BenchStats {
    samples_ns_per_op: Vec<f64>,
    total_iters: u64,
    total_ns: u128,
}

impl BenchStats {
    fn record(&mut self, iters: u64, dur: Duration) {
        let ns = dur.as_nanos();
        self.total_iters = self.total_iters.saturating_add(iters);
        self.total_ns = self.total_ns.saturating_add(ns);
        self.samples_ns_per_op.push(ns as f64 / iters as f64);
    }

    fn report(&self, mode_label: &str, bench_label: &str) {
        let mut samples = self.samples_ns_per_op.clone();
        if samples.is_empty() {
            return;
        }
        samples.sort_by(|a, b| a.total_cmp(b));
        let p50 = samples[(samples.len() - 1) / 2];
        let p99 = samples[((samples.len() - 1) as f64 * 0.99).round() as usize];
        let ops_s = if self.total_ns == 0 {
            0.0
        } else {
            self.total_iters as f64 / (self.total_ns as f64 / 1e9)
        };
        println!(
            "SCANF_BENCH mode={mode_label} bench={bench_label} samples={} p50_ns_op={p50:.3} p99_ns_op={p99:.3} throughput_ops_s={ops_s:.3}",
            samples.len()
        );
    }
}

fn mode_label(opts: &ScanOptions) -> &'static str {
    match opts.level {
        SafetyLevel::Strict => "strict",
        SafetyLevel::Hardened => "hardened",
        SafetyLevel::Off => "off",
    }
}

fn wide(s: &str) -> Vec<u32> {
    s.chars().map(u32::from).collect()
}

/// Time `op` with `iter_custom` so per-sample stats can be printed.
fn timed<F: FnMut() -> i32>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    name: &str,
    mode: &str,
    mut op: F,
) {
    let stats = RefCell::new(BenchStats::default());
    group.bench_function(BenchmarkId::new(name, mode), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                black_box(op());
            }
            let dur = start.elapsed().max(Duration::from_nanos(1));
            stats.borrow_mut().record(iters, dur);
            dur
        });
    });
    stats.borrow().report(mode, name);
}

fn bench_narrow(c: &mut Criterion) {
    let mut group = c.benchmark_group("sscanf");
    group.throughput(Throughput::Elements(1));

    for opts in [ScanOptions::strict(), ScanOptions::hardened()] {
        let mode = mode_label(&opts);

        timed(&mut group, "ints", mode, || {
            let (mut a, mut b, mut c) = (0i32, 0i64, 0u32);
            sscanf_with(
                black_box(b"-1234 567890123 0x7f"),
                b"%d %lld %i",
                &mut [ScanArg::I32(&mut a), ScanArg::I64(&mut b), ScanArg::U32(&mut c)],
                &opts,
            )
        });

        timed(&mut group, "floats", mode, || {
            let (mut x, mut y) = (0f64, 0f32);
            sscanf_with(
                black_box(b"3.14159265 -2.5e-3"),
                b"%lf %f",
                &mut [ScanArg::F64(&mut x), ScanArg::F32(&mut y)],
                &opts,
            )
        });

        timed(&mut group, "strings", mode, || {
            let mut word = [0u8; 32];
            let mut rest = [0u8; 32];
            sscanf_with(
                black_box(b"key=value-with-dashes trailing"),
                b"key=%31[^ ] %31s",
                &mut [ScanArg::Bytes(&mut word), ScanArg::Bytes(&mut rest)],
                &opts,
            )
        });

        timed(&mut group, "positional", mode, || {
            let (mut a, mut b) = (0i32, 0i32);
            sscanf_with(
                black_box(b"10 20"),
                b"%2$d %1$d",
                &mut [ScanArg::I32(&mut a), ScanArg::I32(&mut b)],
                &opts,
            )
        });
    }

    group.finish();
}

fn bench_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("swscanf");
    group.throughput(Throughput::Elements(1));

    let input = wide("42 αβγδ 2.5");
    let fmt = wide("%d %ls %lf");
    for opts in [ScanOptions::strict(), ScanOptions::hardened()] {
        let mode = mode_label(&opts);
        timed(&mut group, "mixed", mode, || {
            let mut n = 0i32;
            let mut word = [0u32; 16];
            let mut x = 0f64;
            swscanf_with(
                black_box(&input),
                &fmt,
                &mut [ScanArg::I32(&mut n), ScanArg::Wide(&mut word), ScanArg::F64(&mut x)],
                &opts,
            )
        });
    }

    group.finish();
}

fn bench_host_baseline(c: &mut Criterion) {
    let mut group = c.benchmark_group("host_libc");
    group.throughput(Throughput::Elements(1));

    timed(&mut group, "ints", "libc", || {
        let (mut a, mut b, mut c): (libc::c_int, libc::c_longlong, libc::c_uint) = (0, 0, 0);
        // SAFETY: NUL-terminated literals and one valid out-pointer per directive.
        unsafe {
            libc::sscanf(
                black_box(c"-1234 567890123 0x7f").as_ptr(),
                c"%d %lld %i".as_ptr(),
                &mut a as *mut libc::c_int,
                &mut b as *mut libc::c_longlong,
                &mut c as *mut libc::c_uint,
            )
        }
    });

    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(200))
        .measurement_time(Duration::from_secs(2))
        .sample_size(100);
    targets = bench_narrow, bench_wide, bench_host_baseline
);
criterion_main!(benches);
