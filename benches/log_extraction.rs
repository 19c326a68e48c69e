//! Benchmark suite for log extraction and normalization.
//!
//! Run with: `cargo bench`
//!
//! This benchmark measures:
//! - Log scan throughput for realistic simulator output
//! - Weighted-speedup computation
//! - Cross-config normalization over a full result table

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mitigation_eval::{
    normalize::{CrossConfigNormalizer, TableRow},
    LogFieldExtractor, RunMode, WeightedSpeedup,
};
use std::io::Cursor;

/// Simulator log with `cores` per-core lines and `noise` unrelated lines per core.
fn create_test_log(cores: usize, noise: usize) -> String {
    let mut log = String::from("McSim+ simulation log\n");
    for core in 0..cores {
        for n in 0..noise {
            log.push_str(&format!(
                "  -- [  {n:>3}] mc : row hits {}, row misses {}, refresh {}\n",
                n * 17,
                n * 3,
                n % 5
            ));
        }
        log.push_str(&format!(
            "  -- th[{core}] : retired {} instrs, {} branches\n",
            250_000 + core * 1_000,
            40_000 + core
        ));
    }
    log.push_str("  -- total number of fetched instructions : 4000000 (IPC =  1.234)\n");
    log
}

/// Result table covering `methods` x `configs` x `workloads` plus baselines.
fn create_table(methods: usize, configs: usize, workloads: usize) -> Vec<TableRow> {
    let mut rows = Vec::with_capacity((methods * configs + 1) * workloads);
    for w in 0..workloads {
        let (mode, run_base) = if w % 2 == 0 {
            (RunMode::Rate, format!("rate.trace_{w}"))
        } else {
            (RunMode::Mix, format!("mix.{w}"))
        };
        rows.push(TableRow {
            method: "baseline".to_string(),
            mode,
            config: "none".to_string(),
            run_base: run_base.clone(),
            sum: 12.0 + (w % 7) as f64,
        });
        for m in 0..methods {
            for c in 0..configs {
                rows.push(TableRow {
                    method: format!("method_{m}"),
                    mode,
                    config: (64 << c).to_string(),
                    run_base: run_base.clone(),
                    sum: 10.0 + ((m + c + w) % 5) as f64,
                });
            }
        }
    }
    rows
}

/// Benchmark log scanning.
fn bench_log_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_extraction");

    for noise in [0, 50, 500] {
        let log = create_test_log(16, noise);
        let extractor = LogFieldExtractor::new(16);
        group.throughput(Throughput::Bytes(log.len() as u64));
        group.bench_with_input(BenchmarkId::new("noise_lines", noise), &log, |b, log| {
            b.iter(|| {
                let parsed = extractor.extract(Cursor::new(black_box(log.as_bytes()))).unwrap();
                black_box(parsed)
            })
        });
    }

    group.finish();
}

/// Benchmark weighted-speedup computation.
fn bench_weighted_speedup(c: &mut Criterion) {
    let parsed = LogFieldExtractor::new(16)
        .extract(Cursor::new(create_test_log(16, 0)))
        .unwrap();
    let solo = vec![0.9; 16];

    c.bench_function("weighted_speedup_16_cores", |b| {
        b.iter(|| black_box(WeightedSpeedup::compute(black_box(&parsed), black_box(&solo))))
    });
}

/// Benchmark normalization over tables of increasing size.
fn bench_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalization");
    let normalizer = CrossConfigNormalizer::new();

    for workloads in [60, 600] {
        let table = create_table(6, 6, workloads);
        group.throughput(Throughput::Elements(table.len() as u64));
        group.bench_with_input(BenchmarkId::new("rows", table.len()), &table, |b, table| {
            b.iter(|| black_box(normalizer.normalize(black_box(table))))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_log_extraction,
    bench_weighted_speedup,
    bench_normalization
);
criterion_main!(benches);
