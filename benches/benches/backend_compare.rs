//! Backend Comparison Benchmark
//!
//! Compares the runtime-dispatched compression against the explicit
//! kernels. Validates the cost of dispatch and the speedup of each
//! instruction set over the portable baseline.

#![allow(missing_docs)]
#![allow(unsafe_code)]
#![allow(clippy::cast_possible_truncation)]
use b3core::kernels::{constants, portable};
use b3core::{BLOCK_LEN, CHUNK_END, CHUNK_START, IV, ROOT};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_single_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("Single Block");
    group.throughput(Throughput::Bytes(BLOCK_LEN as u64));

    let block = [0x42u8; BLOCK_LEN];
    let flags = CHUNK_START | CHUNK_END | ROOT;

    // 1. Dispatched (Production Path)
    group.bench_function("Dispatched", |b| {
        b.iter(|| {
            let mut cv = IV;
            b3core::compress_in_place(&mut cv, black_box(&block), 64, 0, flags);
            cv
        });
    });

    // 2. Explicit kernels (bypass the dispatcher)
    #[cfg(target_arch = "x86_64")]
    {
        use b3core::kernels::{avx512, sse41};

        if is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("avx512vl") {
            group.bench_function("AVX-512 Native", |b| {
                b.iter(|| {
                    let mut cv = IV;
                    // SAFETY: guarded by the feature check above.
                    unsafe { avx512::compress_in_place(&mut cv, black_box(&block), 64, 0, flags) };
                    cv
                });
            });
        }

        if is_x86_feature_detected!("sse4.1") && is_x86_feature_detected!("ssse3") {
            group.bench_function("SSE4.1 Native", |b| {
                b.iter(|| {
                    let mut cv = IV;
                    // SAFETY: guarded by the feature check above.
                    unsafe { sse41::compress_in_place(&mut cv, black_box(&block), 64, 0, flags) };
                    cv
                });
            });
        }
    }

    // 3. Portable baseline
    group.bench_function("Portable (No SIMD)", |b| {
        b.iter(|| {
            let mut cv = IV;
            portable::compress_in_place(&mut cv, black_box(&block), 64, 0, flags);
            cv
        });
    });

    group.finish();
}

fn bench_xof(c: &mut Criterion) {
    let mut group = c.benchmark_group("Extended Output");
    group.throughput(Throughput::Bytes(2 * constants::OUT_LEN as u64));

    let block = [0x42u8; BLOCK_LEN];

    group.bench_function("Dispatched", |b| {
        b.iter(|| {
            let mut out = [0u8; 2 * constants::OUT_LEN];
            b3core::compress_xof(&IV, black_box(&block), 64, 0, ROOT, &mut out);
            out
        });
    });

    group.finish();
}

criterion_group!(benches, bench_single_block, bench_xof);
criterion_main!(benches);
