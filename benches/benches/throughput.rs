//! Batched Hashing Throughput Benchmark
//!
//! Measures `hash_many` over full-chunk batches at each SIMD width, with
//! the `blake3` crate as an external yardstick.

#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation)]
use b3core::{hash_many, simd_degree, BLOCK_LEN, CHUNK_END, CHUNK_START, IV, OUT_LEN};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rand::prelude::*;
use std::hint::black_box;

const BLOCKS_PER_CHUNK: usize = 16;

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_hash_many(c: &mut Criterion) {
    let mut group = c.benchmark_group("Batched Chunks");
    let mut rng = rand::rng();

    // Batch sizes: one SIMD pass, several passes, and a ragged batch that
    // exercises the narrow fallback tail.
    let degree = simd_degree();
    for num_chunks in [degree, 8 * degree, 8 * degree + 3] {
        let chunk_len = BLOCKS_PER_CHUNK * BLOCK_LEN;
        let mut data = vec![0u8; num_chunks * chunk_len];
        rng.fill(&mut data[..]);
        let inputs: Vec<&[u8]> = data.chunks_exact(chunk_len).collect();
        let mut out = vec![0u8; num_chunks * OUT_LEN];

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_function(format!("hash_many - {num_chunks} chunks"), |b| {
            b.iter(|| {
                hash_many(
                    black_box(&inputs),
                    BLOCKS_PER_CHUNK,
                    &IV,
                    0,
                    true,
                    0,
                    CHUNK_START,
                    CHUNK_END,
                    &mut out,
                );
            });
        });
    }

    group.finish();
}

fn bench_reference(c: &mut Criterion) {
    let mut group = c.benchmark_group("Reference (blake3 crate)");
    let mut rng = rand::rng();

    for size in [16 * 1024, 128 * 1024] {
        let mut data = vec![0u8; size];
        rng.fill(&mut data[..]);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("blake3::hash - {size} bytes"), |b| {
            b.iter(|| blake3::hash(black_box(&data)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_hash_many, bench_reference);
criterion_main!(benches);
