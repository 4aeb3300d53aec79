//! Dispatch Behavior Tests
//!
//! Checks that kernel selection is stable, consistent with the CPU's actual
//! capabilities, and safe under concurrent first use.

#![allow(missing_docs)]
#![allow(clippy::expect_used)]

use std::sync::Barrier;

use b3core::{
    active_backend, compress_in_place, cpu_features, simd_degree, BLOCK_LEN, CHUNK_END,
    CHUNK_START, IV, ROOT,
};

#[test]
fn capability_probe_is_stable() {
    assert_eq!(cpu_features(), cpu_features());
    if simd_degree() > 1 {
        assert!(!cpu_features().is_empty());
    }
}

#[test]
fn simd_degree_is_stable_and_sane() {
    let degree = simd_degree();
    assert!([1, 4, 8, 16].contains(&degree));
    for _ in 0..100 {
        assert_eq!(simd_degree(), degree);
    }
}

#[test]
fn backend_names_are_stable() {
    let names = active_backend();
    assert!(!names.0.is_empty());
    assert!(!names.1.is_empty());
    assert_eq!(active_backend(), names);
}

#[cfg(target_arch = "x86_64")]
#[test]
fn selection_respects_cpu_capabilities() {
    let degree = simd_degree();
    if is_x86_feature_detected!("avx512f")
        && is_x86_feature_detected!("avx512vl")
        && is_x86_feature_detected!("avx2")
    {
        assert_eq!(degree, 16);
    } else if is_x86_feature_detected!("avx2") {
        assert_eq!(degree, 8);
    } else if is_x86_feature_detected!("sse4.1") && is_x86_feature_detected!("ssse3") {
        assert_eq!(degree, 4);
    } else {
        assert_eq!(degree, 1);
    }
}

#[test]
fn concurrent_first_use_agrees() {
    // All threads release together so several of them race the one-time
    // capability probe; every thread must still compute the same result.
    let threads = 8;
    let barrier = Barrier::new(threads);
    let results: Vec<[u32; 8]> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    let mut cv = IV;
                    let block = [3u8; BLOCK_LEN];
                    compress_in_place(&mut cv, &block, 64, 0, CHUNK_START | CHUNK_END | ROOT);
                    cv
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker thread"))
            .collect()
    });

    for cv in &results {
        assert_eq!(cv, &results[0]);
    }
}
