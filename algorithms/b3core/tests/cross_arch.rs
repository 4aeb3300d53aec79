//! Cross-Backend Consistency Tests
//!
//! Verifies that the SSE4.1, AVX2, and AVX-512 kernels produce IDENTICAL
//! results to the portable kernel for every operation, so that CPU feature
//! detection never alters the output.
//!
//! Coverage:
//! - Single-block compression (boundary block lengths, counter extremes)
//! - Extended output
//! - Batched hashing (full lanes, one and many blocks, counter modes)

#![cfg(target_arch = "x86_64")]
#![allow(unsafe_code)]
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::cast_possible_truncation)]

use b3core::kernels::constants::{BLOCK_LEN, CHUNK_END, CHUNK_START, KEYED_HASH, OUT_LEN, ROOT};
use b3core::kernels::{avx2, avx512, portable, sse41};
use rand::prelude::*;

fn is_sse41_supported() -> bool {
    is_x86_feature_detected!("sse4.1") && is_x86_feature_detected!("ssse3")
}

fn is_avx2_supported() -> bool {
    is_x86_feature_detected!("avx2")
}

fn is_avx512_supported() -> bool {
    is_x86_feature_detected!("avx512f")
        && is_x86_feature_detected!("avx512vl")
        && is_x86_feature_detected!("avx2")
}

fn random_cv(rng: &mut impl Rng) -> [u32; 8] {
    let mut cv = [0u32; 8];
    for word in &mut cv {
        *word = rng.random();
    }
    cv
}

const COUNTERS: [u64; 4] = [0, 1, u32::MAX as u64, u64::MAX];
const BLOCK_LENS: [u8; 4] = [0, 1, 63, 64];
const FLAG_SETS: [u8; 4] = [
    0,
    CHUNK_START,
    CHUNK_START | CHUNK_END | ROOT,
    CHUNK_END | KEYED_HASH,
];

// =============================================================================
// SINGLE-BLOCK CONSISTENCY
// =============================================================================

#[test]
fn sse41_compress_matches_portable() {
    if !is_sse41_supported() {
        println!("Skipping: SSE4.1 not supported.");
        return;
    }

    let mut rng = rand::rng();
    for _ in 0..32 {
        let cv = random_cv(&mut rng);
        let mut block = [0u8; BLOCK_LEN];
        rng.fill(&mut block[..]);

        for counter in COUNTERS {
            for block_len in BLOCK_LENS {
                for flags in FLAG_SETS {
                    let mut expected = cv;
                    portable::compress_in_place(&mut expected, &block, block_len, counter, flags);

                    let mut actual = cv;
                    unsafe {
                        sse41::compress_in_place(&mut actual, &block, block_len, counter, flags);
                    }
                    assert_eq!(actual, expected, "in_place len={block_len} ctr={counter}");

                    let mut expected_xof = [0u8; 2 * OUT_LEN];
                    portable::compress_xof(&cv, &block, block_len, counter, flags, &mut expected_xof);
                    let mut actual_xof = [0u8; 2 * OUT_LEN];
                    unsafe {
                        sse41::compress_xof(&cv, &block, block_len, counter, flags, &mut actual_xof);
                    }
                    assert_eq!(actual_xof, expected_xof, "xof len={block_len} ctr={counter}");
                }
            }
        }
    }
}

#[test]
fn avx512_compress_matches_portable() {
    if !is_avx512_supported() {
        println!("Skipping: AVX-512 not supported.");
        return;
    }

    let mut rng = rand::rng();
    for _ in 0..32 {
        let cv = random_cv(&mut rng);
        let mut block = [0u8; BLOCK_LEN];
        rng.fill(&mut block[..]);

        for counter in COUNTERS {
            for block_len in BLOCK_LENS {
                for flags in FLAG_SETS {
                    let mut expected = cv;
                    portable::compress_in_place(&mut expected, &block, block_len, counter, flags);

                    let mut actual = cv;
                    unsafe {
                        avx512::compress_in_place(&mut actual, &block, block_len, counter, flags);
                    }
                    assert_eq!(actual, expected, "in_place len={block_len} ctr={counter}");

                    let mut expected_xof = [0u8; 2 * OUT_LEN];
                    portable::compress_xof(&cv, &block, block_len, counter, flags, &mut expected_xof);
                    let mut actual_xof = [0u8; 2 * OUT_LEN];
                    unsafe {
                        avx512::compress_xof(&cv, &block, block_len, counter, flags, &mut actual_xof);
                    }
                    assert_eq!(actual_xof, expected_xof, "xof len={block_len} ctr={counter}");
                }
            }
        }
    }
}

// =============================================================================
// BATCHED CONSISTENCY
// =============================================================================

/// Runs the portable reference over `degree` inputs and compares.
fn check_batched(
    degree: usize,
    blocks: usize,
    counter: u64,
    increment_counter: bool,
    run: impl Fn(&[*const u8], &[u32; 8], &mut [u8]),
) {
    let mut rng = rand::rng();
    let key = random_cv(&mut rng);
    let mut data = vec![0u8; degree * blocks * BLOCK_LEN];
    rng.fill(&mut data[..]);
    let inputs: Vec<&[u8]> = data.chunks_exact(blocks * BLOCK_LEN).collect();

    let mut expected = vec![0u8; degree * OUT_LEN];
    portable::hash_many(
        &inputs,
        blocks,
        &key,
        counter,
        increment_counter,
        KEYED_HASH,
        CHUNK_START,
        CHUNK_END,
        &mut expected,
    );

    let ptrs: Vec<*const u8> = inputs.iter().map(|input| input.as_ptr()).collect();
    let mut actual = vec![0u8; degree * OUT_LEN];
    run(&ptrs, &key, &mut actual);

    assert_eq!(
        actual, expected,
        "blocks={blocks} ctr={counter} inc={increment_counter}"
    );
}

#[test]
fn sse41_hash4_matches_portable() {
    if !is_sse41_supported() {
        println!("Skipping: SSE4.1 not supported.");
        return;
    }

    for blocks in [1usize, 2, 16] {
        for (counter, increment) in [(0u64, true), (7, true), (u64::MAX, false)] {
            check_batched(sse41::DEGREE, blocks, counter, increment, |ptrs, key, out| {
                let ptrs: [*const u8; 4] = ptrs.try_into().unwrap();
                unsafe {
                    sse41::hash4(
                        &ptrs,
                        blocks,
                        key,
                        counter,
                        increment,
                        KEYED_HASH,
                        CHUNK_START,
                        CHUNK_END,
                        out.as_mut_ptr(),
                    );
                }
            });
        }
    }
}

#[test]
fn avx2_hash8_matches_portable() {
    if !is_avx2_supported() {
        println!("Skipping: AVX2 not supported.");
        return;
    }

    for blocks in [1usize, 2, 16] {
        for (counter, increment) in [(0u64, true), (7, true), (u64::MAX, false)] {
            check_batched(avx2::DEGREE, blocks, counter, increment, |ptrs, key, out| {
                let ptrs: [*const u8; 8] = ptrs.try_into().unwrap();
                unsafe {
                    avx2::hash8(
                        &ptrs,
                        blocks,
                        key,
                        counter,
                        increment,
                        KEYED_HASH,
                        CHUNK_START,
                        CHUNK_END,
                        out.as_mut_ptr(),
                    );
                }
            });
        }
    }
}

#[test]
fn avx512_hash16_matches_portable() {
    if !is_avx512_supported() {
        println!("Skipping: AVX-512 not supported.");
        return;
    }

    for blocks in [1usize, 2, 16] {
        for (counter, increment) in [(0u64, true), (7, true), (u64::MAX, false)] {
            check_batched(avx512::DEGREE, blocks, counter, increment, |ptrs, key, out| {
                let ptrs: [*const u8; 16] = ptrs.try_into().unwrap();
                unsafe {
                    avx512::hash16(
                        &ptrs,
                        blocks,
                        key,
                        counter,
                        increment,
                        KEYED_HASH,
                        CHUNK_START,
                        CHUNK_END,
                        out.as_mut_ptr(),
                    );
                }
            });
        }
    }
}
