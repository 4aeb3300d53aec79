//! BLAKE3 Kernel Constants
//!
//! Shared by every backend. All backends must agree on these values exactly;
//! the compression function is only defined relative to them.

#![allow(clippy::cast_possible_truncation)]

// =============================================================================
// SIZES
// =============================================================================

/// Chaining-value / result size in bytes (8 little-endian 32-bit words).
pub const OUT_LEN: usize = 32;

/// Key size in bytes (8 little-endian 32-bit words).
pub const KEY_LEN: usize = 32;

/// Message block size in bytes. The final block of a sequence may be
/// logically shorter (`block_len < 64`) but the buffer is always 64 bytes,
/// zero-padded beyond the true length.
pub const BLOCK_LEN: usize = 64;

/// Widest batch degree any compiled-in backend can reach (AVX-512, 16-way).
/// Callers above this layer can size per-call scratch buffers with it.
pub const MAX_SIMD_DEGREE: usize = 16;

// =============================================================================
// INITIALIZATION VECTOR
// =============================================================================

/// The BLAKE3 IV: the first eight words of the SHA-2 fractional square roots.
pub const IV: [u32; 8] = [
    0x6A09_E667,
    0xBB67_AE85,
    0x3C6E_F372,
    0xA54F_F53A,
    0x510E_527F,
    0x9B05_688C,
    0x1F83_D9AB,
    0x5BE0_CD19,
];

// =============================================================================
// MESSAGE SCHEDULE
// =============================================================================

/// `MSG_SCHEDULE[round][i]` gives the index of the message word fed to
/// position `i` of round `round`. Seven rounds, fixed permutation.
pub const MSG_SCHEDULE: [[usize; 16]; 7] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [2, 6, 3, 10, 7, 0, 4, 13, 1, 11, 12, 5, 9, 14, 15, 8],
    [3, 4, 10, 12, 13, 2, 7, 14, 6, 5, 9, 0, 11, 15, 8, 1],
    [10, 7, 12, 9, 14, 3, 13, 15, 4, 0, 11, 2, 5, 8, 1, 6],
    [12, 13, 9, 11, 15, 10, 14, 8, 7, 2, 5, 3, 0, 1, 6, 4],
    [9, 14, 11, 5, 8, 12, 15, 1, 13, 3, 0, 10, 2, 6, 4, 7],
    [11, 15, 5, 0, 1, 9, 8, 6, 14, 10, 2, 12, 3, 4, 7, 13],
];

// =============================================================================
// DOMAIN-SEPARATION FLAGS
// =============================================================================

/// First block of a chunk.
pub const CHUNK_START: u8 = 1 << 0;
/// Last block of a chunk.
pub const CHUNK_END: u8 = 1 << 1;
/// Parent node in the hash tree.
pub const PARENT: u8 = 1 << 2;
/// Root compression (output materialization).
pub const ROOT: u8 = 1 << 3;
/// Keyed-hash mode.
pub const KEYED_HASH: u8 = 1 << 4;
/// Key-derivation context pass.
pub const DERIVE_KEY_CONTEXT: u8 = 1 << 5;
/// Key-derivation material pass.
pub const DERIVE_KEY_MATERIAL: u8 = 1 << 6;

// =============================================================================
// COUNTER SPLITTING
// =============================================================================

/// Low 32 bits of the block counter, as loaded into state word 12.
#[inline]
#[must_use]
pub const fn counter_low(counter: u64) -> u32 {
    counter as u32
}

/// High 32 bits of the block counter, as loaded into state word 13.
#[inline]
#[must_use]
pub const fn counter_high(counter: u64) -> u32 {
    (counter >> 32) as u32
}
