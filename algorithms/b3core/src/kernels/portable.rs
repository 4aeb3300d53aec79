//! Portable implementation of the BLAKE3 compression primitives.
//!
//! Pure scalar Rust, compiled on every target. Always correct, always
//! available: it is the unconditional dispatch fallback and the oracle every
//! accelerated backend is tested against.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]

use super::constants::{BLOCK_LEN, IV, OUT_LEN};

// =============================================================================
// BYTE / WORD CONVERSION
// =============================================================================

/// Parse a 64-byte block into 16 little-endian message words.
#[inline]
#[must_use]
pub fn words16_from_le_bytes(block: &[u8; BLOCK_LEN]) -> [u32; 16] {
    let mut words = [0u32; 16];
    let (chunks, _) = block.as_chunks::<4>();
    for (word, chunk) in words.iter_mut().zip(chunks) {
        *word = u32::from_le_bytes(*chunk);
    }
    words
}

/// Serialize 8 state words as 32 little-endian bytes.
#[inline]
#[must_use]
pub fn le_bytes_from_words8(words: &[u32; 8]) -> [u8; OUT_LEN] {
    let mut out = [0u8; OUT_LEN];
    for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    out
}

// =============================================================================
// COMPRESSION FUNCTION
// =============================================================================

/// The full 16-word compression output: words 0-7 are the new chaining
/// value, words 8-15 are the extra XOF material (`v[8..16] ^ cv[0..8]`).
#[inline]
#[must_use]
#[allow(clippy::too_many_lines)]
pub(crate) fn compress(
    cv: &[u32; 8],
    block_words: &[u32; 16],
    counter: u64,
    block_len: u8,
    flags: u8,
) -> [u32; 16] {
    let m0 = block_words[0];
    let m1 = block_words[1];
    let m2 = block_words[2];
    let m3 = block_words[3];
    let m4 = block_words[4];
    let m5 = block_words[5];
    let m6 = block_words[6];
    let m7 = block_words[7];
    let m8 = block_words[8];
    let m9 = block_words[9];
    let m10 = block_words[10];
    let m11 = block_words[11];
    let m12 = block_words[12];
    let m13 = block_words[13];
    let m14 = block_words[14];
    let m15 = block_words[15];

    let mut v0 = cv[0];
    let mut v1 = cv[1];
    let mut v2 = cv[2];
    let mut v3 = cv[3];
    let mut v4 = cv[4];
    let mut v5 = cv[5];
    let mut v6 = cv[6];
    let mut v7 = cv[7];
    let mut v8 = IV[0];
    let mut v9 = IV[1];
    let mut v10 = IV[2];
    let mut v11 = IV[3];
    let mut v12 = super::constants::counter_low(counter);
    let mut v13 = super::constants::counter_high(counter);
    let mut v14 = u32::from(block_len);
    let mut v15 = u32::from(flags);

    macro_rules! g {
        ($a:ident, $b:ident, $c:ident, $d:ident, $mx:expr, $my:expr) => {{
            $a = $a.wrapping_add($b).wrapping_add($mx);
            $d = ($d ^ $a).rotate_right(16);
            $c = $c.wrapping_add($d);
            $b = ($b ^ $c).rotate_right(12);
            $a = $a.wrapping_add($b).wrapping_add($my);
            $d = ($d ^ $a).rotate_right(8);
            $c = $c.wrapping_add($d);
            $b = ($b ^ $c).rotate_right(7);
        }};
    }

    // One full round with an explicit message schedule, so the compiler keeps
    // `v0..v15` and `m0..m15` in registers without indirect indexing.
    macro_rules! round {
        (
            $m0:expr, $m1:expr, $m2:expr, $m3:expr, $m4:expr, $m5:expr, $m6:expr, $m7:expr,
            $m8:expr, $m9:expr, $m10:expr, $m11:expr, $m12:expr, $m13:expr, $m14:expr, $m15:expr
        ) => {{
            g!(v0, v4, v8, v12, $m0, $m1);
            g!(v1, v5, v9, v13, $m2, $m3);
            g!(v2, v6, v10, v14, $m4, $m5);
            g!(v3, v7, v11, v15, $m6, $m7);

            g!(v0, v5, v10, v15, $m8, $m9);
            g!(v1, v6, v11, v12, $m10, $m11);
            g!(v2, v7, v8, v13, $m12, $m13);
            g!(v3, v4, v9, v14, $m14, $m15);
        }};
    }

    round!(m0, m1, m2, m3, m4, m5, m6, m7, m8, m9, m10, m11, m12, m13, m14, m15);
    round!(m2, m6, m3, m10, m7, m0, m4, m13, m1, m11, m12, m5, m9, m14, m15, m8);
    round!(m3, m4, m10, m12, m13, m2, m7, m14, m6, m5, m9, m0, m11, m15, m8, m1);
    round!(m10, m7, m12, m9, m14, m3, m13, m15, m4, m0, m11, m2, m5, m8, m1, m6);
    round!(m12, m13, m9, m11, m15, m10, m14, m8, m7, m2, m5, m3, m0, m1, m6, m4);
    round!(m9, m14, m11, m5, m8, m12, m15, m1, m13, m3, m0, m10, m2, m6, m4, m7);
    round!(m11, m15, m5, m0, m1, m9, m8, m6, m14, m10, m2, m12, m3, m4, m7, m13);

    v0 ^= v8;
    v1 ^= v9;
    v2 ^= v10;
    v3 ^= v11;
    v4 ^= v12;
    v5 ^= v13;
    v6 ^= v14;
    v7 ^= v15;

    v8 ^= cv[0];
    v9 ^= cv[1];
    v10 ^= cv[2];
    v11 ^= cv[3];
    v12 ^= cv[4];
    v13 ^= cv[5];
    v14 ^= cv[6];
    v15 ^= cv[7];

    [
        v0, v1, v2, v3, v4, v5, v6, v7, v8, v9, v10, v11, v12, v13, v14, v15,
    ]
}

// =============================================================================
// PUBLIC ENTRY POINTS
// =============================================================================

/// Compress one block, overwriting `cv` with the new chaining value.
pub fn compress_in_place(
    cv: &mut [u32; 8],
    block: &[u8; BLOCK_LEN],
    block_len: u8,
    counter: u64,
    flags: u8,
) {
    let block_words = words16_from_le_bytes(block);
    let state = compress(cv, &block_words, counter, block_len, flags);
    cv.copy_from_slice(&state[..8]);
}

/// Compress one block without mutating `cv`, writing the full 64-byte
/// expanded output. The first 32 bytes equal the chaining value that
/// [`compress_in_place`] would have produced.
pub fn compress_xof(
    cv: &[u32; 8],
    block: &[u8; BLOCK_LEN],
    block_len: u8,
    counter: u64,
    flags: u8,
    out: &mut [u8; 2 * OUT_LEN],
) {
    let block_words = words16_from_le_bytes(block);
    let state = compress(cv, &block_words, counter, block_len, flags);
    for (chunk, word) in out.chunks_exact_mut(4).zip(&state) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

/// Hash each input's block sequence independently, one input at a time.
///
/// `flags_start` is OR-ed into the first block of every input and
/// `flags_end` into the last (a 1-block input gets both). When
/// `increment_counter` is set, input `i` is seeded with `counter + i`.
pub fn hash_many(
    inputs: &[&[u8]],
    blocks: usize,
    key: &[u32; 8],
    counter: u64,
    increment_counter: bool,
    flags: u8,
    flags_start: u8,
    flags_end: u8,
    out: &mut [u8],
) {
    debug_assert!(out.len() >= inputs.len() * OUT_LEN);
    for (i, input) in inputs.iter().enumerate() {
        debug_assert_eq!(input.len(), blocks * BLOCK_LEN);
        let input_counter = if increment_counter {
            counter.wrapping_add(i as u64)
        } else {
            counter
        };

        let mut cv = *key;
        let (block_slices, _) = input.as_chunks::<BLOCK_LEN>();
        for (b, block) in block_slices.iter().enumerate() {
            let mut block_flags = flags;
            if b == 0 {
                block_flags |= flags_start;
            }
            if b + 1 == blocks {
                block_flags |= flags_end;
            }
            compress_in_place(&mut cv, block, BLOCK_LEN as u8, input_counter, block_flags);
        }

        out[i * OUT_LEN..(i + 1) * OUT_LEN].copy_from_slice(&le_bytes_from_words8(&cv));
    }
}

// =============================================================================
// TESTS
// =============================================================================
