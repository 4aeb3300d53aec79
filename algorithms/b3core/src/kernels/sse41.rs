//! SSE4.1 backend: single-block compression and 4-way batched hashing.
//!
//! The single-block path keeps the 4x4 state matrix in four XMM rows and
//! mixes diagonals by rotating rows in place. The batched path transposes
//! four inputs into word-major vectors and runs them in lock-step.
//!
//! Byte-wise rotates (16 and 8) use `pshufb`, so this backend requires
//! SSSE3 in addition to SSE4.1.

#![allow(unsafe_code)]
#![allow(unsafe_op_in_unsafe_fn)]
#![allow(clippy::inline_always)]
#![allow(clippy::similar_names)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use core::arch::x86_64::*;

use super::constants::{counter_high, counter_low, BLOCK_LEN, IV, MSG_SCHEDULE, OUT_LEN};
use super::portable::words16_from_le_bytes;

/// Number of inputs the batched hasher processes per invocation.
pub const DEGREE: usize = 4;

// =============================================================================
// VECTOR HELPERS
// =============================================================================

#[inline(always)]
unsafe fn loadu(src: *const u8) -> __m128i {
    _mm_loadu_si128(src.cast())
}

#[inline(always)]
unsafe fn storeu(src: __m128i, dest: *mut u8) {
    _mm_storeu_si128(dest.cast(), src);
}

#[inline(always)]
unsafe fn add(a: __m128i, b: __m128i) -> __m128i {
    _mm_add_epi32(a, b)
}

#[inline(always)]
unsafe fn xor(a: __m128i, b: __m128i) -> __m128i {
    _mm_xor_si128(a, b)
}

#[inline(always)]
unsafe fn set1(x: u32) -> __m128i {
    _mm_set1_epi32(x as i32)
}

#[inline(always)]
unsafe fn set4(a: u32, b: u32, c: u32, d: u32) -> __m128i {
    _mm_setr_epi32(a as i32, b as i32, c as i32, d as i32)
}

#[inline(always)]
unsafe fn rot16_mask() -> __m128i {
    _mm_setr_epi8(2, 3, 0, 1, 6, 7, 4, 5, 10, 11, 8, 9, 14, 15, 12, 13)
}

#[inline(always)]
unsafe fn rot8_mask() -> __m128i {
    _mm_setr_epi8(1, 2, 3, 0, 5, 6, 7, 4, 9, 10, 11, 8, 13, 14, 15, 12)
}

#[inline(always)]
unsafe fn rot12(a: __m128i) -> __m128i {
    _mm_or_si128(_mm_srli_epi32(a, 12), _mm_slli_epi32(a, 20))
}

#[inline(always)]
unsafe fn rot7(a: __m128i) -> __m128i {
    _mm_or_si128(_mm_srli_epi32(a, 7), _mm_slli_epi32(a, 25))
}

// =============================================================================
// SINGLE-BLOCK COMPRESSION
// =============================================================================

/// Run the 7-round compression on the row-major state, returning the four
/// finalized rows `[v0..4, v4..8, v8..12 ^ cv_lo, v12..16 ^ cv_hi]`.
#[inline(always)]
#[allow(clippy::too_many_lines)]
unsafe fn compress_rows(
    cv: &[u32; 8],
    block: &[u8; BLOCK_LEN],
    block_len: u8,
    counter: u64,
    flags: u8,
) -> [__m128i; 4] {
    let rot16 = rot16_mask();
    let rot8 = rot8_mask();

    // row0 = cv[0..4], row1 = cv[4..8], row2 = IV[0..4],
    // row3 = [counter_lo, counter_hi, block_len, flags]
    let cv_lo = loadu(cv.as_ptr().cast());
    let cv_hi = loadu(cv.as_ptr().add(4).cast());
    let mut row0 = cv_lo;
    let mut row1 = cv_hi;
    let mut row2 = loadu(IV.as_ptr().cast());
    let mut row3 = set4(
        counter_low(counter),
        counter_high(counter),
        u32::from(block_len),
        u32::from(flags),
    );

    let m = words16_from_le_bytes(block);

    macro_rules! g {
        ($mx:expr, $my:expr) => {{
            row0 = add(add(row0, row1), $mx);
            row3 = _mm_shuffle_epi8(xor(row3, row0), rot16);
            row2 = add(row2, row3);
            row1 = rot12(xor(row1, row2));
            row0 = add(add(row0, row1), $my);
            row3 = _mm_shuffle_epi8(xor(row3, row0), rot8);
            row2 = add(row2, row3);
            row1 = rot7(xor(row1, row2));
        }};
    }

    for schedule in &MSG_SCHEDULE {
        // Column step: lanes are the four columns of the state matrix.
        let mx = set4(
            m[schedule[0]],
            m[schedule[2]],
            m[schedule[4]],
            m[schedule[6]],
        );
        let my = set4(
            m[schedule[1]],
            m[schedule[3]],
            m[schedule[5]],
            m[schedule[7]],
        );
        g!(mx, my);

        // Diagonalize: rotate row1 left 1, row2 left 2, row3 left 3 so the
        // diagonals line up as lanes.
        row1 = _mm_shuffle_epi32(row1, 0b00_11_10_01);
        row2 = _mm_shuffle_epi32(row2, 0b01_00_11_10);
        row3 = _mm_shuffle_epi32(row3, 0b10_01_00_11);

        let mx = set4(
            m[schedule[8]],
            m[schedule[10]],
            m[schedule[12]],
            m[schedule[14]],
        );
        let my = set4(
            m[schedule[9]],
            m[schedule[11]],
            m[schedule[13]],
            m[schedule[15]],
        );
        g!(mx, my);

        // Undiagonalize.
        row1 = _mm_shuffle_epi32(row1, 0b10_01_00_11);
        row2 = _mm_shuffle_epi32(row2, 0b01_00_11_10);
        row3 = _mm_shuffle_epi32(row3, 0b00_11_10_01);
    }

    [
        xor(row0, row2),
        xor(row1, row3),
        xor(row2, cv_lo),
        xor(row3, cv_hi),
    ]
}

/// Compress one block, overwriting `cv` with the new chaining value.
///
/// # Safety
/// The caller must ensure SSE4.1 and SSSE3 are available.
#[target_feature(enable = "sse4.1,ssse3")]
pub unsafe fn compress_in_place(
    cv: &mut [u32; 8],
    block: &[u8; BLOCK_LEN],
    block_len: u8,
    counter: u64,
    flags: u8,
) {
    let rows = compress_rows(cv, block, block_len, counter, flags);
    storeu(rows[0], cv.as_mut_ptr().cast());
    storeu(rows[1], cv.as_mut_ptr().add(4).cast());
}

/// Compress one block without mutating `cv`, writing the full 64-byte
/// expanded output.
///
/// # Safety
/// The caller must ensure SSE4.1 and SSSE3 are available.
#[target_feature(enable = "sse4.1,ssse3")]
pub unsafe fn compress_xof(
    cv: &[u32; 8],
    block: &[u8; BLOCK_LEN],
    block_len: u8,
    counter: u64,
    flags: u8,
    out: &mut [u8; 2 * OUT_LEN],
) {
    let rows = compress_rows(cv, block, block_len, counter, flags);
    storeu(rows[0], out.as_mut_ptr());
    storeu(rows[1], out.as_mut_ptr().add(16));
    storeu(rows[2], out.as_mut_ptr().add(32));
    storeu(rows[3], out.as_mut_ptr().add(48));
}

// =============================================================================
// BATCHED HASHING (4-WAY)
// =============================================================================

#[inline(always)]
#[allow(clippy::too_many_lines)]
unsafe fn round(v: &mut [__m128i; 16], m: &[__m128i; 16], r: usize, rot16: __m128i, rot8: __m128i) {
    v[0] = add(v[0], m[MSG_SCHEDULE[r][0]]);
    v[1] = add(v[1], m[MSG_SCHEDULE[r][2]]);
    v[2] = add(v[2], m[MSG_SCHEDULE[r][4]]);
    v[3] = add(v[3], m[MSG_SCHEDULE[r][6]]);
    v[0] = add(v[0], v[4]);
    v[1] = add(v[1], v[5]);
    v[2] = add(v[2], v[6]);
    v[3] = add(v[3], v[7]);
    v[12] = xor(v[12], v[0]);
    v[13] = xor(v[13], v[1]);
    v[14] = xor(v[14], v[2]);
    v[15] = xor(v[15], v[3]);
    v[12] = _mm_shuffle_epi8(v[12], rot16);
    v[13] = _mm_shuffle_epi8(v[13], rot16);
    v[14] = _mm_shuffle_epi8(v[14], rot16);
    v[15] = _mm_shuffle_epi8(v[15], rot16);
    v[8] = add(v[8], v[12]);
    v[9] = add(v[9], v[13]);
    v[10] = add(v[10], v[14]);
    v[11] = add(v[11], v[15]);
    v[4] = rot12(xor(v[4], v[8]));
    v[5] = rot12(xor(v[5], v[9]));
    v[6] = rot12(xor(v[6], v[10]));
    v[7] = rot12(xor(v[7], v[11]));
    v[0] = add(v[0], m[MSG_SCHEDULE[r][1]]);
    v[1] = add(v[1], m[MSG_SCHEDULE[r][3]]);
    v[2] = add(v[2], m[MSG_SCHEDULE[r][5]]);
    v[3] = add(v[3], m[MSG_SCHEDULE[r][7]]);
    v[0] = add(v[0], v[4]);
    v[1] = add(v[1], v[5]);
    v[2] = add(v[2], v[6]);
    v[3] = add(v[3], v[7]);
    v[12] = xor(v[12], v[0]);
    v[13] = xor(v[13], v[1]);
    v[14] = xor(v[14], v[2]);
    v[15] = xor(v[15], v[3]);
    v[12] = _mm_shuffle_epi8(v[12], rot8);
    v[13] = _mm_shuffle_epi8(v[13], rot8);
    v[14] = _mm_shuffle_epi8(v[14], rot8);
    v[15] = _mm_shuffle_epi8(v[15], rot8);
    v[8] = add(v[8], v[12]);
    v[9] = add(v[9], v[13]);
    v[10] = add(v[10], v[14]);
    v[11] = add(v[11], v[15]);
    v[4] = rot7(xor(v[4], v[8]));
    v[5] = rot7(xor(v[5], v[9]));
    v[6] = rot7(xor(v[6], v[10]));
    v[7] = rot7(xor(v[7], v[11]));

    v[0] = add(v[0], m[MSG_SCHEDULE[r][8]]);
    v[1] = add(v[1], m[MSG_SCHEDULE[r][10]]);
    v[2] = add(v[2], m[MSG_SCHEDULE[r][12]]);
    v[3] = add(v[3], m[MSG_SCHEDULE[r][14]]);
    v[0] = add(v[0], v[5]);
    v[1] = add(v[1], v[6]);
    v[2] = add(v[2], v[7]);
    v[3] = add(v[3], v[4]);
    v[15] = xor(v[15], v[0]);
    v[12] = xor(v[12], v[1]);
    v[13] = xor(v[13], v[2]);
    v[14] = xor(v[14], v[3]);
    v[15] = _mm_shuffle_epi8(v[15], rot16);
    v[12] = _mm_shuffle_epi8(v[12], rot16);
    v[13] = _mm_shuffle_epi8(v[13], rot16);
    v[14] = _mm_shuffle_epi8(v[14], rot16);
    v[10] = add(v[10], v[15]);
    v[11] = add(v[11], v[12]);
    v[8] = add(v[8], v[13]);
    v[9] = add(v[9], v[14]);
    v[5] = rot12(xor(v[5], v[10]));
    v[6] = rot12(xor(v[6], v[11]));
    v[7] = rot12(xor(v[7], v[8]));
    v[4] = rot12(xor(v[4], v[9]));
    v[0] = add(v[0], m[MSG_SCHEDULE[r][9]]);
    v[1] = add(v[1], m[MSG_SCHEDULE[r][11]]);
    v[2] = add(v[2], m[MSG_SCHEDULE[r][13]]);
    v[3] = add(v[3], m[MSG_SCHEDULE[r][15]]);
    v[0] = add(v[0], v[5]);
    v[1] = add(v[1], v[6]);
    v[2] = add(v[2], v[7]);
    v[3] = add(v[3], v[4]);
    v[15] = xor(v[15], v[0]);
    v[12] = xor(v[12], v[1]);
    v[13] = xor(v[13], v[2]);
    v[14] = xor(v[14], v[3]);
    v[15] = _mm_shuffle_epi8(v[15], rot8);
    v[12] = _mm_shuffle_epi8(v[12], rot8);
    v[13] = _mm_shuffle_epi8(v[13], rot8);
    v[14] = _mm_shuffle_epi8(v[14], rot8);
    v[10] = add(v[10], v[15]);
    v[11] = add(v[11], v[12]);
    v[8] = add(v[8], v[13]);
    v[9] = add(v[9], v[14]);
    v[5] = rot7(xor(v[5], v[10]));
    v[6] = rot7(xor(v[6], v[11]));
    v[7] = rot7(xor(v[7], v[8]));
    v[4] = rot7(xor(v[4], v[9]));
}

#[inline(always)]
unsafe fn transpose_vecs(vecs: &mut [__m128i; DEGREE]) {
    let ab_01 = _mm_unpacklo_epi32(vecs[0], vecs[1]);
    let ab_23 = _mm_unpackhi_epi32(vecs[0], vecs[1]);
    let cd_01 = _mm_unpacklo_epi32(vecs[2], vecs[3]);
    let cd_23 = _mm_unpackhi_epi32(vecs[2], vecs[3]);

    vecs[0] = _mm_unpacklo_epi64(ab_01, cd_01);
    vecs[1] = _mm_unpackhi_epi64(ab_01, cd_01);
    vecs[2] = _mm_unpacklo_epi64(ab_23, cd_23);
    vecs[3] = _mm_unpackhi_epi64(ab_23, cd_23);
}

#[inline(always)]
unsafe fn transpose_msg_vecs(inputs: &[*const u8; DEGREE], block_offset: usize) -> [__m128i; 16] {
    let stride = 4 * DEGREE;
    let mut quarter0 = [
        loadu(inputs[0].add(block_offset)),
        loadu(inputs[1].add(block_offset)),
        loadu(inputs[2].add(block_offset)),
        loadu(inputs[3].add(block_offset)),
    ];
    let mut quarter1 = [
        loadu(inputs[0].add(block_offset + stride)),
        loadu(inputs[1].add(block_offset + stride)),
        loadu(inputs[2].add(block_offset + stride)),
        loadu(inputs[3].add(block_offset + stride)),
    ];
    let mut quarter2 = [
        loadu(inputs[0].add(block_offset + 2 * stride)),
        loadu(inputs[1].add(block_offset + 2 * stride)),
        loadu(inputs[2].add(block_offset + 2 * stride)),
        loadu(inputs[3].add(block_offset + 2 * stride)),
    ];
    let mut quarter3 = [
        loadu(inputs[0].add(block_offset + 3 * stride)),
        loadu(inputs[1].add(block_offset + 3 * stride)),
        loadu(inputs[2].add(block_offset + 3 * stride)),
        loadu(inputs[3].add(block_offset + 3 * stride)),
    ];

    for &input in inputs {
        _mm_prefetch(input.wrapping_add(block_offset + 256).cast::<i8>(), _MM_HINT_T0);
    }

    transpose_vecs(&mut quarter0);
    transpose_vecs(&mut quarter1);
    transpose_vecs(&mut quarter2);
    transpose_vecs(&mut quarter3);

    [
        quarter0[0], quarter0[1], quarter0[2], quarter0[3], quarter1[0], quarter1[1], quarter1[2],
        quarter1[3], quarter2[0], quarter2[1], quarter2[2], quarter2[3], quarter3[0], quarter3[1],
        quarter3[2], quarter3[3],
    ]
}

#[inline(always)]
unsafe fn load_counters(counter: u64, increment_counter: bool) -> (__m128i, __m128i) {
    let mask = if increment_counter { !0u64 } else { 0u64 };
    (
        set4(
            counter_low(counter),
            counter_low(counter.wrapping_add(mask & 1)),
            counter_low(counter.wrapping_add(mask & 2)),
            counter_low(counter.wrapping_add(mask & 3)),
        ),
        set4(
            counter_high(counter),
            counter_high(counter.wrapping_add(mask & 1)),
            counter_high(counter.wrapping_add(mask & 2)),
            counter_high(counter.wrapping_add(mask & 3)),
        ),
    )
}

/// Hash exactly [`DEGREE`] independent inputs in lock-step, writing one
/// 32-byte chaining value per input to `out`.
///
/// # Safety
/// The caller must ensure SSE4.1 and SSSE3 are available, that every input
/// pointer is valid for `blocks * BLOCK_LEN` bytes, and that `out` is valid
/// for `DEGREE * OUT_LEN` writable bytes.
#[target_feature(enable = "sse4.1,ssse3")]
pub unsafe fn hash4(
    inputs: &[*const u8; DEGREE],
    blocks: usize,
    key: &[u32; 8],
    counter: u64,
    increment_counter: bool,
    flags: u8,
    flags_start: u8,
    flags_end: u8,
    out: *mut u8,
) {
    let rot16 = rot16_mask();
    let rot8 = rot8_mask();

    let block_len_vec = set1(BLOCK_LEN as u32);
    let iv0 = set1(IV[0]);
    let iv1 = set1(IV[1]);
    let iv2 = set1(IV[2]);
    let iv3 = set1(IV[3]);

    let mut h_vecs = [
        set1(key[0]),
        set1(key[1]),
        set1(key[2]),
        set1(key[3]),
        set1(key[4]),
        set1(key[5]),
        set1(key[6]),
        set1(key[7]),
    ];

    let (counter_low_vec, counter_high_vec) = load_counters(counter, increment_counter);

    for block in 0..blocks {
        let mut block_flags = flags;
        if block == 0 {
            block_flags |= flags_start;
        }
        if block + 1 == blocks {
            block_flags |= flags_end;
        }

        let block_flags_vec = set1(u32::from(block_flags));
        let msg_vecs = transpose_msg_vecs(inputs, block * BLOCK_LEN);

        let mut v = [
            h_vecs[0],
            h_vecs[1],
            h_vecs[2],
            h_vecs[3],
            h_vecs[4],
            h_vecs[5],
            h_vecs[6],
            h_vecs[7],
            iv0,
            iv1,
            iv2,
            iv3,
            counter_low_vec,
            counter_high_vec,
            block_len_vec,
            block_flags_vec,
        ];

        round(&mut v, &msg_vecs, 0, rot16, rot8);
        round(&mut v, &msg_vecs, 1, rot16, rot8);
        round(&mut v, &msg_vecs, 2, rot16, rot8);
        round(&mut v, &msg_vecs, 3, rot16, rot8);
        round(&mut v, &msg_vecs, 4, rot16, rot8);
        round(&mut v, &msg_vecs, 5, rot16, rot8);
        round(&mut v, &msg_vecs, 6, rot16, rot8);

        h_vecs[0] = xor(v[0], v[8]);
        h_vecs[1] = xor(v[1], v[9]);
        h_vecs[2] = xor(v[2], v[10]);
        h_vecs[3] = xor(v[3], v[11]);
        h_vecs[4] = xor(v[4], v[12]);
        h_vecs[5] = xor(v[5], v[13]);
        h_vecs[6] = xor(v[6], v[14]);
        h_vecs[7] = xor(v[7], v[15]);
    }

    // After these transposes, `lo[i]` holds words 0..4 and `hi[i]` words 4..8
    // of lane `i`, so each lane's chaining value stores contiguously.
    let mut lo = [h_vecs[0], h_vecs[1], h_vecs[2], h_vecs[3]];
    let mut hi = [h_vecs[4], h_vecs[5], h_vecs[6], h_vecs[7]];
    transpose_vecs(&mut lo);
    transpose_vecs(&mut hi);

    for lane in 0..DEGREE {
        storeu(lo[lane], out.add(lane * OUT_LEN));
        storeu(hi[lane], out.add(lane * OUT_LEN + 16));
    }
}
