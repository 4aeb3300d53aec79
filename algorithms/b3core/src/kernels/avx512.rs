//! AVX-512 backend: single-block compression and 16-way batched hashing.
//!
//! Rotates use `vprold` instead of shuffle or shift-and-or sequences, which
//! is why the single-block path here beats the SSE4.1 one despite doing the
//! same 128-bit row arithmetic. The 16-way path additionally needs AVX2 for
//! its 256-bit transposes.

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
pub const DEGREE: usize = 16;

// =============================================================================
// VECTOR HELPERS
// =============================================================================

#[inline(always)]
unsafe fn add(a: __m512i, b: __m512i) -> __m512i {
    _mm512_add_epi32(a, b)
}

#[inline(always)]
unsafe fn xor(a: __m512i, b: __m512i) -> __m512i {
    _mm512_xor_si512(a, b)
}

#[inline(always)]
unsafe fn set1(x: u32) -> __m512i {
    _mm512_set1_epi32(x as i32)
}

#[inline(always)]
unsafe fn loadu256(src: *const u8) -> __m256i {
    _mm256_loadu_si256(src.cast())
}

#[inline(always)]
unsafe fn storeu256(src: __m256i, dest: *mut u8) {
    _mm256_storeu_si256(dest.cast(), src);
}

// Rotate right by N == rotate left by 32 - N. `vprold` only has the left
// form as an intrinsic.

#[inline(always)]
unsafe fn rot16(x: __m512i) -> __m512i {
    _mm512_rol_epi32(x, 16)
}

#[inline(always)]
unsafe fn rot12(x: __m512i) -> __m512i {
    _mm512_rol_epi32(x, 20)
}

#[inline(always)]
unsafe fn rot8(x: __m512i) -> __m512i {
    _mm512_rol_epi32(x, 24)
}

#[inline(always)]
unsafe fn rot7(x: __m512i) -> __m512i {
    _mm512_rol_epi32(x, 25)
}

// =============================================================================
// SINGLE-BLOCK COMPRESSION
// =============================================================================

#[inline(always)]
unsafe fn loadu128(src: *const u8) -> __m128i {
    _mm_loadu_si128(src.cast())
}

#[inline(always)]
unsafe fn storeu128(src: __m128i, dest: *mut u8) {
    _mm_storeu_si128(dest.cast(), src);
}

#[inline(always)]
unsafe fn add128(a: __m128i, b: __m128i) -> __m128i {
    _mm_add_epi32(a, b)
}

#[inline(always)]
unsafe fn xor128(a: __m128i, b: __m128i) -> __m128i {
    _mm_xor_si128(a, b)
}

#[inline(always)]
unsafe fn set4(a: u32, b: u32, c: u32, d: u32) -> __m128i {
    _mm_setr_epi32(a as i32, b as i32, c as i32, d as i32)
}

/// Run the 7-round compression on the row-major state, returning the four
/// finalized rows `[v0..4, v4..8, v8..12 ^ cv_lo, v12..16 ^ cv_hi]`.
#[inline(always)]
unsafe fn compress_rows(
    cv: &[u32; 8],
    block: &[u8; BLOCK_LEN],
    block_len: u8,
    counter: u64,
    flags: u8,
) -> [__m128i; 4] {
    let cv_lo = loadu128(cv.as_ptr().cast());
    let cv_hi = loadu128(cv.as_ptr().add(4).cast());
    let mut row0 = cv_lo;
    let mut row1 = cv_hi;
    let mut row2 = loadu128(IV.as_ptr().cast());
    let mut row3 = set4(
        counter_low(counter),
        counter_high(counter),
        u32::from(block_len),
        u32::from(flags),
    );

    let m = words16_from_le_bytes(block);

    macro_rules! g {
        ($mx:expr, $my:expr) => {{
            row0 = add128(add128(row0, row1), $mx);
            row3 = _mm_rol_epi32(xor128(row3, row0), 16);
            row2 = add128(row2, row3);
            row1 = _mm_rol_epi32(xor128(row1, row2), 20);
            row0 = add128(add128(row0, row1), $my);
            row3 = _mm_rol_epi32(xor128(row3, row0), 24);
            row2 = add128(row2, row3);
            row1 = _mm_rol_epi32(xor128(row1, row2), 25);
        }};
    }

    for schedule in &MSG_SCHEDULE {
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

        row1 = _mm_shuffle_epi32(row1, 0b10_01_00_11);
        row2 = _mm_shuffle_epi32(row2, 0b01_00_11_10);
        row3 = _mm_shuffle_epi32(row3, 0b00_11_10_01);
    }

    [
        xor128(row0, row2),
        xor128(row1, row3),
        xor128(row2, cv_lo),
        xor128(row3, cv_hi),
    ]
}

/// Compress one block, overwriting `cv` with the new chaining value.
///
/// # Safety
/// The caller must ensure AVX-512F and AVX-512VL are available.
#[target_feature(enable = "avx512f,avx512vl")]
pub unsafe fn compress_in_place(
    cv: &mut [u32; 8],
    block: &[u8; BLOCK_LEN],
    block_len: u8,
    counter: u64,
    flags: u8,
) {
    let rows = compress_rows(cv, block, block_len, counter, flags);
    storeu128(rows[0], cv.as_mut_ptr().cast());
    storeu128(rows[1], cv.as_mut_ptr().add(4).cast());
}

/// Compress one block without mutating `cv`, writing the full 64-byte
/// expanded output.
///
/// # Safety
/// The caller must ensure AVX-512F and AVX-512VL are available.
#[target_feature(enable = "avx512f,avx512vl")]
pub unsafe fn compress_xof(
    cv: &[u32; 8],
    block: &[u8; BLOCK_LEN],
    block_len: u8,
    counter: u64,
    flags: u8,
    out: &mut [u8; 2 * OUT_LEN],
) {
    let rows = compress_rows(cv, block, block_len, counter, flags);
    storeu128(rows[0], out.as_mut_ptr());
    storeu128(rows[1], out.as_mut_ptr().add(16));
    storeu128(rows[2], out.as_mut_ptr().add(32));
    storeu128(rows[3], out.as_mut_ptr().add(48));
}

// =============================================================================
// BATCHED HASHING (16-WAY)
// =============================================================================

#[inline(always)]
#[allow(clippy::too_many_lines)]
unsafe fn round(v: &mut [__m512i; 16], m: &[__m512i; 16], r: usize) {
    v[0] = add(v[0], m[MSG_SCHEDULE[r][0]]);
    v[1] = add(v[1], m[MSG_SCHEDULE[r][2]]);
    v[2] = add(v[2], m[MSG_SCHEDULE[r][4]]);
    v[3] = add(v[3], m[MSG_SCHEDULE[r][6]]);
    v[0] = add(v[0], v[4]);
    v[1] = add(v[1], v[5]);
    v[2] = add(v[2], v[6]);
    v[3] = add(v[3], v[7]);
    v[12] = rot16(xor(v[12], v[0]));
    v[13] = rot16(xor(v[13], v[1]));
    v[14] = rot16(xor(v[14], v[2]));
    v[15] = rot16(xor(v[15], v[3]));
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
    v[12] = rot8(xor(v[12], v[0]));
    v[13] = rot8(xor(v[13], v[1]));
    v[14] = rot8(xor(v[14], v[2]));
    v[15] = rot8(xor(v[15], v[3]));
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
    v[15] = rot16(xor(v[15], v[0]));
    v[12] = rot16(xor(v[12], v[1]));
    v[13] = rot16(xor(v[13], v[2]));
    v[14] = rot16(xor(v[14], v[3]));
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
    v[15] = rot8(xor(v[15], v[0]));
    v[12] = rot8(xor(v[12], v[1]));
    v[13] = rot8(xor(v[13], v[2]));
    v[14] = rot8(xor(v[14], v[3]));
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
unsafe fn load_counters(counter: u64, increment_counter: bool) -> (__m512i, __m512i) {
    let mask = if increment_counter { !0u64 } else { 0u64 };
    let mut low = [0u32; DEGREE];
    let mut high = [0u32; DEGREE];
    for i in 0..DEGREE {
        let c = counter.wrapping_add(mask & i as u64);
        low[i] = counter_low(c);
        high[i] = counter_high(c);
    }
    (
        _mm512_loadu_si512(low.as_ptr().cast()),
        _mm512_loadu_si512(high.as_ptr().cast()),
    )
}

#[inline(always)]
unsafe fn interleave128(a: __m256i, b: __m256i) -> (__m256i, __m256i) {
    (
        _mm256_permute2x128_si256(a, b, 0x20),
        _mm256_permute2x128_si256(a, b, 0x31),
    )
}

#[inline(always)]
unsafe fn transpose8x8(vecs: &mut [__m256i; 8]) {
    let ab_0145 = _mm256_unpacklo_epi32(vecs[0], vecs[1]);
    let ab_2367 = _mm256_unpackhi_epi32(vecs[0], vecs[1]);
    let cd_0145 = _mm256_unpacklo_epi32(vecs[2], vecs[3]);
    let cd_2367 = _mm256_unpackhi_epi32(vecs[2], vecs[3]);
    let ef_0145 = _mm256_unpacklo_epi32(vecs[4], vecs[5]);
    let ef_2367 = _mm256_unpackhi_epi32(vecs[4], vecs[5]);
    let gh_0145 = _mm256_unpacklo_epi32(vecs[6], vecs[7]);
    let gh_2367 = _mm256_unpackhi_epi32(vecs[6], vecs[7]);

    let abcd_04 = _mm256_unpacklo_epi64(ab_0145, cd_0145);
    let abcd_15 = _mm256_unpackhi_epi64(ab_0145, cd_0145);
    let abcd_26 = _mm256_unpacklo_epi64(ab_2367, cd_2367);
    let abcd_37 = _mm256_unpackhi_epi64(ab_2367, cd_2367);
    let efgh_04 = _mm256_unpacklo_epi64(ef_0145, gh_0145);
    let efgh_15 = _mm256_unpackhi_epi64(ef_0145, gh_0145);
    let efgh_26 = _mm256_unpacklo_epi64(ef_2367, gh_2367);
    let efgh_37 = _mm256_unpackhi_epi64(ef_2367, gh_2367);

    let (abcdefgh_0, abcdefgh_4) = interleave128(abcd_04, efgh_04);
    let (abcdefgh_1, abcdefgh_5) = interleave128(abcd_15, efgh_15);
    let (abcdefgh_2, abcdefgh_6) = interleave128(abcd_26, efgh_26);
    let (abcdefgh_3, abcdefgh_7) = interleave128(abcd_37, efgh_37);

    vecs[0] = abcdefgh_0;
    vecs[1] = abcdefgh_1;
    vecs[2] = abcdefgh_2;
    vecs[3] = abcdefgh_3;
    vecs[4] = abcdefgh_4;
    vecs[5] = abcdefgh_5;
    vecs[6] = abcdefgh_6;
    vecs[7] = abcdefgh_7;
}

#[inline(always)]
unsafe fn transpose_msg_vecs8(inputs: &[*const u8; 8], block_offset: usize) -> [__m256i; 16] {
    let stride = 4 * 8;
    let mut half0 = [
        loadu256(inputs[0].add(block_offset)),
        loadu256(inputs[1].add(block_offset)),
        loadu256(inputs[2].add(block_offset)),
        loadu256(inputs[3].add(block_offset)),
        loadu256(inputs[4].add(block_offset)),
        loadu256(inputs[5].add(block_offset)),
        loadu256(inputs[6].add(block_offset)),
        loadu256(inputs[7].add(block_offset)),
    ];
    let mut half1 = [
        loadu256(inputs[0].add(block_offset + stride)),
        loadu256(inputs[1].add(block_offset + stride)),
        loadu256(inputs[2].add(block_offset + stride)),
        loadu256(inputs[3].add(block_offset + stride)),
        loadu256(inputs[4].add(block_offset + stride)),
        loadu256(inputs[5].add(block_offset + stride)),
        loadu256(inputs[6].add(block_offset + stride)),
        loadu256(inputs[7].add(block_offset + stride)),
    ];

    for &input in inputs {
        _mm_prefetch(input.wrapping_add(block_offset + 256).cast::<i8>(), _MM_HINT_T0);
    }

    transpose8x8(&mut half0);
    transpose8x8(&mut half1);

    [
        half0[0], half0[1], half0[2], half0[3], half0[4], half0[5], half0[6], half0[7], half1[0],
        half1[1], half1[2], half1[3], half1[4], half1[5], half1[6], half1[7],
    ]
}

#[inline(always)]
unsafe fn transpose_msg_vecs(inputs: &[*const u8; DEGREE], block_offset: usize) -> [__m512i; 16] {
    let lo_ptrs = [
        inputs[0], inputs[1], inputs[2], inputs[3], inputs[4], inputs[5], inputs[6], inputs[7],
    ];
    let hi_ptrs = [
        inputs[8], inputs[9], inputs[10], inputs[11], inputs[12], inputs[13], inputs[14],
        inputs[15],
    ];

    let lo = transpose_msg_vecs8(&lo_ptrs, block_offset);
    let hi = transpose_msg_vecs8(&hi_ptrs, block_offset);

    let mut out = [set1(0); 16];
    for i in 0..16 {
        out[i] = _mm512_inserti64x4(_mm512_castsi256_si512(lo[i]), hi[i], 1);
    }
    out
}

/// Hash exactly [`DEGREE`] independent inputs in lock-step, writing one
/// 32-byte chaining value per input to `out`.
///
/// # Safety
/// The caller must ensure AVX-512F, AVX-512VL, and AVX2 are available, that
/// every input pointer is valid for `blocks * BLOCK_LEN` bytes, and that
/// `out` is valid for `DEGREE * OUT_LEN` writable bytes.
#[target_feature(enable = "avx512f,avx512vl,avx2")]
pub unsafe fn hash16(
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

        round(&mut v, &msg_vecs, 0);
        round(&mut v, &msg_vecs, 1);
        round(&mut v, &msg_vecs, 2);
        round(&mut v, &msg_vecs, 3);
        round(&mut v, &msg_vecs, 4);
        round(&mut v, &msg_vecs, 5);
        round(&mut v, &msg_vecs, 6);

        h_vecs[0] = xor(v[0], v[8]);
        h_vecs[1] = xor(v[1], v[9]);
        h_vecs[2] = xor(v[2], v[10]);
        h_vecs[3] = xor(v[3], v[11]);
        h_vecs[4] = xor(v[4], v[12]);
        h_vecs[5] = xor(v[5], v[13]);
        h_vecs[6] = xor(v[6], v[14]);
        h_vecs[7] = xor(v[7], v[15]);
    }

    // Convert word-major vectors into lane-major order without a scatter.
    // `lo` holds lanes 0..8 and `hi` lanes 8..16.
    let mut lo = [_mm256_setzero_si256(); 8];
    let mut hi = [_mm256_setzero_si256(); 8];
    for i in 0..8 {
        lo[i] = _mm512_castsi512_si256(h_vecs[i]);
        hi[i] = _mm512_extracti64x4_epi64(h_vecs[i], 1);
    }

    transpose8x8(&mut lo);
    transpose8x8(&mut hi);

    for lane in 0..8 {
        storeu256(lo[lane], out.add(lane * OUT_LEN));
        storeu256(hi[lane], out.add((lane + 8) * OUT_LEN));
    }
}
