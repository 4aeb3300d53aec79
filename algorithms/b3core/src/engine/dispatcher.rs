//! Kernel Dispatcher
//!
//! Selects the fastest available kernel for each operation on the current
//! CPU and exposes the safe public entry points. Single-block compression
//! and batched hashing are dispatched independently. AVX2 has no
//! single-block kernel, and the batched AVX-512 kernel needs AVX2 for its
//! transposes.

#[cfg(target_arch = "x86_64")]
use crate::engine::features::{self, CpuFeatures};
use crate::kernels;
use crate::kernels::constants::{BLOCK_LEN, OUT_LEN};

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// A compiled-in kernel family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// AVX-512 kernels (16-way batched, `vprold` single-block).
    #[cfg(target_arch = "x86_64")]
    Avx512,
    /// AVX2 batched kernel (8-way).
    #[cfg(target_arch = "x86_64")]
    Avx2,
    /// SSE4.1 kernels (4-way batched, `pshufb` single-block).
    #[cfg(target_arch = "x86_64")]
    Sse41,
    /// Scalar kernels, available everywhere.
    Portable,
}

impl Backend {
    /// Number of inputs the backend's batched hasher consumes at a time.
    pub const fn degree(self) -> usize {
        match self {
            #[cfg(target_arch = "x86_64")]
            Self::Avx512 => kernels::avx512::DEGREE,
            #[cfg(target_arch = "x86_64")]
            Self::Avx2 => kernels::avx2::DEGREE,
            #[cfg(target_arch = "x86_64")]
            Self::Sse41 => kernels::sse41::DEGREE,
            Self::Portable => 1,
        }
    }

    /// Human-readable backend label for logs and bench output.
    pub const fn name(self) -> &'static str {
        match self {
            #[cfg(target_arch = "x86_64")]
            Self::Avx512 => "AVX-512",
            #[cfg(target_arch = "x86_64")]
            Self::Avx2 => "AVX2",
            #[cfg(target_arch = "x86_64")]
            Self::Sse41 => "SSE4.1",
            Self::Portable => "Portable",
        }
    }
}

/// Returns the backend used for single-block compression.
pub fn select_compress() -> Backend {
    #[cfg(target_arch = "x86_64")]
    {
        let caps = features::detect();
        if caps.contains(CpuFeatures::AVX512F | CpuFeatures::AVX512VL) {
            return Backend::Avx512;
        }
        if caps.contains(CpuFeatures::SSE41 | CpuFeatures::SSSE3) {
            return Backend::Sse41;
        }
    }
    Backend::Portable
}

/// Returns the backend used for batched hashing.
pub fn select_hash_many() -> Backend {
    #[cfg(target_arch = "x86_64")]
    {
        let caps = features::detect();
        if caps.contains(CpuFeatures::AVX512F | CpuFeatures::AVX512VL | CpuFeatures::AVX2) {
            return Backend::Avx512;
        }
        if caps.contains(CpuFeatures::AVX2) {
            return Backend::Avx2;
        }
        if caps.contains(CpuFeatures::SSE41 | CpuFeatures::SSSE3) {
            return Backend::Sse41;
        }
    }
    Backend::Portable
}

// =============================================================================
// PUBLIC ENTRY POINTS
// =============================================================================

/// Compresses one block, overwriting `cv` with the new chaining value.
///
/// `block_len` is the number of meaningful bytes in `block`; callers pad
/// short final blocks with zeros before compressing them.
#[allow(unsafe_code)]
pub fn compress_in_place(
    cv: &mut [u32; 8],
    block: &[u8; BLOCK_LEN],
    block_len: u8,
    counter: u64,
    flags: u8,
) {
    match select_compress() {
        // SAFETY: Only reachable after the capability probe confirmed
        // AVX-512F and AVX-512VL.
        #[cfg(target_arch = "x86_64")]
        Backend::Avx512 => unsafe {
            kernels::avx512::compress_in_place(cv, block, block_len, counter, flags);
        },
        // SAFETY: Only reachable after the capability probe confirmed
        // SSE4.1 and SSSE3.
        #[cfg(target_arch = "x86_64")]
        Backend::Sse41 => unsafe {
            kernels::sse41::compress_in_place(cv, block, block_len, counter, flags);
        },
        _ => kernels::portable::compress_in_place(cv, block, block_len, counter, flags),
    }
}

/// Compresses one block without consuming `cv`, writing all sixteen
/// post-finalization state words to `out` in little-endian order.
///
/// The first 32 bytes of `out` equal the chaining value that
/// [`compress_in_place`] would produce for the same arguments.
#[allow(unsafe_code)]
pub fn compress_xof(
    cv: &[u32; 8],
    block: &[u8; BLOCK_LEN],
    block_len: u8,
    counter: u64,
    flags: u8,
    out: &mut [u8; 2 * OUT_LEN],
) {
    match select_compress() {
        // SAFETY: Only reachable after the capability probe confirmed
        // AVX-512F and AVX-512VL.
        #[cfg(target_arch = "x86_64")]
        Backend::Avx512 => unsafe {
            kernels::avx512::compress_xof(cv, block, block_len, counter, flags, out);
        },
        // SAFETY: Only reachable after the capability probe confirmed
        // SSE4.1 and SSSE3.
        #[cfg(target_arch = "x86_64")]
        Backend::Sse41 => unsafe {
            kernels::sse41::compress_xof(cv, block, block_len, counter, flags, out);
        },
        _ => kernels::portable::compress_xof(cv, block, block_len, counter, flags, out),
    }
}

/// Hashes a batch of equal-length inputs, writing one 32-byte chaining
/// value per input to `out`.
///
/// Each input must be exactly `blocks * 64` bytes. `flags_start` is OR'd
/// into the flags of each input's first block and `flags_end` into its
/// last (both for a single-block input). When `increment_counter` is set,
/// input `i` uses `counter + i`; otherwise every input uses `counter`.
///
/// Full-width groups go to the widest supported kernel; the remainder
/// falls back to narrower ones so no SIMD lane is ever partially filled.
///
/// # Panics
/// Panics if any input's length differs from `blocks * 64`, or if `out` is
/// shorter than `inputs.len() * 32` bytes.
#[allow(clippy::too_many_arguments)]
#[cfg_attr(not(target_arch = "x86_64"), allow(unused_mut))]
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
    for input in inputs {
        assert_eq!(input.len(), blocks * BLOCK_LEN, "ragged batch input");
    }
    assert!(out.len() >= inputs.len() * OUT_LEN, "output buffer too short");

    let mut inputs = inputs;
    let mut counter = counter;
    let mut out = out;

    #[cfg(target_arch = "x86_64")]
    {
        let backend = select_hash_many();
        let degree = backend.degree();
        while degree > 1 && inputs.len() >= degree {
            let (group, rest) = inputs.split_at(degree);
            let (group_out, rest_out) = core::mem::take(&mut out).split_at_mut(degree * OUT_LEN);
            hash_group(backend, group, blocks, key, counter, increment_counter, flags, flags_start, flags_end, group_out);
            inputs = rest;
            out = rest_out;
            if increment_counter {
                counter = counter.wrapping_add(degree as u64);
            }
        }
    }

    kernels::portable::hash_many(
        inputs,
        blocks,
        key,
        counter,
        increment_counter,
        flags,
        flags_start,
        flags_end,
        out,
    );
}

/// Runs one full-width group on the selected batched kernel.
///
/// `group` has exactly `backend.degree()` entries, each validated to hold
/// `blocks` whole blocks, and `out` holds one chaining value per entry.
#[cfg(target_arch = "x86_64")]
#[allow(unsafe_code)]
#[allow(clippy::too_many_arguments)]
fn hash_group(
    backend: Backend,
    group: &[&[u8]],
    blocks: usize,
    key: &[u32; 8],
    counter: u64,
    increment_counter: bool,
    flags: u8,
    flags_start: u8,
    flags_end: u8,
    out: &mut [u8],
) {
    match backend {
        // SAFETY: Only reachable after the capability probe confirmed
        // AVX-512F, AVX-512VL, and AVX2. The caller validated input and
        // output lengths.
        Backend::Avx512 => unsafe {
            let ptrs: [*const u8; 16] = core::array::from_fn(|i| group[i].as_ptr());
            kernels::avx512::hash16(
                &ptrs,
                blocks,
                key,
                counter,
                increment_counter,
                flags,
                flags_start,
                flags_end,
                out.as_mut_ptr(),
            );
        },
        // SAFETY: Only reachable after the capability probe confirmed AVX2.
        // The caller validated input and output lengths.
        Backend::Avx2 => unsafe {
            let ptrs: [*const u8; 8] = core::array::from_fn(|i| group[i].as_ptr());
            kernels::avx2::hash8(
                &ptrs,
                blocks,
                key,
                counter,
                increment_counter,
                flags,
                flags_start,
                flags_end,
                out.as_mut_ptr(),
            );
        },
        // SAFETY: Only reachable after the capability probe confirmed
        // SSE4.1 and SSSE3. The caller validated input and output lengths.
        Backend::Sse41 => unsafe {
            let ptrs: [*const u8; 4] = core::array::from_fn(|i| group[i].as_ptr());
            kernels::sse41::hash4(
                &ptrs,
                blocks,
                key,
                counter,
                increment_counter,
                flags,
                flags_start,
                flags_end,
                out.as_mut_ptr(),
            );
        },
        Backend::Portable => kernels::portable::hash_many(
            group,
            blocks,
            key,
            counter,
            increment_counter,
            flags,
            flags_start,
            flags_end,
            out,
        ),
    }
}

/// Returns the number of inputs [`hash_many`] processes per SIMD pass.
///
/// Stable for the lifetime of the process. Callers size their batches as a
/// multiple of this to keep every lane busy.
#[must_use]
pub fn simd_degree() -> usize {
    select_hash_many().degree()
}

/// Returns the names of the active backends as
/// `(single_block, batched)`.
#[must_use]
pub fn active_backend_names() -> (&'static str, &'static str) {
    (select_compress().name(), select_hash_many().name())
}
