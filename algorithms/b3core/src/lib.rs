#![cfg_attr(not(feature = "std"), no_std)]

//! # b3core
//!
//! Runtime-dispatched BLAKE3 compression core.
//! Accelerated by SSE4.1, AVX2, and AVX-512.
//!
//! This crate implements the block compression layer that tree hashing
//! builds on: single-block compression, the extended 64-byte output form,
//! and wide batched hashing of independent equal-length inputs. The widest
//! kernel the CPU (and OS) supports is selected once at first use.

//! # Usage
//! ```rust
//! use b3core::{compress_in_place, BLOCK_LEN, CHUNK_END, CHUNK_START, IV, ROOT};
//!
//! // Hash the empty message: one all-zero block, length zero, all three
//! // chunk flags set. `cv` ends up holding the first eight words of
//! // BLAKE3("").
//! let mut cv = IV;
//! compress_in_place(&mut cv, &[0u8; BLOCK_LEN], 0, 0, CHUNK_START | CHUNK_END | ROOT);
//!
//! // Batch sizing for the wide path.
//! assert!(b3core::simd_degree().is_power_of_two());
//! ```

// =============================================================================
// MODULES
// =============================================================================

mod engine;
// Re-export internal kernels for benchmarking/testing if needed, but hide from docs
#[doc(hidden)]
pub mod kernels; // Public for test/example use only

// =============================================================================
// EXPORTS
// =============================================================================

pub use engine::{
    compress_in_place, compress_xof, cpu_features, hash_many, simd_degree, CpuFeatures,
};
pub use kernels::constants::{
    BLOCK_LEN, CHUNK_END, CHUNK_START, DERIVE_KEY_CONTEXT, DERIVE_KEY_MATERIAL, IV, KEYED_HASH,
    KEY_LEN, MAX_SIMD_DEGREE, OUT_LEN, PARENT, ROOT,
};

/// Returns the names of the hardware backends currently in use, as
/// `(single_block, batched)`.
#[must_use]
pub fn active_backend() -> (&'static str, &'static str) {
    engine::active_backend_names()
}
