//! Compression kernels.
//!
//! Each submodule implements the same block compression with a different
//! instruction set. The portable kernel is always present and is the
//! reference the SIMD kernels are checked against; the `x86_64` kernels are
//! compiled in unconditionally on that architecture and selected at runtime
//! by the engine.

pub mod constants;
pub mod portable;

#[cfg(target_arch = "x86_64")]
pub mod avx2;
#[cfg(target_arch = "x86_64")]
pub mod avx512;
#[cfg(target_arch = "x86_64")]
pub mod sse41;
