//! CPU Feature Detection
//!
//! Probes the instruction sets the kernels need, once per process. With the
//! `std` feature the probe runs CPUID/XGETBV at first use and caches the
//! result; without it the capability set is fixed at compile time from the
//! target's enabled features.

use core::ops::{BitOr, BitOrAssign};

/// Set of CPU capabilities relevant to kernel selection.
///
/// A capability bit is set only when both the instruction set exists and,
/// for the wide register files, the OS saves their state across context
/// switches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuFeatures(u32);

impl CpuFeatures {
    /// No capabilities.
    pub const NONE: Self = Self(0);
    /// SSE2 (baseline on x86_64, still probed explicitly).
    pub const SSE2: Self = Self(1);
    /// SSSE3, needed for byte shuffles.
    pub const SSSE3: Self = Self(1 << 1);
    /// SSE4.1.
    pub const SSE41: Self = Self(1 << 2);
    /// AVX, with OS support for the YMM state.
    pub const AVX: Self = Self(1 << 3);
    /// AVX2.
    pub const AVX2: Self = Self(1 << 4);
    /// AVX-512 foundation, with OS support for the ZMM and opmask state.
    pub const AVX512F: Self = Self(1 << 5);
    /// AVX-512 vector length extensions.
    pub const AVX512VL: Self = Self(1 << 6);

    /// Returns `true` if every capability in `other` is present in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no capability is present.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CpuFeatures {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CpuFeatures {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// =============================================================================
// DETECTION
// =============================================================================

/// Returns the capability set of the current CPU.
///
/// The runtime probe executes at most once per process. Concurrent first
/// callers block on the same initialization and every caller observes the
/// same result.
#[cfg(feature = "std")]
#[must_use]
pub fn detect() -> CpuFeatures {
    static CACHE: std::sync::OnceLock<CpuFeatures> = std::sync::OnceLock::new();
    *CACHE.get_or_init(probe)
}

/// Returns the capability set fixed at compile time.
#[cfg(not(feature = "std"))]
#[must_use]
pub fn detect() -> CpuFeatures {
    compile_time()
}

#[cfg(all(feature = "std", target_arch = "x86_64"))]
#[allow(unsafe_code)]
fn probe() -> CpuFeatures {
    use core::arch::x86_64::{__cpuid, __cpuid_count};

    let mut features = CpuFeatures::NONE;

    // SAFETY: CPUID is unconditionally available in 64-bit mode.
    let max_leaf = unsafe { __cpuid(0) }.eax;
    // SAFETY: as above.
    let leaf1 = unsafe { __cpuid(1) };

    if leaf1.edx & (1 << 26) != 0 {
        features |= CpuFeatures::SSE2;
    }
    if leaf1.ecx & (1 << 9) != 0 {
        features |= CpuFeatures::SSSE3;
    }
    if leaf1.ecx & (1 << 19) != 0 {
        features |= CpuFeatures::SSE41;
    }

    // The YMM and ZMM capability bits are only trustworthy when the OS has
    // enabled the corresponding state components in XCR0, so everything
    // wider than 128 bits sits behind the OSXSAVE check.
    if leaf1.ecx & (1 << 27) != 0 {
        // SAFETY: OSXSAVE is set, so XGETBV is executable.
        let xcr0 = unsafe { xgetbv0() };
        if xcr0 & 0x06 == 0x06 {
            if leaf1.ecx & (1 << 28) != 0 {
                features |= CpuFeatures::AVX;
            }
            if max_leaf >= 7 {
                // SAFETY: leaf 7 is in range per the max-leaf check.
                let leaf7 = unsafe { __cpuid_count(7, 0) };
                if leaf7.ebx & (1 << 5) != 0 {
                    features |= CpuFeatures::AVX2;
                }
                if xcr0 & 0xE0 == 0xE0 {
                    if leaf7.ebx & (1 << 16) != 0 {
                        features |= CpuFeatures::AVX512F;
                    }
                    if leaf7.ebx & (1 << 31) != 0 {
                        features |= CpuFeatures::AVX512VL;
                    }
                }
            }
        }
    }

    features
}

#[cfg(all(feature = "std", not(target_arch = "x86_64")))]
fn probe() -> CpuFeatures {
    CpuFeatures::NONE
}

/// Reads XCR0.
///
/// # Safety
/// The caller must have confirmed CPUID leaf 1 ECX bit 27 (OSXSAVE).
#[cfg(all(feature = "std", target_arch = "x86_64"))]
#[allow(unsafe_code)]
#[target_feature(enable = "xsave")]
unsafe fn xgetbv0() -> u64 {
    core::arch::x86_64::_xgetbv(0)
}

#[cfg(not(feature = "std"))]
fn compile_time() -> CpuFeatures {
    let mut features = CpuFeatures::NONE;
    #[cfg(target_arch = "x86_64")]
    {
        if cfg!(target_feature = "sse2") {
            features |= CpuFeatures::SSE2;
        }
        if cfg!(target_feature = "ssse3") {
            features |= CpuFeatures::SSSE3;
        }
        if cfg!(target_feature = "sse4.1") {
            features |= CpuFeatures::SSE41;
        }
        if cfg!(target_feature = "avx") {
            features |= CpuFeatures::AVX;
        }
        if cfg!(target_feature = "avx2") {
            features |= CpuFeatures::AVX2;
        }
        if cfg!(target_feature = "avx512f") {
            features |= CpuFeatures::AVX512F;
        }
        if cfg!(target_feature = "avx512vl") {
            features |= CpuFeatures::AVX512VL;
        }
    }
    features
}
