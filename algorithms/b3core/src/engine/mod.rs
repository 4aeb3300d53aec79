//! Execution Engine
//!
//! CPU capability detection and kernel dispatch.

pub mod dispatcher;
pub mod features;

pub use dispatcher::{active_backend_names, compress_in_place, compress_xof, hash_many, simd_degree};
pub use features::{detect as cpu_features, CpuFeatures};
