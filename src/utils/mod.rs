//! Utility Module
//!
//! This module provides the small support layer under the renderer:
//!
//! - [`thread_pool`]: fixed worker pool driving rasterization tiles
//! - [`memory`]: 32-byte-aligned float buffers for the SIMD interpolator
//! - [`hash`]: Murmur3 and hash-combine for state-cache keys
//! - [`image_io`]: PNG dump helpers for texture diagnostics

pub mod hash;
pub mod image_io;
pub mod memory;
pub mod thread_pool;

pub use memory::{aligned_size, AlignedF32Buffer, SIMD_ALIGNMENT};
pub use thread_pool::ThreadPool;
