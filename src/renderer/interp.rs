//! Varying interpolation kernels.
//!
//! The barycentric kernel is the hot loop of fragment setup: every pixel
//! quad interpolates the full varyings block four times. On x86-64 with
//! AVX2+FMA it processes 8 floats per iteration with aligned loads,
//! falling back to a 4-wide tail and then scalar; other targets (or
//! unaligned slices) use the scalar loop. All paths compute
//! `out[i] = bc.x * a[i] + bc.y * b[i] + bc.z * c[i]`.

use glam::Vec3;

#[cfg(target_arch = "x86_64")]
use crate::utils::memory::SIMD_ALIGNMENT;

/// Linear interpolation between two attribute blocks at parameter `t`.
pub fn interpolate_linear(out: &mut [f32], a: &[f32], b: &[f32], t: f32) {
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = a[i] + (b[i] - a[i]) * t;
    }
}

/// Barycentric interpolation of three attribute blocks.
///
/// `out`, `a`, `b` and `c` must have at least `count` elements.
pub fn interpolate_barycentric(out: &mut [f32], a: &[f32], b: &[f32], c: &[f32], bc: Vec3) {
    let count = out.len().min(a.len()).min(b.len()).min(c.len());

    #[cfg(target_arch = "x86_64")]
    {
        if is_aligned(out) && is_aligned(a) && is_aligned(b) && is_aligned(c) && simd_available() {
            // SAFETY: avx2+fma presence checked at runtime; slices are
            // 32-byte aligned and at least `count` long.
            unsafe { interpolate_barycentric_simd(out, a, b, c, bc, count) };
            return;
        }
    }

    interpolate_barycentric_scalar(out, a, b, c, bc, count);
}

fn interpolate_barycentric_scalar(
    out: &mut [f32],
    a: &[f32],
    b: &[f32],
    c: &[f32],
    bc: Vec3,
    count: usize,
) {
    for i in 0..count {
        out[i] = bc.x * a[i] + bc.y * b[i] + bc.z * c[i];
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn is_aligned(slice: &[f32]) -> bool {
    slice.as_ptr() as usize % SIMD_ALIGNMENT == 0
}

#[cfg(target_arch = "x86_64")]
fn simd_available() -> bool {
    is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma")
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn interpolate_barycentric_simd(
    out: &mut [f32],
    a: &[f32],
    b: &[f32],
    c: &[f32],
    bc: Vec3,
    count: usize,
) {
    use std::arch::x86_64::{
        __m128, __m256, _mm256_fmadd_ps, _mm256_load_ps, _mm256_mul_ps, _mm256_set1_ps,
        _mm256_store_ps, _mm_fmadd_ps, _mm_load_ps, _mm_mul_ps, _mm_set1_ps, _mm_store_ps,
    };

    let mut idx = 0;

    // 8-wide
    let end8 = count & !7;
    if end8 > 0 {
        let bc0: __m256 = _mm256_set1_ps(bc.x);
        let bc1 = _mm256_set1_ps(bc.y);
        let bc2 = _mm256_set1_ps(bc.z);
        while idx < end8 {
            let mut sum = _mm256_mul_ps(_mm256_load_ps(a.as_ptr().add(idx)), bc0);
            sum = _mm256_fmadd_ps(_mm256_load_ps(b.as_ptr().add(idx)), bc1, sum);
            sum = _mm256_fmadd_ps(_mm256_load_ps(c.as_ptr().add(idx)), bc2, sum);
            _mm256_store_ps(out.as_mut_ptr().add(idx), sum);
            idx += 8;
        }
    }

    // 4-wide tail
    let end4 = idx + ((count - idx) & !3);
    if end4 > idx {
        let bc0: __m128 = _mm_set1_ps(bc.x);
        let bc1 = _mm_set1_ps(bc.y);
        let bc2 = _mm_set1_ps(bc.z);
        while idx < end4 {
            let mut sum = _mm_mul_ps(_mm_load_ps(a.as_ptr().add(idx)), bc0);
            sum = _mm_fmadd_ps(_mm_load_ps(b.as_ptr().add(idx)), bc1, sum);
            sum = _mm_fmadd_ps(_mm_load_ps(c.as_ptr().add(idx)), bc2, sum);
            _mm_store_ps(out.as_mut_ptr().add(idx), sum);
            idx += 4;
        }
    }

    // scalar tail
    while idx < count {
        out[idx] = bc.x * a[idx] + bc.y * b[idx] + bc.z * c[idx];
        idx += 1;
    }
}
