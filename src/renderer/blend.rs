//! Color blending.
//!
//! RGB and alpha blend independently: each side picks its factors and
//! operator from [`BlendParams`], combining the incoming fragment with
//! the destination texel already in the color attachment.

use glam::{Vec3, Vec4};

use crate::resources::states::{BlendFactor, BlendFunction, BlendParams};

trait BlendLane: Copy {
    fn splat(v: f32) -> Self;
    fn one_minus(self) -> Self;
}

impl BlendLane for Vec3 {
    #[inline]
    fn splat(v: f32) -> Self {
        Vec3::splat(v)
    }
    #[inline]
    fn one_minus(self) -> Self {
        Vec3::ONE - self
    }
}

impl BlendLane for f32 {
    #[inline]
    fn splat(v: f32) -> Self {
        v
    }
    #[inline]
    fn one_minus(self) -> Self {
        1.0 - self
    }
}

#[inline]
fn blend_factor<T: BlendLane>(
    src: T,
    src_alpha: f32,
    dst: T,
    dst_alpha: f32,
    factor: BlendFactor,
) -> T {
    match factor {
        BlendFactor::Zero => T::splat(0.0),
        BlendFactor::One => T::splat(1.0),
        BlendFactor::SrcColor => src,
        BlendFactor::SrcAlpha => T::splat(src_alpha),
        BlendFactor::DstColor => dst,
        BlendFactor::DstAlpha => T::splat(dst_alpha),
        BlendFactor::OneMinusSrcColor => src.one_minus(),
        BlendFactor::OneMinusSrcAlpha => T::splat(1.0 - src_alpha),
        BlendFactor::OneMinusDstColor => dst.one_minus(),
        BlendFactor::OneMinusDstAlpha => T::splat(1.0 - dst_alpha),
    }
}

#[inline]
fn blend_func_vec3(src: Vec3, dst: Vec3, func: BlendFunction) -> Vec3 {
    match func {
        BlendFunction::Add => src + dst,
        BlendFunction::Subtract => src - dst,
        BlendFunction::ReverseSubtract => dst - src,
        BlendFunction::Min => src.min(dst),
        BlendFunction::Max => src.max(dst),
    }
}

#[inline]
fn blend_func_f32(src: f32, dst: f32, func: BlendFunction) -> f32 {
    match func {
        BlendFunction::Add => src + dst,
        BlendFunction::Subtract => src - dst,
        BlendFunction::ReverseSubtract => dst - src,
        BlendFunction::Min => src.min(dst),
        BlendFunction::Max => src.max(dst),
    }
}

/// Blends `src` over `dst` (both in `[0, 1]`).
#[must_use]
pub fn blend_color(src: Vec4, dst: Vec4, params: &BlendParams) -> Vec4 {
    let src_rgb = src.truncate();
    let dst_rgb = dst.truncate();

    let src_rgb_f = blend_factor(src_rgb, src.w, dst_rgb, dst.w, params.src_rgb);
    let dst_rgb_f = blend_factor(src_rgb, src.w, dst_rgb, dst.w, params.dst_rgb);
    let rgb = blend_func_vec3(src_rgb * src_rgb_f, dst_rgb * dst_rgb_f, params.func_rgb);

    let src_a_f = blend_factor(src.w, src.w, dst.w, dst.w, params.src_alpha);
    let dst_a_f = blend_factor(src.w, src.w, dst.w, dst.w, params.dst_alpha);
    let alpha = blend_func_f32(src.w * src_a_f, dst.w * dst_a_f, params.func_alpha);

    rgb.extend(alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_source_through() {
        let params = BlendParams::default(); // ONE, ZERO, ADD
        let src = Vec4::new(0.2, 0.4, 0.6, 0.8);
        let dst = Vec4::new(0.9, 0.1, 0.3, 0.5);
        assert_eq!(blend_color(src, dst, &params), src);
    }

    #[test]
    fn alpha_blending() {
        let mut params = BlendParams::default();
        params.set_blend_factor(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
        let src = Vec4::new(1.0, 0.0, 0.0, 0.5);
        let dst = Vec4::new(0.0, 1.0, 0.0, 1.0);
        let out = blend_color(src, dst, &params);
        assert!((out.x - 0.5).abs() < 1e-6);
        assert!((out.y - 0.5).abs() < 1e-6);
        assert!((out.w - 0.75).abs() < 1e-6);
    }

    #[test]
    fn min_max_operators() {
        let mut params = BlendParams::default();
        params.set_blend_factor(BlendFactor::One, BlendFactor::One);
        params.set_blend_func(BlendFunction::Min);
        let src = Vec4::new(0.2, 0.8, 0.5, 1.0);
        let dst = Vec4::new(0.6, 0.3, 0.5, 0.4);
        let out = blend_color(src, dst, &params);
        assert_eq!(out, Vec4::new(0.2, 0.3, 0.5, 0.4));
    }
}
