//! Depth comparison.

use crate::resources::states::DepthFunction;

/// Compares incoming depth `a` against stored depth `b`.
#[inline]
#[must_use]
pub fn depth_test(a: f32, b: f32, func: DepthFunction) -> bool {
    match func {
        DepthFunction::Never => false,
        DepthFunction::Less => a < b,
        DepthFunction::Equal => (a - b).abs() <= f32::EPSILON,
        DepthFunction::LessEqual => a <= b,
        DepthFunction::Greater => a > b,
        DepthFunction::NotEqual => (a - b).abs() > f32::EPSILON,
        DepthFunction::GreaterEqual => a >= b,
        DepthFunction::Always => true,
    }
}
