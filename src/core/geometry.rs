use glam::{Mat4, Vec3, Vec4};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The eight corner points, near face first.
    #[must_use]
    pub fn corners(&self) -> [Vec3; 8] {
        let (mn, mx) = (self.min, self.max);
        [
            Vec3::new(mn.x, mx.y, mn.z),
            Vec3::new(mx.x, mx.y, mn.z),
            Vec3::new(mn.x, mn.y, mn.z),
            Vec3::new(mx.x, mn.y, mn.z),
            Vec3::new(mn.x, mx.y, mx.z),
            Vec3::new(mx.x, mx.y, mx.z),
            Vec3::new(mn.x, mn.y, mx.z),
            Vec3::new(mx.x, mn.y, mx.z),
        ]
    }

    /// Transforms every corner and re-wraps the result.
    #[must_use]
    pub fn transform(&self, matrix: &Mat4) -> Self {
        let mut corners = self.corners();
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for corner in &mut corners {
            let p = matrix.transform_point3(*corner);
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        (self.min.cmple(other.max) & self.max.cmpge(other.min)).all()
    }

    pub fn merge(&mut self, other: &Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// How a volume sits relative to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Crosses the plane.
    Cross,
    /// Touches the plane.
    Tangent,
    /// Entirely on the normal side.
    Front,
    /// Entirely on the opposite side.
    Back,
}

/// Plane `dot(normal, p) + d = 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plane {
    normal: Vec3,
    d: f32,
}

impl Plane {
    /// Builds the plane through `point` with normal `n`.
    #[must_use]
    pub fn from_point_normal(n: Vec3, point: Vec3) -> Self {
        let normal = n.normalize();
        Self {
            normal,
            d: -normal.dot(point),
        }
    }

    #[inline]
    #[must_use]
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Signed distance from `point` to the plane.
    #[inline]
    #[must_use]
    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    #[must_use]
    pub fn side_of_point(&self, p: Vec3) -> PlaneSide {
        let d = self.distance(p);
        if d == 0.0 {
            PlaneSide::Tangent
        } else if d > 0.0 {
            PlaneSide::Front
        } else {
            PlaneSide::Back
        }
    }

    #[must_use]
    pub fn side_of_segment(&self, p0: Vec3, p1: Vec3) -> PlaneSide {
        let d0 = self.distance(p0);
        let d1 = self.distance(p1);
        classify(&[d0, d1])
    }

    #[must_use]
    pub fn side_of_triangle(&self, p0: Vec3, p1: Vec3, p2: Vec3) -> PlaneSide {
        let d = [self.distance(p0), self.distance(p1), self.distance(p2)];
        classify(&d)
    }

    #[must_use]
    pub fn side_of_box(&self, bounds: &BoundingBox) -> PlaneSide {
        let d: Vec<f32> = bounds
            .corners()
            .iter()
            .map(|&c| self.distance(c))
            .collect();
        classify(&d)
    }
}

fn classify(distances: &[f32]) -> PlaneSide {
    let front = distances.iter().filter(|&&d| d > 0.0).count();
    let back = distances.iter().filter(|&&d| d < 0.0).count();
    if front > 0 && back > 0 {
        PlaneSide::Cross
    } else if front > 0 {
        PlaneSide::Front
    } else if back > 0 {
        PlaneSide::Back
    } else {
        PlaneSide::Tangent
    }
}

/// View frustum: six outward-facing planes plus cached corners and bounds.
///
/// Plane order: near, far, top, bottom, left, right.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    pub planes: [Plane; 6],
    pub corners: [Vec3; 8],
    pub bounds: BoundingBox,
}

impl Frustum {
    #[must_use]
    pub fn intersects_box(&self, bounds: &BoundingBox) -> bool {
        if !self.bounds.intersects(bounds) {
            return false;
        }
        self.planes
            .iter()
            .all(|plane| plane.side_of_box(bounds) != PlaneSide::Back)
    }

    #[must_use]
    pub fn intersects_point(&self, p: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.side_of_point(p) != PlaneSide::Back)
    }

    #[must_use]
    pub fn intersects_segment(&self, p0: Vec3, p1: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.side_of_segment(p0, p1) != PlaneSide::Back)
    }

    #[must_use]
    pub fn intersects_triangle(&self, p0: Vec3, p1: Vec3, p2: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.side_of_triangle(p0, p1, p2) != PlaneSide::Back)
    }
}

// ============================================================================
// Homogeneous clip space
// ============================================================================

/// One bit per frustum half-space a clip-space point violates.
pub mod clip_mask {
    pub const POSITIVE_X: u8 = 1 << 0;
    pub const NEGATIVE_X: u8 = 1 << 1;
    pub const POSITIVE_Y: u8 = 1 << 2;
    pub const NEGATIVE_Y: u8 = 1 << 3;
    pub const POSITIVE_Z: u8 = 1 << 4;
    pub const NEGATIVE_Z: u8 = 1 << 5;
}

/// Per-plane bit, index-aligned with [`CLIP_PLANES`].
pub const CLIP_MASKS: [u8; 6] = [
    clip_mask::POSITIVE_X,
    clip_mask::NEGATIVE_X,
    clip_mask::POSITIVE_Y,
    clip_mask::NEGATIVE_Y,
    clip_mask::POSITIVE_Z,
    clip_mask::NEGATIVE_Z,
];

/// The six clip-space plane equations; `dot(plane, p) >= 0` is inside.
pub const CLIP_PLANES: [Vec4; 6] = [
    Vec4::new(-1.0, 0.0, 0.0, 1.0),
    Vec4::new(1.0, 0.0, 0.0, 1.0),
    Vec4::new(0.0, -1.0, 0.0, 1.0),
    Vec4::new(0.0, 1.0, 0.0, 1.0),
    Vec4::new(0.0, 0.0, -1.0, 1.0),
    Vec4::new(0.0, 0.0, 1.0, 1.0),
];

/// Outcode of a clip-space position against all six planes.
#[must_use]
pub fn frustum_clip_mask(clip_pos: Vec4) -> u8 {
    let mut mask = 0;
    if clip_pos.w < clip_pos.x {
        mask |= clip_mask::POSITIVE_X;
    }
    if clip_pos.w < -clip_pos.x {
        mask |= clip_mask::NEGATIVE_X;
    }
    if clip_pos.w < clip_pos.y {
        mask |= clip_mask::POSITIVE_Y;
    }
    if clip_pos.w < -clip_pos.y {
        mask |= clip_mask::NEGATIVE_Y;
    }
    if clip_pos.w < clip_pos.z {
        mask |= clip_mask::POSITIVE_Z;
    }
    if clip_pos.w < -clip_pos.z {
        mask |= clip_mask::NEGATIVE_Z;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_mask_inside_is_zero() {
        assert_eq!(frustum_clip_mask(Vec4::new(0.0, 0.0, 0.0, 1.0)), 0);
        assert_eq!(frustum_clip_mask(Vec4::new(0.5, -0.5, 0.9, 1.0)), 0);
    }

    #[test]
    fn clip_mask_flags_each_plane() {
        assert_eq!(
            frustum_clip_mask(Vec4::new(2.0, 0.0, 0.0, 1.0)),
            clip_mask::POSITIVE_X
        );
        assert_eq!(
            frustum_clip_mask(Vec4::new(0.0, 0.0, -2.0, 1.0)),
            clip_mask::NEGATIVE_Z
        );
        // Behind the eye: w negative violates every plane.
        assert_eq!(frustum_clip_mask(Vec4::new(0.0, 0.0, 0.0, -1.0)), 0b11_1111);
    }

    #[test]
    fn plane_distance_and_sides() {
        let plane = Plane::from_point_normal(Vec3::Z, Vec3::ZERO);
        assert_eq!(plane.distance(Vec3::new(0.0, 0.0, 2.0)), 2.0);
        assert_eq!(plane.side_of_point(Vec3::new(0.0, 0.0, -1.0)), PlaneSide::Back);
        assert_eq!(
            plane.side_of_segment(Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0)),
            PlaneSide::Cross
        );
    }

    #[test]
    fn box_merge_and_intersect() {
        let mut a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let b = BoundingBox::new(Vec3::splat(2.0), Vec3::splat(3.0));
        assert!(!a.intersects(&b));
        a.merge(&b);
        assert!(a.intersects(&b));
        assert_eq!(a.max, Vec3::splat(3.0));
    }
}
