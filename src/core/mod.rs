//! Math and geometry primitives shared across the pipeline.

pub mod geometry;

pub use geometry::{frustum_clip_mask, BoundingBox, Frustum, Plane, PlaneSide};
