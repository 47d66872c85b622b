//! Per-draw working state: vertex/primitive holders, the varyings pool
//! and the resolved render targets.

use std::sync::Arc;

use glam::{Vec2, Vec4};

use crate::resources::buffer::PixelBuffer;
use crate::resources::image::Rgba;
use crate::utils::memory::AlignedF32Buffer;

/// Precomputed viewport transform.
///
/// `inner_p`/`inner_o` turn an NDC position into framebuffer space in one
/// multiply-add; the absolute depth range clamps rasterized samples.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
    pub inner_o: Vec4,
    pub inner_p: Vec4,
    pub abs_min_depth: f32,
    pub abs_max_depth: f32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        let (x, y) = (x as f32, y as f32);
        let (width, height) = (width as f32, height as f32);
        let min_depth = 0.0;
        let max_depth = 1.0;
        Self {
            x,
            y,
            width,
            height,
            min_depth,
            max_depth,
            inner_o: Vec4::new(x + width / 2.0, y + height / 2.0, min_depth, 0.0),
            inner_p: Vec4::new(width / 2.0, height / 2.0, max_depth - min_depth, 1.0),
            abs_min_depth: min_depth.min(max_depth),
            abs_max_depth: min_depth.max(max_depth),
        }
    }
}

/// Where a vertex's attribute bytes live.
#[derive(Debug, Clone)]
pub(crate) enum VertexData {
    /// Byte offset into the vertex array's interleaved buffer.
    Shared(usize),
    /// Clipping-created vertex with interpolated attributes.
    Owned(Vec<u8>),
}

/// Where a vertex's varyings block lives.
#[derive(Debug)]
pub(crate) enum VaryingsSlot {
    /// Float offset into the draw's aligned pool.
    Pool(usize),
    /// Clipping-created vertex with its own aligned block.
    Owned(AlignedF32Buffer),
    /// Shader declares no varyings.
    None,
}

#[derive(Debug)]
pub(crate) struct VertexHolder {
    pub discard: bool,
    pub index: usize,
    pub clip_mask: u8,
    /// Clip-space position out of the vertex shader.
    pub clip_pos: Vec4,
    /// Framebuffer-space position; `w` holds `1/clip_w` after the divide.
    pub frag_pos: Vec4,
    pub data: VertexData,
    pub varyings: VaryingsSlot,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PrimitiveHolder {
    pub discard: bool,
    pub front_facing: bool,
    pub indices: [usize; 3],
}

impl Default for PrimitiveHolder {
    fn default() -> Self {
        Self {
            discard: false,
            front_facing: true,
            indices: [0; 3],
        }
    }
}

/// Everything the post-vertex-stage pipeline reads and appends to.
#[derive(Debug)]
pub(crate) struct DrawList {
    pub vertices: Vec<VertexHolder>,
    pub primitives: Vec<PrimitiveHolder>,
    pub varyings_pool: AlignedF32Buffer,
    /// Floats per vertex, as declared by the shader.
    pub varyings_count: usize,
    /// Pool slot stride in floats (32-byte aligned).
    pub varyings_aligned_count: usize,
    pub vertex_bytes: Arc<Vec<u8>>,
    pub vertex_stride: usize,
}

impl DrawList {
    pub fn varyings_of(&self, index: usize) -> &[f32] {
        match &self.vertices[index].varyings {
            VaryingsSlot::Pool(start) => {
                &self.varyings_pool.as_slice()[*start..*start + self.varyings_aligned_count]
            }
            VaryingsSlot::Owned(buffer) => buffer.as_slice(),
            VaryingsSlot::None => &[],
        }
    }

    pub fn attributes_of(&self, index: usize) -> &[u8] {
        match &self.vertices[index].data {
            VertexData::Shared(offset) => &self.vertex_bytes[*offset..*offset + self.vertex_stride],
            VertexData::Owned(bytes) => bytes,
        }
    }
}

// ============================================================================
// Render targets
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) enum ColorTarget {
    Single(Arc<PixelBuffer<Rgba>>),
    Ms4x {
        samples: Arc<PixelBuffer<[Rgba; 4]>>,
        resolve: Arc<PixelBuffer<Rgba>>,
    },
}

#[derive(Debug, Clone)]
pub(crate) enum DepthTarget {
    Single(Arc<PixelBuffer<f32>>),
    Ms4x(Arc<PixelBuffer<[f32; 4]>>),
}

/// Attachment storage resolved for the duration of a render pass.
#[derive(Debug, Clone, Default)]
pub(crate) struct RenderTargets {
    pub color: Option<ColorTarget>,
    pub depth: Option<DepthTarget>,
}

impl ColorTarget {
    pub fn width(&self) -> u32 {
        match self {
            Self::Single(buf) => buf.width(),
            Self::Ms4x { samples, .. } => samples.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Single(buf) => buf.height(),
            Self::Ms4x { samples, .. } => samples.height(),
        }
    }

    pub fn sample_count(&self) -> u32 {
        match self {
            Self::Single(_) => 1,
            Self::Ms4x { .. } => 4,
        }
    }

    pub fn is_multisample(&self) -> bool {
        matches!(self, Self::Ms4x { .. })
    }
}

impl DepthTarget {
    pub fn sample_count(&self) -> u32 {
        match self {
            Self::Single(_) => 1,
            Self::Ms4x(_) => 4,
        }
    }
}

impl RenderTargets {
    pub fn frame_color(&self, x: u32, y: u32, sample: u32) -> Option<Rgba> {
        match self.color.as_ref()? {
            ColorTarget::Single(buf) => buf.get(x, y),
            // sample index wraps into the attachment's own count
            ColorTarget::Ms4x { samples, .. } => {
                let texel = samples.get(x, y)?;
                Some(texel[(sample as usize) & 3])
            }
        }
    }

    pub fn set_frame_color(&self, x: u32, y: u32, sample: u32, color: Rgba) {
        match &self.color {
            Some(ColorTarget::Single(buf)) => buf.set(x, y, color),
            Some(ColorTarget::Ms4x { samples, .. }) => {
                if let Some(mut texel) = samples.get(x, y) {
                    texel[(sample as usize) & 3] = color;
                    samples.set(x, y, texel);
                }
            }
            None => {}
        }
    }

    pub fn frame_depth(&self, x: u32, y: u32, sample: u32) -> Option<f32> {
        match self.depth.as_ref()? {
            DepthTarget::Single(buf) => buf.get(x, y),
            DepthTarget::Ms4x(buf) => {
                let texel = buf.get(x, y)?;
                Some(texel[(sample as usize) & 3])
            }
        }
    }

    pub fn set_frame_depth(&self, x: u32, y: u32, sample: u32, depth: f32) {
        match &self.depth {
            Some(DepthTarget::Single(buf)) => buf.set(x, y, depth),
            Some(DepthTarget::Ms4x(buf)) => {
                if let Some(mut texel) = buf.get(x, y) {
                    texel[(sample as usize) & 3] = depth;
                    buf.set(x, y, texel);
                }
            }
            None => {}
        }
    }
}

/// Rotated-grid sample offsets for 4x MSAA, inside a unit pixel.
pub(crate) const SAMPLE_LOCATIONS_4X: [Vec2; 4] = [
    Vec2::new(0.375, 0.875),
    Vec2::new(0.875, 0.625),
    Vec2::new(0.125, 0.375),
    Vec2::new(0.625, 0.125),
];
