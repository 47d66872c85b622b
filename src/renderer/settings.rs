//! Renderer Configuration
//!
//! Options recognized by the software renderer. Defaults match the
//! common case: 32-pixel tiles, early depth test on, linear texture
//! storage, one worker per hardware thread.
//!
//! # Example
//!
//! ```rust,ignore
//! use prism::renderer::{RendererSettings, SoftwareRenderer};
//! use prism::resources::BufferLayout;
//!
//! let renderer = SoftwareRenderer::new(RendererSettings {
//!     raster_block_size: 64,
//!     texture_layout: BufferLayout::Tiled,
//!     ..Default::default()
//! })?;
//! ```

use crate::resources::buffer::BufferLayout;

/// Configuration options for [`super::SoftwareRenderer`].
///
/// | Field | Description | Default |
/// |-------|-------------|---------|
/// | `raster_block_size` | Tile side in pixels (power of two) | `32` |
/// | `early_z` | Depth probe before fragment shading | `true` |
/// | `texture_layout` | Storage order for texture allocations | `Linear` |
/// | `thread_count` | Worker threads (`None` = hardware threads) | `None` |
#[derive(Debug, Clone)]
pub struct RendererSettings {
    /// Side length of a rasterization tile, in pixels.
    ///
    /// Must be a positive power of two. Each tile is one unit of
    /// parallel work; smaller tiles balance better, larger tiles have
    /// less scheduling overhead.
    pub raster_block_size: u32,

    /// Probe the depth buffer before running the fragment shader.
    ///
    /// Skips shading for occluded pixels. Disable when comparing output
    /// against a reference that shades unconditionally.
    pub early_z: bool,

    /// Index layout used for texture storage created by this renderer.
    ///
    /// Tiled / Morton layouts trade linear readback for sampling
    /// locality; `get`/`set` behave identically across layouts.
    pub texture_layout: BufferLayout,

    /// Worker pool size; `None` sizes to the host's available
    /// parallelism.
    pub thread_count: Option<usize>,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            raster_block_size: 32,
            early_z: true,
            texture_layout: BufferLayout::Linear,
            thread_count: None,
        }
    }
}
