//! Core Resource Definitions
//!
//! CPU-side data structures consumed by the software pipeline.
//!
//! # Module Structure
//!
//! - [`buffer`] - Typed 2D pixel buffers with pluggable index layouts
//! - [`image`] - Image levels (single / 4x multisample) and mip pyramids
//! - [`texture`] - Textures, sampler descriptors, usage masks
//! - [`vertex`] - Vertex arrays (interleaved attributes + indices)
//! - [`framebuffer`] - Color/depth attachments
//! - [`states`] - Render/clear states and the pipeline-states cache
//! - [`uniforms`] - Uniform blocks and uniform samplers
//!
//! # Design Principles
//!
//! - **Shared ownership**: textures, buffers and uniforms are `Arc`
//!   handles shared between materials, framebuffers and samplers
//! - **Immutable during a draw**: mutation happens between draws through
//!   interior locks; the renderer snapshots what it needs up front

pub mod buffer;
pub mod framebuffer;
pub mod image;
pub mod states;
pub mod texture;
pub mod uniforms;
pub mod vertex;

pub use buffer::{BufferLayout, PixelBuffer};
pub use framebuffer::{Attachment, Framebuffer};
pub use image::{mip_level_count, ImageBuffer, Rgba, Texel, TextureImage};
pub use states::{
    BlendFactor, BlendFunction, BlendParams, ClearStates, DepthFunction, PipelineStates,
    PolygonMode, PrimitiveType, RenderStates,
};
pub use texture::{
    BorderColor, CubeFace, FilterMode, SamplerDesc, Texture, TextureDesc, TextureFormat,
    TextureType, TextureUsage, WrapMode,
};
pub use uniforms::{ShaderResources, UniformBlock, UniformSampler};
pub use vertex::{VertexArray, VertexArrayObject, VertexAttributeDesc};
