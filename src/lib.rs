#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod core;
pub mod errors;
pub mod renderer;
pub mod resources;
pub mod utils;

pub use errors::PrismError;
pub use renderer::sampler::SamplerUnit;
pub use renderer::shader::{
    FragmentShaderIo, FragmentStage, ShaderBuiltins, ShaderProgram, ShaderStage, UniformDesc,
    UniformKind, VertexShaderIo, VertexStage,
};
pub use renderer::{RendererSettings, ShaderProgramHandle, SoftwareRenderer};
pub use resources::{
    BlendFactor, BlendFunction, BlendParams, BorderColor, BufferLayout, ClearStates, CubeFace,
    DepthFunction, FilterMode, Framebuffer, PipelineStates, PixelBuffer, PolygonMode,
    PrimitiveType, RenderStates, Rgba, SamplerDesc, ShaderResources, Texture, TextureDesc,
    TextureFormat, TextureType, TextureUsage, UniformBlock, UniformSampler, VertexArray,
    VertexArrayObject, VertexAttributeDesc, WrapMode,
};
pub use crate::core::geometry::{BoundingBox, Frustum, Plane};
