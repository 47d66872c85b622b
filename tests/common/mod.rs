//! Shared fixtures: a solid-color shader pair and framebuffer helpers.

#![allow(dead_code)]

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

use prism::{
    Framebuffer, FragmentShaderIo, FragmentStage, Rgba, ShaderStage, SoftwareRenderer, Texture,
    TextureDesc, TextureFormat, TextureType, TextureUsage, UniformDesc, VertexArray,
    VertexArrayObject, VertexAttributeDesc, VertexShaderIo, VertexStage,
};

/// Uniform block consumed by the solid-color shader.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ColorUniforms {
    pub color: [f32; 4],
}

const COLOR_DESCS: &[UniformDesc] = &[UniformDesc::block("ColorUniforms", 0)];

/// Passes a `[x, y, z, w]` clip-space attribute straight through.
pub struct ColorVs;

/// Emits the uniform color.
pub struct ColorFs;

impl ShaderStage for ColorVs {
    fn uniforms_size(&self) -> usize {
        std::mem::size_of::<ColorUniforms>()
    }
    fn uniform_descs(&self) -> &[UniformDesc] {
        COLOR_DESCS
    }
}

impl VertexStage for ColorVs {
    fn shader_main(&self, io: &mut VertexShaderIo<'_>) {
        let position: [f32; 4] = io.attributes_as();
        io.builtins.position = Vec4::from_array(position);
    }
}

impl ShaderStage for ColorFs {
    fn uniforms_size(&self) -> usize {
        std::mem::size_of::<ColorUniforms>()
    }
    fn uniform_descs(&self) -> &[UniformDesc] {
        COLOR_DESCS
    }
}

impl FragmentStage for ColorFs {
    fn shader_main(&self, io: &mut FragmentShaderIo<'_>) {
        let uniforms: ColorUniforms = io.uniform_block(0);
        io.builtins.frag_color = Vec4::from_array(uniforms.color);
    }
}

/// Color + depth attachments bound to a fresh offscreen framebuffer.
pub fn make_target(
    renderer: &SoftwareRenderer,
    width: u32,
    height: u32,
    multi_sample: bool,
) -> (Arc<Texture>, Arc<Texture>, Arc<Framebuffer>) {
    let color = renderer
        .create_texture(TextureDesc {
            width,
            height,
            texture_type: TextureType::D2,
            format: TextureFormat::Rgba8,
            usage: TextureUsage::ATTACHMENT_COLOR | TextureUsage::RENDERER_OUTPUT,
            use_mipmaps: false,
            multi_sample,
            tag: "color".into(),
        })
        .unwrap();
    let depth = renderer
        .create_texture(TextureDesc {
            width,
            height,
            texture_type: TextureType::D2,
            format: TextureFormat::Float32,
            usage: TextureUsage::ATTACHMENT_DEPTH,
            use_mipmaps: false,
            multi_sample,
            tag: "depth".into(),
        })
        .unwrap();
    let fbo = renderer.create_frame_buffer(true);
    fbo.set_color_attachment(Arc::clone(&color), 0, 0);
    fbo.set_depth_attachment(Arc::clone(&depth));
    (color, depth, fbo)
}

/// Reads back one pixel of the (resolved) color attachment.
pub fn pixel(texture: &Texture, x: u32, y: u32) -> Rgba {
    texture
        .image_rgba8(0)
        .unwrap()
        .level(0)
        .unwrap()
        .single()
        .get(x, y)
        .unwrap()
}

/// Builds an interleaved float vertex array; `attr_sizes` are per
/// attribute, in floats.
pub fn make_vao(
    renderer: &SoftwareRenderer,
    vertices: &[f32],
    floats_per_vertex: usize,
    attr_sizes: &[usize],
    indices: &[i32],
) -> Arc<VertexArrayObject> {
    let stride = floats_per_vertex * std::mem::size_of::<f32>();
    let mut attributes = Vec::new();
    let mut offset = 0;
    for &size in attr_sizes {
        attributes.push(VertexAttributeDesc {
            size: size * std::mem::size_of::<f32>(),
            stride,
            offset,
        });
        offset += size * std::mem::size_of::<f32>();
    }
    renderer
        .create_vertex_array_object(&VertexArray {
            attributes: &attributes,
            vertex_buffer: bytemuck::cast_slice(vertices),
            index_buffer: indices,
        })
        .unwrap()
}

/// Screen coordinate to NDC for a `width x height` viewport.
pub fn ndc(x: f32, y: f32, width: f32, height: f32) -> (f32, f32) {
    (2.0 * x / width - 1.0, 2.0 * y / height - 1.0)
}

/// `[x, y, z, 1]` clip-space vertex hitting the given screen point.
pub fn screen_vertex(x: f32, y: f32, z: f32, width: f32, height: f32) -> [f32; 4] {
    let (nx, ny) = ndc(x, y, width, height);
    [nx, ny, z, 1.0]
}
