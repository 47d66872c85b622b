//! Software Rendering Pipeline
//!
//! This module implements a conventional raster pipeline entirely on the
//! CPU:
//!
//! ```text
//! VertexArray -> VertexStage -> PrimitiveAssembly -> Clipping
//!   -> PerspectiveDivide -> Viewport -> FaceCull
//!   -> Raster (tiled, threaded) -> FragmentShader -> PerSampleOps
//!   -> Framebuffer -> (MSAA Resolve)
//! ```
//!
//! # Architecture Overview
//!
//! - **[`shader`]**: the binding contract user shader objects implement
//! - **[`sampler`]**: wrap/filter/mipmap texture sampling
//! - **[`clip`]**: homogeneous Sutherland-Hodgman clipping
//! - **[`raster`]**: pixel-quad rasterization, depth/blend, MSAA resolve
//! - **[`interp`]**: SIMD varying interpolation
//! - **[`settings`]**: renderer configuration
//!
//! # Draw lifecycle
//!
//! ```rust,ignore
//! renderer.begin_render_pass(&fbo, &clear);
//! renderer.set_viewport(0, 0, width, height);
//! renderer.set_vertex_array_object(&vao);
//! renderer.set_shader_program(&program);
//! renderer.set_shader_resources(&resources);
//! renderer.set_pipeline_states(&states);
//! renderer.draw();
//! renderer.end_render_pass();
//! renderer.wait_idle();
//! ```
//!
//! Draws are issued sequentially by the caller; the worker pool only
//! parallelizes tiles within a single draw, and tiles never share a
//! pixel sample.

pub mod blend;
pub mod clip;
pub(crate) mod context;
pub mod depth;
pub mod interp;
pub mod raster;
pub mod sampler;
pub mod settings;
pub mod shader;

use std::sync::Arc;

use glam::Vec4;
use parking_lot::Mutex;

use crate::core::geometry::frustum_clip_mask;
use crate::errors::{PrismError, Result};
use crate::resources::framebuffer::Framebuffer;
use crate::resources::image::Rgba;
use crate::resources::states::{
    ClearStates, PipelineStates, PolygonMode, PrimitiveType, RenderStates,
};
use crate::resources::texture::{Texture, TextureDesc, TextureFormat, TextureType};
use crate::resources::uniforms::{ShaderResources, UniformBlock, UniformSampler};
use crate::resources::vertex::{VertexArray, VertexArrayObject};
use crate::resources::image::Texel;
use crate::utils::memory::{aligned_size, AlignedF32Buffer};
use crate::utils::thread_pool::ThreadPool;

use context::{
    ColorTarget, DepthTarget, DrawList, PrimitiveHolder, RenderTargets, VaryingsSlot, VertexData,
    VertexHolder, Viewport,
};
use raster::RasterContext;
use shader::{FragmentStage, ShaderProgram, VertexStage};

pub use settings::RendererSettings;

/// Shared handle to a shader program bound for drawing.
///
/// The renderer takes one lock per draw to snapshot per-thread clones;
/// callers mutate the program (defines, uniform binds) between draws.
pub type ShaderProgramHandle = Arc<Mutex<ShaderProgram>>;

/// The software (CPU) renderer.
///
/// Factory for every pipeline resource and driver of the render-pass
/// lifecycle. All draw-time failures degrade to logged no-ops; a pass
/// always runs to completion.
pub struct SoftwareRenderer {
    settings: RendererSettings,
    thread_pool: ThreadPool,

    viewport: Viewport,
    fbo: Option<Arc<Framebuffer>>,
    vao: Option<Arc<VertexArrayObject>>,
    program: Option<ShaderProgramHandle>,
    render_states: RenderStates,
    targets: RenderTargets,

    point_size: f32,
}

impl SoftwareRenderer {
    pub fn new(settings: RendererSettings) -> Result<Self> {
        if settings.raster_block_size == 0 || !settings.raster_block_size.is_power_of_two() {
            return Err(PrismError::InvalidConfiguration(format!(
                "raster_block_size must be a positive power of two, got {}",
                settings.raster_block_size
            )));
        }
        let thread_pool = match settings.thread_count {
            Some(count) => ThreadPool::with_threads(count),
            None => ThreadPool::new(),
        };
        Ok(Self {
            settings,
            thread_pool,
            viewport: Viewport::default(),
            fbo: None,
            vao: None,
            program: None,
            render_states: RenderStates::default(),
            targets: RenderTargets::default(),
            point_size: 1.0,
        })
    }

    // ========================================================================
    // Resource factory
    // ========================================================================

    #[must_use]
    pub fn create_frame_buffer(&self, offscreen: bool) -> Arc<Framebuffer> {
        Arc::new(Framebuffer::new(offscreen))
    }

    pub fn create_texture(&self, desc: TextureDesc) -> Result<Arc<Texture>> {
        Ok(Arc::new(Texture::new(desc, self.settings.texture_layout)?))
    }

    pub fn create_vertex_array_object(
        &self,
        vertex_array: &VertexArray<'_>,
    ) -> Result<Arc<VertexArrayObject>> {
        Ok(Arc::new(VertexArrayObject::new(vertex_array)?))
    }

    pub fn create_shader_program(
        &self,
        vertex: Arc<dyn VertexStage>,
        fragment: Arc<dyn FragmentStage>,
    ) -> Result<ShaderProgramHandle> {
        Ok(Arc::new(Mutex::new(ShaderProgram::new(vertex, fragment)?)))
    }

    #[must_use]
    pub fn create_pipeline_states(&self, states: RenderStates) -> Arc<PipelineStates> {
        PipelineStates::get_or_create(states)
    }

    #[must_use]
    pub fn create_uniform_block(&self, name: &str, size: usize) -> Arc<UniformBlock> {
        Arc::new(UniformBlock::new(name, size))
    }

    #[must_use]
    pub fn create_uniform_sampler(
        &self,
        name: &str,
        texture_type: TextureType,
        format: TextureFormat,
    ) -> Arc<UniformSampler> {
        Arc::new(UniformSampler::new(name, texture_type, format))
    }

    // ========================================================================
    // Render pass lifecycle
    // ========================================================================

    /// Binds `fbo` and applies the clear state to its attachments.
    pub fn begin_render_pass(&mut self, fbo: &Arc<Framebuffer>, clear: &ClearStates) {
        if !fbo.is_valid() {
            log::error!("begin_render_pass: framebuffer attachments are inconsistent");
        }
        self.fbo = Some(Arc::clone(fbo));
        self.targets = resolve_targets(fbo);

        if clear.color_flag {
            let color = Rgba::from_vec4(clear.clear_color * 255.0);
            match &self.targets.color {
                Some(ColorTarget::Single(buf)) => buf.set_all(color),
                Some(ColorTarget::Ms4x { samples, .. }) => samples.set_all([color; 4]),
                None => {}
            }
        }
        if clear.depth_flag {
            match &self.targets.depth {
                Some(DepthTarget::Single(buf)) => buf.set_all(clear.clear_depth),
                Some(DepthTarget::Ms4x(buf)) => buf.set_all([clear.clear_depth; 4]),
                None => {}
            }
        }
    }

    pub fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.viewport = Viewport::new(x, y, width, height);
    }

    pub fn set_vertex_array_object(&mut self, vao: &Arc<VertexArrayObject>) {
        self.vao = Some(Arc::clone(vao));
    }

    pub fn set_shader_program(&mut self, program: &ShaderProgramHandle) {
        self.program = Some(Arc::clone(program));
    }

    /// Binds every uniform block, then every sampler, into the current
    /// program.
    pub fn set_shader_resources(&mut self, resources: &ShaderResources) {
        if let Some(program) = &self.program {
            program.lock().bind_resources(resources);
        }
    }

    pub fn set_pipeline_states(&mut self, states: &Arc<PipelineStates>) {
        self.render_states = states.render_states;
    }

    /// Runs the full pipeline for the currently bound resources.
    pub fn draw(&mut self) {
        let (Some(fbo), Some(vao), Some(program_handle)) =
            (self.fbo.clone(), self.vao.clone(), self.program.clone())
        else {
            return;
        };
        self.targets = resolve_targets(&fbo);

        let raster_samples = match (&self.targets.color, &self.targets.depth) {
            (Some(color), _) => color.sample_count(),
            (None, Some(depth)) => depth.sample_count(),
            (None, None) => 1,
        };

        let mut program = program_handle.lock().clone_for_thread();

        let mut list = self.process_vertex_shader(&vao, &mut program);
        self.process_primitive_assembly(&mut list, &vao);
        self.process_clipping(&mut list, &mut program);
        self.process_perspective_divide(&mut list);
        self.process_viewport_transform(&mut list);
        self.process_face_culling(&mut list);
        self.process_rasterization(list, program, raster_samples);

        if matches!(&self.targets.color, Some(target) if target.is_multisample()) {
            self.multi_sample_resolve();
        }
    }

    pub fn end_render_pass(&mut self) {}

    /// Flushes outstanding worker-pool tasks.
    pub fn wait_idle(&self) {
        self.thread_pool.wait_tasks_finish();
    }

    // ========================================================================
    // Vertex processing
    // ========================================================================

    fn process_vertex_shader(
        &mut self,
        vao: &VertexArrayObject,
        program: &mut ShaderProgram,
    ) -> DrawList {
        let varyings_count = program.varyings_count();
        let varyings_aligned_count =
            aligned_size(varyings_count * std::mem::size_of::<f32>()) / std::mem::size_of::<f32>();

        let vertex_bytes = vao.vertex_bytes();
        let stride = vao.vertex_stride();
        let vertex_count = vao.vertex_count();

        let mut pool = AlignedF32Buffer::zeroed(vertex_count * varyings_aligned_count);
        let mut vertices = Vec::with_capacity(vertex_count);

        for index in 0..vertex_count {
            let attributes = &vertex_bytes[index * stride..(index + 1) * stride];
            let varyings_start = index * varyings_aligned_count;
            let varyings = if varyings_count > 0 {
                &mut pool.as_mut_slice()[varyings_start..varyings_start + varyings_count]
            } else {
                &mut []
            };
            program.exec_vertex_shader(attributes, varyings);

            let clip_pos = program.builtins().position;
            self.point_size = program.builtins().point_size;
            vertices.push(VertexHolder {
                discard: false,
                index,
                clip_mask: frustum_clip_mask(clip_pos),
                clip_pos,
                frag_pos: Vec4::ZERO,
                data: VertexData::Shared(index * stride),
                varyings: if varyings_count > 0 {
                    VaryingsSlot::Pool(varyings_start)
                } else {
                    VaryingsSlot::None
                },
            });
        }

        DrawList {
            vertices,
            primitives: Vec::new(),
            varyings_pool: pool,
            varyings_count,
            varyings_aligned_count,
            vertex_bytes,
            vertex_stride: stride,
        }
    }

    fn process_primitive_assembly(&mut self, list: &mut DrawList, vao: &VertexArrayObject) {
        let per_primitive = self.render_states.primitive_type.index_count();
        let vertex_count = list.vertices.len();
        list.primitives = vao
            .indices()
            .chunks_exact(per_primitive)
            .map(|chunk| {
                let mut primitive = PrimitiveHolder::default();
                for (slot, &index) in primitive.indices.iter_mut().zip(chunk) {
                    *slot = index as usize;
                }
                // reject indices outside the vertex range up front
                primitive.discard = chunk
                    .iter()
                    .any(|&index| index < 0 || index as usize >= vertex_count);
                primitive
            })
            .collect();
    }

    fn process_perspective_divide(&mut self, list: &mut DrawList) {
        for vertex in &mut list.vertices {
            if vertex.discard {
                continue;
            }
            perspective_divide(vertex);
        }
    }

    fn process_viewport_transform(&mut self, list: &mut DrawList) {
        for vertex in &mut list.vertices {
            if vertex.discard {
                continue;
            }
            viewport_transform(vertex, &self.viewport);
        }
    }

    fn process_face_culling(&mut self, list: &mut DrawList) {
        if self.render_states.primitive_type != PrimitiveType::Triangle {
            return;
        }
        for triangle in &mut list.primitives {
            if triangle.discard {
                continue;
            }
            let v0 = list.vertices[triangle.indices[0]].frag_pos;
            let v1 = list.vertices[triangle.indices[1]].frag_pos;
            let v2 = list.vertices[triangle.indices[2]].frag_pos;

            let area =
                (v1.truncate() - v0.truncate()).cross(v2.truncate() - v0.truncate()).z;
            triangle.front_facing = area > 0.0;

            if self.render_states.cull_face {
                triangle.discard = !triangle.front_facing;
            }
        }
    }

    fn process_rasterization(
        &mut self,
        list: DrawList,
        program: ShaderProgram,
        raster_samples: u32,
    ) {
        let ctx = RasterContext {
            targets: self.targets.clone(),
            states: self.render_states,
            viewport: self.viewport,
            raster_samples,
            early_z: self.settings.early_z,
        };
        match self.render_states.primitive_type {
            PrimitiveType::Point => {
                raster::draw_points(&ctx, &list, program, self.point_size);
            }
            PrimitiveType::Line => {
                raster::draw_lines(&ctx, &list, program, self.render_states.line_width);
            }
            PrimitiveType::Triangle => match self.render_states.polygon_mode {
                PolygonMode::Point => {
                    raster::draw_polygons_point(&ctx, list, program, self.point_size);
                }
                PolygonMode::Line => {
                    raster::draw_polygons_line(
                        &ctx,
                        list,
                        program,
                        self.render_states.line_width,
                        &self.viewport,
                    );
                }
                PolygonMode::Fill => {
                    raster::draw_polygons_fill(
                        &ctx,
                        list,
                        &program,
                        &self.thread_pool,
                        self.settings.raster_block_size,
                    );
                    self.thread_pool.wait_tasks_finish();
                }
            },
        }
    }

    /// Averages the 4x sample buffer into the resolve buffer, one row per
    /// worker task.
    fn multi_sample_resolve(&mut self) {
        let Some(ColorTarget::Ms4x { samples, resolve }) = self.targets.color.clone() else {
            return;
        };
        for y in 0..samples.height() {
            let samples = Arc::clone(&samples);
            let resolve = Arc::clone(&resolve);
            self.thread_pool.push_task(move |_| {
                for x in 0..samples.width() {
                    let Some(texel) = samples.get(x, y) else {
                        continue;
                    };
                    let mut sum = Vec4::ZERO;
                    for sample in &texel {
                        sum += sample.to_vec4();
                    }
                    resolve.set(x, y, Rgba::from_vec4(sum / texel.len() as f32));
                }
            });
        }
        self.thread_pool.wait_tasks_finish();
    }
}

/// `frag_pos = clip_pos / w`, keeping `1/w` for perspective correction.
pub(crate) fn perspective_divide(vertex: &mut VertexHolder) {
    let inv_w = 1.0 / vertex.clip_pos.w;
    vertex.frag_pos = vertex.clip_pos * inv_w;
    vertex.frag_pos.w = inv_w;
}

/// Maps NDC into framebuffer coordinates.
pub(crate) fn viewport_transform(vertex: &mut VertexHolder, viewport: &Viewport) {
    vertex.frag_pos = vertex.frag_pos * viewport.inner_p + viewport.inner_o;
}

/// Resolves attachment storage for the duration of a pass.
fn resolve_targets(fbo: &Framebuffer) -> RenderTargets {
    let mut targets = RenderTargets::default();

    if let Some(attachment) = fbo.color_attachment() {
        if attachment.texture.format() != TextureFormat::Rgba8 {
            log::error!("color attachment must be RGBA8");
        } else {
            if !attachment.texture.is_allocated() {
                attachment.texture.init_image_data();
            }
            targets.color = attachment
                .texture
                .image_rgba8(attachment.layer)
                .and_then(|image| image.level(attachment.level).cloned())
                .map(|level| match level.ms4x() {
                    Some(samples) => ColorTarget::Ms4x {
                        samples: Arc::clone(samples),
                        resolve: Arc::clone(level.single()),
                    },
                    None => ColorTarget::Single(Arc::clone(level.single())),
                });
        }
    }

    if let Some(attachment) = fbo.depth_attachment() {
        if attachment.texture.format() != TextureFormat::Float32 {
            log::error!("depth attachment must be FLOAT32");
        } else {
            if !attachment.texture.is_allocated() {
                attachment.texture.init_image_data();
            }
            targets.depth = attachment
                .texture
                .image_f32(attachment.layer)
                .and_then(|image| image.level(attachment.level).cloned())
                .map(|level| match level.ms4x() {
                    Some(samples) => DepthTarget::Ms4x(Arc::clone(samples)),
                    None => DepthTarget::Single(Arc::clone(level.single())),
                });
        }
    }

    targets
}
