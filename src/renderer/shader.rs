//! Shader binding contract.
//!
//! Shaders are user-supplied Rust objects: a vertex stage and a fragment
//! stage that declare identical `Attributes` / `Uniforms` / `Varyings` /
//! defines layouts and implement `shader_main` over a typed io context.
//!
//! A [`ShaderProgram`] owns the shared state both stages see: the uniform
//! byte buffer, the defines buffer (one byte per declared define), the
//! sampler slots and the built-in variables. Uniform names resolve to a
//! location by linear search over the stage-declared descriptor list;
//! missing names resolve to -1 and binds against -1 are silent no-ops.
//!
//! Fragment shading is parallel: [`ShaderProgram::clone_for_thread`]
//! produces an instance that shares the immutable stage code but owns
//! private uniform bytes and built-ins, one per raster worker.

use std::sync::Arc;

use bytemuck::Pod;
use glam::{IVec2, UVec2, Vec2, Vec3, Vec4};
use uuid::Uuid;

use crate::errors::{PrismError, Result};
use crate::renderer::sampler::{lod_from_derivatives, SamplerUnit};
use crate::resources::texture::Texture;
use crate::resources::uniforms::ShaderResources;

/// Uniform slot kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    /// A byte range inside the uniform buffer.
    Block,
    /// A texture sampler slot. `derivative_offset` is the float offset of
    /// the UV this sampler is fed with inside the varyings block, used to
    /// compute the mip LOD from the pixel quad; `None` disables automatic
    /// LOD.
    Sampler { derivative_offset: Option<usize> },
}

/// One entry of a stage's uniform layout; its index is the binding
/// location returned by [`ShaderProgram::uniform_location`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformDesc {
    pub name: &'static str,
    /// Byte offset inside the uniform buffer (blocks only).
    pub offset: usize,
    pub kind: UniformKind,
}

impl UniformDesc {
    #[must_use]
    pub const fn block(name: &'static str, offset: usize) -> Self {
        Self {
            name,
            offset,
            kind: UniformKind::Block,
        }
    }

    #[must_use]
    pub const fn sampler(name: &'static str) -> Self {
        Self {
            name,
            offset: 0,
            kind: UniformKind::Sampler {
                derivative_offset: None,
            },
        }
    }

    #[must_use]
    pub const fn sampler_with_derivative(name: &'static str, varying_offset: usize) -> Self {
        Self {
            name,
            offset: 0,
            kind: UniformKind::Sampler {
                derivative_offset: Some(varying_offset),
            },
        }
    }
}

/// Built-in variables shared by both stages of an invocation.
#[derive(Debug, Clone)]
pub struct ShaderBuiltins {
    /// Vertex output: clip-space position.
    pub position: Vec4,
    /// Vertex output: point sprite size in pixels.
    pub point_size: f32,
    /// Fragment input: `(x, y, z, 1/w)` of the shading sample.
    pub frag_coord: Vec4,
    /// Fragment input: primitive orientation.
    pub front_facing: bool,
    /// Fragment output color.
    pub frag_color: Vec4,
    /// Fragment output: skip per-sample operations for this pixel.
    pub discard: bool,
}

impl Default for ShaderBuiltins {
    fn default() -> Self {
        Self {
            position: Vec4::ZERO,
            point_size: 1.0,
            frag_coord: Vec4::ZERO,
            front_facing: true,
            frag_color: Vec4::ZERO,
            discard: false,
        }
    }
}

/// Layout declarations common to both stages.
pub trait ShaderStage: Send + Sync {
    /// Byte size of the `Uniforms` struct.
    fn uniforms_size(&self) -> usize {
        0
    }

    /// Uniform layout; entry index == binding location.
    fn uniform_descs(&self) -> &[UniformDesc] {
        &[]
    }

    /// Number of floats in the `Varyings` struct.
    fn varyings_count(&self) -> usize {
        0
    }

    /// Names of the preprocessor-style defines this shader understands.
    fn defines(&self) -> &[&'static str] {
        &[]
    }
}

/// The vertex stage: attributes + uniforms in, varyings + position out.
pub trait VertexStage: ShaderStage {
    fn shader_main(&self, io: &mut VertexShaderIo<'_>);
}

/// The fragment stage: varyings + uniforms in, color out.
pub trait FragmentStage: ShaderStage {
    fn shader_main(&self, io: &mut FragmentShaderIo<'_>);
}

/// A sampler slot resolved for the current draw.
#[derive(Debug, Clone)]
pub struct SamplerBinding {
    pub unit: Arc<SamplerUnit>,
    pub derivative_offset: Option<usize>,
}

/// Execution context of one vertex invocation.
pub struct VertexShaderIo<'a> {
    pub attributes: &'a [u8],
    pub uniforms: &'a [u8],
    pub defines: &'a [u8],
    pub descs: &'a [UniformDesc],
    pub varyings: &'a mut [f32],
    pub builtins: &'a mut ShaderBuiltins,
}

impl VertexShaderIo<'_> {
    /// The attributes struct, as declared by the vertex array layout.
    #[must_use]
    pub fn attributes_as<T: Pod>(&self) -> T {
        read_pod(self.attributes, 0)
    }

    /// The uniform block bound at `location`; zeroed if unbound.
    #[must_use]
    pub fn uniform_block<T: Pod>(&self, location: i32) -> T {
        uniform_block(self.uniforms, self.descs, location)
    }

    /// Typed mutable view of this vertex's varyings slot.
    pub fn varyings_as<T: Pod>(&mut self) -> &mut T {
        let size = std::mem::size_of::<T>();
        bytemuck::from_bytes_mut(&mut bytemuck::cast_slice_mut(self.varyings)[..size])
    }

    /// Whether the define at `index` (into [`ShaderStage::defines`]) is on.
    #[must_use]
    pub fn define_enabled(&self, index: usize) -> bool {
        self.defines.get(index).copied().unwrap_or(0) != 0
    }
}

/// Execution context of one fragment invocation.
///
/// `quad` carries the four varyings blocks of the surrounding pixel quad
/// (p0..p3) so texture sampling can derive screen-space derivatives.
pub struct FragmentShaderIo<'a> {
    pub uniforms: &'a [u8],
    pub defines: &'a [u8],
    pub descs: &'a [UniformDesc],
    pub samplers: &'a [Option<SamplerBinding>],
    pub varyings: &'a [f32],
    pub quad: Option<[&'a [f32]; 4]>,
    pub builtins: &'a mut ShaderBuiltins,
}

impl FragmentShaderIo<'_> {
    #[must_use]
    pub fn uniform_block<T: Pod>(&self, location: i32) -> T {
        uniform_block(self.uniforms, self.descs, location)
    }

    /// Typed view of the interpolated varyings.
    #[must_use]
    pub fn varyings_as<T: Pod>(&self) -> T {
        read_pod(bytemuck::cast_slice(self.varyings), 0)
    }

    #[must_use]
    pub fn define_enabled(&self, index: usize) -> bool {
        self.defines.get(index).copied().unwrap_or(0) != 0
    }

    fn sampler(&self, location: i32) -> Option<&SamplerBinding> {
        if location < 0 {
            return None;
        }
        self.samplers.get(location as usize)?.as_ref()
    }

    /// Samples a 2D texture; the LOD comes from the quad derivatives of
    /// the UV registered for this sampler (0 when unavailable).
    #[must_use]
    pub fn texture_2d(&self, location: i32, uv: Vec2) -> Vec4 {
        let Some(binding) = self.sampler(location) else {
            return Vec4::ZERO;
        };
        let lod = self.auto_lod(binding);
        binding.unit.sample_2d(uv, lod, IVec2::ZERO)
    }

    /// Samples a 2D texture at an explicit LOD.
    #[must_use]
    pub fn texture_2d_lod(&self, location: i32, uv: Vec2, lod: f32) -> Vec4 {
        self.sampler(location)
            .map_or(Vec4::ZERO, |b| b.unit.sample_2d(uv, lod, IVec2::ZERO))
    }

    /// Samples a 2D texture at an explicit LOD with a texel offset.
    #[must_use]
    pub fn texture_2d_lod_offset(&self, location: i32, uv: Vec2, lod: f32, offset: IVec2) -> Vec4 {
        self.sampler(location)
            .map_or(Vec4::ZERO, |b| b.unit.sample_2d(uv, lod, offset))
    }

    /// Samples a cubemap; cubemaps have no derivative-driven LOD.
    #[must_use]
    pub fn texture_cube(&self, location: i32, dir: Vec3) -> Vec4 {
        self.texture_cube_lod(location, dir, 0.0)
    }

    #[must_use]
    pub fn texture_cube_lod(&self, location: i32, dir: Vec3, lod: f32) -> Vec4 {
        self.sampler(location)
            .map_or(Vec4::ZERO, |b| b.unit.sample_cube(dir, lod))
    }

    /// Dimensions of one level of the bound texture.
    #[must_use]
    pub fn texture_size(&self, location: i32, level: u32) -> UVec2 {
        self.sampler(location)
            .map_or(UVec2::ZERO, |b| b.unit.texture_size(level))
    }

    fn auto_lod(&self, binding: &SamplerBinding) -> f32 {
        if !binding.unit.needs_lod() {
            return 0.0;
        }
        let (Some(offset), Some(quad)) = (binding.derivative_offset, self.quad) else {
            return 0.0;
        };
        if quad.iter().any(|p| p.len() < offset + 2) {
            return 0.0;
        }
        let uv = |p: &[f32]| Vec2::new(p[offset], p[offset + 1]);
        let tex_size = binding.unit.size();
        let dx = (uv(quad[1]) - uv(quad[0])) * tex_size;
        let dy = (uv(quad[2]) - uv(quad[0])) * tex_size;
        lod_from_derivatives(dx, dy)
    }
}

fn read_pod<T: Pod>(bytes: &[u8], offset: usize) -> T {
    let size = std::mem::size_of::<T>();
    if offset + size > bytes.len() {
        return T::zeroed();
    }
    bytemuck::pod_read_unaligned(&bytes[offset..offset + size])
}

fn uniform_block<T: Pod>(uniforms: &[u8], descs: &[UniformDesc], location: i32) -> T {
    if location < 0 {
        return T::zeroed();
    }
    match descs.get(location as usize) {
        Some(desc) if desc.kind == UniformKind::Block => read_pod(uniforms, desc.offset),
        _ => T::zeroed(),
    }
}

/// A vertex stage and a fragment stage sharing layout and state.
pub struct ShaderProgram {
    uuid: Uuid,
    vertex: Arc<dyn VertexStage>,
    fragment: Arc<dyn FragmentStage>,
    requested_defines: Vec<String>,
    defines: Vec<u8>,
    uniforms: Vec<u8>,
    samplers: Vec<Option<SamplerBinding>>,
    builtins: ShaderBuiltins,
}

impl ShaderProgram {
    /// Installs the two stages, validating that they expose identical
    /// layouts, and resets defines and uniforms.
    pub fn new(vertex: Arc<dyn VertexStage>, fragment: Arc<dyn FragmentStage>) -> Result<Self> {
        validate_stages(vertex.as_ref(), fragment.as_ref())?;
        let defines = vec![0u8; vertex.defines().len()];
        let uniforms = vec![0u8; vertex.uniforms_size()];
        let samplers = vec![None; vertex.uniform_descs().len()];
        Ok(Self {
            uuid: Uuid::new_v4(),
            vertex,
            fragment,
            requested_defines: Vec::new(),
            defines,
            uniforms,
            samplers,
            builtins: ShaderBuiltins::default(),
        })
    }

    /// Replaces both stages; the defines buffer is rebuilt from the
    /// defines requested so far.
    pub fn set_shaders(
        &mut self,
        vertex: Arc<dyn VertexStage>,
        fragment: Arc<dyn FragmentStage>,
    ) -> Result<()> {
        validate_stages(vertex.as_ref(), fragment.as_ref())?;
        self.defines = vec![0u8; vertex.defines().len()];
        self.uniforms = vec![0u8; vertex.uniforms_size()];
        self.samplers = vec![None; vertex.uniform_descs().len()];
        self.vertex = vertex;
        self.fragment = fragment;
        let requested = std::mem::take(&mut self.requested_defines);
        for name in &requested {
            self.enable_define(name);
        }
        self.requested_defines = requested;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Turns on the named define for both stages. Unknown names are kept
    /// and applied if a later `set_shaders` declares them.
    pub fn add_define(&mut self, name: &str) {
        self.requested_defines.push(name.to_string());
        self.enable_define(name);
    }

    fn enable_define(&mut self, name: &str) {
        if let Some(idx) = self.vertex.defines().iter().position(|&d| d == name) {
            self.defines[idx] = 1;
        }
    }

    /// Number of floats in the shared varyings block.
    #[inline]
    #[must_use]
    pub fn varyings_count(&self) -> usize {
        self.vertex.varyings_count()
    }

    /// Binding location for a uniform name, or -1 if not declared.
    #[must_use]
    pub fn uniform_location(&self, name: &str) -> i32 {
        self.vertex
            .uniform_descs()
            .iter()
            .position(|desc| desc.name == name)
            .map_or(-1, |idx| idx as i32)
    }

    /// Copies `data` into the uniform buffer at the block's offset.
    /// Invalid locations and sampler slots are silent no-ops.
    pub fn bind_uniform_block(&mut self, location: i32, data: &[u8]) {
        if location < 0 {
            return;
        }
        let Some(desc) = self.vertex.uniform_descs().get(location as usize) else {
            return;
        };
        if desc.kind != UniformKind::Block || desc.offset >= self.uniforms.len() {
            return;
        }
        let n = data.len().min(self.uniforms.len() - desc.offset);
        self.uniforms[desc.offset..desc.offset + n].copy_from_slice(&data[..n]);
    }

    /// Snapshots `texture` into the sampler slot at `location`.
    pub fn bind_uniform_sampler(&mut self, location: i32, texture: &Arc<Texture>) {
        if location < 0 {
            return;
        }
        let Some(desc) = self.vertex.uniform_descs().get(location as usize) else {
            return;
        };
        let UniformKind::Sampler { derivative_offset } = desc.kind else {
            return;
        };
        self.samplers[location as usize] = Some(SamplerBinding {
            unit: Arc::new(SamplerUnit::from_texture(texture)),
            derivative_offset,
        });
    }

    /// Binds all blocks, then all samplers, resolving names to locations.
    pub fn bind_resources(&mut self, resources: &ShaderResources) {
        for block in &resources.blocks {
            let location = self.uniform_location(block.name());
            self.bind_uniform_block(location, &block.bytes());
        }
        for sampler in &resources.samplers {
            let location = self.uniform_location(sampler.name());
            if let Some(texture) = sampler.texture() {
                self.bind_uniform_sampler(location, &texture);
            }
        }
    }

    /// Runs the vertex stage over one vertex.
    pub fn exec_vertex_shader(&mut self, attributes: &[u8], varyings: &mut [f32]) {
        let mut io = VertexShaderIo {
            attributes,
            uniforms: &self.uniforms,
            defines: &self.defines,
            descs: self.vertex.uniform_descs(),
            varyings,
            builtins: &mut self.builtins,
        };
        self.vertex.shader_main(&mut io);
    }

    /// Runs the fragment stage over one pixel of a quad.
    pub fn exec_fragment_shader(&mut self, varyings: &[f32], quad: Option<[&[f32]; 4]>) {
        self.builtins.discard = false;
        let mut io = FragmentShaderIo {
            uniforms: &self.uniforms,
            defines: &self.defines,
            descs: self.fragment.uniform_descs(),
            samplers: &self.samplers,
            varyings,
            quad,
            builtins: &mut self.builtins,
        };
        self.fragment.shader_main(&mut io);
    }

    #[inline]
    #[must_use]
    pub fn builtins(&self) -> &ShaderBuiltins {
        &self.builtins
    }

    #[inline]
    pub fn builtins_mut(&mut self) -> &mut ShaderBuiltins {
        &mut self.builtins
    }

    /// Clone used to parallelize fragment shading: shares stage code,
    /// copies uniform/define bytes and sampler slots, fresh built-ins.
    #[must_use]
    pub fn clone_for_thread(&self) -> Self {
        Self {
            uuid: self.uuid,
            vertex: Arc::clone(&self.vertex),
            fragment: Arc::clone(&self.fragment),
            requested_defines: self.requested_defines.clone(),
            defines: self.defines.clone(),
            uniforms: self.uniforms.clone(),
            samplers: self.samplers.clone(),
            builtins: ShaderBuiltins::default(),
        }
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("uuid", &self.uuid)
            .field("uniforms_len", &self.uniforms.len())
            .field("varyings_count", &self.varyings_count())
            .finish()
    }
}

fn validate_stages(vertex: &dyn VertexStage, fragment: &dyn FragmentStage) -> Result<()> {
    if vertex.uniforms_size() != fragment.uniforms_size() {
        return Err(PrismError::StageMismatch(format!(
            "uniforms size {} vs {}",
            vertex.uniforms_size(),
            fragment.uniforms_size()
        )));
    }
    if vertex.varyings_count() != fragment.varyings_count() {
        return Err(PrismError::StageMismatch(format!(
            "varyings count {} vs {}",
            vertex.varyings_count(),
            fragment.varyings_count()
        )));
    }
    if vertex.defines() != fragment.defines() {
        return Err(PrismError::StageMismatch("defines differ".into()));
    }
    if vertex.uniform_descs() != fragment.uniform_descs() {
        return Err(PrismError::StageMismatch("uniform layouts differ".into()));
    }
    Ok(())
}
