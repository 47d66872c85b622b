//! Textures and sampler descriptors.
//!
//! A [`Texture`] owns one [`TextureImage`] per layer (1 for 2D, 6 cube
//! faces ordered +X, -X, +Y, -Y, +Z, -Z), a sampler descriptor and a
//! usage mask. Storage is allocated on the first
//! [`Texture::init_image_data`] or upload; textures are shared between
//! materials, framebuffers and samplers through `Arc`.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use bitflags::bitflags;
use bytemuck::Pod;
use glam::Vec4;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::errors::{PrismError, Result};
use crate::resources::buffer::{BufferLayout, PixelBuffer};
use crate::resources::image::{ImageBuffer, Rgba, Texel, TextureImage};
use crate::utils::image_io;

/// Out-of-range texture coordinate policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    #[default]
    ClampToEdge,
    ClampToBorder,
}

/// Texel filtering policy, including the four mipmap combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl FilterMode {
    /// Whether this mode selects among mip levels.
    #[inline]
    #[must_use]
    pub fn uses_mipmaps(self) -> bool {
        !matches!(self, Self::Nearest | Self::Linear)
    }
}

/// Cube faces, layer-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX = 0,
    NegativeX = 1,
    PositiveY = 2,
    NegativeY = 3,
    PositiveZ = 4,
    NegativeZ = 5,
}

/// Border color used by [`WrapMode::ClampToBorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderColor {
    #[default]
    Black,
    White,
}

impl BorderColor {
    #[inline]
    #[must_use]
    pub fn to_vec4(self) -> Vec4 {
        match self {
            Self::Black => Vec4::ZERO,
            Self::White => Vec4::ONE,
        }
    }
}

/// Sampler state attached to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub filter_min: FilterMode,
    pub filter_mag: FilterMode,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub wrap_r: WrapMode,
    pub border_color: BorderColor,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            filter_min: FilterMode::Nearest,
            filter_mag: FilterMode::Linear,
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
            wrap_r: WrapMode::ClampToEdge,
            border_color: BorderColor::Black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    D2,
    Cube,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8,
    Float32,
}

bitflags! {
    /// What a texture participates in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SAMPLER          = 1 << 0;
        const UPLOAD_DATA      = 1 << 1;
        const ATTACHMENT_COLOR = 1 << 2;
        const ATTACHMENT_DEPTH = 1 << 3;
        const RENDERER_OUTPUT  = 1 << 4;
    }
}

/// Creation parameters for [`Texture`].
#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub texture_type: TextureType,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub use_mipmaps: bool,
    pub multi_sample: bool,
    /// Debug label.
    pub tag: String,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            texture_type: TextureType::D2,
            format: TextureFormat::Rgba8,
            usage: TextureUsage::SAMPLER,
            use_mipmaps: false,
            multi_sample: false,
            tag: String::new(),
        }
    }
}

/// Per-format layer storage.
#[derive(Debug)]
pub enum TextureStorage {
    Rgba8(Vec<TextureImage<Rgba>>),
    Float32(Vec<TextureImage<f32>>),
}

/// A 2D or cubemap texture.
#[derive(Debug)]
pub struct Texture {
    uuid: Uuid,
    desc: TextureDesc,
    layout: BufferLayout,
    sampler: RwLock<SamplerDesc>,
    storage: RwLock<TextureStorage>,
}

impl Texture {
    /// Creates a texture with unallocated layer storage.
    pub fn new(desc: TextureDesc, layout: BufferLayout) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            return Err(PrismError::InvalidDimensions {
                width: desc.width,
                height: desc.height,
            });
        }
        if desc.use_mipmaps && desc.multi_sample {
            return Err(PrismError::InvalidConfiguration(
                "mipmaps are not defined for multisample textures".into(),
            ));
        }
        let layers = match desc.texture_type {
            TextureType::D2 => 1,
            TextureType::Cube => 6,
        };
        let storage = match desc.format {
            TextureFormat::Rgba8 => TextureStorage::Rgba8(vec![TextureImage::default(); layers]),
            TextureFormat::Float32 => {
                TextureStorage::Float32(vec![TextureImage::default(); layers])
            }
        };
        Ok(Self {
            uuid: Uuid::new_v4(),
            desc,
            layout,
            sampler: RwLock::new(SamplerDesc::default()),
            storage: RwLock::new(storage),
        })
    }

    #[inline]
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    #[inline]
    #[must_use]
    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.desc.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.desc.height
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> TextureFormat {
        self.desc.format
    }

    #[inline]
    #[must_use]
    pub fn texture_type(&self) -> TextureType {
        self.desc.texture_type
    }

    #[inline]
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        if self.desc.multi_sample {
            4
        } else {
            1
        }
    }

    #[inline]
    #[must_use]
    pub fn layer_count(&self) -> u32 {
        match self.desc.texture_type {
            TextureType::D2 => 1,
            TextureType::Cube => 6,
        }
    }

    #[inline]
    #[must_use]
    pub fn level_width(&self, level: u32) -> u32 {
        (self.desc.width >> level).max(1)
    }

    #[inline]
    #[must_use]
    pub fn level_height(&self, level: u32) -> u32 {
        (self.desc.height >> level).max(1)
    }

    #[must_use]
    pub fn sampler_desc(&self) -> SamplerDesc {
        *self.sampler.read()
    }

    pub fn set_sampler_desc(&self, desc: SamplerDesc) {
        *self.sampler.write() = desc;
    }

    /// Border color in the texel domain of this format.
    #[must_use]
    pub fn border_color_rgba(&self) -> Rgba {
        Rgba::from_vec4(self.sampler_desc().border_color.to_vec4() * 255.0)
    }

    #[must_use]
    pub fn border_color_f32(&self) -> f32 {
        self.sampler_desc().border_color.to_vec4().x.clamp(0.0, 1.0)
    }

    /// Allocates storage for every layer (and mip levels if requested).
    ///
    /// Already-sized storage is re-allocated; call once after creation.
    pub fn init_image_data(&self) {
        let samples = self.sample_count();
        let mut storage = self.storage.write();
        match &mut *storage {
            TextureStorage::Rgba8(layers) => {
                init_layers(layers, &self.desc, samples, self.layout);
            }
            TextureStorage::Float32(layers) => {
                init_layers(layers, &self.desc, samples, self.layout);
            }
        }
    }

    /// Uploads one single-sample buffer per layer; regenerates mipmaps if
    /// the texture asked for them. Mismatched size/format/layer count is
    /// logged and ignored.
    pub fn set_image_data_rgba8(&self, buffers: Vec<Arc<PixelBuffer<Rgba>>>) {
        if self.desc.format != TextureFormat::Rgba8 {
            log::error!("set_image_data: format mismatch (texture is {:?})", self.desc.format);
            return;
        }
        let mut storage = self.storage.write();
        if let TextureStorage::Rgba8(layers) = &mut *storage {
            upload_layers(layers, buffers, &self.desc);
        }
    }

    /// Float variant of [`Texture::set_image_data_rgba8`].
    pub fn set_image_data_f32(&self, buffers: Vec<Arc<PixelBuffer<f32>>>) {
        if self.desc.format != TextureFormat::Float32 {
            log::error!("set_image_data: format mismatch (texture is {:?})", self.desc.format);
            return;
        }
        let mut storage = self.storage.write();
        if let TextureStorage::Float32(layers) = &mut *storage {
            upload_layers(layers, buffers, &self.desc);
        }
    }

    /// Snapshot of one RGBA8 layer for sampling/attachment resolution.
    #[must_use]
    pub fn image_rgba8(&self, layer: u32) -> Option<TextureImage<Rgba>> {
        match &*self.storage.read() {
            TextureStorage::Rgba8(layers) => layers.get(layer as usize).cloned(),
            TextureStorage::Float32(_) => None,
        }
    }

    /// Snapshot of one float layer.
    #[must_use]
    pub fn image_f32(&self, layer: u32) -> Option<TextureImage<f32>> {
        match &*self.storage.read() {
            TextureStorage::Float32(layers) => layers.get(layer as usize).cloned(),
            TextureStorage::Rgba8(_) => None,
        }
    }

    #[must_use]
    pub fn is_allocated(&self) -> bool {
        match &*self.storage.read() {
            TextureStorage::Rgba8(layers) => layers.iter().any(|l| !l.is_empty()),
            TextureStorage::Float32(layers) => layers.iter().any(|l| !l.is_empty()),
        }
    }

    /// Dumps one layer/level as PNG; float levels become grayscale.
    /// Multisample textures are skipped.
    pub fn dump_image(&self, path: &Path, layer: u32, level: u32) -> Result<()> {
        if self.desc.multi_sample {
            return Ok(());
        }
        let width = self.level_width(level);
        let height = self.level_height(level);
        match &*self.storage.read() {
            TextureStorage::Rgba8(layers) => {
                let Some(buf) = level_buffer(layers, layer, level) else {
                    return Ok(());
                };
                image_io::write_rgba_png(path, width, height, bytemuck::cast_slice(buf.as_slice()))
            }
            TextureStorage::Float32(layers) => {
                let Some(buf) = level_buffer(layers, layer, level) else {
                    return Ok(());
                };
                let rgba = image_io::float_to_rgba(buf.as_slice());
                image_io::write_rgba_png(path, width, height, &rgba)
            }
        }
    }

    /// Writes the raw bytes of every layer and level, concatenated.
    pub fn store_to_file(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)?;
        match &*self.storage.read() {
            TextureStorage::Rgba8(layers) => write_layers(&mut file, layers)?,
            TextureStorage::Float32(layers) => write_layers(&mut file, layers)?,
        }
        Ok(())
    }

    /// Reads back a file produced by [`Texture::store_to_file`] into
    /// already-allocated storage.
    pub fn load_from_file(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::open(path)?;
        let storage = self.storage.read();
        match &*storage {
            TextureStorage::Rgba8(layers) => read_layers(&mut file, layers)?,
            TextureStorage::Float32(layers) => read_layers(&mut file, layers)?,
        }
        Ok(())
    }
}

fn init_layers<T: Texel>(
    layers: &mut [TextureImage<T>],
    desc: &TextureDesc,
    samples: u32,
    layout: BufferLayout,
) {
    for layer in layers.iter_mut() {
        match ImageBuffer::new(desc.width, desc.height, samples, layout) {
            Ok(level0) => {
                layer.levels = vec![level0];
                if desc.use_mipmaps {
                    crate::renderer::sampler::generate_mipmaps(layer, layout, false);
                }
            }
            Err(err) => {
                log::error!("init_image_data failed: {err}");
                layer.levels.clear();
            }
        }
    }
}

fn upload_layers<T: Texel>(
    layers: &mut [TextureImage<T>],
    buffers: Vec<Arc<PixelBuffer<T>>>,
    desc: &TextureDesc,
) {
    if desc.multi_sample {
        log::error!("set_image_data not supported for multisample textures");
        return;
    }
    if buffers.len() != layers.len() {
        log::error!(
            "set_image_data: layer count mismatch (expected {}, got {})",
            layers.len(),
            buffers.len()
        );
        return;
    }
    if buffers
        .iter()
        .any(|b| b.width() != desc.width || b.height() != desc.height)
    {
        log::error!("set_image_data: size does not match texture");
        return;
    }
    for (layer, buffer) in layers.iter_mut().zip(buffers) {
        let layout = buffer.layout();
        layer.levels = vec![ImageBuffer::from_buffer(buffer)];
        if desc.use_mipmaps {
            crate::renderer::sampler::generate_mipmaps(layer, layout, true);
        }
    }
}

fn level_buffer<T: Texel>(
    layers: &[TextureImage<T>],
    layer: u32,
    level: u32,
) -> Option<&Arc<PixelBuffer<T>>> {
    Some(layers.get(layer as usize)?.level(level)?.single())
}

fn write_layers<T: Texel + Pod>(file: &mut std::fs::File, layers: &[TextureImage<T>]) -> Result<()>
where
    [T; 4]: Pod,
{
    for layer in layers {
        for level in &layer.levels {
            if let Some(ms) = level.ms4x() {
                file.write_all(bytemuck::cast_slice(ms.as_slice()))?;
            } else {
                file.write_all(bytemuck::cast_slice(level.single().as_slice()))?;
            }
        }
    }
    Ok(())
}

fn read_layers<T: Texel + Pod>(file: &mut std::fs::File, layers: &[TextureImage<T>]) -> Result<()>
where
    [T; 4]: Pod,
{
    for layer in layers {
        for level in &layer.levels {
            if let Some(ms) = level.ms4x() {
                let mut bytes = vec![0u8; ms.raw_len() * std::mem::size_of::<[T; 4]>()];
                file.read_exact(&mut bytes)?;
                ms.copy_from_slice(bytemuck::cast_slice(&bytes));
            } else {
                let buf = level.single();
                let mut bytes = vec![0u8; buf.raw_len() * std::mem::size_of::<T>()];
                file.read_exact(&mut bytes)?;
                buf.copy_from_slice(bytemuck::cast_slice(&bytes));
            }
        }
    }
    Ok(())
}
