//! Image storage for textures and attachments.
//!
//! An [`ImageBuffer`] is one resolution level: a single-sample
//! [`PixelBuffer<T>`] and, for 4x multisample levels, an additional
//! buffer holding four samples per logical pixel (the single-sample
//! buffer then serves as the resolve target). A [`TextureImage`] is the
//! ordered mip pyramid of one texture layer; level `k` is sized
//! `(max(1, w >> k), max(1, h >> k))`. Mip chains are only defined over
//! single-sample level 0.

use std::sync::Arc;

use glam::Vec4;

use crate::errors::{PrismError, Result};
use crate::resources::buffer::{BufferLayout, PixelBuffer};

/// Samples per pixel of a multisample buffer.
pub const MS_SAMPLE_COUNT: usize = 4;

/// An RGBA8 texel.
pub type Rgba = [u8; 4];

/// Element type storable in texture images.
///
/// Filtering math runs in `Vec4` space; each texel type defines its
/// conversion. RGBA8 converts to the `0..=255` domain (shaders normalize
/// on read), float texels broadcast across lanes.
pub trait Texel: Copy + bytemuck::Zeroable + Send + Sync + 'static {
    fn to_vec4(self) -> Vec4;
    fn from_vec4(v: Vec4) -> Self;
}

impl Texel for Rgba {
    #[inline]
    fn to_vec4(self) -> Vec4 {
        Vec4::new(
            f32::from(self[0]),
            f32::from(self[1]),
            f32::from(self[2]),
            f32::from(self[3]),
        )
    }

    #[inline]
    fn from_vec4(v: Vec4) -> Self {
        // truncate toward zero, like the fixed-point writeback
        let v = v.clamp(Vec4::ZERO, Vec4::splat(255.0));
        [v.x as u8, v.y as u8, v.z as u8, v.w as u8]
    }
}

impl Texel for f32 {
    #[inline]
    fn to_vec4(self) -> Vec4 {
        Vec4::splat(self)
    }

    #[inline]
    fn from_vec4(v: Vec4) -> Self {
        v.x
    }
}

/// One resolution level of a texture layer.
///
/// Multisample levels carry both the per-sample storage and a
/// single-sample buffer the MSAA resolve writes into.
#[derive(Debug, Clone)]
pub struct ImageBuffer<T: Texel> {
    single: Arc<PixelBuffer<T>>,
    ms4x: Option<Arc<PixelBuffer<[T; MS_SAMPLE_COUNT]>>>,
}

impl<T: Texel> ImageBuffer<T> {
    /// Allocates a level with the given sample count (1 or 4).
    pub fn new(width: u32, height: u32, samples: u32, layout: BufferLayout) -> Result<Self> {
        let single = Arc::new(PixelBuffer::with_layout(width, height, layout)?);
        let ms4x = match samples {
            1 => None,
            4 => Some(Arc::new(PixelBuffer::with_layout(width, height, layout)?)),
            other => return Err(PrismError::UnsupportedSampleCount(other)),
        };
        Ok(Self { single, ms4x })
    }

    /// Wraps an existing single-sample buffer.
    #[must_use]
    pub fn from_buffer(buffer: Arc<PixelBuffer<T>>) -> Self {
        Self {
            single: buffer,
            ms4x: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.single.width()
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.single.height()
    }

    #[inline]
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        if self.ms4x.is_some() {
            MS_SAMPLE_COUNT as u32
        } else {
            1
        }
    }

    #[inline]
    #[must_use]
    pub fn is_multisample(&self) -> bool {
        self.ms4x.is_some()
    }

    /// Single-sample storage (the resolve target for multisample levels).
    #[inline]
    #[must_use]
    pub fn single(&self) -> &Arc<PixelBuffer<T>> {
        &self.single
    }

    /// Per-sample storage of a multisample level.
    #[inline]
    #[must_use]
    pub fn ms4x(&self) -> Option<&Arc<PixelBuffer<[T; MS_SAMPLE_COUNT]>>> {
        self.ms4x.as_ref()
    }
}

/// The mip pyramid of one texture layer.
#[derive(Debug, Clone, Default)]
pub struct TextureImage<T: Texel> {
    pub levels: Vec<ImageBuffer<T>>,
}

impl<T: Texel> TextureImage<T> {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.levels.first().map_or(0, ImageBuffer::width)
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.levels.first().map_or(0, ImageBuffer::height)
    }

    #[inline]
    #[must_use]
    pub fn level(&self, level: u32) -> Option<&ImageBuffer<T>> {
        self.levels.get(level as usize)
    }

    /// Index of the last mip level.
    #[inline]
    #[must_use]
    pub fn max_level(&self) -> u32 {
        self.levels.len().saturating_sub(1) as u32
    }
}

/// Mip count for a full pyramid over a `width x height` base.
#[inline]
#[must_use]
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    32 - largest.leading_zeros()
}
