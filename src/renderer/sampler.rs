//! Texture sampling.
//!
//! Sampling runs in the texel domain (`0..=255` for RGBA8, raw floats for
//! depth) and normalizes at the shader boundary. Wrap arithmetic, level
//! filtering and the mipmap downsampler all operate on [`PixelBuffer`]
//! levels; [`SamplerUnit`] is the immutable per-draw snapshot a shader
//! program samples through.

use std::sync::Arc;

use glam::{IVec2, UVec2, Vec2, Vec3, Vec4};

use crate::resources::buffer::{BufferLayout, PixelBuffer};
use crate::resources::image::{mip_level_count, ImageBuffer, Rgba, Texel, TextureImage};
use crate::resources::texture::{
    FilterMode, SamplerDesc, Texture, TextureFormat, TextureType, WrapMode,
};

/// Fetches the texel at integer `(x, y)` under a wrap policy.
pub fn pixel_with_wrap<T: Texel>(
    buffer: &PixelBuffer<T>,
    x: i32,
    y: i32,
    wrap: WrapMode,
    border: T,
) -> T {
    let w = buffer.width() as i32;
    let h = buffer.height() as i32;
    let (x, y) = match wrap {
        WrapMode::Repeat => (x.rem_euclid(w), y.rem_euclid(h)),
        WrapMode::MirroredRepeat => (mirror_coord(x, w), mirror_coord(y, h)),
        WrapMode::ClampToEdge => (x.clamp(0, w - 1), y.clamp(0, h - 1)),
        WrapMode::ClampToBorder => {
            if x < 0 || x >= w || y < 0 || y >= h {
                return border;
            }
            (x, y)
        }
    };
    buffer.get(x as u32, y as u32).unwrap_or_else(T::zeroed)
}

/// Folds `i` into `[0, n)` with mirrored periodicity `2n`.
#[inline]
fn mirror_coord(i: i32, n: i32) -> i32 {
    let mut i = i.rem_euclid(2 * n) - n;
    if i < 0 {
        i = -1 - i;
    }
    n - 1 - i
}

/// Nearest-texel sample; `uv` in texture space, `offset` in texels.
pub fn sample_nearest<T: Texel>(
    buffer: &PixelBuffer<T>,
    uv: Vec2,
    wrap: WrapMode,
    offset: IVec2,
    border: T,
) -> T {
    let tc = uv * Vec2::new(buffer.width() as f32, buffer.height() as f32) + offset.as_vec2();
    pixel_with_wrap(
        buffer,
        tc.x.floor() as i32,
        tc.y.floor() as i32,
        wrap,
        border,
    )
}

/// Bilinear sample; `uv` in texture space, `offset` in texels.
pub fn sample_bilinear<T: Texel>(
    buffer: &PixelBuffer<T>,
    uv: Vec2,
    wrap: WrapMode,
    offset: IVec2,
    border: T,
) -> T {
    let tc = uv * Vec2::new(buffer.width() as f32, buffer.height() as f32) + offset.as_vec2();
    sample_texel_bilinear(buffer, tc, wrap, border)
}

/// Bilinear filtering around an exact texel-space point.
fn sample_texel_bilinear<T: Texel>(
    buffer: &PixelBuffer<T>,
    tc: Vec2,
    wrap: WrapMode,
    border: T,
) -> T {
    let base = tc - 0.5;
    let x = base.x.floor() as i32;
    let y = base.y.floor() as i32;
    let f = base - Vec2::new(base.x.floor(), base.y.floor());

    let s00 = pixel_with_wrap(buffer, x, y, wrap, border).to_vec4();
    let s10 = pixel_with_wrap(buffer, x + 1, y, wrap, border).to_vec4();
    let s01 = pixel_with_wrap(buffer, x, y + 1, wrap, border).to_vec4();
    let s11 = pixel_with_wrap(buffer, x + 1, y + 1, wrap, border).to_vec4();

    T::from_vec4(s00.lerp(s10, f.x).lerp(s01.lerp(s11, f.x), f.y))
}

/// Bilinear-downsamples `input` into `output` (the mip generation kernel).
///
/// Source points sit at output-pixel centers scaled by `in/out`, so a 2:1
/// reduction averages the exact 2x2 footprint of each output texel.
pub fn sample_buffer_bilinear<T: Texel>(
    output: &PixelBuffer<T>,
    input: &PixelBuffer<T>,
    border: T,
) {
    let ratio_x = input.width() as f32 / output.width() as f32;
    let ratio_y = input.height() as f32 / output.height() as f32;
    for y in 0..output.height() {
        for x in 0..output.width() {
            let tc = Vec2::new(
                (x as f32 + 0.5) * ratio_x,
                (y as f32 + 0.5) * ratio_y,
            );
            output.set(
                x,
                y,
                sample_texel_bilinear(input, tc, WrapMode::ClampToEdge, border),
            );
        }
    }
}

/// (Re)builds the mip pyramid of `image` below its level 0.
///
/// Allocates `floor(log2(max(w, h))) + 1` levels; when `sample` is set,
/// each level is filled from its predecessor with the bilinear
/// downsampler (border color is the format's zero).
pub fn generate_mipmaps<T: Texel>(image: &mut TextureImage<T>, layout: BufferLayout, sample: bool) {
    if image.is_empty() {
        return;
    }
    let width = image.width();
    let height = image.height();
    image.levels.truncate(1);

    let level_count = mip_level_count(width, height);
    for level in 1..level_count {
        let lw = (width >> level).max(1);
        let lh = (height >> level).max(1);
        match ImageBuffer::new(lw, lh, 1, layout) {
            Ok(buffer) => image.levels.push(buffer),
            Err(err) => {
                log::error!("mipmap allocation failed at level {level}: {err}");
                return;
            }
        }
    }

    if !sample {
        return;
    }
    for level in 1..image.levels.len() {
        let (head, tail) = image.levels.split_at(level);
        sample_buffer_bilinear(tail[0].single(), head[level - 1].single(), T::zeroed());
    }
}

/// Samples one pyramid with the descriptor's filter policy.
///
/// Returns the texel-domain value; empty images yield the format zero.
pub fn texture_impl<T: Texel>(
    image: &TextureImage<T>,
    desc: &SamplerDesc,
    uv: Vec2,
    lod: f32,
    offset: IVec2,
    border: T,
) -> Vec4 {
    if image.is_empty() {
        return T::zeroed().to_vec4();
    }
    let filter = desc.filter_min;
    let wrap = desc.wrap_s;
    let bilinear = matches!(
        filter,
        FilterMode::Linear | FilterMode::LinearMipmapNearest | FilterMode::LinearMipmapLinear
    );
    let max_level = image.max_level();

    match filter {
        FilterMode::Nearest | FilterMode::Linear => {
            level_sample(image, 0, uv, wrap, offset, border, bilinear)
        }
        FilterMode::NearestMipmapNearest | FilterMode::LinearMipmapNearest => {
            let level = (((lod + 0.5).ceil() as i32) - 1).clamp(0, max_level as i32) as u32;
            level_sample(image, level, uv, wrap, offset, border, bilinear)
        }
        FilterMode::NearestMipmapLinear | FilterMode::LinearMipmapLinear => {
            let level_hi = (lod.floor() as i32).clamp(0, max_level as i32) as u32;
            let level_lo = (level_hi + 1).min(max_level);
            let hi = level_sample(image, level_hi, uv, wrap, offset, border, bilinear);
            if level_lo == level_hi {
                hi
            } else {
                let lo = level_sample(image, level_lo, uv, wrap, offset, border, bilinear);
                hi.lerp(lo, lod - lod.floor())
            }
        }
    }
}

fn level_sample<T: Texel>(
    image: &TextureImage<T>,
    level: u32,
    uv: Vec2,
    wrap: WrapMode,
    offset: IVec2,
    border: T,
    bilinear: bool,
) -> Vec4 {
    let Some(buffer) = image.level(level) else {
        return T::zeroed().to_vec4();
    };
    let buffer = buffer.single();
    let texel = if bilinear {
        sample_bilinear(buffer, uv, wrap, offset, border)
    } else {
        sample_nearest(buffer, uv, wrap, offset, border)
    };
    texel.to_vec4()
}

/// Selects the cube face for `dir` and projects onto its `[0, 1]` square.
#[must_use]
pub fn cube_uv(dir: Vec3) -> (usize, Vec2) {
    let abs = dir.abs();
    let (face, max_axis, uc, vc) = if abs.x >= abs.y && abs.x >= abs.z {
        if dir.x > 0.0 {
            (0, abs.x, -dir.z, dir.y)
        } else {
            (1, abs.x, dir.z, dir.y)
        }
    } else if abs.y >= abs.z {
        if dir.y > 0.0 {
            (2, abs.y, dir.x, -dir.z)
        } else {
            (3, abs.y, dir.x, dir.z)
        }
    } else if dir.z > 0.0 {
        (4, abs.z, dir.x, dir.y)
    } else {
        (5, abs.z, -dir.x, dir.y)
    };
    let u = 0.5 * (uc / max_axis + 1.0);
    let v = 0.5 * (vc / max_axis + 1.0);
    (face, Vec2::new(u, v))
}

// ============================================================================
// Shader-facing sampler snapshot
// ============================================================================

/// Immutable sampling view over a bound texture, valid for one draw.
#[derive(Debug, Clone)]
pub enum SamplerUnit {
    D2Rgba8 {
        image: TextureImage<Rgba>,
        desc: SamplerDesc,
        border: Rgba,
    },
    D2Float {
        image: TextureImage<f32>,
        desc: SamplerDesc,
        border: f32,
    },
    CubeRgba8 {
        faces: Box<[TextureImage<Rgba>; 6]>,
        desc: SamplerDesc,
        border: Rgba,
    },
    CubeFloat {
        faces: Box<[TextureImage<f32>; 6]>,
        desc: SamplerDesc,
        border: f32,
    },
}

impl SamplerUnit {
    /// Snapshots `texture` for sampling. Unallocated textures snapshot as
    /// empty pyramids that sample to the format zero.
    #[must_use]
    pub fn from_texture(texture: &Arc<Texture>) -> Self {
        let desc = texture.sampler_desc();
        match (texture.texture_type(), texture.format()) {
            (TextureType::D2, TextureFormat::Rgba8) => Self::D2Rgba8 {
                image: texture.image_rgba8(0).unwrap_or_default(),
                desc,
                border: texture.border_color_rgba(),
            },
            (TextureType::D2, TextureFormat::Float32) => Self::D2Float {
                image: texture.image_f32(0).unwrap_or_default(),
                desc,
                border: texture.border_color_f32(),
            },
            (TextureType::Cube, TextureFormat::Rgba8) => Self::CubeRgba8 {
                faces: Box::new(std::array::from_fn(|i| {
                    texture.image_rgba8(i as u32).unwrap_or_default()
                })),
                desc,
                border: texture.border_color_rgba(),
            },
            (TextureType::Cube, TextureFormat::Float32) => Self::CubeFloat {
                faces: Box::new(std::array::from_fn(|i| {
                    texture.image_f32(i as u32).unwrap_or_default()
                })),
                desc,
                border: texture.border_color_f32(),
            },
        }
    }

    #[must_use]
    pub fn is_cube(&self) -> bool {
        matches!(self, Self::CubeRgba8 { .. } | Self::CubeFloat { .. })
    }

    /// Level-0 dimensions.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        let size = self.texture_size(0);
        Vec2::new(size.x as f32, size.y as f32)
    }

    #[must_use]
    pub fn texture_size(&self, level: u32) -> UVec2 {
        let (w, h) = match self {
            Self::D2Rgba8 { image, .. } => level_dims(image, level),
            Self::D2Float { image, .. } => level_dims(image, level),
            Self::CubeRgba8 { faces, .. } => level_dims(&faces[0], level),
            Self::CubeFloat { faces, .. } => level_dims(&faces[0], level),
        };
        UVec2::new(w, h)
    }

    /// Whether this unit needs a screen-space LOD for level selection.
    #[must_use]
    pub fn needs_lod(&self) -> bool {
        let desc = match self {
            Self::D2Rgba8 { desc, .. } | Self::CubeRgba8 { desc, .. } => desc,
            Self::D2Float { desc, .. } | Self::CubeFloat { desc, .. } => desc,
        };
        !self.is_cube() && desc.filter_min.uses_mipmaps()
    }

    /// 2D sample, normalized to the shader domain (`[0, 1]` for RGBA8).
    #[must_use]
    pub fn sample_2d(&self, uv: Vec2, lod: f32, offset: IVec2) -> Vec4 {
        match self {
            Self::D2Rgba8 {
                image,
                desc,
                border,
            } => texture_impl(image, desc, uv, lod, offset, *border) / 255.0,
            Self::D2Float {
                image,
                desc,
                border,
            } => texture_impl(image, desc, uv, lod, offset, *border),
            _ => Vec4::ZERO,
        }
    }

    /// Cube sample by direction; LOD is caller-supplied (no derivatives).
    #[must_use]
    pub fn sample_cube(&self, dir: Vec3, lod: f32) -> Vec4 {
        let (face, uv) = cube_uv(dir);
        match self {
            Self::CubeRgba8 {
                faces,
                desc,
                border,
            } => texture_impl(&faces[face], desc, uv, lod, IVec2::ZERO, *border) / 255.0,
            Self::CubeFloat {
                faces,
                desc,
                border,
            } => texture_impl(&faces[face], desc, uv, lod, IVec2::ZERO, *border),
            _ => Vec4::ZERO,
        }
    }
}

fn level_dims<T: Texel>(image: &TextureImage<T>, level: u32) -> (u32, u32) {
    image
        .level(level)
        .map_or((0, 0), |buf| (buf.width(), buf.height()))
}

/// LOD from the screen-space derivatives of a pixel quad's UVs.
///
/// `dx`/`dy` are finite differences across the quad, already scaled to
/// texel space by the caller.
#[inline]
#[must_use]
pub fn lod_from_derivatives(dx: Vec2, dy: Vec2) -> f32 {
    let d = dx.dot(dx).max(dy.dot(dy));
    (0.5 * d.log2()).max(0.0)
}
