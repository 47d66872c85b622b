//! Texture Sampler Tests
//!
//! Tests for:
//! - Nearest / bilinear filtering and texel-center identities
//! - Wrap mode arithmetic (repeat, mirror, clamp, border)
//! - Mipmap pyramid shape, generation and LOD level selection
//! - Cubemap face selection
//! - Quad-derivative LOD through the fragment io

use std::sync::Arc;

use glam::{IVec2, Vec2, Vec3, Vec4};

use prism::renderer::sampler::{
    pixel_with_wrap, sample_bilinear, sample_nearest, texture_impl, SamplerUnit,
};
use prism::renderer::shader::{FragmentShaderIo, SamplerBinding, ShaderBuiltins, UniformDesc};
use prism::{
    BorderColor, FilterMode, PixelBuffer, Rgba, SamplerDesc, TextureDesc, TextureFormat,
    TextureType, TextureUsage, WrapMode,
};

const RED: Rgba = [255, 0, 0, 255];
const GREEN: Rgba = [0, 255, 0, 255];
const BLUE: Rgba = [0, 0, 255, 255];
const WHITE: Rgba = [255, 255, 255, 255];

fn checker_2x2() -> PixelBuffer<Rgba> {
    PixelBuffer::from_data(2, 2, &[RED, GREEN, BLUE, WHITE]).unwrap()
}

fn near(a: u8, b: u8) -> bool {
    a.abs_diff(b) <= 1
}

#[test]
fn bilinear_on_checker_center() {
    let buf = checker_2x2();
    let out = sample_bilinear(
        &buf,
        Vec2::splat(0.5),
        WrapMode::ClampToEdge,
        IVec2::ZERO,
        [0; 4],
    );
    // elementwise average of the four texels, +-1 for truncation
    assert!(near(out[0], 128), "r = {}", out[0]);
    assert!(near(out[1], 128));
    assert!(near(out[2], 128));
    assert_eq!(out[3], 255);
}

#[test]
fn nearest_hits_texel_centers() {
    let buf = checker_2x2();
    let texels = [[RED, GREEN], [BLUE, WHITE]];
    for y in 0..2u32 {
        for x in 0..2u32 {
            let uv = Vec2::new((x as f32 + 0.5) / 2.0, (y as f32 + 0.5) / 2.0);
            let out = sample_nearest(&buf, uv, WrapMode::ClampToEdge, IVec2::ZERO, [0; 4]);
            assert_eq!(out, texels[y as usize][x as usize]);
        }
    }
}

#[test]
fn bilinear_at_texel_center_is_identity() {
    // interior centers of a gradient have zero fractional weight
    let data: Vec<Rgba> = (0..16).map(|i| [i * 16, 0, 0, 255]).collect();
    let buf = PixelBuffer::from_data(4, 4, &data).unwrap();
    for y in 0..4u32 {
        for x in 0..4u32 {
            let uv = Vec2::new((x as f32 + 0.5) / 4.0, (y as f32 + 0.5) / 4.0);
            let out = sample_bilinear(&buf, uv, WrapMode::ClampToEdge, IVec2::ZERO, [0; 4]);
            assert_eq!(out, data[(y * 4 + x) as usize]);
        }
    }
}

#[test]
fn repeat_wrap_is_periodic() {
    let buf = checker_2x2();
    for k in -2i32..3 {
        for (x, y) in [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75)] {
            let uv = Vec2::new(x, y);
            let shifted = uv + Vec2::new(k as f32, 0.0);
            let a = sample_nearest(&buf, uv, WrapMode::Repeat, IVec2::ZERO, [0; 4]);
            let b = sample_nearest(&buf, shifted, WrapMode::Repeat, IVec2::ZERO, [0; 4]);
            assert_eq!(a, b, "k = {k}");
        }
    }
}

#[test]
fn mirrored_repeat_reflects() {
    let data: Vec<Rgba> = (0..4).map(|i| [i * 60, 0, 0, 255]).collect();
    let buf = PixelBuffer::from_data(4, 1, &data).unwrap();
    for x in [0.125f32, 0.375, 0.625, 0.875] {
        let uv = Vec2::new(x, 0.5);
        let mirrored = Vec2::new(2.0 - x, 0.5);
        let a = sample_nearest(&buf, uv, WrapMode::MirroredRepeat, IVec2::ZERO, [0; 4]);
        let b = sample_nearest(&buf, mirrored, WrapMode::MirroredRepeat, IVec2::ZERO, [0; 4]);
        assert_eq!(a, b, "x = {x}");
    }
}

#[test]
fn clamp_to_border_returns_border() {
    let buf = checker_2x2();
    let border = [7, 7, 7, 7];
    for (x, y) in [(-1, 0), (0, -1), (2, 0), (0, 2), (5, 5)] {
        assert_eq!(
            pixel_with_wrap(&buf, x, y, WrapMode::ClampToBorder, border),
            border
        );
    }
    assert_eq!(
        pixel_with_wrap(&buf, 1, 1, WrapMode::ClampToBorder, border),
        WHITE
    );
}

#[test]
fn clamp_to_edge_snaps() {
    let buf = checker_2x2();
    assert_eq!(pixel_with_wrap(&buf, -3, 0, WrapMode::ClampToEdge, [0; 4]), RED);
    assert_eq!(pixel_with_wrap(&buf, 5, 5, WrapMode::ClampToEdge, [0; 4]), WHITE);
}

fn mipmapped_texture(size: u32) -> Arc<prism::Texture> {
    let texture = Arc::new(
        prism::Texture::new(
            TextureDesc {
                width: size,
                height: size,
                texture_type: TextureType::D2,
                format: TextureFormat::Rgba8,
                usage: TextureUsage::SAMPLER | TextureUsage::UPLOAD_DATA,
                use_mipmaps: true,
                multi_sample: false,
                tag: "mips".into(),
            },
            prism::BufferLayout::Linear,
        )
        .unwrap(),
    );
    // black/white checkerboard so every mip below level 0 averages to gray
    let data: Vec<Rgba> = (0..size * size)
        .map(|i| {
            let (x, y) = (i % size, i / size);
            if (x + y) % 2 == 0 {
                [255, 255, 255, 255]
            } else {
                [0, 0, 0, 255]
            }
        })
        .collect();
    texture.set_image_data_rgba8(vec![Arc::new(
        PixelBuffer::from_data(size, size, &data).unwrap(),
    )]);
    texture
}

#[test]
fn mip_pyramid_shape() {
    let texture = mipmapped_texture(8);
    let image = texture.image_rgba8(0).unwrap();
    assert_eq!(image.levels.len(), 4);
    let dims: Vec<(u32, u32)> = image
        .levels
        .iter()
        .map(|level| (level.width(), level.height()))
        .collect();
    assert_eq!(dims, vec![(8, 8), (4, 4), (2, 2), (1, 1)]);
}

#[test]
fn mip_downsample_averages() {
    let texture = mipmapped_texture(8);
    let image = texture.image_rgba8(0).unwrap();
    let level1 = image.level(1).unwrap().single();
    for y in 0..4 {
        for x in 0..4 {
            let texel = level1.get(x, y).unwrap();
            assert!(near(texel[0], 128), "({x},{y}) = {:?}", texel);
        }
    }
}

#[test]
fn mip_level_selection() {
    let texture = mipmapped_texture(8);
    let image = texture.image_rgba8(0).unwrap();
    let desc = SamplerDesc {
        filter_min: FilterMode::NearestMipmapNearest,
        wrap_s: WrapMode::ClampToEdge,
        ..Default::default()
    };
    // lod 0 stays on the checker; lod 1 lands on the gray level
    let fine = texture_impl(&image, &desc, Vec2::splat(0.26), 0.0, IVec2::ZERO, [0; 4]);
    let coarse = texture_impl(&image, &desc, Vec2::splat(0.26), 1.0, IVec2::ZERO, [0; 4]);
    assert!(fine.x <= 1.0 || fine.x >= 254.0);
    assert!((coarse.x - 128.0).abs() <= 1.0, "coarse = {coarse}");
}

#[test]
fn trilinear_blends_between_levels() {
    let texture = mipmapped_texture(8);
    let image = texture.image_rgba8(0).unwrap();
    let desc = SamplerDesc {
        filter_min: FilterMode::NearestMipmapLinear,
        wrap_s: WrapMode::ClampToEdge,
        ..Default::default()
    };
    // a white texel at lod 0 blended halfway toward gray
    let uv = Vec2::new(0.0625, 0.0625);
    let out = texture_impl(&image, &desc, uv, 0.5, IVec2::ZERO, [0; 4]);
    assert!((out.x - (255.0 + 128.0) / 2.0).abs() <= 2.0, "out = {out}");
}

#[test]
fn sampling_empty_texture_is_zero() {
    let texture = Arc::new(
        prism::Texture::new(
            TextureDesc {
                width: 4,
                height: 4,
                texture_type: TextureType::D2,
                format: TextureFormat::Rgba8,
                usage: TextureUsage::SAMPLER,
                use_mipmaps: false,
                multi_sample: false,
                tag: String::new(),
            },
            prism::BufferLayout::Linear,
        )
        .unwrap(),
    );
    let unit = SamplerUnit::from_texture(&texture);
    assert_eq!(unit.sample_2d(Vec2::splat(0.5), 0.0, IVec2::ZERO), Vec4::ZERO);
}

#[test]
fn cubemap_samples_each_face() {
    let texture = Arc::new(
        prism::Texture::new(
            TextureDesc {
                width: 2,
                height: 2,
                texture_type: TextureType::Cube,
                format: TextureFormat::Rgba8,
                usage: TextureUsage::SAMPLER | TextureUsage::UPLOAD_DATA,
                use_mipmaps: false,
                multi_sample: false,
                tag: "cube".into(),
            },
            prism::BufferLayout::Linear,
        )
        .unwrap(),
    );
    let face_colors: [Rgba; 6] = [
        [255, 0, 0, 255],
        [0, 255, 0, 255],
        [0, 0, 255, 255],
        [255, 255, 0, 255],
        [0, 255, 255, 255],
        [255, 0, 255, 255],
    ];
    let buffers = face_colors
        .iter()
        .map(|&c| Arc::new(PixelBuffer::from_data(2, 2, &[c; 4]).unwrap()))
        .collect();
    texture.set_image_data_rgba8(buffers);

    let unit = SamplerUnit::from_texture(&texture);
    let directions = [
        Vec3::X,
        -Vec3::X,
        Vec3::Y,
        -Vec3::Y,
        Vec3::Z,
        -Vec3::Z,
    ];
    for (dir, expected) in directions.iter().zip(face_colors) {
        let out = unit.sample_cube(*dir, 0.0) * 255.0;
        let got = Rgba::from([out.x as u8, out.y as u8, out.z as u8, out.w as u8]);
        assert_eq!(got, expected, "dir = {dir}");
    }
}

#[test]
fn quad_derivatives_drive_lod() {
    let texture = mipmapped_texture(8);
    texture.set_sampler_desc(SamplerDesc {
        filter_min: FilterMode::NearestMipmapNearest,
        wrap_s: WrapMode::ClampToEdge,
        border_color: BorderColor::Black,
        ..Default::default()
    });
    let unit = Arc::new(SamplerUnit::from_texture(&texture));
    let binding = Some(SamplerBinding {
        unit,
        derivative_offset: Some(0),
    });
    let descs = [UniformDesc::sampler_with_derivative("uTexture", 0)];
    let mut builtins = ShaderBuiltins::default();

    // one pixel step covers two texels -> dx = 2, lod = 1 -> gray level
    let p0 = [0.25f32, 0.25];
    let p1 = [0.5f32, 0.25];
    let p2 = [0.25f32, 0.5];
    let p3 = [0.5f32, 0.5];
    let io = FragmentShaderIo {
        uniforms: &[],
        defines: &[],
        descs: &descs,
        samplers: std::slice::from_ref(&binding),
        varyings: &p0,
        quad: Some([&p0, &p1, &p2, &p3]),
        builtins: &mut builtins,
    };
    let out = io.texture_2d(0, Vec2::new(0.25, 0.25)) * 255.0;
    assert!((out.x - 128.0).abs() <= 1.0, "out = {out}");

    // flat quad -> lod 0 -> checker stays black or white
    let flat = [0.25f32, 0.25];
    let io = FragmentShaderIo {
        uniforms: &[],
        defines: &[],
        descs: &descs,
        samplers: std::slice::from_ref(&binding),
        varyings: &flat,
        quad: Some([&flat, &flat, &flat, &flat]),
        builtins: io.builtins,
    };
    let out = io.texture_2d(0, Vec2::new(0.25, 0.25)) * 255.0;
    assert!(out.x <= 1.0 || out.x >= 254.0, "out = {out}");
}
