//! End-to-End Pipeline Tests
//!
//! Full draws through the software renderer:
//! - Exact single-sample triangle coverage
//! - Face culling, depth functions (incl. reverse-Z), blending
//! - Early-Z equivalence, MSAA resolve, perspective-correct varyings
//! - Textured draws, polygon modes, lines, points, fragment discard
//! - Near-plane clipping

mod common;

use std::sync::Arc;

use glam::{Vec2, Vec4};

use common::{make_target, make_vao, pixel, screen_vertex, ColorFs, ColorUniforms, ColorVs};
use prism::{
    BlendFactor, ClearStates, DepthFunction, FilterMode, FragmentShaderIo, FragmentStage,
    PixelBuffer, PolygonMode, PrimitiveType, RenderStates, RendererSettings, Rgba, SamplerDesc,
    ShaderProgramHandle, ShaderResources, ShaderStage, SoftwareRenderer, TextureDesc,
    TextureFormat, TextureType, TextureUsage, UniformDesc, VertexShaderIo, VertexStage, WrapMode,
};

const SIZE: u32 = 8;
const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

fn renderer() -> SoftwareRenderer {
    let _ = env_logger::builder().is_test(true).try_init();
    SoftwareRenderer::new(RendererSettings::default()).unwrap()
}

fn clear_all() -> ClearStates {
    ClearStates {
        color_flag: true,
        depth_flag: true,
        clear_color: Vec4::ZERO,
        clear_depth: 1.0,
    }
}

fn color_program(renderer: &SoftwareRenderer) -> ShaderProgramHandle {
    renderer
        .create_shader_program(Arc::new(ColorVs), Arc::new(ColorFs))
        .unwrap()
}

fn color_resources(renderer: &SoftwareRenderer, color: [f32; 4]) -> ShaderResources {
    let block = renderer.create_uniform_block("ColorUniforms", std::mem::size_of::<ColorUniforms>());
    block.set_data(bytemuck::bytes_of(&ColorUniforms { color }));
    ShaderResources {
        blocks: vec![block],
        samplers: vec![],
    }
}

/// Screen-space triangle as position-only clip vertices (w = 1).
fn screen_triangle(points: [(f32, f32); 3], z: f32) -> Vec<f32> {
    let mut out = Vec::new();
    for (x, y) in points {
        out.extend_from_slice(&screen_vertex(x, y, z, SIZE as f32, SIZE as f32));
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn draw_pass(
    renderer: &mut SoftwareRenderer,
    fbo: &Arc<prism::Framebuffer>,
    clear: &ClearStates,
    vao: &Arc<prism::VertexArrayObject>,
    program: &ShaderProgramHandle,
    resources: &ShaderResources,
    states: RenderStates,
) {
    renderer.begin_render_pass(fbo, clear);
    renderer.set_viewport(0, 0, SIZE as i32, SIZE as i32);
    renderer.set_vertex_array_object(vao);
    renderer.set_shader_program(program);
    renderer.set_shader_resources(resources);
    let pipeline = renderer.create_pipeline_states(states);
    renderer.set_pipeline_states(&pipeline);
    renderer.draw();
    renderer.end_render_pass();
    renderer.wait_idle();
}

fn covered(color: Rgba) -> bool {
    color[0] > 200
}

#[test]
fn triangle_coverage_is_exact() {
    let mut renderer = renderer();
    let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, false);
    let vertices = screen_triangle([(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)], 0.0);
    let vao = make_vao(&renderer, &vertices, 4, &[4], &[0, 1, 2]);
    let program = color_program(&renderer);
    let resources = color_resources(&renderer, WHITE);

    draw_pass(
        &mut renderer,
        &fbo,
        &clear_all(),
        &vao,
        &program,
        &resources,
        RenderStates::default(),
    );

    let expected = [
        (0, 0),
        (1, 0),
        (2, 0),
        (3, 0),
        (0, 1),
        (1, 1),
        (2, 1),
        (0, 2),
        (1, 2),
        (0, 3),
    ];
    for y in 0..SIZE {
        for x in 0..SIZE {
            let inside = expected.contains(&(x, y));
            assert_eq!(
                covered(pixel(&color, x, y)),
                inside,
                "pixel ({x},{y}) expected inside={inside}"
            );
        }
    }
}

#[test]
fn cull_face_drops_exactly_one_winding() {
    let mut renderer = renderer();
    let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, false);
    let program = color_program(&renderer);
    let resources = color_resources(&renderer, WHITE);
    let states = RenderStates {
        cull_face: true,
        ..Default::default()
    };

    let vertices = screen_triangle([(0.0, 0.0), (7.0, 0.0), (0.0, 7.0)], 0.0);

    let ccw = make_vao(&renderer, &vertices, 4, &[4], &[0, 1, 2]);
    draw_pass(&mut renderer, &fbo, &clear_all(), &ccw, &program, &resources, states);
    let ccw_covered = covered(pixel(&color, 1, 1));

    let cw = make_vao(&renderer, &vertices, 4, &[4], &[0, 2, 1]);
    draw_pass(&mut renderer, &fbo, &clear_all(), &cw, &program, &resources, states);
    let cw_covered = covered(pixel(&color, 1, 1));

    assert!(ccw_covered != cw_covered);
}

#[test]
fn reverse_z_rejects_farther_draw() {
    let mut renderer = renderer();
    let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, false);
    let program = color_program(&renderer);
    let states = RenderStates {
        depth_test: true,
        depth_func: DepthFunction::Greater,
        ..Default::default()
    };
    let reverse_clear = ClearStates {
        color_flag: true,
        depth_flag: true,
        clear_color: Vec4::ZERO,
        clear_depth: 0.0,
    };

    let near = make_vao(
        &renderer,
        &screen_triangle([(0.0, 0.0), (7.0, 0.0), (0.0, 7.0)], 0.5),
        4,
        &[4],
        &[0, 1, 2],
    );
    let green = color_resources(&renderer, [0.0, 1.0, 0.0, 1.0]);
    draw_pass(&mut renderer, &fbo, &reverse_clear, &near, &program, &green, states);

    // a second triangle farther away (smaller reverse-Z depth) must lose
    let far = make_vao(
        &renderer,
        &screen_triangle([(0.0, 0.0), (7.0, 0.0), (0.0, 7.0)], 0.2),
        4,
        &[4],
        &[0, 1, 2],
    );
    let red = color_resources(&renderer, [1.0, 0.0, 0.0, 1.0]);
    renderer.begin_render_pass(
        &fbo,
        &ClearStates {
            color_flag: false,
            depth_flag: false,
            ..Default::default()
        },
    );
    renderer.set_viewport(0, 0, SIZE as i32, SIZE as i32);
    renderer.set_vertex_array_object(&far);
    renderer.set_shader_program(&program);
    renderer.set_shader_resources(&red);
    let pipeline = renderer.create_pipeline_states(states);
    renderer.set_pipeline_states(&pipeline);
    renderer.draw();
    renderer.wait_idle();

    let out = pixel(&color, 1, 1);
    assert!(out[1] > 200, "green must survive, got {out:?}");
    assert!(out[0] < 50);
}

#[test]
fn blending_identity_matches_plain_write() {
    let mut renderer = renderer();
    let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, false);
    let program = color_program(&renderer);
    let resources = color_resources(&renderer, [0.25, 0.5, 0.75, 1.0]);
    let vao = make_vao(
        &renderer,
        &screen_triangle([(0.0, 0.0), (7.0, 0.0), (0.0, 7.0)], 0.0),
        4,
        &[4],
        &[0, 1, 2],
    );

    draw_pass(
        &mut renderer,
        &fbo,
        &clear_all(),
        &vao,
        &program,
        &resources,
        RenderStates::default(),
    );
    let plain = pixel(&color, 1, 1);

    // ONE/ZERO + ADD is the identity configuration
    let blend_states = RenderStates {
        blend: true,
        ..Default::default()
    };
    draw_pass(
        &mut renderer,
        &fbo,
        &clear_all(),
        &vao,
        &program,
        &resources,
        blend_states,
    );
    assert_eq!(pixel(&color, 1, 1), plain);
}

#[test]
fn alpha_blend_over_cleared_background() {
    let mut renderer = renderer();
    let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, false);
    let program = color_program(&renderer);
    let resources = color_resources(&renderer, [1.0, 0.0, 0.0, 0.5]);
    let vao = make_vao(
        &renderer,
        &screen_triangle([(0.0, 0.0), (7.0, 0.0), (0.0, 7.0)], 0.0),
        4,
        &[4],
        &[0, 1, 2],
    );
    let mut states = RenderStates {
        blend: true,
        ..Default::default()
    };
    states
        .blend_params
        .set_blend_factor(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);

    let clear = ClearStates {
        color_flag: true,
        depth_flag: true,
        clear_color: Vec4::new(0.0, 0.0, 1.0, 1.0),
        clear_depth: 1.0,
    };
    draw_pass(&mut renderer, &fbo, &clear, &vao, &program, &resources, states);

    let out = pixel(&color, 1, 1);
    assert!(out[0].abs_diff(127) <= 2, "r = {}", out[0]);
    assert!(out[2].abs_diff(127) <= 2, "b = {}", out[2]);
}

#[test]
fn early_z_does_not_change_output() {
    let draw_scene = |early_z: bool| -> Vec<Rgba> {
        let mut renderer = SoftwareRenderer::new(RendererSettings {
            early_z,
            ..Default::default()
        })
        .unwrap();
        let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, false);
        let program = color_program(&renderer);
        let states = RenderStates {
            depth_test: true,
            ..Default::default()
        };

        // near green first, far red second: red must lose everywhere
        let near = make_vao(
            &renderer,
            &screen_triangle([(0.0, 0.0), (7.0, 0.0), (0.0, 7.0)], 0.2),
            4,
            &[4],
            &[0, 1, 2],
        );
        let green = color_resources(&renderer, [0.0, 1.0, 0.0, 1.0]);
        draw_pass(&mut renderer, &fbo, &clear_all(), &near, &program, &green, states);

        let far = make_vao(
            &renderer,
            &screen_triangle([(0.0, 0.0), (7.0, 0.0), (0.0, 7.0)], 0.8),
            4,
            &[4],
            &[0, 1, 2],
        );
        let red = color_resources(&renderer, [1.0, 0.0, 0.0, 1.0]);
        renderer.begin_render_pass(
            &fbo,
            &ClearStates {
                color_flag: false,
                depth_flag: false,
                ..Default::default()
            },
        );
        renderer.set_viewport(0, 0, SIZE as i32, SIZE as i32);
        renderer.set_vertex_array_object(&far);
        renderer.set_shader_program(&program);
        renderer.set_shader_resources(&red);
        let pipeline = renderer.create_pipeline_states(states);
        renderer.set_pipeline_states(&pipeline);
        renderer.draw();
        renderer.wait_idle();

        (0..SIZE * SIZE)
            .map(|i| pixel(&color, i % SIZE, i / SIZE))
            .collect()
    };

    assert_eq!(draw_scene(true), draw_scene(false));
}

#[test]
fn msaa_resolve_averages_edge_pixels() {
    let mut renderer = renderer();
    let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, true);
    let program = color_program(&renderer);
    let resources = color_resources(&renderer, WHITE);
    let vao = make_vao(
        &renderer,
        &screen_triangle([(0.0, 0.0), (8.0, 0.0), (0.0, 8.0)], 0.0),
        4,
        &[4],
        &[0, 1, 2],
    );
    draw_pass(
        &mut renderer,
        &fbo,
        &clear_all(),
        &vao,
        &program,
        &resources,
        RenderStates::default(),
    );

    // fully covered pixel resolves to full white
    assert_eq!(pixel(&color, 1, 1)[0], 255);
    // a pixel straddling the hypotenuse resolves to partial coverage
    let edge = pixel(&color, 3, 4)[0];
    assert!(edge > 0 && edge < 255, "edge = {edge}");
}

#[test]
fn repeated_draw_is_idempotent() {
    let render = |passes: u32| -> Vec<Rgba> {
        let mut renderer = renderer();
        let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, true);
        let program = color_program(&renderer);
        let resources = color_resources(&renderer, WHITE);
        let vao = make_vao(
            &renderer,
            &screen_triangle([(0.0, 0.0), (8.0, 0.0), (0.0, 8.0)], 0.0),
            4,
            &[4],
            &[0, 1, 2],
        );
        renderer.begin_render_pass(&fbo, &clear_all());
        renderer.set_viewport(0, 0, SIZE as i32, SIZE as i32);
        renderer.set_vertex_array_object(&vao);
        renderer.set_shader_program(&program);
        renderer.set_shader_resources(&resources);
        let pipeline = renderer.create_pipeline_states(RenderStates::default());
        renderer.set_pipeline_states(&pipeline);
        for _ in 0..passes {
            renderer.draw();
        }
        renderer.end_render_pass();
        renderer.wait_idle();
        (0..SIZE * SIZE)
            .map(|i| pixel(&color, i % SIZE, i / SIZE))
            .collect()
    };

    assert_eq!(render(1), render(2));
}

// ============================================================================
// Perspective-correct interpolation
// ============================================================================

struct VaryVs;
struct VaryFs;

impl ShaderStage for VaryVs {
    fn varyings_count(&self) -> usize {
        1
    }
}
impl VertexStage for VaryVs {
    fn shader_main(&self, io: &mut VertexShaderIo<'_>) {
        let data: [f32; 5] = io.attributes_as();
        io.builtins.position = Vec4::new(data[0], data[1], data[2], data[3]);
        io.varyings[0] = data[4];
    }
}
impl ShaderStage for VaryFs {
    fn varyings_count(&self) -> usize {
        1
    }
}
impl FragmentStage for VaryFs {
    fn shader_main(&self, io: &mut FragmentShaderIo<'_>) {
        io.builtins.frag_color = Vec4::splat(io.varyings[0] / 255.0);
    }
}

#[test]
fn varyings_interpolate_perspective_correct() {
    let mut renderer = renderer();
    let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, false);
    let program = renderer
        .create_shader_program(Arc::new(VaryVs), Arc::new(VaryFs))
        .unwrap();

    // clip = (ndc * w, w) with unequal w, varying f per vertex
    let w = [1.0f32, 2.0, 4.0];
    let f = [0.0f32, 255.0, 255.0];
    let ndc = [(-1.0f32, -1.0f32), (1.0, -1.0), (-1.0, 1.0)];
    let mut vertices = Vec::new();
    for i in 0..3 {
        vertices.extend_from_slice(&[
            ndc[i].0 * w[i],
            ndc[i].1 * w[i],
            0.0,
            w[i],
            f[i],
        ]);
    }
    let vao = make_vao(&renderer, &vertices, 5, &[4, 1], &[0, 1, 2]);

    draw_pass(
        &mut renderer,
        &fbo,
        &clear_all(),
        &vao,
        &program,
        &ShaderResources::default(),
        RenderStates::default(),
    );

    // screen-space barycentric of pixel (3, 3) against (0,0) (8,0) (0,8)
    let (cx, cy) = (3.5f32, 3.5);
    let beta = cx / 8.0;
    let gamma = cy / 8.0;
    let alpha = 1.0 - beta - gamma;
    let num = alpha * f[0] / w[0] + beta * f[1] / w[1] + gamma * f[2] / w[2];
    let den = alpha / w[0] + beta / w[1] + gamma / w[2];
    let expected = num / den;

    let out = pixel(&color, 3, 3);
    assert!(
        (f32::from(out[0]) - expected).abs() <= 2.0,
        "got {}, expected {expected}",
        out[0]
    );
}

// ============================================================================
// Textured draw
// ============================================================================

struct TexVs;
struct TexFs;

const TEX_DESCS: &[UniformDesc] = &[UniformDesc::sampler_with_derivative("uTexture", 0)];

impl ShaderStage for TexVs {
    fn uniform_descs(&self) -> &[UniformDesc] {
        TEX_DESCS
    }
    fn varyings_count(&self) -> usize {
        2
    }
}
impl VertexStage for TexVs {
    fn shader_main(&self, io: &mut VertexShaderIo<'_>) {
        let data: [f32; 6] = io.attributes_as();
        io.builtins.position = Vec4::new(data[0], data[1], data[2], data[3]);
        io.varyings[0] = data[4];
        io.varyings[1] = data[5];
    }
}
impl ShaderStage for TexFs {
    fn uniform_descs(&self) -> &[UniformDesc] {
        TEX_DESCS
    }
    fn varyings_count(&self) -> usize {
        2
    }
}
impl FragmentStage for TexFs {
    fn shader_main(&self, io: &mut FragmentShaderIo<'_>) {
        let uv = Vec2::new(io.varyings[0], io.varyings[1]);
        io.builtins.frag_color = io.texture_2d(0, uv);
    }
}

#[test]
fn textured_triangle_samples_nearest() {
    let mut renderer = renderer();
    let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, false);
    let program = renderer
        .create_shader_program(Arc::new(TexVs), Arc::new(TexFs))
        .unwrap();

    let texture = renderer
        .create_texture(TextureDesc {
            width: 2,
            height: 2,
            texture_type: TextureType::D2,
            format: TextureFormat::Rgba8,
            usage: TextureUsage::SAMPLER | TextureUsage::UPLOAD_DATA,
            use_mipmaps: false,
            multi_sample: false,
            tag: "checker".into(),
        })
        .unwrap();
    texture.set_sampler_desc(SamplerDesc {
        filter_min: FilterMode::Nearest,
        wrap_s: WrapMode::ClampToEdge,
        ..Default::default()
    });
    texture.set_image_data_rgba8(vec![Arc::new(
        PixelBuffer::from_data(
            2,
            2,
            &[
                [255, 0, 0, 255],
                [0, 255, 0, 255],
                [0, 0, 255, 255],
                [255, 255, 255, 255],
            ],
        )
        .unwrap(),
    )]);

    let sampler = renderer.create_uniform_sampler("uTexture", TextureType::D2, TextureFormat::Rgba8);
    sampler.set_texture(texture);
    let resources = ShaderResources {
        blocks: vec![],
        samplers: vec![sampler],
    };

    // full-screen lower-left triangle with uv matching ndc
    let mut vertices = Vec::new();
    for ((x, y), (u, v)) in [
        ((-1.0f32, -1.0f32), (0.0f32, 0.0f32)),
        ((1.0, -1.0), (1.0, 0.0)),
        ((-1.0, 1.0), (0.0, 1.0)),
    ] {
        vertices.extend_from_slice(&[x, y, 0.0, 1.0, u, v]);
    }
    let vao = make_vao(&renderer, &vertices, 6, &[4, 2], &[0, 1, 2]);

    draw_pass(
        &mut renderer,
        &fbo,
        &clear_all(),
        &vao,
        &program,
        &resources,
        RenderStates::default(),
    );

    // uv < 0.5 in both axes -> texel (0,0) red
    assert_eq!(pixel(&color, 1, 1), [255, 0, 0, 255]);
    // uv.x > 0.5 -> texel (1,0) green
    assert_eq!(pixel(&color, 6, 0), [0, 255, 0, 255]);
    // uv.y > 0.5 -> texel (0,1) blue
    assert_eq!(pixel(&color, 0, 6), [0, 0, 255, 255]);
}

// ============================================================================
// Polygon modes, lines, points, discard, clipping
// ============================================================================

#[test]
fn wireframe_draws_edges_only() {
    let mut renderer = renderer();
    let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, false);
    let program = color_program(&renderer);
    let resources = color_resources(&renderer, WHITE);
    let vao = make_vao(
        &renderer,
        &screen_triangle([(0.5, 0.5), (7.5, 0.5), (0.5, 7.5)], 0.0),
        4,
        &[4],
        &[0, 1, 2],
    );
    let states = RenderStates {
        polygon_mode: PolygonMode::Line,
        ..Default::default()
    };
    draw_pass(&mut renderer, &fbo, &clear_all(), &vao, &program, &resources, states);

    // bottom edge and left edge are covered, the interior is not
    assert!(covered(pixel(&color, 3, 0)));
    assert!(covered(pixel(&color, 0, 3)));
    assert!(!covered(pixel(&color, 2, 2)));
}

#[test]
fn point_primitive_splats_one_pixel() {
    let mut renderer = renderer();
    let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, false);
    let program = color_program(&renderer);
    let resources = color_resources(&renderer, WHITE);
    let vertices = screen_vertex(3.5, 4.5, 0.0, SIZE as f32, SIZE as f32);
    let vao = make_vao(&renderer, &vertices, 4, &[4], &[0]);
    let states = RenderStates {
        primitive_type: PrimitiveType::Point,
        ..Default::default()
    };
    draw_pass(&mut renderer, &fbo, &clear_all(), &vao, &program, &resources, states);

    assert!(covered(pixel(&color, 3, 4)));
    assert!(!covered(pixel(&color, 5, 4)));
    assert!(!covered(pixel(&color, 3, 6)));
}

#[test]
fn line_primitive_covers_span() {
    let mut renderer = renderer();
    let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, false);
    let program = color_program(&renderer);
    let resources = color_resources(&renderer, WHITE);
    let mut vertices = screen_vertex(0.5, 2.5, 0.0, SIZE as f32, SIZE as f32).to_vec();
    vertices.extend_from_slice(&screen_vertex(7.5, 2.5, 0.0, SIZE as f32, SIZE as f32));
    let vao = make_vao(&renderer, &vertices, 4, &[4], &[0, 1]);
    let states = RenderStates {
        primitive_type: PrimitiveType::Line,
        ..Default::default()
    };
    draw_pass(&mut renderer, &fbo, &clear_all(), &vao, &program, &resources, states);

    for x in 0..SIZE {
        assert!(covered(pixel(&color, x, 2)), "x = {x}");
    }
    assert!(!covered(pixel(&color, 3, 4)));
}

const DISCARD_FS_DESCS: &[UniformDesc] = &[UniformDesc::block("ColorUniforms", 0)];

struct DiscardFs;
impl ShaderStage for DiscardFs {
    fn uniforms_size(&self) -> usize {
        std::mem::size_of::<ColorUniforms>()
    }
    fn uniform_descs(&self) -> &[UniformDesc] {
        DISCARD_FS_DESCS
    }
}
impl FragmentStage for DiscardFs {
    fn shader_main(&self, io: &mut FragmentShaderIo<'_>) {
        io.builtins.discard = true;
    }
}

#[test]
fn fragment_discard_skips_all_writes() {
    let mut renderer = renderer();
    let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, false);
    let program = renderer
        .create_shader_program(Arc::new(ColorVs), Arc::new(DiscardFs))
        .unwrap();
    let resources = color_resources(&renderer, WHITE);
    let vao = make_vao(
        &renderer,
        &screen_triangle([(0.0, 0.0), (7.0, 0.0), (0.0, 7.0)], 0.0),
        4,
        &[4],
        &[0, 1, 2],
    );
    draw_pass(
        &mut renderer,
        &fbo,
        &clear_all(),
        &vao,
        &program,
        &resources,
        RenderStates::default(),
    );

    for y in 0..SIZE {
        for x in 0..SIZE {
            assert!(!covered(pixel(&color, x, y)), "({x},{y})");
        }
    }
}

#[test]
fn near_plane_clip_still_draws_visible_part() {
    let mut renderer = renderer();
    let (color, _depth, fbo) = make_target(&renderer, SIZE, SIZE, false);
    let program = color_program(&renderer);
    let resources = color_resources(&renderer, WHITE);

    // one vertex behind the near plane (z < -w); the clip walk turns the
    // triangle into a quad whose in-range band hugs the far edge
    let vertices: Vec<f32> = [
        [-1.0f32, -1.0, -2.0, 1.0],
        [1.0, -1.0, 0.5, 1.0],
        [-1.0, 1.0, 0.5, 1.0],
    ]
    .concat();
    let vao = make_vao(&renderer, &vertices, 4, &[4], &[0, 1, 2]);
    draw_pass(
        &mut renderer,
        &fbo,
        &clear_all(),
        &vao,
        &program,
        &resources,
        RenderStates::default(),
    );

    // near the surviving edge the interpolated depth is back in range
    assert!(covered(pixel(&color, 4, 2)));
    // the corner owned by the clipped vertex stays empty
    assert!(!covered(pixel(&color, 1, 1)));
}
