//! Rasterization.
//!
//! Points splat a `point_size` square, lines run Bresenham with linear
//! varying interpolation, and filled triangles are tiled into
//! `raster_block_size` blocks dispatched to the worker pool. Each block
//! walks 2x2 pixel quads so fragment-shader derivatives are defined by
//! finite differences among the quad's corners; with 4x MSAA every pixel
//! carries four rotated-grid coverage samples plus a fifth center sample
//! used for shading.

use std::sync::Arc;

use glam::{IVec2, Vec2, Vec3, Vec4};
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::renderer::blend::blend_color;
use crate::renderer::clip;
use crate::renderer::context::{
    DrawList, PrimitiveHolder, RenderTargets, Viewport, SAMPLE_LOCATIONS_4X,
};
use crate::renderer::depth::depth_test;
use crate::renderer::interp::{interpolate_barycentric, interpolate_linear};
use crate::renderer::shader::ShaderProgram;
use crate::resources::image::{Rgba, Texel};
use crate::resources::states::RenderStates;
use crate::utils::memory::AlignedF32Buffer;
use crate::utils::thread_pool::ThreadPool;

/// Fixed-function state snapshot shared by every raster path of a draw.
#[derive(Debug, Clone)]
pub(crate) struct RasterContext {
    pub targets: RenderTargets,
    pub states: RenderStates,
    pub viewport: Viewport,
    pub raster_samples: u32,
    pub early_z: bool,
}

impl RasterContext {
    /// Depth test with optional write-back; out-of-target coordinates
    /// fail closed.
    fn process_depth_test(&self, x: i32, y: i32, depth: f32, sample: u32, skip_write: bool) -> bool {
        if !self.states.depth_test || self.targets.depth.is_none() {
            return true;
        }
        let depth = depth.clamp(self.viewport.abs_min_depth, self.viewport.abs_max_depth);
        if x < 0 || y < 0 {
            return false;
        }
        let (x, y) = (x as u32, y as u32);
        let Some(stored) = self.targets.frame_depth(x, y, sample) else {
            return false;
        };
        if !depth_test(depth, stored, self.states.depth_func) {
            return false;
        }
        if !skip_write && self.states.depth_mask {
            self.targets.set_frame_depth(x, y, sample, depth);
        }
        true
    }

    /// Depth test, blend and color write for one sample.
    fn per_sample_operations(&self, x: i32, y: i32, depth: f32, color: Vec4, sample: u32) {
        if !self.process_depth_test(x, y, depth, sample, false) {
            return;
        }
        if self.targets.color.is_none() || x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);

        let mut color = color.clamp(Vec4::ZERO, Vec4::ONE);
        if self.states.blend {
            let dst = self
                .targets
                .frame_color(x, y, sample)
                .map_or(Vec4::ZERO, |texel| texel.to_vec4() / 255.0);
            color = blend_color(color, dst, &self.states.blend_params)
                .clamp(Vec4::ZERO, Vec4::ONE);
        }
        self.targets
            .set_frame_color(x, y, sample, Rgba::from_vec4(color * 255.0));
    }
}

/// Barycentric coordinates of `p`, or `None` when outside (or the
/// triangle is degenerate).
///
/// `flat_x`/`flat_y` hold the vertex coordinates pre-interleaved as
/// `(v2, v1, v0, 0)` so one vector subtraction feeds the cross product.
fn barycentric(flat_x: Vec4, flat_y: Vec4, v0: Vec4, p: Vec2) -> Option<Vec3> {
    let vec0 = Vec3::new(flat_x.x - v0.x, flat_x.y - v0.x, flat_x.z - p.x);
    let vec1 = Vec3::new(flat_y.x - v0.y, flat_y.y - v0.y, flat_y.z - p.y);
    let u = vec0.cross(vec1);
    if u.z.abs() < f32::EPSILON {
        return None;
    }
    let u = u / u.z;
    let bc = Vec3::new(1.0 - (u.x + u.y), u.y, u.x);
    if bc.x < 0.0 || bc.y < 0.0 || bc.z < 0.0 {
        return None;
    }
    Some(bc)
}

#[derive(Debug, Clone, Copy, Default)]
struct SampleContext {
    inside: bool,
    fbo_coord: IVec2,
    /// `(x, y)` sample location; `z`/`w` filled by depth interpolation.
    position: Vec4,
    barycentric: Vec3,
}

#[derive(Debug, Default)]
struct PixelContext {
    inside: bool,
    samples: SmallVec<[SampleContext; 5]>,
    /// Index of the sample used for shading.
    shading: usize,
    sample_count: usize,
    coverage: usize,
}

impl PixelContext {
    fn init(&mut self, x: f32, y: f32, sample_count: u32) {
        self.inside = false;
        self.coverage = 0;
        self.samples.clear();
        let coord = IVec2::new(x as i32, y as i32);
        if sample_count == 4 {
            self.sample_count = 4;
            for location in SAMPLE_LOCATIONS_4X {
                self.samples.push(SampleContext {
                    fbo_coord: coord,
                    position: Vec4::new(x + location.x, y + location.y, 0.0, 0.0),
                    ..Default::default()
                });
            }
            // 5th center sample drives shading
            self.samples.push(SampleContext {
                fbo_coord: coord,
                position: Vec4::new(x + 0.5, y + 0.5, 0.0, 0.0),
                ..Default::default()
            });
            self.shading = 4;
        } else {
            self.sample_count = 1;
            self.samples.push(SampleContext {
                fbo_coord: coord,
                position: Vec4::new(x + 0.5, y + 0.5, 0.0, 0.0),
                ..Default::default()
            });
            self.shading = 0;
        }
    }

    fn init_coverage(&mut self) {
        if self.sample_count > 1 {
            self.coverage = self.samples[..self.sample_count]
                .iter()
                .filter(|s| s.inside)
                .count();
            self.inside = self.coverage > 0;
        } else {
            self.coverage = 1;
            self.inside = self.samples[0].inside;
        }
    }

    fn init_shading_sample(&mut self) {
        if self.samples[self.shading].inside {
            return;
        }
        if let Some(idx) = self.samples.iter().position(|s| s.inside) {
            self.shading = idx;
        }
    }

    fn shading_sample(&self) -> &SampleContext {
        &self.samples[self.shading]
    }
}

/// 2x2 pixel block working state, one instance per worker thread.
///
/// ```text
///   p2--p3
///   |   |
///   p0--p1
/// ```
pub(crate) struct PixelQuadContext {
    pixels: [PixelContext; 4],
    vert_pos: [Vec4; 3],
    vert_flat_x: Vec4,
    vert_flat_y: Vec4,
    vert_z: Vec3,
    /// Per-vertex `1/w`, fourth lane unused.
    vert_w: Vec4,
    vert_indices: [usize; 3],
    front_facing: bool,
    program: ShaderProgram,
    varyings_count: usize,
    varyings_aligned_count: usize,
    varyings_pool: AlignedF32Buffer,
}

impl PixelQuadContext {
    fn new(program: ShaderProgram, varyings_count: usize, varyings_aligned_count: usize) -> Self {
        Self {
            pixels: Default::default(),
            vert_pos: [Vec4::ZERO; 3],
            vert_flat_x: Vec4::ZERO,
            vert_flat_y: Vec4::ZERO,
            vert_z: Vec3::ZERO,
            vert_w: Vec4::W,
            vert_indices: [0; 3],
            front_facing: true,
            program,
            varyings_count,
            varyings_aligned_count,
            varyings_pool: AlignedF32Buffer::zeroed(4 * varyings_aligned_count),
        }
    }

    fn init(&mut self, x: f32, y: f32, sample_count: u32) {
        self.pixels[0].init(x, y, sample_count);
        self.pixels[1].init(x + 1.0, y, sample_count);
        self.pixels[2].init(x, y + 1.0, sample_count);
        self.pixels[3].init(x + 1.0, y + 1.0, sample_count);
    }

    fn check_inside(&self) -> bool {
        self.pixels.iter().any(|p| p.inside)
    }
}

#[derive(Debug, Clone, Copy)]
struct TileBounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

/// Triangle fill raster job shared by all tile tasks of one draw.
pub(crate) struct RasterJob {
    ctx: RasterContext,
    list: DrawList,
    quad_ctxs: Vec<Mutex<PixelQuadContext>>,
    block_size: u32,
}

// ============================================================================
// Entry points per primitive / polygon mode
// ============================================================================

pub(crate) fn draw_points(
    ctx: &RasterContext,
    list: &DrawList,
    mut program: ShaderProgram,
    point_size: f32,
) {
    for primitive in &list.primitives {
        if primitive.discard {
            continue;
        }
        let index = primitive.indices[0];
        let frag_pos = list.vertices[index].frag_pos;
        raster_point(
            ctx,
            &mut program,
            list.varyings_of(index),
            frag_pos,
            point_size,
        );
    }
}

pub(crate) fn draw_lines(
    ctx: &RasterContext,
    list: &DrawList,
    mut program: ShaderProgram,
    line_width: f32,
) {
    for primitive in &list.primitives {
        if primitive.discard {
            continue;
        }
        raster_line(
            ctx,
            &mut program,
            list,
            primitive.indices[0],
            primitive.indices[1],
            line_width,
        );
    }
}

/// Triangles in point polygon mode: splat each corner that survives
/// point clipping.
pub(crate) fn draw_polygons_point(
    ctx: &RasterContext,
    list: DrawList,
    mut program: ShaderProgram,
    point_size: f32,
) {
    for primitive in list.primitives.clone() {
        if primitive.discard {
            continue;
        }
        for index in primitive.indices {
            let mut point = PrimitiveHolder {
                discard: false,
                front_facing: primitive.front_facing,
                indices: [index, 0, 0],
            };
            clip::clip_point(&list, &mut point);
            if point.discard {
                continue;
            }
            let frag_pos = list.vertices[index].frag_pos;
            raster_point(ctx, &mut program, list.varyings_of(index), frag_pos, point_size);
        }
    }
}

/// Triangles in line polygon mode: clip each edge in place (new vertices
/// get divide + viewport applied) and draw it with the line rasterizer.
pub(crate) fn draw_polygons_line(
    ctx: &RasterContext,
    mut list: DrawList,
    mut program: ShaderProgram,
    line_width: f32,
    viewport: &Viewport,
) {
    for i in 0..list.primitives.len() {
        let primitive = list.primitives[i];
        if primitive.discard {
            continue;
        }
        for e in 0..3 {
            let mut line = PrimitiveHolder {
                discard: false,
                front_facing: primitive.front_facing,
                indices: [primitive.indices[e], primitive.indices[(e + 1) % 3], 0],
            };
            clip::clip_line(&mut list, &mut line, &mut program, viewport, true);
            if line.discard {
                continue;
            }
            raster_line(
                ctx,
                &mut program,
                &list,
                line.indices[0],
                line.indices[1],
                line_width,
            );
        }
    }
}

/// Filled triangles: tile each one and push a task per tile. The caller
/// waits on the pool afterwards.
pub(crate) fn draw_polygons_fill(
    ctx: &RasterContext,
    list: DrawList,
    program: &ShaderProgram,
    pool: &ThreadPool,
    block_size: u32,
) {
    let varyings_count = list.varyings_count;
    let varyings_aligned_count = list.varyings_aligned_count;
    let quad_ctxs = (0..pool.thread_count())
        .map(|_| {
            Mutex::new(PixelQuadContext::new(
                program.clone_for_thread(),
                varyings_count,
                varyings_aligned_count,
            ))
        })
        .collect();

    let job = Arc::new(RasterJob {
        ctx: ctx.clone(),
        list,
        quad_ctxs,
        block_size,
    });

    for primitive in job.list.primitives.clone() {
        if primitive.discard {
            continue;
        }
        let positions = [
            job.list.vertices[primitive.indices[0]].frag_pos,
            job.list.vertices[primitive.indices[1]].frag_pos,
            job.list.vertices[primitive.indices[2]].frag_pos,
        ];
        let mut bounds = triangle_bounds(&positions, ctx.viewport.width, ctx.viewport.height);
        // expand one pixel against edge precision loss
        bounds.min_x -= 1.0;
        bounds.min_y -= 1.0;

        let block = block_size as f32;
        let blocks_x = ((bounds.max_x - bounds.min_x + block - 1.0) / block) as i32;
        let blocks_y = ((bounds.max_y - bounds.min_y + block - 1.0) / block) as i32;

        for block_y in 0..blocks_y {
            for block_x in 0..blocks_x {
                let job = Arc::clone(&job);
                pool.push_task(move |thread_id| {
                    job.raster_block(thread_id, primitive, bounds, block_x, block_y);
                });
            }
        }
    }
}

// ============================================================================
// Point / line rasterization
// ============================================================================

/// Splats a `point_size` square centered on `frag_pos`, shading each
/// covered pixel.
fn raster_point(
    ctx: &RasterContext,
    program: &mut ShaderProgram,
    varyings: &[f32],
    frag_pos: Vec4,
    point_size: f32,
) {
    if ctx.targets.color.is_none() {
        return;
    }
    let left = frag_pos.x - point_size / 2.0 + 0.5;
    let right = left + point_size;
    let top = frag_pos.y - point_size / 2.0 + 0.5;
    let bottom = top + point_size;

    for x in (left as i32)..(right as i32) {
        for y in (top as i32)..(bottom as i32) {
            let screen = Vec4::new(x as f32, y as f32, frag_pos.z, frag_pos.w);
            exec_fragment(program, screen, true, varyings, None);
            if program.builtins().discard {
                continue;
            }
            let color = program.builtins().frag_color;
            for sample in 0..ctx.raster_samples {
                ctx.per_sample_operations(x, y, screen.z, color, sample);
            }
        }
    }
}

/// Bresenham line with linear interpolation of depth, `1/w` and the
/// varyings; each covered pixel expands through the point rasterizer to
/// honor `line_width`.
fn raster_line(
    ctx: &RasterContext,
    program: &mut ShaderProgram,
    list: &DrawList,
    i0: usize,
    i1: usize,
    line_width: f32,
) {
    let v0 = &list.vertices[i0];
    let v1 = &list.vertices[i1];

    let mut x0 = v0.frag_pos.x as i32;
    let mut y0 = v0.frag_pos.y as i32;
    let mut x1 = v1.frag_pos.x as i32;
    let mut y1 = v1.frag_pos.y as i32;
    let mut z0 = v0.frag_pos.z;
    let mut z1 = v1.frag_pos.z;
    let mut w0 = v0.frag_pos.w;
    let mut w1 = v1.frag_pos.w;

    let mut steep = false;
    if (x0 - x1).abs() < (y0 - y1).abs() {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
        steep = true;
    }

    let mut varyings_in = [list.varyings_of(i0), list.varyings_of(i1)];

    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
        std::mem::swap(&mut z0, &mut z1);
        std::mem::swap(&mut w0, &mut w1);
        varyings_in.swap(0, 1);
    }

    let dx = x1 - x0;
    let dy = y1 - y0;

    let mut error = 0;
    let d_error = 2 * dy.abs();
    let mut y = y0;

    let mut varyings = AlignedF32Buffer::zeroed(list.varyings_aligned_count);

    for x in x0..=x1 {
        let t = if dx == 0 {
            0.0
        } else {
            (x - x0) as f32 / dx as f32
        };
        let mut pos = Vec4::new(
            x as f32,
            y as f32,
            z0 + (z1 - z0) * t,
            w0 + (w1 - w0) * t,
        );
        if steep {
            pos = Vec4::new(pos.y, pos.x, pos.z, pos.w);
        }

        if list.varyings_count > 0 {
            interpolate_linear(
                &mut varyings.as_mut_slice()[..list.varyings_count],
                varyings_in[0],
                varyings_in[1],
                t,
            );
        }

        raster_point(ctx, program, varyings.as_slice(), pos, line_width);

        error += d_error;
        if error > dx {
            y += if y1 > y0 { 1 } else { -1 };
            error -= 2 * dx;
        }
    }
}

fn exec_fragment(
    program: &mut ShaderProgram,
    screen_pos: Vec4,
    front_facing: bool,
    varyings: &[f32],
    quad: Option<[&[f32]; 4]>,
) {
    let builtins = program.builtins_mut();
    builtins.frag_coord = screen_pos;
    builtins.front_facing = front_facing;
    program.exec_fragment_shader(varyings, quad);
}

// ============================================================================
// Triangle fill
// ============================================================================

/// Screen-space bounding box, expanded half a pixel and clamped to the
/// viewport.
fn triangle_bounds(positions: &[Vec4; 3], width: f32, height: f32) -> TileBounds {
    let min_x = positions.iter().map(|p| p.x).fold(f32::MAX, f32::min);
    let min_y = positions.iter().map(|p| p.y).fold(f32::MAX, f32::min);
    let max_x = positions.iter().map(|p| p.x).fold(f32::MIN, f32::max);
    let max_y = positions.iter().map(|p| p.y).fold(f32::MIN, f32::max);
    TileBounds {
        min_x: (min_x - 0.5).max(0.0),
        min_y: (min_y - 0.5).max(0.0),
        max_x: (max_x + 0.5).min(width - 1.0),
        max_y: (max_y + 0.5).min(height - 1.0),
    }
}

impl RasterJob {
    /// Rasterizes one tile of one triangle on a worker thread.
    fn raster_block(
        &self,
        thread_id: usize,
        primitive: PrimitiveHolder,
        bounds: TileBounds,
        block_x: i32,
        block_y: i32,
    ) {
        let mut guard = self.quad_ctxs[thread_id].lock();
        let quad = &mut *guard;

        let p = [
            self.list.vertices[primitive.indices[0]].frag_pos,
            self.list.vertices[primitive.indices[1]].frag_pos,
            self.list.vertices[primitive.indices[2]].frag_pos,
        ];
        quad.front_facing = primitive.front_facing;
        quad.vert_pos = p;
        quad.vert_flat_x = Vec4::new(p[2].x, p[1].x, p[0].x, 0.0);
        quad.vert_flat_y = Vec4::new(p[2].y, p[1].y, p[0].y, 0.0);
        quad.vert_z = Vec3::new(p[0].z, p[1].z, p[2].z);
        quad.vert_w = Vec4::new(p[0].w, p[1].w, p[2].w, 1.0);
        quad.vert_indices = primitive.indices;

        let block = self.block_size as i32;
        let start_x = (bounds.min_x + (block_x * block) as f32) as i32;
        let start_y = (bounds.min_y + (block_y * block) as f32) as i32;

        let mut y = start_y + 1;
        while y < start_y + block && y as f32 <= bounds.max_y {
            let mut x = start_x + 1;
            while x < start_x + block && x as f32 <= bounds.max_x {
                quad.init(x as f32, y as f32, self.ctx.raster_samples);
                self.raster_pixel_quad(quad);
                x += 2;
            }
            y += 2;
        }
    }

    /// Coverage, depth, early-Z, varying interpolation, shading and
    /// per-sample operations for one 2x2 quad.
    fn raster_pixel_quad(&self, quad: &mut PixelQuadContext) {
        // coverage
        for pixel in &mut quad.pixels {
            for sample in &mut pixel.samples {
                match barycentric(
                    quad.vert_flat_x,
                    quad.vert_flat_y,
                    quad.vert_pos[0],
                    Vec2::new(sample.position.x, sample.position.y),
                ) {
                    Some(bc) => {
                        sample.inside = true;
                        sample.barycentric = bc;
                    }
                    None => sample.inside = false,
                }
            }
            pixel.init_coverage();
            pixel.init_shading_sample();
        }
        if !quad.check_inside() {
            return;
        }

        // depth interpolation, clamp-reject and perspective correction
        let viewport = &self.ctx.viewport;
        for pixel in &mut quad.pixels {
            for sample in &mut pixel.samples {
                if !sample.inside {
                    continue;
                }
                sample.position.z = quad.vert_z.dot(sample.barycentric);
                sample.position.w = quad.vert_w.truncate().dot(sample.barycentric);

                if sample.position.z < viewport.abs_min_depth
                    || sample.position.z > viewport.abs_max_depth
                {
                    sample.inside = false;
                }

                // weight by 1/w for perspective-correct varyings
                sample.barycentric *= quad.vert_w.truncate() / sample.position.w;
            }
        }

        if self.ctx.early_z && self.ctx.states.depth_test && !self.early_z_test(quad) {
            return;
        }

        // all four pixels interpolate so derivatives stay defined
        let sources = [
            self.list.varyings_of(quad.vert_indices[0]),
            self.list.varyings_of(quad.vert_indices[1]),
            self.list.varyings_of(quad.vert_indices[2]),
        ];
        let count = quad.varyings_count;
        let aligned = quad.varyings_aligned_count;
        if count > 0 {
            for i in 0..4 {
                let bc = quad.pixels[i].shading_sample().barycentric;
                let slot = &mut quad.varyings_pool.as_mut_slice()[i * aligned..i * aligned + count];
                interpolate_barycentric(slot, sources[0], sources[1], sources[2], bc);
            }
        }

        // fragment shading + per-sample operations
        let PixelQuadContext {
            ref pixels,
            ref varyings_pool,
            ref mut program,
            front_facing,
            ..
        } = *quad;
        let pool = varyings_pool.as_slice();
        let slot = |i: usize| {
            if count > 0 {
                &pool[i * aligned..i * aligned + count]
            } else {
                &[] as &[f32]
            }
        };
        let quad_refs = [slot(0), slot(1), slot(2), slot(3)];

        for (i, pixel) in pixels.iter().enumerate() {
            if !pixel.inside {
                continue;
            }
            let shading = pixel.shading_sample();
            exec_fragment(
                program,
                shading.position,
                front_facing,
                quad_refs[i],
                Some(quad_refs),
            );
            if program.builtins().discard {
                continue;
            }
            let color = program.builtins().frag_color;

            if pixel.sample_count > 1 {
                for (sample_idx, sample) in pixel.samples[..pixel.sample_count].iter().enumerate() {
                    if !sample.inside {
                        continue;
                    }
                    self.ctx.per_sample_operations(
                        sample.fbo_coord.x,
                        sample.fbo_coord.y,
                        sample.position.z,
                        color,
                        sample_idx as u32,
                    );
                }
            } else {
                self.ctx.per_sample_operations(
                    shading.fbo_coord.x,
                    shading.fbo_coord.y,
                    shading.position.z,
                    color,
                    0,
                );
            }
        }
    }

    /// Probes the depth buffer without writing; pixels whose samples all
    /// fail are dropped before shading.
    fn early_z_test(&self, quad: &mut PixelQuadContext) -> bool {
        for pixel in &mut quad.pixels {
            if !pixel.inside {
                continue;
            }
            if pixel.sample_count > 1 {
                let mut any_inside = false;
                for (sample_idx, sample) in
                    pixel.samples[..pixel.sample_count].iter_mut().enumerate()
                {
                    if !sample.inside {
                        continue;
                    }
                    sample.inside = self.ctx.process_depth_test(
                        sample.fbo_coord.x,
                        sample.fbo_coord.y,
                        sample.position.z,
                        sample_idx as u32,
                        true,
                    );
                    any_inside |= sample.inside;
                }
                pixel.inside = any_inside;
            } else {
                let sample = &mut pixel.samples[pixel.shading];
                sample.inside = self.ctx.process_depth_test(
                    sample.fbo_coord.x,
                    sample.fbo_coord.y,
                    sample.position.z,
                    0,
                    true,
                );
                pixel.inside = sample.inside;
            }
        }
        quad.check_inside()
    }
}
