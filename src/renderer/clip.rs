//! Homogeneous clipping against the view frustum.
//!
//! Points are accepted or dropped by their outcode; lines are
//! parametrically trimmed; triangles run Sutherland-Hodgman over the six
//! clip planes, fan-triangulating any polygon the walk leaves behind.
//! New vertices interpolate attributes and varyings linearly and re-run
//! the vertex shader to refresh `clip_pos` / `clip_mask` / point size.

use glam::Vec4;
use smallvec::SmallVec;

use crate::core::geometry::{CLIP_MASKS, CLIP_PLANES};
use crate::renderer::context::{
    DrawList, PrimitiveHolder, VaryingsSlot, VertexData, VertexHolder, Viewport,
};
use crate::renderer::interp::interpolate_linear;
use crate::renderer::shader::ShaderProgram;
use crate::renderer::{perspective_divide, viewport_transform, SoftwareRenderer};
use crate::resources::states::{PolygonMode, PrimitiveType};
use crate::utils::memory::AlignedF32Buffer;

impl SoftwareRenderer {
    /// Clips every assembled primitive, then drops vertices no surviving
    /// primitive references so later stages skip their work.
    pub(crate) fn process_clipping(&mut self, list: &mut DrawList, program: &mut ShaderProgram) {
        let primitive_type = self.render_states.primitive_type;
        let polygon_mode = self.render_states.polygon_mode;

        let primitive_count = list.primitives.len();
        let mut appended = Vec::new();
        for i in 0..primitive_count {
            let mut primitive = list.primitives[i];
            if primitive.discard {
                continue;
            }
            match primitive_type {
                PrimitiveType::Point => clip_point(list, &mut primitive),
                PrimitiveType::Line => {
                    clip_line(list, &mut primitive, program, &self.viewport, false);
                }
                PrimitiveType::Triangle => {
                    // wireframe and point modes re-clip per edge at raster time
                    if polygon_mode != PolygonMode::Fill {
                        continue;
                    }
                    clip_triangle(list, &mut primitive, &mut appended, program, &self.viewport);
                }
            }
            list.primitives[i] = primitive;
        }
        list.primitives.append(&mut appended);

        // clipping may have added vertices; recompute liveness from the
        // surviving primitives
        for vertex in &mut list.vertices {
            vertex.discard = true;
        }
        let used = primitive_type.index_count();
        for primitive in &list.primitives {
            if primitive.discard {
                continue;
            }
            for &index in &primitive.indices[..used] {
                list.vertices[index].discard = false;
            }
        }
    }
}

/// A point survives iff it violates no clip plane.
pub(crate) fn clip_point(list: &DrawList, point: &mut PrimitiveHolder) {
    point.discard = list.vertices[point.indices[0]].clip_mask != 0;
}

/// Parametric line clip; with `post_vertex_process`, new endpoints are
/// pushed through perspective divide and viewport (wireframe edges are
/// clipped after projection).
pub(crate) fn clip_line(
    list: &mut DrawList,
    line: &mut PrimitiveHolder,
    program: &mut ShaderProgram,
    viewport: &Viewport,
    post_vertex_process: bool,
) {
    let v0 = &list.vertices[line.indices[0]];
    let v1 = &list.vertices[line.indices[1]];
    let mask0 = v0.clip_mask;
    let mask1 = v1.clip_mask;
    let pos0 = v0.clip_pos;
    let pos1 = v1.clip_pos;

    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;

    let mask = mask0 | mask1;
    if mask != 0 {
        for (plane, bit) in CLIP_PLANES.iter().zip(CLIP_MASKS) {
            if mask & bit == 0 {
                continue;
            }
            let d0 = plane.dot(pos0);
            let d1 = plane.dot(pos1);

            if d0 < 0.0 && d1 < 0.0 {
                line.discard = true;
                return;
            } else if d0 < 0.0 {
                t0 = t0.max(-d0 / (d1 - d0));
            } else if d1 < 0.0 {
                t1 = t1.min(d0 / (d0 - d1));
            }
        }
    }

    // both parameters live on the original segment
    let (orig0, orig1) = (line.indices[0], line.indices[1]);
    if mask0 != 0 {
        line.indices[0] =
            clipping_new_vertex(list, orig0, orig1, t0, program, viewport, post_vertex_process);
    }
    if mask1 != 0 {
        line.indices[1] =
            clipping_new_vertex(list, orig0, orig1, t1, program, viewport, post_vertex_process);
    }
}

/// Sutherland-Hodgman against each plane the triangle's outcode touches.
/// Polygons beyond three vertices fan-triangulate into `append`.
pub(crate) fn clip_triangle(
    list: &mut DrawList,
    triangle: &mut PrimitiveHolder,
    append: &mut Vec<PrimitiveHolder>,
    program: &mut ShaderProgram,
    viewport: &Viewport,
) {
    let mask = list.vertices[triangle.indices[0]].clip_mask
        | list.vertices[triangle.indices[1]].clip_mask
        | list.vertices[triangle.indices[2]].clip_mask;
    if mask == 0 {
        return;
    }

    let mut full_clip = false;
    let mut indices_in: SmallVec<[usize; 8]> = SmallVec::new();
    let mut indices_out: SmallVec<[usize; 8]> = SmallVec::new();
    indices_in.extend_from_slice(&triangle.indices);

    for (plane, bit) in CLIP_PLANES.iter().zip(CLIP_MASKS) {
        if mask & bit == 0 {
            continue;
        }
        if indices_in.len() < 3 {
            full_clip = true;
            break;
        }
        indices_out.clear();

        let mut idx_pre = indices_in[0];
        let mut d_pre = plane.dot(list.vertices[idx_pre].clip_pos);

        // close the polygon
        indices_in.push(idx_pre);

        for i in 1..indices_in.len() {
            let idx = indices_in[i];
            let d = plane.dot(list.vertices[idx].clip_pos);

            if d_pre >= 0.0 {
                indices_out.push(idx_pre);
            }

            if d_pre.is_sign_negative() != d.is_sign_negative() {
                // pick the form with a positive denominator
                let t = if d < 0.0 {
                    d_pre / (d_pre - d)
                } else {
                    -d_pre / (d - d_pre)
                };
                let new_index =
                    clipping_new_vertex(list, idx_pre, idx, t, program, viewport, false);
                indices_out.push(new_index);
            }

            idx_pre = idx;
            d_pre = d;
        }

        std::mem::swap(&mut indices_in, &mut indices_out);
    }

    if full_clip || indices_in.len() < 3 {
        triangle.discard = true;
        return;
    }

    triangle.indices.copy_from_slice(&indices_in[..3]);
    for i in 3..indices_in.len() {
        append.push(PrimitiveHolder {
            discard: false,
            front_facing: triangle.front_facing,
            indices: [indices_in[0], indices_in[i - 1], indices_in[i]],
        });
    }
}

/// Interpolates a new vertex at parameter `t` along `(idx0, idx1)` and
/// re-runs the vertex shader for its clip-space outputs.
fn clipping_new_vertex(
    list: &mut DrawList,
    idx0: usize,
    idx1: usize,
    t: f32,
    program: &mut ShaderProgram,
    viewport: &Viewport,
    post_vertex_process: bool,
) -> usize {
    let stride = list.vertex_stride;
    let float_count = stride / std::mem::size_of::<f32>();

    // attributes blend as float arrays (byte slices may be unaligned)
    let mut attributes = vec![0u8; stride];
    {
        let a = list.attributes_of(idx0);
        let b = list.attributes_of(idx1);
        for i in 0..float_count {
            let span = i * 4..i * 4 + 4;
            let fa: f32 = bytemuck::pod_read_unaligned(&a[span.clone()]);
            let fb: f32 = bytemuck::pod_read_unaligned(&b[span.clone()]);
            attributes[span].copy_from_slice(bytemuck::bytes_of(&(fa + (fb - fa) * t)));
        }
    }

    // varyings blend directly; the vertex shader will not recompute them
    let mut varyings = AlignedF32Buffer::zeroed(list.varyings_aligned_count);
    if list.varyings_count > 0 {
        let a = list.varyings_of(idx0);
        let b = list.varyings_of(idx1);
        interpolate_linear(&mut varyings.as_mut_slice()[..list.varyings_count], a, b, t);
    }

    let index = list.vertices.len();
    let mut vertex = VertexHolder {
        discard: false,
        index,
        clip_mask: 0,
        clip_pos: Vec4::ZERO,
        frag_pos: Vec4::ZERO,
        data: VertexData::Owned(attributes),
        varyings: if list.varyings_count > 0 {
            VaryingsSlot::Owned(varyings)
        } else {
            VaryingsSlot::None
        },
    };

    run_vertex_shader(&mut vertex, program);

    if post_vertex_process {
        perspective_divide(&mut vertex);
        viewport_transform(&mut vertex, viewport);
    }

    list.vertices.push(vertex);
    index
}

/// Refreshes `clip_pos` / `clip_mask` from the vertex stage; varyings are
/// scratch here (already interpolated by the caller).
fn run_vertex_shader(vertex: &mut VertexHolder, program: &mut ShaderProgram) {
    let attributes = match &vertex.data {
        VertexData::Owned(bytes) => bytes.as_slice(),
        VertexData::Shared(_) => unreachable!("new clip vertices own their attributes"),
    };
    let mut scratch = AlignedF32Buffer::zeroed(program.varyings_count());
    program.exec_vertex_shader(attributes, scratch.as_mut_slice());
    vertex.clip_pos = program.builtins().position;
    vertex.clip_mask = crate::core::geometry::frustum_clip_mask(vertex.clip_pos);
}
