//! Vertex arrays.
//!
//! A [`VertexArray`] is the caller-side description of an interleaved
//! attribute buffer plus a 32-bit index buffer; the renderer copies it
//! into an owned [`VertexArrayObject`]. Attribute memory layout must
//! match the shader's attributes struct; the descriptors carry
//! `{size, stride, offset}` in bytes the way the model loader emits them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::{PrismError, Result};

static NEXT_VAO_ID: AtomicU64 = AtomicU64::new(1);

/// One attribute within the interleaved vertex buffer (all in bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttributeDesc {
    /// Component byte size of the attribute.
    pub size: usize,
    /// Distance between two vertices.
    pub stride: usize,
    /// Offset of this attribute inside a vertex.
    pub offset: usize,
}

/// Borrowed vertex/index data handed to the renderer factory.
#[derive(Debug, Clone, Copy)]
pub struct VertexArray<'a> {
    pub attributes: &'a [VertexAttributeDesc],
    pub vertex_buffer: &'a [u8],
    pub index_buffer: &'a [i32],
}

/// Owned vertex data bound for drawing.
#[derive(Debug)]
pub struct VertexArrayObject {
    id: u64,
    vertex_stride: usize,
    vertex_count: usize,
    attributes: Vec<VertexAttributeDesc>,
    vertexes: RwLock<Arc<Vec<u8>>>,
    indices: Vec<i32>,
}

impl VertexArrayObject {
    pub fn new(vertex_array: &VertexArray<'_>) -> Result<Self> {
        let Some(first) = vertex_array.attributes.first() else {
            return Err(PrismError::VertexArrayError(
                "vertex array needs at least one attribute".into(),
            ));
        };
        let stride = first.stride;
        if stride == 0 || vertex_array.vertex_buffer.len() % stride != 0 {
            return Err(PrismError::VertexArrayError(format!(
                "vertex buffer length {} is not a multiple of stride {stride}",
                vertex_array.vertex_buffer.len()
            )));
        }
        Ok(Self {
            id: NEXT_VAO_ID.fetch_add(1, Ordering::Relaxed),
            vertex_stride: stride,
            vertex_count: vertex_array.vertex_buffer.len() / stride,
            attributes: vertex_array.attributes.to_vec(),
            vertexes: RwLock::new(Arc::new(vertex_array.vertex_buffer.to_vec())),
            indices: vertex_array.index_buffer.to_vec(),
        })
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn vertex_stride(&self) -> usize {
        self.vertex_stride
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &[VertexAttributeDesc] {
        &self.attributes
    }

    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[i32] {
        &self.indices
    }

    /// Cheap snapshot of the interleaved bytes for the duration of a draw.
    #[must_use]
    pub fn vertex_bytes(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.vertexes.read())
    }

    /// Replaces the front of the vertex buffer with `data`, capped at the
    /// existing buffer length.
    pub fn update_vertex_data(&self, data: &[u8]) {
        let mut guard = self.vertexes.write();
        let mut bytes = (**guard).clone();
        let n = bytes.len().min(data.len());
        bytes[..n].copy_from_slice(&data[..n]);
        *guard = Arc::new(bytes);
    }
}
