//! Uniform blocks and uniform samplers.
//!
//! A [`UniformBlock`] is a named byte buffer copied into a shader
//! program's uniform storage at the offset the program registered for the
//! block's name. A [`UniformSampler`] is a named texture slot. Both are
//! shared handles; binding resolves names through the program's uniform
//! descriptor list, and unknown names are silent no-ops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::resources::texture::{Texture, TextureFormat, TextureType};

static NEXT_UNIFORM_ID: AtomicU64 = AtomicU64::new(1);

fn next_uniform_id() -> u64 {
    NEXT_UNIFORM_ID.fetch_add(1, Ordering::Relaxed)
}

/// A named uniform byte buffer.
#[derive(Debug)]
pub struct UniformBlock {
    id: u64,
    name: String,
    buffer: RwLock<Vec<u8>>,
}

impl UniformBlock {
    #[must_use]
    pub fn new(name: &str, size: usize) -> Self {
        Self {
            id: next_uniform_id(),
            name: name.to_string(),
            buffer: RwLock::new(vec![0; size]),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the block content from the start; excess bytes are dropped.
    pub fn set_data(&self, data: &[u8]) {
        self.set_sub_data(data, 0);
    }

    /// Copies `data` into the block at `offset`, clamped to the block size.
    pub fn set_sub_data(&self, data: &[u8], offset: usize) {
        let mut buffer = self.buffer.write();
        if offset >= buffer.len() {
            return;
        }
        let n = data.len().min(buffer.len() - offset);
        buffer[offset..offset + n].copy_from_slice(&data[..n]);
    }

    /// Snapshot of the block bytes.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.buffer.read().clone()
    }
}

/// A named texture slot addressed by shaders.
#[derive(Debug)]
pub struct UniformSampler {
    id: u64,
    name: String,
    texture_type: TextureType,
    format: TextureFormat,
    texture: RwLock<Option<Arc<Texture>>>,
}

impl UniformSampler {
    #[must_use]
    pub fn new(name: &str, texture_type: TextureType, format: TextureFormat) -> Self {
        Self {
            id: next_uniform_id(),
            name: name.to_string(),
            texture_type,
            format,
            texture: RwLock::new(None),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn texture_type(&self) -> TextureType {
        self.texture_type
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Points the slot at `texture`. A type/format mismatch is logged and
    /// leaves the slot unchanged; the shader keeps sampling zeros.
    pub fn set_texture(&self, texture: Arc<Texture>) {
        if texture.texture_type() != self.texture_type || texture.format() != self.format {
            log::error!(
                "uniform sampler '{}' expects {:?}/{:?}, got {:?}/{:?}",
                self.name,
                self.texture_type,
                self.format,
                texture.texture_type(),
                texture.format()
            );
            return;
        }
        *self.texture.write() = Some(texture);
    }

    #[must_use]
    pub fn texture(&self) -> Option<Arc<Texture>> {
        self.texture.read().clone()
    }
}

/// Everything a draw binds in one call: all blocks, then all samplers.
#[derive(Debug, Default, Clone)]
pub struct ShaderResources {
    pub blocks: Vec<Arc<UniformBlock>>,
    pub samplers: Vec<Arc<UniformSampler>>,
}
