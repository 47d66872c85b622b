//! Framebuffers.
//!
//! A framebuffer pairs a color attachment with a depth attachment. An
//! attachment is a texture plus `{layer, level}` (layer is only
//! meaningful for cubemaps). Attachments must agree on size and sample
//! count; disagreement is logged and the pass still runs with the last
//! valid state.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::resources::texture::Texture;

/// A texture bound as a render target.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub texture: Arc<Texture>,
    /// Cube face index for cubemap targets.
    pub layer: u32,
    /// Mip level written by the pass.
    pub level: u32,
}

impl Attachment {
    #[must_use]
    pub fn new(texture: Arc<Texture>) -> Self {
        Self {
            texture,
            layer: 0,
            level: 0,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.texture.level_width(self.level)
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.texture.level_height(self.level)
    }

    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.texture.sample_count()
    }
}

#[derive(Debug)]
pub struct Framebuffer {
    offscreen: bool,
    color: RwLock<Option<Attachment>>,
    depth: RwLock<Option<Attachment>>,
}

impl Framebuffer {
    #[must_use]
    pub fn new(offscreen: bool) -> Self {
        Self {
            offscreen,
            color: RwLock::new(None),
            depth: RwLock::new(None),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_offscreen(&self) -> bool {
        self.offscreen
    }

    pub fn set_color_attachment(&self, texture: Arc<Texture>, layer: u32, level: u32) {
        *self.color.write() = Some(Attachment {
            texture,
            layer,
            level,
        });
    }

    pub fn set_depth_attachment(&self, texture: Arc<Texture>) {
        *self.depth.write() = Some(Attachment::new(texture));
    }

    #[must_use]
    pub fn color_attachment(&self) -> Option<Attachment> {
        self.color.read().clone()
    }

    #[must_use]
    pub fn depth_attachment(&self) -> Option<Attachment> {
        self.depth.read().clone()
    }

    /// Checks that present attachments agree on `(width, height, samples)`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let color = self.color.read();
        let depth = self.depth.read();
        match (&*color, &*depth) {
            (Some(c), Some(d)) => {
                let ok = c.width() == d.width()
                    && c.height() == d.height()
                    && c.sample_count() == d.sample_count();
                if !ok {
                    log::error!(
                        "framebuffer attachments disagree: color {}x{}@{} vs depth {}x{}@{}",
                        c.width(),
                        c.height(),
                        c.sample_count(),
                        d.width(),
                        d.height(),
                        d.sample_count()
                    );
                }
                ok
            }
            (None, None) => false,
            _ => true,
        }
    }
}
