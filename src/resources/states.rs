//! Render, clear and pipeline states.
//!
//! [`RenderStates`] bundles blend/depth/cull/polygon-mode/line-width the
//! way a draw consumes them. [`PipelineStates`] is the immutable,
//! cache-keyed form: identical states resolve to the same `Arc` through
//! a process-wide cache.

use std::sync::Arc;

use glam::Vec4;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::utils::hash::murmur3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthFunction {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendFactor {
    #[default]
    Zero,
    One,
    SrcColor,
    SrcAlpha,
    DstColor,
    DstAlpha,
    OneMinusSrcColor,
    OneMinusSrcAlpha,
    OneMinusDstColor,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendFunction {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolygonMode {
    Point,
    Line,
    #[default]
    Fill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveType {
    Point,
    Line,
    #[default]
    Triangle,
}

impl PrimitiveType {
    /// Indices consumed per primitive.
    #[inline]
    #[must_use]
    pub fn index_count(self) -> usize {
        match self {
            Self::Point => 1,
            Self::Line => 2,
            Self::Triangle => 3,
        }
    }
}

/// Independent RGB / alpha blend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendParams {
    pub func_rgb: BlendFunction,
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub func_alpha: BlendFunction,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl Default for BlendParams {
    fn default() -> Self {
        Self {
            func_rgb: BlendFunction::Add,
            src_rgb: BlendFactor::One,
            dst_rgb: BlendFactor::Zero,
            func_alpha: BlendFunction::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
        }
    }
}

impl BlendParams {
    /// Sets the same source/destination factors for RGB and alpha.
    pub fn set_blend_factor(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.src_rgb = src;
        self.src_alpha = src;
        self.dst_rgb = dst;
        self.dst_alpha = dst;
    }

    /// Sets the same operator for RGB and alpha.
    pub fn set_blend_func(&mut self, func: BlendFunction) {
        self.func_rgb = func;
        self.func_alpha = func;
    }
}

/// Everything a draw needs to know about fixed-function state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStates {
    pub blend: bool,
    pub blend_params: BlendParams,

    pub depth_test: bool,
    pub depth_mask: bool,
    pub depth_func: DepthFunction,

    pub cull_face: bool,
    pub primitive_type: PrimitiveType,
    pub polygon_mode: PolygonMode,

    pub line_width: f32,
}

impl Default for RenderStates {
    fn default() -> Self {
        Self {
            blend: false,
            blend_params: BlendParams::default(),
            depth_test: false,
            depth_mask: true,
            depth_func: DepthFunction::Less,
            cull_face: false,
            primitive_type: PrimitiveType::Triangle,
            polygon_mode: PolygonMode::Fill,
            line_width: 1.0,
        }
    }
}

impl RenderStates {
    /// Stable cache key over the packed state words.
    #[must_use]
    pub fn cache_key(&self) -> u64 {
        let words = [
            u32::from(self.blend)
                | (u32::from(self.depth_test) << 1)
                | (u32::from(self.depth_mask) << 2)
                | (u32::from(self.cull_face) << 3),
            (self.blend_params.func_rgb as u32)
                | ((self.blend_params.src_rgb as u32) << 4)
                | ((self.blend_params.dst_rgb as u32) << 8)
                | ((self.blend_params.func_alpha as u32) << 12)
                | ((self.blend_params.src_alpha as u32) << 16)
                | ((self.blend_params.dst_alpha as u32) << 20),
            (self.depth_func as u32)
                | ((self.primitive_type as u32) << 4)
                | ((self.polygon_mode as u32) << 8),
            self.line_width.to_bits(),
        ];
        let low = murmur3(&words, 0);
        let high = murmur3(&words, 0x9e37_79b9);
        (u64::from(high) << 32) | u64::from(low)
    }
}

/// Clear configuration for `begin_render_pass`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearStates {
    pub color_flag: bool,
    pub depth_flag: bool,
    pub clear_color: Vec4,
    pub clear_depth: f32,
}

impl Default for ClearStates {
    fn default() -> Self {
        Self {
            color_flag: false,
            depth_flag: false,
            clear_color: Vec4::ZERO,
            clear_depth: 1.0,
        }
    }
}

/// Immutable render states handle, deduplicated process-wide.
#[derive(Debug)]
pub struct PipelineStates {
    pub render_states: RenderStates,
}

static PIPELINE_CACHE: Lazy<Mutex<FxHashMap<u64, Arc<PipelineStates>>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

impl PipelineStates {
    /// Returns the cached instance for `states`, creating it on first use.
    #[must_use]
    pub fn get_or_create(states: RenderStates) -> Arc<Self> {
        let key = states.cache_key();
        let mut cache = PIPELINE_CACHE.lock();
        Arc::clone(cache.entry(key).or_insert_with(|| {
            Arc::new(Self {
                render_states: states,
            })
        }))
    }
}
