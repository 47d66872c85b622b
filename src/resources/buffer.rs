//! Typed 2D pixel buffers with pluggable index layouts.
//!
//! A [`PixelBuffer`] stores a logical `width x height` rectangle inside an
//! inner (allocated) rectangle whose shape depends on the [`BufferLayout`]:
//!
//! - [`BufferLayout::Linear`]: row-major, inner size equals logical size.
//! - [`BufferLayout::Tiled`]: 4x4 tiles, row-major inside each tile.
//! - [`BufferLayout::Morton`]: 32x32 tiles, Morton-interleaved inside.
//!
//! Tiled and Morton layouts only change storage order for neighborhood
//! locality; the logical rectangle accepted by `get`/`set` is identical
//! across layouts.
//!
//! Cells are interior-mutable: `set` takes `&self` so the rasterizer's
//! tile workers can write the same buffer concurrently. Soundness rests
//! on the tile partition invariant: no two workers ever touch the same
//! sample cell during a draw.

use std::cell::UnsafeCell;

use bytemuck::Zeroable;

use crate::errors::{PrismError, Result};

/// Storage order of a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferLayout {
    /// Row-major.
    #[default]
    Linear,
    /// 4x4 tiles, row-major within a tile.
    Tiled,
    /// 32x32 tiles, Morton order within a tile.
    Morton,
}

const TILE_SIZE: u32 = 4;
const TILE_BITS: u32 = 2;
const MORTON_SIZE: u32 = 32;
const MORTON_BITS: u32 = 5;

/// Interleaves the low bits of `x` and `y` (2D Morton code).
#[inline]
fn encode_morton2(x: u32, y: u32) -> u32 {
    let mut res = x | (y << 16);
    res = (res | (res << 4)) & 0x0f0f_0f0f;
    res = (res | (res << 2)) & 0x3333_3333;
    res = (res | (res << 1)) & 0x5555_5555;
    (res | (res >> 15)) & 0xffff
}

/// A typed 2D image buffer.
pub struct PixelBuffer<T> {
    width: u32,
    height: u32,
    inner_width: u32,
    inner_height: u32,
    layout: BufferLayout,
    // tiles per inner row, for the tiled layouts
    tiles_x: u32,
    data: UnsafeCell<Box<[T]>>,
}

// SAFETY: concurrent access goes through raw element pointers; callers
// uphold the disjoint-cell invariant documented on `set`.
unsafe impl<T: Send> Send for PixelBuffer<T> {}
unsafe impl<T: Send + Sync> Sync for PixelBuffer<T> {}

impl<T: Copy + Zeroable> PixelBuffer<T> {
    /// Creates a linear buffer.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_layout(width, height, BufferLayout::Linear)
    }

    /// Creates a buffer with the requested layout.
    pub fn with_layout(width: u32, height: u32, layout: BufferLayout) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PrismError::InvalidDimensions { width, height });
        }
        let (inner_width, inner_height, tiles_x) = inner_extent(width, height, layout);
        let len = inner_width as usize * inner_height as usize;
        let data = vec![T::zeroed(); len].into_boxed_slice();
        Ok(Self {
            width,
            height,
            inner_width,
            inner_height,
            layout,
            tiles_x,
            data: UnsafeCell::new(data),
        })
    }

    /// Creates a linear buffer seeded from row-major `data`.
    ///
    /// `data` must hold exactly `width * height` elements.
    pub fn from_data(width: u32, height: u32, data: &[T]) -> Result<Self> {
        let buffer = Self::new(width, height)?;
        if data.len() != (width as usize) * (height as usize) {
            return Err(PrismError::InvalidDimensions { width, height });
        }
        // SAFETY: freshly created, no other reference exists.
        unsafe { (*buffer.data.get()).copy_from_slice(data) };
        Ok(buffer)
    }

    /// Reallocates for new logical dimensions; same dimensions are a no-op.
    pub fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(PrismError::InvalidDimensions { width, height });
        }
        if width == self.width && height == self.height {
            return Ok(());
        }
        *self = Self::with_layout(width, height, self.layout)?;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn inner_width(&self) -> u32 {
        self.inner_width
    }

    #[inline]
    #[must_use]
    pub fn inner_height(&self) -> u32 {
        self.inner_height
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> BufferLayout {
        self.layout
    }

    /// Total allocated elements (`inner_width * inner_height`).
    #[inline]
    #[must_use]
    pub fn raw_len(&self) -> usize {
        self.inner_width as usize * self.inner_height as usize
    }

    /// Maps logical `(x, y)` to its linear storage offset.
    #[inline]
    #[must_use]
    pub fn convert_index(&self, x: u32, y: u32) -> usize {
        match self.layout {
            BufferLayout::Linear => (x + y * self.inner_width) as usize,
            BufferLayout::Tiled => {
                let tile = (y >> TILE_BITS) * self.tiles_x + (x >> TILE_BITS);
                let in_x = x & (TILE_SIZE - 1);
                let in_y = y & (TILE_SIZE - 1);
                ((tile << (TILE_BITS * 2)) + (in_y << TILE_BITS) + in_x) as usize
            }
            BufferLayout::Morton => {
                let tile = (y >> MORTON_BITS) * self.tiles_x + (x >> MORTON_BITS);
                let in_x = x & (MORTON_SIZE - 1);
                let in_y = y & (MORTON_SIZE - 1);
                ((tile << (MORTON_BITS * 2)) + encode_morton2(in_x, in_y)) as usize
            }
        }
    }

    /// Reads the element at `(x, y)`; `None` outside the logical rectangle.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.convert_index(x, y);
        // SAFETY: idx is in bounds; element reads race only with writes to
        // other cells (see `set`).
        Some(unsafe { *(*self.data.get()).as_ptr().add(idx) })
    }

    /// Writes the element at `(x, y)`; no-op outside the logical rectangle.
    ///
    /// Concurrent callers must target disjoint cells; the rasterizer's
    /// tile partition guarantees this.
    #[inline]
    pub fn set(&self, x: u32, y: u32, value: T) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.convert_index(x, y);
        // SAFETY: idx is in bounds and each cell has at most one writer.
        unsafe { (*self.data.get()).as_mut_ptr().add(idx).write(value) };
    }

    /// Writes `value` into every allocated cell (inner rectangle included).
    pub fn set_all(&self, value: T) {
        let ptr = self.data.get();
        // SAFETY: exclusive use is required by callers (clears happen
        // between draws, never concurrently with tile workers).
        unsafe {
            for slot in (*ptr).iter_mut() {
                *slot = value;
            }
        }
    }

    /// Zeroes every allocated cell.
    pub fn clear(&self) {
        self.set_all(T::zeroed());
    }

    /// Copies the raw storage into `out`, optionally reversing row order.
    ///
    /// Rows here are inner rows; for the linear layout this is the usual
    /// scanline copy. `out` must hold at least [`Self::raw_len`] elements.
    pub fn copy_to(&self, out: &mut [T], flip_y: bool) {
        let src = self.as_slice();
        let row = self.inner_width as usize;
        let rows = self.inner_height as usize;
        if !flip_y {
            out[..src.len()].copy_from_slice(src);
        } else {
            for y in 0..rows {
                let dst = &mut out[y * row..(y + 1) * row];
                dst.copy_from_slice(&src[(rows - 1 - y) * row..(rows - y) * row]);
            }
        }
    }

    /// Overwrites raw storage from `data` (element count capped at
    /// [`Self::raw_len`]). Callers must have exclusive use of the buffer.
    pub fn copy_from_slice(&self, data: &[T]) {
        // SAFETY: exclusive use required by the caller.
        unsafe {
            let dst = &mut *self.data.get();
            let n = dst.len().min(data.len());
            dst[..n].copy_from_slice(&data[..n]);
        }
    }

    /// Raw storage view. Callers must not race this with `set`.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: see above; reads are valid whenever no write to the same
        // cell is in flight.
        unsafe { &*self.data.get() }
    }
}

fn inner_extent(width: u32, height: u32, layout: BufferLayout) -> (u32, u32, u32) {
    match layout {
        BufferLayout::Linear => (width, height, 0),
        BufferLayout::Tiled => {
            let tiles_x = width.div_ceil(TILE_SIZE);
            let tiles_y = height.div_ceil(TILE_SIZE);
            (tiles_x * TILE_SIZE, tiles_y * TILE_SIZE, tiles_x)
        }
        BufferLayout::Morton => {
            let tiles_x = width.div_ceil(MORTON_SIZE);
            let tiles_y = height.div_ceil(MORTON_SIZE);
            (tiles_x * MORTON_SIZE, tiles_y * MORTON_SIZE, tiles_x)
        }
    }
}

impl<T: Copy + Zeroable> Clone for PixelBuffer<T> {
    fn clone(&self) -> Self {
        let data = self.as_slice().to_vec().into_boxed_slice();
        Self {
            width: self.width,
            height: self.height,
            inner_width: self.inner_width,
            inner_height: self.inner_height,
            layout: self.layout,
            tiles_x: self.tiles_x,
            data: UnsafeCell::new(data),
        }
    }
}

impl<T> std::fmt::Debug for PixelBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("inner_width", &self.inner_width)
            .field("inner_height", &self.inner_height)
            .field("layout", &self.layout)
            .finish()
    }
}
