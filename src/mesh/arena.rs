//! Render-pass arena
//!
//! One forward-only region per render pass. Slices are handed out typed and
//! initialized, never freed one by one, and released together on drop or
//! `reset`.

use std::cell::Cell;
use std::mem::size_of;

use bumpalo::Bump;

use crate::error::{RasterError, Result};
use crate::rasterizer::Framebuffer;

pub struct RenderArena {
    bump: Bump,
    capacity: usize,
    used: Cell<usize>,
}

impl RenderArena {
    /// Arena that refuses to hand out more than `capacity` payload bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bump: Bump::with_capacity(capacity),
            capacity,
            used: Cell::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.used.get()
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.used.get()
    }

    /// Allocate `len` copies of `fill`.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_slice<T: Copy>(&self, len: usize, fill: T) -> Result<&mut [T]> {
        let remaining = self.remaining();
        let requested = len.checked_mul(size_of::<T>()).unwrap_or(usize::MAX);
        if requested > remaining {
            return Err(RasterError::ResourceExhausted {
                requested,
                remaining,
            });
        }
        self.used.set(self.used.get() + requested);
        Ok(self.bump.alloc_slice_fill_copy(len, fill))
    }

    /// Color and depth planes for one render target, cleared to transparent
    /// black and negative infinity
    pub fn alloc_framebuffer(&self, width: usize, height: usize, channels: usize) -> Result<Framebuffer<'_>> {
        let pixels = width.checked_mul(height).unwrap_or(usize::MAX);
        let color = self.alloc_slice(pixels.checked_mul(channels).unwrap_or(usize::MAX), 0u8)?;
        let depth = self.alloc_slice(pixels, f32::NEG_INFINITY)?;
        Framebuffer::new(color, depth, width, height, channels)
    }

    /// Release everything at once, keeping the budget
    pub fn reset(&mut self) {
        self.bump.reset();
        self.used.set(0);
    }
}
