//! Temporary crop surface
//!
//! Texture cropping renders each material's region into a temporary
//! surface that must be acquired, rendered into, read back, and released
//! before the next material's crop begins; a stale surface bleeds pixels
//! between crops. The guard borrows the surface mutably, so overlapping
//! acquisitions are rejected at compile time and release happens on drop.

use image::RgbaImage;
use std::ops::{Deref, DerefMut};

/// A reusable scratch surface for texture crops
#[derive(Debug)]
pub struct ScratchSurface {
    buffer: RgbaImage,
}

impl Default for ScratchSurface {
    fn default() -> Self {
        Self {
            buffer: RgbaImage::new(1, 1),
        }
    }
}

impl ScratchSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the surface at the given size, cleared to transparent black
    pub fn acquire(&mut self, width: u32, height: u32) -> SurfaceGuard<'_> {
        if self.buffer.dimensions() == (width, height) {
            for pixel in self.buffer.pixels_mut() {
                *pixel = image::Rgba([0, 0, 0, 0]);
            }
        } else {
            self.buffer = RgbaImage::new(width, height);
        }
        SurfaceGuard { surface: self }
    }
}

/// Exclusive access to an acquired scratch surface
pub struct SurfaceGuard<'a> {
    surface: &'a mut ScratchSurface,
}

impl SurfaceGuard<'_> {
    /// Copy the rendered pixels out of the surface
    pub fn read_back(&self) -> RgbaImage {
        self.surface.buffer.clone()
    }
}

impl Deref for SurfaceGuard<'_> {
    type Target = RgbaImage;

    fn deref(&self) -> &RgbaImage {
        &self.surface.buffer
    }
}

impl DerefMut for SurfaceGuard<'_> {
    fn deref_mut(&mut self) -> &mut RgbaImage {
        &mut self.surface.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_clears_previous_contents() {
        let mut scratch = ScratchSurface::new();
        {
            let mut surface = scratch.acquire(2, 2);
            surface.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        }
        let surface = scratch.acquire(2, 2);
        assert_eq!(surface.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_resize_between_acquisitions() {
        let mut scratch = ScratchSurface::new();
        {
            let _ = scratch.acquire(4, 4);
        }
        let surface = scratch.acquire(8, 2);
        assert_eq!(surface.dimensions(), (8, 2));
    }
}
