//! # Raster
//!
//! A fixed-size grid of [`Rgba`] pixels, row-major from the top-left.

use crate::{blend::CompositeOp, color::Rgba};

#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    /// Invariant: `pixels.len() == width * height`
    pixels: Vec<Rgba>,
}
impl Raster {
    /// Create a fully transparent raster.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; width as usize * height as usize],
        }
    }
    #[must_use]
    pub fn with_size([width, height]: [u32; 2]) -> Self {
        Self::new(width, height)
    }
    /// Wrap existing pixels. Returns `None` if the length of the data is not `width * height`.
    #[must_use]
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgba>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }
    #[must_use]
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }
    pub fn pixels_mut(&mut self) -> &mut [Rgba] {
        &mut self.pixels
    }
    /// Get the full data as RGBA8 bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
    /// Flat index of a coordinate, `None` if out-of-bounds.
    #[must_use]
    pub fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Rgba> {
        self.index(x, y).map(|idx| self.pixels[idx])
    }
    /// Overwrite a pixel. Returns `false` if out-of-bounds.
    pub fn set(&mut self, x: u32, y: u32, color: Rgba) -> bool {
        match self.index(x, y) {
            Some(idx) => {
                self.pixels[idx] = color;
                true
            }
            None => false,
        }
    }
    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.pixels.fill(Rgba::TRANSPARENT);
    }
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|pixel| pixel.is_transparent())
    }
    /// Composite `src` onto `self` with the operator, scaling `src` alpha by `opacity`.
    /// Both are aligned at the top-left; any part of `src` outside `self` is clipped.
    pub fn draw(&mut self, src: &Raster, op: CompositeOp, opacity: f32) {
        let width = self.width.min(src.width) as usize;
        let height = self.height.min(src.height) as usize;
        for y in 0..height {
            let dst_row = &mut self.pixels[y * self.width as usize..][..width];
            let src_row = &src.pixels[y * src.width as usize..][..width];
            for (dst, src) in dst_row.iter_mut().zip(src_row) {
                *dst = op.apply(*dst, *src, opacity);
            }
        }
    }
    /// Composite a flat color over the whole raster.
    pub fn fill_with(&mut self, color: Rgba, op: CompositeOp) {
        for pixel in &mut self.pixels {
            *pixel = op.apply(*pixel, color, 1.0);
        }
    }
}
impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Pixel data is far too long to be useful here.
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}
