//! Off-screen meter buffer with change detection.
//!
//! The level meter is painted row by row into this RAM buffer. Once the
//! frame is complete, only the rectangle containing changed pixels is pushed
//! to the display in a single `fill_contiguous` call, so the panel never
//! shows a half-painted meter.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::trace;

/// Bounding box of pixels that have changed since the last present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirtyRect {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl DirtyRect {
    fn expand(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn from_point(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }
}

/// Heap-backed sprite implementing `DrawTarget<Color = Rgb565>`.
///
/// At the default meter size (38x218) this is about 16 KiB.
pub struct MeterSprite {
    width: usize,
    height: usize,
    pixels: Vec<Rgb565>,
    dirty: Option<DirtyRect>,
}

impl MeterSprite {
    /// Allocate a sprite filled with `background`. Nothing is dirty yet.
    pub fn new(size: Size, background: Rgb565) -> Self {
        let width = size.width as usize;
        let height = size.height as usize;
        Self {
            width,
            height,
            pixels: vec![background; width * height],
            dirty: None,
        }
    }

    /// Colour of a pixel, or `None` outside the sprite.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb565> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Mark the whole sprite as changed so the next present pushes all of it.
    pub fn invalidate(&mut self) {
        if self.width > 0 && self.height > 0 {
            self.dirty = Some(DirtyRect {
                min_x: 0,
                min_y: 0,
                max_x: self.width - 1,
                max_y: self.height - 1,
            });
        }
    }

    /// Paint one full-width row. Rows outside the sprite are ignored.
    pub fn fill_row(&mut self, y: usize, color: Rgb565) {
        if y >= self.height {
            return;
        }
        for x in 0..self.width {
            self.set_pixel(x, y, color);
        }
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: Rgb565) {
        let idx = y * self.width + x;
        if self.pixels[idx] != color {
            self.pixels[idx] = color;
            match &mut self.dirty {
                Some(rect) => rect.expand(x, y),
                None => self.dirty = Some(DirtyRect::from_point(x, y)),
            }
        }
    }

    /// Push the dirty region to `display` with the sprite's top-left corner
    /// at `origin`, then reset the dirty state.
    ///
    /// If nothing changed this is a no-op. On error the dirty region is kept
    /// so a later present can retry.
    pub fn present<D>(&mut self, display: &mut D, origin: Point) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let Some(rect) = self.dirty else {
            return Ok(());
        };

        let width = rect.max_x - rect.min_x + 1;
        let height = rect.max_y - rect.min_y + 1;

        trace!(
            "Presenting {}x{} meter region at ({}, {})",
            width, height, rect.min_x, rect.min_y
        );

        let area = Rectangle::new(
            origin + Point::new(rect.min_x as i32, rect.min_y as i32),
            Size::new(width as u32, height as u32),
        );

        let pixels = &self.pixels;
        let stride = self.width;
        let pixel_iter = (rect.min_y..=rect.max_y).flat_map(move |y| {
            let row_start = y * stride + rect.min_x;
            pixels[row_start..row_start + width].iter().copied()
        });

        display.fill_contiguous(&area, pixel_iter)?;
        self.dirty = None;
        Ok(())
    }
}

impl OriginDimensions for MeterSprite {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl DrawTarget for MeterSprite {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let x = coord.x;
            let y = coord.y;
            if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let x_start = (area.top_left.x.max(0) as usize).min(self.width);
        let y_start = (area.top_left.y.max(0) as usize).min(self.height);
        let x_end = (area.top_left.x.max(0) as usize)
            .saturating_add(area.size.width as usize)
            .min(self.width);
        let y_end = (area.top_left.y.max(0) as usize)
            .saturating_add(area.size.height as usize)
            .min(self.height);

        for y in y_start..y_end {
            for x in x_start..x_end {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        for y in 0..self.height {
            self.fill_row(y, color);
        }
        Ok(())
    }
}
