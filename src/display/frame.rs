//! In-memory monochrome framebuffer.

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
use std::convert::Infallible;

/// Panel width in pixels.
pub const WIDTH: u32 = 128;
/// Panel height in pixels.
pub const HEIGHT: u32 = 64;
/// Rows of 8 pixels, the unit the controller addresses.
pub const PAGES: usize = (HEIGHT / 8) as usize;

/// A 128x64 1-bit frame laid out the way SH1106/SSD1306 controllers expect:
/// one byte per column per 8-row page, least significant bit on top.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    buffer: [u8; WIDTH as usize * PAGES],
}

impl Frame {
    /// An all-dark frame.
    pub fn new() -> Self {
        Self {
            buffer: [0; WIDTH as usize * PAGES],
        }
    }

    /// Whether the pixel at `(x, y)` is lit. Out of bounds reads as dark.
    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= WIDTH || y >= HEIGHT {
            return false;
        }
        let byte = self.buffer[Self::index(x, y)];
        byte & (1 << (y % 8)) != 0
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, on: bool) {
        if x >= WIDTH || y >= HEIGHT {
            return;
        }
        let index = Self::index(x, y);
        let mask = 1 << (y % 8);
        if on {
            self.buffer[index] |= mask;
        } else {
            self.buffer[index] &= !mask;
        }
    }

    /// The 128 column bytes of one page.
    pub fn page(&self, page: usize) -> &[u8] {
        let start = page * WIDTH as usize;
        &self.buffer[start..start + WIDTH as usize]
    }

    pub fn lit_pixels(&self) -> u32 {
        self.buffer.iter().map(|b| b.count_ones()).sum()
    }

    pub fn is_blank(&self) -> bool {
        self.buffer.iter().all(|b| *b == 0)
    }

    /// Text rendering for terminals and logs, `#` for lit pixels.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(((WIDTH + 1) * HEIGHT) as usize);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                out.push(if self.pixel(x, y) { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }

    fn index(x: u32, y: u32) -> usize {
        (y / 8) as usize * WIDTH as usize + x as usize
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("lit_pixels", &self.lit_pixels())
            .finish()
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(point.x as u32, point.y as u32, color.is_on());
            }
        }
        Ok(())
    }
}

/// Unwrap the result of drawing onto a [`Frame`], which cannot fail.
pub(crate) fn drawn<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}
