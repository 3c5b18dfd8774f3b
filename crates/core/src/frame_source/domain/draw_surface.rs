use std::ops::Range;
use std::sync::Arc;

use crate::shared::color_space::{Color, ColorSpace};
use crate::shared::frame_size::FrameSize;
use crate::shared::pixel_buffer::PixelBuffer;

/// Axis-aligned rectangle in pixel coordinates, origin top-left, y down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A 2D drawing target backed by a [`PixelBuffer`].
///
/// Colours are given in RGBA and written as premultiplied BGRA through the
/// shared [`ColorSpace`]. A pixel is covered by a shape when its centre lies
/// inside it; there is no anti-aliasing.
pub struct DrawSurface {
    buffer: PixelBuffer,
    color_space: Arc<ColorSpace>,
    fill: [u8; 4],
}

impl DrawSurface {
    pub fn new(size: FrameSize, color_space: Arc<ColorSpace>) -> Self {
        let fill = color_space.to_premultiplied_bgra(Color::BLACK);
        Self {
            buffer: PixelBuffer::new(size),
            color_space,
            fill,
        }
    }

    pub fn size(&self) -> FrameSize {
        self.buffer.size()
    }

    pub fn color_space(&self) -> &ColorSpace {
        &self.color_space
    }

    pub fn pixel_buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Direct pixel access for sources that mix drawing with raw writes.
    pub fn pixel_buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.fill = self.color_space.to_premultiplied_bgra(color);
    }

    /// Overwrites every pixel with `color`, without blending.
    pub fn clear(&mut self, color: Color) {
        let bgra = self.color_space.to_premultiplied_bgra(color);
        self.buffer.fill(bgra);
    }

    pub fn fill_rect(&mut self, rect: Rect) {
        let size = self.size();
        let fill = self.fill;
        for y in covered_span(rect.y, rect.height, size.height) {
            for x in covered_span(rect.x, rect.width, size.width) {
                self.blend(x, y, fill);
            }
        }
    }

    pub fn fill_ellipse_in_rect(&mut self, rect: Rect) {
        let rx = rect.width / 2.0;
        let ry = rect.height / 2.0;
        if rx <= 0.0 || ry <= 0.0 {
            return;
        }
        let cx = rect.x + rx;
        let cy = rect.y + ry;

        let size = self.size();
        let fill = self.fill;
        for y in covered_span(rect.y, rect.height, size.height) {
            let dy = (y as f64 + 0.5 - cy) / ry;
            for x in covered_span(rect.x, rect.width, size.width) {
                let dx = (x as f64 + 0.5 - cx) / rx;
                if dx * dx + dy * dy <= 1.0 {
                    self.blend(x, y, fill);
                }
            }
        }
    }

    /// Source-over compositing of premultiplied `src` onto pixel (x, y).
    fn blend(&mut self, x: u32, y: u32, src: [u8; 4]) {
        let Some(dst) = self.buffer.pixel(x, y) else {
            return;
        };
        let inv_alpha = 255 - src[3] as u32;
        let out = std::array::from_fn(|i| {
            (src[i] as u32 + (dst[i] as u32 * inv_alpha + 127) / 255).min(255) as u8
        });
        self.buffer.put_pixel(x, y, out);
    }
}

/// Pixel indices whose centres fall in `[start, start + len)`, clamped to
/// `0..limit`.
fn covered_span(start: f64, len: f64, limit: u32) -> Range<u32> {
    if len.is_nan() || len <= 0.0 || start.is_nan() {
        return 0..0;
    }
    let lo = (start - 0.5).ceil().clamp(0.0, limit as f64) as u32;
    let hi = (start + len - 0.5).ceil().clamp(0.0, limit as f64) as u32;
    lo..hi.max(lo)
}
