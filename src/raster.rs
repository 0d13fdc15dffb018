// CPU rasterizer
// Software canvas the frame is painted into for the shared-memory buffer

use crate::color::Rgb;
use crate::star::Point;
use crate::surface::Surface;
use image::{Rgba, RgbaImage};

/// An opaque RGBA frame
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let mut canvas = Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
        };
        canvas.clear(background);
        canvas
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Reallocate if the size changed; contents are undefined afterwards
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if self.image.dimensions() != (width, height) {
            self.image = RgbaImage::new(width, height);
        }
    }

    /// Color at a pixel, `None` when out of bounds
    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x < self.width() && y < self.height() {
            let Rgba([r, g, b, _]) = *self.image.get_pixel(x, y);
            Some(Rgb(r, g, b))
        } else {
            None
        }
    }

    /// Write the frame as premultiplied BGRA (little-endian ARGB8888) with
    /// a global opacity applied
    pub fn write_bgra(&self, out: &mut [u8], opacity: f32) {
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u32;
        for (dst, src) in out.chunks_exact_mut(4).zip(self.image.as_raw().chunks_exact(4)) {
            dst[0] = ((src[2] as u32 * alpha) / 255) as u8;
            dst[1] = ((src[1] as u32 * alpha) / 255) as u8;
            dst[2] = ((src[0] as u32 * alpha) / 255) as u8;
            dst[3] = alpha as u8;
        }
    }

    /// Blend `color` over one pixel; out-of-bounds coordinates are ignored
    fn blend_pixel(&mut self, x: i32, y: i32, color: Rgb, alpha: u8) {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if alpha == u8::MAX {
            self.image.put_pixel(x, y, opaque(color));
            return;
        }
        let Rgba([r, g, b, _]) = *self.image.get_pixel(x, y);
        let mixed = Rgb(r, g, b).mix(color, alpha as f32 / 255.0);
        self.image.put_pixel(x, y, opaque(mixed));
    }

    fn clip_span(&self, start: i32, len: u32, limit: u32) -> (i32, i32) {
        let lo = start.max(0);
        let hi = (start as i64 + len as i64).min(limit as i64) as i32;
        (lo, hi.max(lo))
    }
}

impl Surface for Canvas {
    fn clear(&mut self, color: Rgb) {
        let px = opaque(color);
        for pixel in self.image.pixels_mut() {
            *pixel = px;
        }
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgb, alpha: u8) {
        let (x0, x1) = self.clip_span(x, width, self.width());
        let (y0, y1) = self.clip_span(y, height, self.height());
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, color, alpha);
            }
        }
    }

    fn fill_polygon(&mut self, points: &[Point], color: Rgb) {
        if points.len() < 3 {
            return;
        }

        let min_y = points.iter().map(|p| p.y).min().unwrap_or(0).max(0);
        let max_y = points
            .iter()
            .map(|p| p.y)
            .max()
            .unwrap_or(0)
            .min(self.height() as i32 - 1);

        let mut crossings: Vec<f64> = Vec::with_capacity(points.len());
        for y in min_y..=max_y {
            // sample at the pixel center
            let scan = y as f64 + 0.5;
            crossings.clear();

            for (i, a) in points.iter().enumerate() {
                let b = points[(i + 1) % points.len()];
                let (ay, by) = (a.y as f64, b.y as f64);
                if (ay <= scan && scan < by) || (by <= scan && scan < ay) {
                    let t = (scan - ay) / (by - ay);
                    crossings.push(a.x as f64 + t * (b.x as f64 - a.x as f64));
                }
            }

            crossings.sort_by(|a, b| a.total_cmp(b));
            for span in crossings.chunks_exact(2) {
                let start = (span[0] - 0.5).ceil().max(0.0) as i32;
                let end = ((span[1] - 0.5).ceil()).min(self.width() as f64) as i32;
                for x in start..end {
                    self.blend_pixel(x, y, color, u8::MAX);
                }
            }
        }
    }

    fn stroke_line(&mut self, from: Point, to: Point, color: Rgb, width: f32) {
        // A zero-length segment has no area to cover
        if from == to {
            return;
        }

        let half = (width.max(1.0) / 2.0) as f64;
        let (ax, ay) = (from.x as f64, from.y as f64);
        let (bx, by) = (to.x as f64, to.y as f64);
        let (dx, dy) = (bx - ax, by - ay);
        let len_sq = dx * dx + dy * dy;

        let pad = half.ceil() as i32 + 1;
        let x0 = from.x.min(to.x).saturating_sub(pad).max(0);
        let x1 = from.x.max(to.x).saturating_add(pad).min(self.width() as i32 - 1);
        let y0 = from.y.min(to.y).saturating_sub(pad).max(0);
        let y1 = from.y.max(to.y).saturating_add(pad).min(self.height() as i32 - 1);

        for y in y0..=y1 {
            for x in x0..=x1 {
                let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
                let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
                let (cx, cy) = (ax + t * dx, ay + t * dy);
                if (px - cx).hypot(py - cy) <= half {
                    self.blend_pixel(x, y, color, u8::MAX);
                }
            }
        }
    }
}

fn opaque(color: Rgb) -> Rgba<u8> {
    Rgba([color.r(), color.g(), color.b(), u8::MAX])
}
