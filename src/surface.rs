// Drawing surface abstraction
// The immediate-mode primitives stars, menus and the picker paint with

use crate::color::Rgb;
use crate::star::Point;

/// Horizontal distance between glyph origins
pub const GLYPH_ADVANCE: u32 = 6;

/// Glyph height in pixels
pub const GLYPH_HEIGHT: u32 = 7;

/// A 2D immediate-mode drawing context in pixel coordinates (Y grows downward)
pub trait Surface {
    /// Start a new frame filled with `color`
    fn clear(&mut self, color: Rgb);

    /// Fill a closed polygon
    fn fill_polygon(&mut self, points: &[Point], color: Rgb);

    /// Stroke a straight segment of the given width
    fn stroke_line(&mut self, from: Point, to: Point, color: Rgb, width: f32);

    /// Fill the pixels `x..x+width`, `y..y+height`, blended with `alpha`
    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgb, alpha: u8);

    /// One-pixel rectangle outline
    fn stroke_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgb) {
        if width == 0 || height == 0 {
            return;
        }
        let right = x + width as i32 - 1;
        let bottom = y + height as i32 - 1;
        self.fill_rect(x, y, width, 1, color, u8::MAX);
        self.fill_rect(x, bottom, width, 1, color, u8::MAX);
        self.fill_rect(x, y, 1, height, color, u8::MAX);
        self.fill_rect(right, y, 1, height, color, u8::MAX);
    }

    /// Draw text with the built-in 5x7 font; unknown characters advance blank
    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Rgb) {
        let mut cx = x;
        for ch in text.chars() {
            if let Some(rows) = glyph(ch) {
                for (row, bits) in rows.iter().enumerate() {
                    for (start, len) in glyph_runs(*bits) {
                        self.fill_rect(cx + start, y + row as i32, len, 1, color, u8::MAX);
                    }
                }
            }
            cx += GLYPH_ADVANCE as i32;
        }
    }
}

/// Horizontal runs of lit columns in one glyph row, as (column, length)
fn glyph_runs(bits: u8) -> impl Iterator<Item = (i32, u32)> {
    let mut col = 0;
    std::iter::from_fn(move || {
        while col < 5 && bits & (0b10000 >> col) == 0 {
            col += 1;
        }
        if col >= 5 {
            return None;
        }
        let start = col;
        while col < 5 && bits & (0b10000 >> col) != 0 {
            col += 1;
        }
        Some((start, (col - start) as u32))
    })
}

/// 5x7 glyph rows, most significant of the low five bits is the leftmost column
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        ' ' => [0, 0, 0, 0, 0, 0, 0],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'a' => [0b00000, 0b00000, 0b01110, 0b00001, 0b01111, 0b10001, 0b01111],
        'c' => [0b00000, 0b00000, 0b01110, 0b10000, 0b10000, 0b10000, 0b01110],
        'd' => [0b00001, 0b00001, 0b01101, 0b10011, 0b10001, 0b10011, 0b01101],
        'e' => [0b00000, 0b00000, 0b01110, 0b10001, 0b11111, 0b10000, 0b01110],
        'h' => [0b10000, 0b10000, 0b10110, 0b11001, 0b10001, 0b10001, 0b10001],
        'k' => [0b10000, 0b10000, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010],
        'l' => [0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'n' => [0b00000, 0b00000, 0b10110, 0b11001, 0b10001, 0b10001, 0b10001],
        'o' => [0b00000, 0b00000, 0b01110, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'i' => [0b00100, 0b00000, 0b01100, 0b00100, 0b00100, 0b00100, 0b01110],
        'r' => [0b00000, 0b00000, 0b10110, 0b11001, 0b10000, 0b10000, 0b10000],
        's' => [0b00000, 0b00000, 0b01111, 0b10000, 0b01110, 0b00001, 0b11110],
        't' => [0b01000, 0b01000, 0b11100, 0b01000, 0b01000, 0b01001, 0b00110],
        _ => return None,
    };
    Some(rows)
}
