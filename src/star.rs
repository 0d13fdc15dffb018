// Star geometry module
// Outline computation and drawing for the four-pointed star shape

use crate::app::Palette;
use crate::color::Rgb;
use crate::surface::Surface;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// Fill color shared by every star
pub const CORE_COLOR: Rgb = Rgb::YELLOW;

/// Border stroke width in pixels
pub const BORDER_WIDTH: f32 = 2.0;

/// Number of vertices in a star outline (4 outer, 4 inner)
pub const OUTLINE_LEN: usize = 8;

/// Integer point in surface coordinates (Y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A four-pointed star whose arms alternate between two border colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Star {
    pub center: Point,
    pub radius: u32,
    pub border_a: Rgb,
    pub border_b: Rgb,
}

impl Star {
    pub fn new(center: Point, radius: u32, border_a: Rgb, border_b: Rgb) -> Self {
        Self {
            center,
            radius,
            border_a,
            border_b,
        }
    }

    /// Zero-radius star at `center` using the palette's current border colors
    pub fn from_palette(center: Point, palette: &Palette) -> Self {
        Self::new(center, 0, palette.border_a, palette.border_b)
    }

    /// The same star with a different radius
    pub fn with_radius(self, radius: u32) -> Self {
        Self { radius, ..self }
    }

    pub fn outline(&self) -> [Point; OUTLINE_LEN] {
        compute_outline(self.center, self.radius)
    }

    /// Fill the core, then stroke each arm in its border color
    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S) {
        let outline = self.outline();
        surface.fill_polygon(&outline, CORE_COLOR);

        for i in 0..4 {
            let color = if i % 2 == 0 {
                self.border_a
            } else {
                self.border_b
            };
            let tip = outline[i * 2];
            let valley = outline[i * 2 + 1];
            let next_tip = outline[(i * 2 + 2) % OUTLINE_LEN];
            surface.stroke_line(tip, valley, color, BORDER_WIDTH);
            surface.stroke_line(valley, next_tip, color, BORDER_WIDTH);
        }
    }
}

/// Compute the eight vertices of a star, alternating outer tip and inner valley.
///
/// Tips sit at `radius` starting straight up and turning counter-clockwise in
/// quarter turns; valleys sit halfway between at `radius / 2`. Offsets are
/// truncated toward zero and the Y axis is flipped for screen coordinates.
pub fn compute_outline(center: Point, radius: u32) -> [Point; OUTLINE_LEN] {
    let outer = radius as f64;
    let inner = (radius / 2) as f64;
    let mut points = [center; OUTLINE_LEN];

    for i in 0..4 {
        let outer_angle = FRAC_PI_2 + i as f64 * FRAC_PI_2;
        let inner_angle = outer_angle + FRAC_PI_4;
        points[i * 2] = polar(center, outer, outer_angle);
        points[i * 2 + 1] = polar(center, inner, inner_angle);
    }

    points
}

fn polar(center: Point, distance: f64, angle: f64) -> Point {
    // `as` truncates toward zero
    let dx = (distance * angle.cos()) as i64;
    let dy = (distance * angle.sin()) as i64;
    Point::new(
        (center.x as i64 + dx).clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        (center.y as i64 - dy).clamp(i32::MIN as i64, i32::MAX as i64) as i32,
    )
}

/// Euclidean distance between two points, truncated toward zero
pub fn radius_between(anchor: Point, pointer: Point) -> u32 {
    let dx = (pointer.x as i64 - anchor.x as i64) as f64;
    let dy = (pointer.y as i64 - anchor.y as i64) as f64;
    dx.hypot(dy).min(u32::MAX as f64) as u32
}
