//! The canvas a clock face paints onto.

use super::math::{Color, Vec2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    /// Device pixels.
    pub width: f32,
}

impl Stroke {
    pub const fn new(color: Color, width: f32) -> Self {
        Self { color, width }
    }
}

/// Anti-aliasing and paint caching are up to the implementation.
pub trait Surface {
    fn line(&mut self, from: Vec2, to: Vec2, stroke: Stroke);

    fn stroke_circle(&mut self, center: Vec2, radius: f32, stroke: Stroke);

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);

    /// Draws `text` horizontally centred on `anchor.x` with its baseline
    /// at `anchor.y`. `size` is the glyph height in device pixels.
    fn text(&mut self, text: &str, anchor: Vec2, size: f32, color: Color);
}
