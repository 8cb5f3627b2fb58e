//! Sizes and positions of everything on a clock face.

use crate::gfx::math::Vec2;

const HOUR_STROKE_RATIO: f32 = 50.0;
const MINUTE_STROKE_RATIO: f32 = 75.0;
const SECOND_STROKE_RATIO: f32 = 85.0;
const DIAL_STROKE_RATIO: f32 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Padding {
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn uniform(value: u32) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn horizontal(&self) -> u32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> u32 {
        self.top + self.bottom
    }
}

/// Converts density-independent units to device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMetrics {
    pub density: f32,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self { density: 1.0 }
    }
}

impl DisplayMetrics {
    pub fn new(density: f32) -> Self {
        Self { density }
    }

    pub fn dp_to_px(&self, dp: f32) -> f32 {
        dp * self.density
    }
}

/// Layout constraint handed down by the parent for one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureSpec {
    Exactly(u32),
    AtMost(u32),
    Unspecified,
}

impl MeasureSpec {
    pub fn resolve(self, desired: u32) -> u32 {
        match self {
            MeasureSpec::Exactly(size) => size,
            MeasureSpec::AtMost(limit) => desired.min(limit),
            MeasureSpec::Unspecified => desired,
        }
    }
}

/// Derived from the view's size; cached until the size or padding changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceGeometry {
    pub center: Vec2,
    pub radius: f32,
    pub hour_length: f32,
    pub minute_length: f32,
    pub second_length: f32,
    pub number_radius: f32,
    pub hour_stroke: f32,
    pub minute_stroke: f32,
    pub second_stroke: f32,
    pub dial_stroke: f32,
    pub text_size: f32,
}

impl FaceGeometry {
    pub fn compute(
        width: u32,
        height: u32,
        padding: Padding,
        numbers_size: u32,
        metrics: DisplayMetrics,
    ) -> Self {
        let usable_width = width.saturating_sub(padding.horizontal()) as f32;
        let usable_height = height.saturating_sub(padding.vertical()) as f32;

        let mut radius = usable_width.min(usable_height) / 2.0;
        // Leave room for the dial's own stroke.
        radius = (radius - (radius / DIAL_STROKE_RATIO).ceil()).max(0.0);

        Self {
            center: Vec2::new(
                padding.left as f32 + usable_width / 2.0,
                padding.top as f32 + usable_height / 2.0,
            ),
            radius,
            hour_length: radius * 0.4,
            minute_length: radius * 0.8,
            second_length: radius * 0.8,
            number_radius: radius * 0.9,
            hour_stroke: metrics.dp_to_px(radius / HOUR_STROKE_RATIO),
            minute_stroke: metrics.dp_to_px(radius / MINUTE_STROKE_RATIO),
            second_stroke: metrics.dp_to_px(radius / SECOND_STROKE_RATIO),
            dial_stroke: metrics.dp_to_px(radius / DIAL_STROKE_RATIO),
            text_size: metrics.dp_to_px(radius * numbers_size as f32 / 500.0),
        }
    }
}

/// Side of the square a face asks for before the parent's constraints
/// are applied.
pub fn square_size(min_width: u32, min_height: u32, padding: Padding) -> u32 {
    (min_width + padding.horizontal()).max(min_height + padding.vertical())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn two_hundred_square_without_padding() {
        let g = FaceGeometry::compute(200, 200, Padding::default(), 15, DisplayMetrics::default());

        // 100 - ceil(100 / 85)
        assert_eq!(g.radius, 98.0);
        assert_eq!(g.center, Vec2::new(100.0, 100.0));
        assert!((g.hour_length - 39.2).abs() < EPS);
        assert!((g.minute_length - 78.4).abs() < EPS);
        assert_eq!(g.minute_length, g.second_length);
        assert!((g.number_radius - 88.2).abs() < EPS);
    }

    #[test]
    fn padding_shrinks_the_face_and_moves_the_center() {
        let g = FaceGeometry::compute(300, 300, Padding::uniform(10), 15, DisplayMetrics::default());
        assert_eq!(g.radius, 138.0);
        assert_eq!(g.center, Vec2::new(150.0, 150.0));

        let g = FaceGeometry::compute(300, 200, Padding::new(40, 0, 0, 20), 15, DisplayMetrics::default());
        // usable area is 260 x 180
        assert_eq!(g.radius, 90.0 - 2.0);
        assert_eq!(g.center, Vec2::new(170.0, 90.0));
    }

    #[test]
    fn strokes_and_text_scale_with_density() {
        let g1 = FaceGeometry::compute(200, 200, Padding::default(), 15, DisplayMetrics::new(1.0));
        let g2 = FaceGeometry::compute(200, 200, Padding::default(), 15, DisplayMetrics::new(2.0));

        assert!((g1.hour_stroke - 98.0 / 50.0).abs() < EPS);
        assert!((g1.minute_stroke - 98.0 / 75.0).abs() < EPS);
        assert!((g1.second_stroke - 98.0 / 85.0).abs() < EPS);
        assert_eq!(g1.second_stroke, g1.dial_stroke);
        assert!((g1.text_size - 98.0 * 15.0 / 500.0).abs() < EPS);

        assert!((g2.hour_stroke - 2.0 * g1.hour_stroke).abs() < EPS);
        assert!((g2.text_size - 2.0 * g1.text_size).abs() < EPS);
        assert_eq!(g1.radius, g2.radius);
    }

    #[test]
    fn padding_larger_than_the_view_collapses_to_nothing() {
        let g = FaceGeometry::compute(20, 20, Padding::uniform(50), 15, DisplayMetrics::default());
        assert_eq!(g.radius, 0.0);
        assert_eq!(g.hour_length, 0.0);
    }

    #[test]
    fn measure_specs() {
        assert_eq!(MeasureSpec::Exactly(120).resolve(300), 120);
        assert_eq!(MeasureSpec::AtMost(120).resolve(300), 120);
        assert_eq!(MeasureSpec::AtMost(500).resolve(300), 300);
        assert_eq!(MeasureSpec::Unspecified.resolve(300), 300);
    }

    #[test]
    fn square_size_takes_the_larger_side() {
        assert_eq!(square_size(100, 100, Padding::new(10, 0, 10, 0)), 120);
        assert_eq!(square_size(100, 100, Padding::new(0, 30, 0, 0)), 130);
        assert_eq!(square_size(0, 0, Padding::default()), 0);
    }
}
