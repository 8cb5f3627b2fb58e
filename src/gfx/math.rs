use anyhow::{bail, Result};
use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing at `angle` radians (y grows downwards).
    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos() as f32, angle.sin() as f32)
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    pub fn normalized(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            self
        } else {
            self * (1.0 / len)
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

/// Straight (non-premultiplied) RGBA, each channel in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgbaf(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgbaf(1.0, 1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgbaf(1.0, 0.0, 0.0, 1.0);

    pub const fn rgbaf(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Parses `#rrggbb` or `#aarrggbb`; the `#` is optional.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("Invalid color {:?}: not a hex value", s);
        }

        let value = match digits.len() {
            6 => 0xff00_0000 | u32::from_str_radix(digits, 16)?,
            8 => u32::from_str_radix(digits, 16)?,
            n => bail!("Invalid color {:?}: expected 6 or 8 hex digits, got {}", s, n),
        };

        let [a, r, g, b] = value.to_be_bytes();
        Ok(Color::rgba(r, g, b, a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rgb_and_argb() {
        assert_eq!(Color::from_hex("#ff0000").unwrap(), Color::RED);
        assert_eq!(Color::from_hex("000000").unwrap(), Color::BLACK);
        assert_eq!(
            Color::from_hex("#804A9EFF").unwrap(),
            Color::rgba(0x4a, 0x9e, 0xff, 0x80)
        );
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("red").is_err());
        assert!(Color::from_hex("#+12345").is_err());
        assert!(Color::from_hex("").is_err());
    }

    #[test]
    fn unit_vectors_follow_the_screen_convention() {
        let down = Vec2::from_angle(std::f64::consts::FRAC_PI_2);
        assert!(down.x.abs() < 1e-6);
        assert!((down.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rect_hit_testing_is_half_open() {
        let r = Rect::new(10.0, 10.0, 20.0, 5.0);
        assert!(r.contains(Vec2::new(10.0, 10.0)));
        assert!(r.contains(Vec2::new(29.9, 14.9)));
        assert!(!r.contains(Vec2::new(30.0, 12.0)));
        assert!(!r.contains(Vec2::new(15.0, 9.0)));
    }
}
