use crate::gfx::math::Color;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOUR_HAND_COLOR: Color = Color::BLACK;
pub const DEFAULT_MINUTE_HAND_COLOR: Color = Color::BLACK;
pub const DEFAULT_SECOND_HAND_COLOR: Color = Color::RED;
pub const DEFAULT_DIAL_COLOR: Color = Color::BLACK;
pub const DEFAULT_NUMBERS_SIZE: u32 = 15;

/// Style attributes as written in a theme or config file. Any of them
/// may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleAttributes {
    pub hour_hand_color: Option<String>,
    pub minute_hand_color: Option<String>,
    pub second_hand_color: Option<String>,
    /// Also used for the numerals.
    pub dial_color: Option<String>,
    pub numbers_size: Option<u32>,
}

/// Fully resolved look of one clock face. Fixed for the life of the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockStyle {
    pub hour_hand_color: Color,
    pub minute_hand_color: Color,
    pub second_hand_color: Color,
    pub dial_color: Color,
    pub numbers_size: u32,
}

impl Default for ClockStyle {
    fn default() -> Self {
        Self {
            hour_hand_color: DEFAULT_HOUR_HAND_COLOR,
            minute_hand_color: DEFAULT_MINUTE_HAND_COLOR,
            second_hand_color: DEFAULT_SECOND_HAND_COLOR,
            dial_color: DEFAULT_DIAL_COLOR,
            numbers_size: DEFAULT_NUMBERS_SIZE,
        }
    }
}

impl ClockStyle {
    /// Resolves each attribute on its own, falling back to the default
    /// when it is absent or cannot be parsed. Never fails.
    pub fn resolve(attrs: Option<&StyleAttributes>) -> Self {
        let Some(attrs) = attrs else {
            return Self::default();
        };

        Self {
            hour_hand_color: color_or("hour_hand_color", &attrs.hour_hand_color, DEFAULT_HOUR_HAND_COLOR),
            minute_hand_color: color_or(
                "minute_hand_color",
                &attrs.minute_hand_color,
                DEFAULT_MINUTE_HAND_COLOR,
            ),
            second_hand_color: color_or(
                "second_hand_color",
                &attrs.second_hand_color,
                DEFAULT_SECOND_HAND_COLOR,
            ),
            dial_color: color_or("dial_color", &attrs.dial_color, DEFAULT_DIAL_COLOR),
            numbers_size: attrs.numbers_size.unwrap_or(DEFAULT_NUMBERS_SIZE),
        }
    }
}

fn color_or(name: &str, value: &Option<String>, default: Color) -> Color {
    match value.as_deref().map(Color::from_hex) {
        None => default,
        Some(Ok(color)) => color,
        Some(Err(e)) => {
            log::warn!("Ignoring {}: {}", name, e);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn no_attribute_source_means_defaults() {
        let style = ClockStyle::resolve(None);
        assert_eq!(style, ClockStyle::default());
        assert_eq!(style.second_hand_color, Color::RED);
        assert_eq!(style.numbers_size, 15);
    }

    #[test]
    fn each_attribute_falls_back_on_its_own() {
        let attrs = StyleAttributes {
            minute_hand_color: Some("#0000ff".into()),
            dial_color: Some("not a color".into()),
            numbers_size: Some(30),
            ..Default::default()
        };

        assert_eq!(
            ClockStyle::resolve(Some(&attrs)),
            ClockStyle {
                hour_hand_color: Color::BLACK,
                minute_hand_color: Color::rgba(0, 0, 255, 255),
                second_hand_color: Color::RED,
                dial_color: Color::BLACK,
                numbers_size: 30,
            }
        );
    }

    #[test]
    fn attributes_read_from_toml() {
        let attrs: StyleAttributes = toml::from_str(
            r##"
            hour_hand_color = "#336699"
            numbers_size = 20
            "##,
        )
        .unwrap();

        assert_eq!(attrs.hour_hand_color.as_deref(), Some("#336699"));
        assert_eq!(attrs.second_hand_color, None);
        assert_eq!(ClockStyle::resolve(Some(&attrs)).numbers_size, 20);
    }
}
