use std::f64::consts::{FRAC_PI_2, PI};
use time::Time;

/// Hand angles for one tick, in radians.
///
/// Zero points right and angles grow clockwise on a y-down surface, so
/// every formula subtracts a quarter turn to put twelve o'clock on top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSnapshot {
    pub hour_angle: f64,
    pub minute_angle: f64,
    pub second_angle: f64,
}

impl ClockSnapshot {
    /// All three angles come from the same `time`.
    pub fn from_time(time: Time) -> Self {
        let (hour, minute, second) = time.as_hms();
        Self::from_hms(hour, minute, second)
    }

    pub fn from_hms(hour: u8, minute: u8, second: u8) -> Self {
        let (hour, minute, second) = (hour as f64, minute as f64, second as f64);

        Self {
            hour_angle: PI * (hour + minute / 60.0) / 6.0 - FRAC_PI_2,
            minute_angle: PI * (minute + second / 60.0) / 30.0 - FRAC_PI_2,
            second_angle: PI * second / 30.0 - FRAC_PI_2,
        }
    }
}

/// Angle of the numeral for `hour` (1..=12), matching the hour hand
/// at the top of that hour.
pub fn dial_angle(hour: u8) -> f64 {
    PI * hour as f64 / 6.0 - FRAC_PI_2
}
