use super::math::Color;

pub fn ease_out(t: f32) -> f32 {
    1.0 - (1.0 - t) * (1.0 - t)
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn lerp_color(a: Color, b: Color, t: f32) -> Color {
    Color {
        r: lerp(a.r, b.r, t),
        g: lerp(a.g, b.g, t),
        b: lerp(a.b, b.b, t),
        a: lerp(a.a, b.a, t),
    }
}

/// A one-shot animation measured in seconds of app time.
#[derive(Debug, Clone)]
pub struct Timeline {
    start_time: Option<f32>,
    duration: f32,
    current_time: f32,
}

impl Timeline {
    /// Starts out finished.
    pub fn new(duration: f32) -> Self {
        Self {
            start_time: None,
            duration,
            current_time: 0.0,
        }
    }

    pub fn start(&mut self, now: f32) {
        self.start_time = Some(now);
        self.current_time = now;
    }

    pub fn update(&mut self, now: f32) {
        self.current_time = now;
    }

    pub fn progress(&self) -> f32 {
        match self.start_time {
            Some(start) if self.duration > 0.0 => {
                ((self.current_time - start) / self.duration).clamp(0.0, 1.0)
            }
            _ => 1.0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress() >= 1.0
    }

    pub fn eased_progress(&self) -> f32 {
        ease_out(self.progress())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_timeline_is_complete() {
        assert!(Timeline::new(0.2).is_complete());
    }

    #[test]
    fn progress_runs_from_start_to_duration() {
        let mut t = Timeline::new(0.5);
        t.start(10.0);
        assert_eq!(t.progress(), 0.0);
        assert!(!t.is_complete());

        t.update(10.25);
        assert!((t.progress() - 0.5).abs() < 1e-6);
        assert!((t.eased_progress() - 0.75).abs() < 1e-6);

        t.update(11.0);
        assert!(t.is_complete());
    }

    #[test]
    fn colors_blend_per_channel() {
        let mid = lerp_color(Color::BLACK, Color::WHITE, 0.5);
        assert_eq!(mid, Color::rgbaf(0.5, 0.5, 0.5, 1.0));
    }
}
