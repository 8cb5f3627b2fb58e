//! The clock face widget.

pub mod geometry;
pub mod style;

use crate::clock::service::{ClockTimeService, Invalidate, Subscription};
use crate::clock::snapshot::{dial_angle, ClockSnapshot};
use crate::gfx::{
    math::Vec2,
    surface::{Stroke, Surface},
};
use anyhow::Result;
use geometry::{square_size, DisplayMetrics, FaceGeometry, MeasureSpec, Padding};
use std::sync::Arc;
use style::ClockStyle;

/// Length of the tail behind the center, as a fraction of the hand.
const TAIL_RATIO: f32 = 0.2;
const CENTER_DOT_RATIO: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandSegment {
    pub from: Vec2,
    pub to: Vec2,
    pub stroke: Stroke,
}

/// An analog clock face driven by a shared [`ClockTimeService`].
///
/// The host calls the `on_*` hooks as the view is shown, hidden and laid
/// out, and `render` whenever the `redraw` handle it supplied has been
/// invalidated.
pub struct ClockFaceView {
    service: Arc<ClockTimeService>,
    redraw: Arc<dyn Invalidate>,
    style: ClockStyle,
    metrics: DisplayMetrics,
    min_size: (u32, u32),
    padding: Padding,
    size: Option<(u32, u32)>,
    geometry: Option<FaceGeometry>,
    subscription: Option<Subscription>,
}

impl ClockFaceView {
    pub fn new(
        service: Arc<ClockTimeService>,
        redraw: Arc<dyn Invalidate>,
        style: ClockStyle,
        metrics: DisplayMetrics,
    ) -> Self {
        Self {
            service,
            redraw,
            style,
            metrics,
            min_size: (0, 0),
            padding: Padding::default(),
            size: None,
            geometry: None,
            subscription: None,
        }
    }

    pub fn with_defaults(service: Arc<ClockTimeService>, redraw: Arc<dyn Invalidate>) -> Self {
        Self::new(service, redraw, ClockStyle::default(), DisplayMetrics::default())
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn geometry(&self) -> Option<&FaceGeometry> {
        self.geometry.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.subscription.is_some()
    }

    /// The suggested minimum size used by [`measure`](Self::measure).
    pub fn set_minimum_size(&mut self, width: u32, height: u32) {
        self.min_size = (width, height);
    }

    pub fn on_visible(&mut self) -> Result<()> {
        if self.subscription.is_none() {
            self.subscription = Some(self.service.subscribe(&self.redraw)?);
        }
        Ok(())
    }

    pub fn on_hidden(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.service.unsubscribe(subscription);
        }
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.size = Some((width, height));
        self.update_geometry();
    }

    /// Changing padding relayouts the face and asks for a repaint.
    pub fn set_padding(&mut self, padding: Padding) {
        if padding == self.padding {
            return;
        }
        self.padding = padding;
        self.update_geometry();
        self.redraw.invalidate();
    }

    /// Always square: the larger of the padded minimum width and height,
    /// then fitted to each constraint.
    pub fn measure(&self, width: MeasureSpec, height: MeasureSpec) -> (u32, u32) {
        let side = square_size(self.min_size.0, self.min_size.1, self.padding);
        (width.resolve(side), height.resolve(side))
    }

    /// Hour, minute and second hands for `snapshot`, in that order.
    /// `None` until the view has been sized.
    pub fn hand_segments(&self, snapshot: &ClockSnapshot) -> Option<[HandSegment; 3]> {
        let g = self.geometry.as_ref()?;

        let hand = |angle: f64, length: f32, stroke: Stroke| {
            let unit = Vec2::from_angle(angle);
            HandSegment {
                from: g.center - unit * (TAIL_RATIO * length),
                to: g.center + unit * length,
                stroke,
            }
        };

        Some([
            hand(
                snapshot.hour_angle,
                g.hour_length,
                Stroke::new(self.style.hour_hand_color, g.hour_stroke),
            ),
            hand(
                snapshot.minute_angle,
                g.minute_length,
                Stroke::new(self.style.minute_hand_color, g.minute_stroke),
            ),
            hand(
                snapshot.second_angle,
                g.second_length,
                Stroke::new(self.style.second_hand_color, g.second_stroke),
            ),
        ])
    }

    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        let Some(g) = self.geometry.as_ref() else {
            return;
        };
        let angles = self.service.current_angles();

        surface.stroke_circle(
            g.center,
            g.radius,
            Stroke::new(self.style.dial_color, g.dial_stroke),
        );

        if let Some(hands) = self.hand_segments(&angles) {
            for hand in hands {
                surface.line(hand.from, hand.to, hand.stroke);
            }
        }

        surface.fill_circle(g.center, CENTER_DOT_RATIO * g.radius, self.style.hour_hand_color);

        for hour in 1..=12u8 {
            let at = g.center + Vec2::from_angle(dial_angle(hour)) * g.number_radius;
            surface.text(
                &hour.to_string(),
                Vec2::new(at.x, at.y + g.text_size / 2.0),
                g.text_size,
                self.style.dial_color,
            );
        }
    }

    fn update_geometry(&mut self) {
        if let Some((width, height)) = self.size {
            self.geometry = Some(FaceGeometry::compute(
                width,
                height,
                self.padding,
                self.style.numbers_size,
                self.metrics,
            ));
        }
    }
}

impl Drop for ClockFaceView {
    fn drop(&mut self) {
        self.on_hidden();
    }
}
