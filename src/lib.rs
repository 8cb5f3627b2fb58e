//! Analog clock face widget.
//!
//! A [`ClockTimeService`] samples wall-clock time once per period and
//! notifies every visible [`ClockFaceView`], which then redraws its hands
//! onto a host-provided [`Surface`].

pub mod clock;
pub mod config;
pub mod gfx;
pub mod view;

pub use clock::{
    service::{ClockTimeService, IdlePolicy, Invalidate, Subscription, TimerConfig},
    snapshot::ClockSnapshot,
    source::{ClockSource, FixedClock, SystemClock},
};
pub use gfx::{
    math::{Color, Rect, Vec2},
    surface::{Stroke, Surface},
};
pub use view::{
    geometry::{DisplayMetrics, FaceGeometry, MeasureSpec, Padding},
    style::{ClockStyle, StyleAttributes},
    ClockFaceView, HandSegment,
};
