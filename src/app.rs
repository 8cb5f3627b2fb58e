use analog_clock::config::Config;
use analog_clock::gfx::{
    anim::{lerp_color, Timeline},
    draw::DrawContext,
};
use analog_clock::{
    ClockFaceView, ClockStyle, ClockTimeService, Color, DisplayMetrics, Invalidate, MeasureSpec,
    Padding, Rect, Vec2,
};
use anyhow::Result;
use calloop::channel::Sender;
use log::{info, warn};
use rand::Rng;
use std::sync::{Arc, Mutex, PoisonError};

pub const BTN_LEFT: u32 = 0x110;
pub const BTN_RIGHT: u32 = 0x111;

/// Upper bound for `demo.max_random_padding_dp`.
const PADDING_LIMIT_DP: f32 = 500.0;

#[derive(Debug, Clone)]
pub enum UiEvent {
    PointerMove { pos: Vec2 },
    PointerLeave,
    PointerDown { pos: Vec2, button: u32 },
}

/// Forwards redraw requests from the timer thread to the UI event loop.
struct RedrawSender {
    slot: usize,
    tx: Mutex<Sender<usize>>,
}

impl Invalidate for RedrawSender {
    fn invalidate(&self) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        // Fails only once the event loop is gone, at which point nobody
        // is left to paint anyway.
        let _ = tx.send(self.slot);
    }
}

struct ClockSlot {
    bounds: Rect,
    view: ClockFaceView,
    shown: bool,
}

pub struct App {
    metrics: DisplayMetrics,
    max_padding_dp: f32,
    slots: Vec<ClockSlot>,
    button: Rect,
    size: [u32; 2],
    background: Color,
    button_color: Color,
    press: Timeline,
    hover: bool,
    time: f32,
    dirty: bool,
}

fn padding_limit(dp: f32) -> f32 {
    if (0.0..=PADDING_LIMIT_DP).contains(&dp) {
        return dp;
    }
    let limit = if dp.is_nan() { 0.0 } else { dp.clamp(0.0, PADDING_LIMIT_DP) };
    warn!("demo.max_random_padding_dp = {} is out of range, using {}", dp, limit);
    limit
}

fn parse_color(name: &str, value: &str, fallback: Color) -> Color {
    Color::from_hex(value).unwrap_or_else(|e| {
        warn!("Ignoring demo.{}: {}", name, e);
        fallback
    })
}

impl App {
    pub fn new(config: &Config, service: &Arc<ClockTimeService>, redraw_tx: Sender<usize>) -> Self {
        let demo = &config.demo;
        let metrics = DisplayMetrics::new(config.density);
        let style = ClockStyle::resolve(Some(&config.style));

        let count = demo.clock_count.max(1);
        let cell = demo.clock_size;
        let gap = demo.gap;
        let width = count * cell + (count + 1) * gap;
        let height = cell + demo.button_height + 3 * gap;

        let slots = (0..count as usize)
            .map(|slot| {
                let redraw: Arc<dyn Invalidate> = Arc::new(RedrawSender {
                    slot,
                    tx: Mutex::new(redraw_tx.clone()),
                });
                let mut view = ClockFaceView::new(service.clone(), redraw, style, metrics);
                let (w, h) = view.measure(MeasureSpec::Exactly(cell), MeasureSpec::Exactly(cell));
                view.on_resize(w, h);

                ClockSlot {
                    bounds: Rect::new(
                        (gap + slot as u32 * (cell + gap)) as f32,
                        gap as f32,
                        w as f32,
                        h as f32,
                    ),
                    view,
                    shown: true,
                }
            })
            .collect();

        Self {
            metrics,
            max_padding_dp: padding_limit(demo.max_random_padding_dp),
            slots,
            button: Rect::new(
                gap as f32,
                (cell + 2 * gap) as f32,
                (width - 2 * gap) as f32,
                demo.button_height as f32,
            ),
            size: [width, height],
            background: parse_color("background", &demo.background, Color::WHITE),
            button_color: parse_color("button_color", &demo.button_color, Color::rgba(74, 158, 255, 255)),
            press: Timeline::new(0.15),
            hover: false,
            time: 0.0,
            dirty: true,
        }
    }

    pub fn surface_size(&self) -> [u32; 2] {
        self.size
    }

    /// The surface is on screen: every shown face starts listening.
    pub fn attach(&mut self) -> Result<()> {
        for slot in self.slots.iter_mut().filter(|s| s.shown) {
            slot.view.on_visible()?;
        }
        self.dirty = true;
        Ok(())
    }

    pub fn detach(&mut self) {
        for slot in &mut self.slots {
            slot.view.on_hidden();
        }
    }

    pub fn handle_event(&mut self, event: UiEvent) -> Result<()> {
        match event {
            UiEvent::PointerMove { pos } => {
                let hover = self.button.contains(pos);
                if hover != self.hover {
                    self.hover = hover;
                    self.dirty = true;
                }
            }
            UiEvent::PointerLeave => {
                if self.hover {
                    self.hover = false;
                    self.dirty = true;
                }
            }
            UiEvent::PointerDown { pos, button: BTN_LEFT } if self.button.contains(pos) => {
                self.press.start(self.time);
                self.randomize_padding();
            }
            UiEvent::PointerDown { pos, button: BTN_RIGHT } => {
                if let Some(index) = self.slot_at(pos) {
                    self.toggle(index)?;
                }
            }
            UiEvent::PointerDown { .. } => {}
        }
        Ok(())
    }

    /// Gives every face its own random padding on each side.
    pub fn randomize_padding(&mut self) {
        let mut rng = rand::thread_rng();
        let max = self.max_padding_dp;
        let metrics = self.metrics;
        let mut side = || metrics.dp_to_px(rng.gen_range(0.0..=max)) as u32;

        for slot in &mut self.slots {
            let padding = Padding::new(side(), side(), side(), side());
            slot.view.set_padding(padding);
        }
        info!("Randomized clock padding");
        self.dirty = true;
    }

    pub fn toggle(&mut self, index: usize) -> Result<()> {
        let Some(slot) = self.slots.get_mut(index) else {
            return Ok(());
        };

        slot.shown = !slot.shown;
        if slot.shown {
            slot.view.on_visible()?;
        } else {
            slot.view.on_hidden();
        }
        info!("Clock {} {}", index, if slot.shown { "shown" } else { "hidden" });
        self.dirty = true;
        Ok(())
    }

    pub fn mark_dirty(&mut self, slot: usize) {
        if self.slots.get(slot).is_some_and(|s| s.shown) {
            self.dirty = true;
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        if !self.press.is_complete() {
            self.press.update(self.time);
            self.dirty = true;
        }
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty
    }

    pub fn render(&mut self, draw: &mut DrawContext) {
        draw.begin([self.size[0] as f32, self.size[1] as f32], self.background);

        let base = if self.hover {
            lerp_color(self.button_color, Color::WHITE, 0.2)
        } else {
            self.button_color
        };
        let flash = 1.0 - self.press.eased_progress();
        draw.rect(self.button, lerp_color(base, Color::WHITE, 0.6 * flash));

        for slot in self.slots.iter().filter(|s| s.shown) {
            draw.set_origin(slot.bounds.origin());
            slot.view.render(draw);
        }
        draw.set_origin(Vec2::default());

        draw.flush();
        self.dirty = false;
    }

    fn slot_at(&self, pos: Vec2) -> Option<usize> {
        self.slots.iter().position(|s| s.bounds.contains(pos))
    }

    #[cfg(test)]
    fn padding_of(&self, index: usize) -> Padding {
        self.slots[index].view.padding()
    }
}
