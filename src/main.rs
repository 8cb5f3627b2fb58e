mod app;
mod wayland;

use analog_clock::config::Config;
use analog_clock::gfx::{draw::DrawContext, gl::load_ui_program};
use analog_clock::{ClockTimeService, SystemClock};
use anyhow::{anyhow, Context as _, Result};
use app::App;
use calloop::channel::{self, Event as ChannelEvent};
use calloop::generic::Generic;
use calloop::{EventLoop, Interest, LoopHandle, Mode, PostAction};
use log::{info, warn};
use std::io::ErrorKind;
use std::os::fd::OwnedFd;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wayland::egl::EglContext;
use wayland::WaylandState;
use wayland_client::{backend::WaylandError, Connection, Proxy};
use wayland_protocols_wlr::layer_shell::v1::client::{zwlr_layer_shell_v1, zwlr_layer_surface_v1};

const FRAME_BUDGET: Duration = Duration::from_millis(16);

/// Ends the current `dispatch` as soon as `fd` has data. Reading is left to
/// the caller.
fn wake_on_readable<D>(handle: &LoopHandle<'_, D>, fd: OwnedFd) -> Result<()> {
    handle
        .insert_source(Generic::new(fd, Interest::READ, Mode::Level), |_, _, _| {
            Ok(PostAction::Continue)
        })
        .map_err(|e| anyhow!("Failed to watch fd: {}", e.error))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    info!("Starting analog-clock...");

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {:#}", e);
        Config::default()
    });

    let service = Arc::new(ClockTimeService::new(
        SystemClock::new(),
        config.timer.to_timer_config(),
    ));

    // Timer ticks arrive here as slot indices needing a repaint.
    let mut event_loop: EventLoop<Vec<usize>> = EventLoop::try_new()?;
    let (redraw_tx, redraw_rx) = channel::channel();
    event_loop
        .handle()
        .insert_source(redraw_rx, |event, _, dirty: &mut Vec<usize>| {
            if let ChannelEvent::Msg(slot) = event {
                dirty.push(slot);
            }
        })
        .map_err(|e| anyhow!("Failed to register redraw channel: {}", e.error))?;

    let mut app = App::new(&config, &service, redraw_tx);
    let [width, height] = app.surface_size();

    let conn = Connection::connect_to_env().context("Failed to connect to Wayland")?;
    let display = conn.display();
    let mut event_queue = conn.new_event_queue();
    let qh = event_queue.handle();
    let _registry = display.get_registry(&qh, ());

    let mut state = WaylandState::new();
    event_queue.roundtrip(&mut state)?;
    if let Some([w, h]) = state.output_size {
        info!("Output is {}x{}", w, h);
    }

    let compositor = state
        .compositor
        .clone()
        .ok_or_else(|| anyhow!("Compositor does not offer wl_compositor"))?;
    let layer_shell = state
        .layer_shell
        .clone()
        .ok_or_else(|| anyhow!("Compositor does not offer zwlr_layer_shell_v1"))?;

    let surface = compositor.create_surface(&qh, ());
    let layer_surface = layer_shell.get_layer_surface(
        &surface,
        state.output.as_ref(),
        zwlr_layer_shell_v1::Layer::Top,
        "analog-clock".to_string(),
        &qh,
        (),
    );
    layer_surface.set_anchor(zwlr_layer_surface_v1::Anchor::Top | zwlr_layer_surface_v1::Anchor::Right);
    layer_surface.set_exclusive_zone(0);
    layer_surface.set_size(width, height);
    surface.commit();
    state.surface = Some(surface.clone());
    state.layer_surface = Some(layer_surface);

    while !state.configured {
        event_queue.blocking_dispatch(&mut state)?;
    }

    let mut egl = EglContext::new(display.id().as_ptr() as *mut _)?;
    egl.create_surface(&surface, width as i32, height as i32)?;

    let gl = unsafe { glow::Context::from_loader_function(|s| egl.get_proc_address(s)) };
    let program = load_ui_program(&gl)?;
    let mut draw = DrawContext::new(gl, program)?;

    service.start()?;
    app.attach()?;

    let wayland_fd = conn
        .backend()
        .poll_fd()
        .try_clone_to_owned()
        .context("Failed to duplicate the Wayland fd")?;
    wake_on_readable(&event_loop.handle(), wayland_fd)?;

    let mut dirty = Vec::new();
    let mut last_frame = Instant::now();

    while state.running {
        event_queue.flush()?;
        event_loop.dispatch(Some(FRAME_BUDGET), &mut dirty)?;

        if let Some(guard) = event_queue.prepare_read() {
            match guard.read() {
                Ok(_) => {}
                Err(WaylandError::Io(e)) if e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }
        }
        event_queue.dispatch_pending(&mut state)?;

        for ev in state.pending_events.drain(..) {
            app.handle_event(ev)?;
        }
        for slot in dirty.drain(..) {
            app.mark_dirty(slot);
        }

        let now = Instant::now();
        app.update(now.duration_since(last_frame).as_secs_f32());
        last_frame = now;

        if app.needs_redraw() {
            egl.make_current()?;
            app.render(&mut draw);
            egl.swap_buffers()?;
        }
    }

    info!("Shutting down");
    app.detach();
    service.stop();
    Ok(())
}
