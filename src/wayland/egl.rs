use anyhow::{anyhow, Context as _, Result};
use khronos_egl as egl;
use std::ffi::c_void;
use std::ptr;
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::Proxy;

const CONFIG_ATTRIBS: [egl::Int; 13] = [
    egl::SURFACE_TYPE,
    egl::WINDOW_BIT,
    egl::RED_SIZE,
    8,
    egl::GREEN_SIZE,
    8,
    egl::BLUE_SIZE,
    8,
    egl::ALPHA_SIZE,
    8,
    egl::RENDERABLE_TYPE,
    egl::OPENGL_ES2_BIT,
    egl::NONE,
];

const CONTEXT_ATTRIBS: [egl::Int; 3] = [egl::CONTEXT_CLIENT_VERSION, 2, egl::NONE];

/// A GLES2 context bound to the single clock surface.
pub struct EglContext {
    instance: egl::Instance<egl::Static>,
    display: egl::Display,
    context: egl::Context,
    config: egl::Config,
    window: Option<wayland_egl::WlEglSurface>,
    surface: Option<egl::Surface>,
}

impl EglContext {
    pub fn new(wl_display: *mut c_void) -> Result<Self> {
        let instance = egl::Instance::new(egl::Static);

        let display = unsafe {
            instance
                .get_display(wl_display as egl::NativeDisplayType)
                .ok_or_else(|| anyhow!("Failed to get EGL display"))?
        };

        let (major, minor) = instance
            .initialize(display)
            .context("Failed to initialize EGL")?;
        log::info!("EGL version: {}.{}", major, minor);

        let config = instance
            .choose_first_config(display, &CONFIG_ATTRIBS)?
            .ok_or_else(|| anyhow!("No EGL config with an 8-bit RGBA GLES2 window"))?;

        instance.bind_api(egl::OPENGL_ES_API)?;
        let context = instance
            .create_context(display, config, None, &CONTEXT_ATTRIBS)
            .context("Failed to create GLES2 context")?;

        Ok(Self {
            instance,
            display,
            context,
            config,
            window: None,
            surface: None,
        })
    }

    /// Wraps `wl_surface` in an EGL window and makes it current.
    pub fn create_surface(&mut self, wl_surface: &WlSurface, width: i32, height: i32) -> Result<()> {
        if let Some(surface) = self.surface.take() {
            self.instance.destroy_surface(self.display, surface)?;
        }
        self.window = None;

        let window = wayland_egl::WlEglSurface::new(wl_surface.id(), width, height)
            .map_err(|e| anyhow!("Failed to create EGL window: {}", e))?;

        let surface = unsafe {
            self.instance.create_window_surface(
                self.display,
                self.config,
                window.ptr() as egl::NativeWindowType,
                None,
            )?
        };

        self.window = Some(window);
        self.surface = Some(surface);
        self.make_current()
    }

    pub fn make_current(&self) -> Result<()> {
        if let Some(surface) = self.surface {
            self.instance
                .make_current(self.display, Some(surface), Some(surface), Some(self.context))?;
        }
        Ok(())
    }

    pub fn swap_buffers(&self) -> Result<()> {
        if let Some(surface) = self.surface {
            self.instance.swap_buffers(self.display, surface)?;
        }
        Ok(())
    }

    pub fn get_proc_address(&self, name: &str) -> *const c_void {
        self.instance
            .get_proc_address(name)
            .map(|f| f as *const c_void)
            .unwrap_or(ptr::null())
    }
}

impl Drop for EglContext {
    fn drop(&mut self) {
        let _ = self.instance.make_current(self.display, None, None, None);
        if let Some(surface) = self.surface.take() {
            let _ = self.instance.destroy_surface(self.display, surface);
        }
        let _ = self.instance.destroy_context(self.display, self.context);
        let _ = self.instance.terminate(self.display);
    }
}
