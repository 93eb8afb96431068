//! Native preview host: a winit window with a glutin GLES context driving a
//! [`Session`] once per display refresh.

use std::ffi::CStr;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use glutin::config::{Config, ConfigTemplateBuilder};
use glutin::context::{ContextApi, ContextAttributesBuilder, PossiblyCurrentContext, Version};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawWindowHandle};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::context::{acquire_context_from, DrawableSurface};
use crate::fetch::SharedFetcher;
use crate::frame::FrameStatus;
use crate::gl::GlowContext;
use crate::runtime::SystemTimeSource;
use crate::session::{ProgramConfig, Session};
use crate::types::{GlApiVersion, PixelRegion};

#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub title: String,
    /// Region read back once textures have settled.
    pub inspect: Option<PixelRegion>,
    /// Stop after this long; run until closed when `None`.
    pub run_for: Option<Duration>,
    pub vsync: bool,
    /// API versions to try, newest first.
    pub versions: Vec<GlApiVersion>,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "shaderplay".to_string(),
            inspect: None,
            run_for: None,
            vsync: true,
            versions: GlApiVersion::PREFERENCE.to_vec(),
        }
    }
}

/// What happened while the window was open.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSummary {
    pub version: GlApiVersion,
    pub frames_drawn: u64,
    pub inspected: Option<Vec<[u8; 4]>>,
}

/// Window surface that creates GLES contexts made current on it.
struct GlutinSurface<'a> {
    display: &'a Display,
    config: &'a Config,
    surface: &'a Surface<WindowSurface>,
    window_handle: RawWindowHandle,
}

impl DrawableSurface for GlutinSurface<'_> {
    type Context = PossiblyCurrentContext;

    fn create_context(&self, version: GlApiVersion) -> Option<PossiblyCurrentContext> {
        let attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::Gles(Some(Version::new(version.major(), 0))))
            .build(Some(self.window_handle));
        let context = match unsafe { self.display.create_context(self.config, &attributes) } {
            Ok(context) => context,
            Err(err) => {
                debug!(%version, error = %err, "context creation refused");
                return None;
            }
        };
        match context.make_current(self.surface) {
            Ok(context) => Some(context),
            Err(err) => {
                debug!(%version, error = %err, "context could not be made current");
                None
            }
        }
    }
}

struct GlWindow {
    gl: GlowContext,
    context: PossiblyCurrentContext,
    surface: Surface<WindowSurface>,
    _display: Display,
    version: GlApiVersion,
}

fn display_preference() -> DisplayApiPreference {
    #[cfg(target_os = "windows")]
    {
        DisplayApiPreference::Wgl(None)
    }
    #[cfg(target_os = "macos")]
    {
        DisplayApiPreference::Cgl
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        DisplayApiPreference::Egl
    }
}

fn create_gl_window(window: &Window, options: &WindowOptions) -> Result<GlWindow> {
    let display_handle = window
        .display_handle()
        .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?
        .as_raw();
    let window_handle = window
        .window_handle()
        .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?
        .as_raw();

    let display = unsafe { Display::new(display_handle, display_preference()) }
        .context("failed to open GL display")?;

    let template = ConfigTemplateBuilder::new()
        .with_alpha_size(8)
        .compatible_with_native_window(window_handle)
        .build();
    let config = unsafe { display.find_configs(template) }
        .context("failed to enumerate GL configs")?
        .next()
        .ok_or_else(|| anyhow!("no suitable GL config"))?;

    let size = window.inner_size();
    let width = NonZeroU32::new(size.width).ok_or_else(|| anyhow!("window has zero width"))?;
    let height = NonZeroU32::new(size.height).ok_or_else(|| anyhow!("window has zero height"))?;
    let attributes =
        SurfaceAttributesBuilder::<WindowSurface>::new().build(window_handle, width, height);
    let surface = unsafe { display.create_window_surface(&config, &attributes) }
        .context("failed to create window surface")?;

    let acquired = acquire_context_from(
        &GlutinSurface {
            display: &display,
            config: &config,
            surface: &surface,
            window_handle,
        },
        &options.versions,
    )?;
    let context = acquired.context;

    let interval = if options.vsync {
        SwapInterval::Wait(NonZeroU32::MIN)
    } else {
        SwapInterval::DontWait
    };
    if let Err(err) = surface.set_swap_interval(&context, interval) {
        warn!(error = %err, "failed to set swap interval");
    }

    let raw = unsafe { glow::Context::from_loader_function_cstr(|s: &CStr| display.get_proc_address(s)) };
    let gl = unsafe { GlowContext::new(raw, acquired.version) }
        .map_err(|err| anyhow!("failed to prepare GL context: {err}"))?;

    info!(version = %acquired.version, width = size.width, height = size.height, "GL window ready");
    Ok(GlWindow {
        gl,
        context,
        surface,
        _display: display,
        version: acquired.version,
    })
}

/// Opens a window sized to the canvas, bootstraps `config` on it and pumps
/// frames until the window closes, the run time elapses or the frame driver
/// is stopped.
pub fn run_window(
    options: WindowOptions,
    config: ProgramConfig,
    fetcher: SharedFetcher,
) -> Result<WindowSummary> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let canvas = config.canvas;
    let window = WindowBuilder::new()
        .with_title(options.title.clone())
        .with_inner_size(PhysicalSize::new(canvas.width, canvas.height))
        .with_resizable(false)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;

    let GlWindow {
        gl,
        context,
        surface,
        _display,
        version,
    } = create_gl_window(&window, &options)?;

    let mut session = Session::bootstrap(gl, config, fetcher, Box::new(SystemTimeSource::new()))
        .context("failed to bootstrap shader program")?;
    let handle = session.frame_handle();
    let started = Instant::now();
    let mut inspected = None;
    let mut result = Ok(());

    window.request_redraw();
    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                handle.stop();
                elwt.exit();
            }
            WindowEvent::RedrawRequested => match session.frame() {
                FrameStatus::Drawn(_) => {
                    let settled = session.channels().map_or(true, |state| !state.is_pending());
                    if inspected.is_none() && settled {
                        inspected = options.inspect.map(|region| session.inspect(region));
                    }
                    if let Err(err) = surface.swap_buffers(&context) {
                        error!(error = %err, "failed to present frame");
                        result = Err(anyhow!("failed to present frame: {err}"));
                        handle.stop();
                        elwt.exit();
                    }
                }
                FrameStatus::Stopped => elwt.exit(),
            },
            _ => {}
        },
        Event::AboutToWait => {
            if options.run_for.is_some_and(|limit| started.elapsed() >= limit) {
                handle.stop();
            }
            if handle.is_running() {
                window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else {
                elwt.exit();
            }
        }
        _ => {}
    });

    if let Err(err) = run_result {
        result = Err(anyhow!("window event loop error: {err}"));
    }
    result?;

    Ok(WindowSummary {
        version,
        frames_drawn: session.frames_drawn(),
        inspected,
    })
}
