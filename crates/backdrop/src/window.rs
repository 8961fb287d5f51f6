use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{info, trace, warn};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder, WindowLevel};

use crate::gpu::GpuSurface;
use crate::lifecycle::Backdrop;
use crate::surface::Host;
use crate::types::{BackdropOptions, SurfaceAlpha};
use crate::viewport::{SizeSource, Viewport};

/// Desktop window the backdrop is mounted into.
#[derive(Clone)]
pub struct WindowHost {
    window: Arc<Window>,
}

impl WindowHost {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }

}

impl Host for WindowHost {
    type Surface = GpuSurface;

    fn viewport(&self) -> Viewport {
        Viewport::from_physical(self.window.inner_size(), self.window.scale_factor())
    }

    fn set_passthrough(&mut self, enabled: bool) {
        if let Err(err) = self.window.set_cursor_hittest(!enabled) {
            warn!(error = %err, "pointer pass-through not supported on this platform");
        }
    }

    fn attach(
        &mut self,
        size: PhysicalSize<u32>,
        options: &BackdropOptions,
    ) -> Result<GpuSurface> {
        self.window.set_visible(true);
        GpuSurface::new(self.window.clone(), size, options)
    }

    fn detach(&mut self) {
        // The compositor would otherwise keep showing the last presented frame.
        self.window.set_visible(false);
        trace!("surface detached from window");
    }

    fn request_frame(&self) {
        self.window.request_redraw();
    }
}

/// Window parameters for [`run`].
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSettings {
    pub title: String,
    /// Logical size; the drawable is this times the scale factor.
    pub size: LogicalSize<f64>,
    /// Keep the window beneath other windows.
    pub below: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "glitchwall".to_string(),
            size: LogicalSize::new(1280.0, 720.0),
            below: true,
        }
    }
}

/// Opens a window, mounts a backdrop into it and runs until the window closes.
///
/// `Escape` closes the window, `R` unmounts and mounts a fresh backdrop.
pub fn run(settings: WindowSettings, options: BackdropOptions) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let mut builder = WindowBuilder::new()
        .with_title(settings.title.as_str())
        .with_inner_size(settings.size)
        .with_transparent(options.surface_alpha == SurfaceAlpha::Transparent);
    if settings.below {
        builder = builder.with_window_level(WindowLevel::AlwaysOnBottom);
    }
    let window = builder
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create backdrop window: {err}"))?;
    let window = Arc::new(window);
    let window_id = window.id();
    let host = WindowHost::new(window.clone());

    let mut backdrop = Some(Backdrop::mount(host.clone(), options.clone()));
    let mut scale_factor = window.scale_factor();

    let run_result = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        match event {
            Event::WindowEvent {
                window_id: id,
                event,
            } if id == window_id => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    if let Some(mut current) = backdrop.take() {
                        current.unmount();
                    }
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. }
                    if event.state == ElementState::Pressed && !event.repeat =>
                {
                    match event.logical_key {
                        Key::Named(NamedKey::Escape) => {
                            if let Some(mut current) = backdrop.take() {
                                current.unmount();
                            }
                            elwt.exit();
                        }
                        Key::Character(ref value) if value.eq_ignore_ascii_case("r") => {
                            if let Some(mut current) = backdrop.take() {
                                current.unmount();
                            }
                            info!("remounting backdrop");
                            backdrop = Some(Backdrop::mount(host.clone(), options.clone()));
                        }
                        _ => {}
                    }
                }
                WindowEvent::Resized(size) => {
                    if let Some(current) = backdrop.as_mut() {
                        current.notify_resize(
                            SizeSource::Window,
                            Viewport::from_physical(size, scale_factor),
                        );
                    }
                }
                WindowEvent::ScaleFactorChanged {
                    scale_factor: updated,
                    ..
                } => {
                    // The logical size is unchanged; only the pixel ratio moves.
                    let logical =
                        Viewport::from_physical(window.inner_size(), scale_factor).logical;
                    scale_factor = updated;
                    if let Some(current) = backdrop.as_mut() {
                        current.notify_resize(SizeSource::Layout, Viewport::new(logical, updated));
                    }
                }
                WindowEvent::Occluded(occluded) => {
                    if let Some(current) = backdrop.as_mut() {
                        current.set_visible(!occluded);
                    }
                }
                WindowEvent::RedrawRequested => {
                    if let Some(current) = backdrop.as_mut() {
                        let outcome = current.on_frame();
                        trace!(?outcome, "frame");
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                if let Some(current) = backdrop.as_mut() {
                    current.settle_viewport();
                }
            }
            _ => {}
        }
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
