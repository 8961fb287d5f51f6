use tracing::{debug, info, trace, warn};
use winit::dpi::PhysicalSize;

use crate::frame_loop::{Liveness, RenderLoop, TickOutcome};
use crate::runtime::{BoxedTimeSource, SystemTimeSource};
use crate::surface::{Host, RenderSurface};
use crate::types::BackdropOptions;
use crate::uniforms::Uniforms;
use crate::viewport::{SizeSource, Viewport, ViewportAdapter};

/// Coarse state of a backdrop, mostly for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackdropStatus {
    /// Drawing every frame.
    Active,
    /// Mounted, but without a usable surface; nothing is drawn.
    Degraded,
    /// Unmounted; every call is a no-op.
    Disposed,
}

/// Everything tied to one mount. Created once, torn down once.
struct RenderContext<S> {
    surface: Option<S>,
    uniforms: Uniforms,
    frame_loop: Option<RenderLoop>,
    viewport: Option<ViewportAdapter>,
}

impl<S: RenderSurface> RenderContext<S> {
    fn degrade(&mut self) {
        self.viewport = None;
        self.frame_loop = None;
        if let Some(surface) = self.surface.take() {
            surface.release();
        }
    }
}

/// A glitch backdrop mounted into a [`Host`].
///
/// Dropping the backdrop unmounts it.
pub struct Backdrop<H: Host> {
    host: H,
    liveness: Liveness,
    context: Option<RenderContext<H::Surface>>,
}

impl<H: Host> Backdrop<H> {
    /// Mounts with the system clock.
    ///
    /// Never fails: if the host cannot provide a surface the backdrop comes
    /// up [`BackdropStatus::Degraded`] and renders nothing.
    pub fn mount(host: H, options: BackdropOptions) -> Self {
        Self::mount_with_clock(host, options, Box::new(SystemTimeSource::new()))
    }

    pub fn mount_with_clock(mut host: H, options: BackdropOptions, clock: BoxedTimeSource) -> Self {
        let liveness = Liveness::new();
        host.set_passthrough(options.passthrough);

        let adapter = ViewportAdapter::new(liveness.clone(), options.pixel_ratio);
        let viewport = host.viewport();
        let size = adapter.drawable_size(&viewport);

        let surface = match host.attach(size, &options) {
            Ok(surface) => Some(surface),
            Err(err) => {
                warn!(
                    error = %format!("{err:#}"),
                    "render surface unavailable; backdrop will stay empty"
                );
                None
            }
        };

        let mut uniforms = Uniforms::default();
        let context = match surface {
            Some(surface) => {
                uniforms.resolution.set(surface.size());
                let applied = surface.size();
                host.request_frame();
                info!(
                    width = applied.width,
                    height = applied.height,
                    scale_factor = viewport.scale_factor,
                    "backdrop mounted"
                );
                RenderContext {
                    surface: Some(surface),
                    uniforms,
                    frame_loop: Some(RenderLoop::new(clock, liveness.clone())),
                    viewport: Some(adapter),
                }
            }
            None => RenderContext {
                surface: None,
                uniforms,
                frame_loop: None,
                viewport: None,
            },
        };

        Self {
            host,
            liveness,
            context: Some(context),
        }
    }

    pub fn status(&self) -> BackdropStatus {
        match self.context.as_ref() {
            None => BackdropStatus::Disposed,
            Some(context) if context.surface.is_some() => BackdropStatus::Active,
            Some(_) => BackdropStatus::Degraded,
        }
    }

    /// Current uniform values, if still mounted.
    pub fn uniforms(&self) -> Option<Uniforms> {
        self.context.as_ref().map(|context| context.uniforms)
    }

    /// Frames drawn by the render loop since mount.
    pub fn frames(&self) -> u64 {
        self.context
            .as_ref()
            .and_then(|context| context.frame_loop.as_ref())
            .map_or(0, RenderLoop::frames)
    }

    /// Host frame callback: settles any pending viewport, then ticks once.
    pub fn on_frame(&mut self) -> TickOutcome {
        if !self.liveness.is_alive() {
            trace!("frame callback after unmount; ignoring");
            return TickOutcome::Cancelled;
        }
        let Some(context) = self.context.as_mut() else {
            return TickOutcome::Cancelled;
        };
        let (Some(surface), Some(frame_loop)) =
            (context.surface.as_mut(), context.frame_loop.as_mut())
        else {
            return TickOutcome::Degraded;
        };

        if let Some(adapter) = context.viewport.as_mut() {
            adapter.settle(surface, &mut context.uniforms.resolution);
        }
        let outcome = frame_loop.tick(surface, &mut context.uniforms);

        if outcome == TickOutcome::Degraded {
            context.degrade();
        }
        if outcome.reschedule() {
            self.host.request_frame();
        }
        outcome
    }

    /// Records a size signal; applied on the next [`Backdrop::settle_viewport`] or frame.
    pub fn notify_resize(&mut self, source: SizeSource, viewport: Viewport) -> bool {
        if !self.liveness.is_alive() {
            return false;
        }
        self.context
            .as_mut()
            .and_then(|context| context.viewport.as_mut())
            .is_some_and(|adapter| adapter.observe(source, viewport))
    }

    /// Applies the pending viewport and redraws immediately if the size changed.
    ///
    /// Returns the outcome of the forced redraw, or `None` when nothing changed.
    /// While hidden the resize is still applied but the redraw reports
    /// [`TickOutcome::Paused`].
    pub fn settle_viewport(&mut self) -> Option<TickOutcome> {
        if !self.liveness.is_alive() {
            return None;
        }
        let context = self.context.as_mut()?;
        let surface = context.surface.as_mut()?;
        let frame_loop = context.frame_loop.as_mut()?;
        let adapter = context.viewport.as_mut()?;

        let applied: PhysicalSize<u32> = adapter.settle(surface, &mut context.uniforms.resolution)?;
        debug!(
            width = applied.width,
            height = applied.height,
            "resolution updated"
        );
        let outcome = frame_loop.redraw(surface, &context.uniforms);
        if outcome == TickOutcome::Degraded {
            context.degrade();
        }
        Some(outcome)
    }

    /// Pauses drawing while the host is hidden.
    pub fn set_visible(&mut self, visible: bool) {
        if !self.liveness.is_alive() {
            return;
        }
        let Some(frame_loop) = self
            .context
            .as_mut()
            .and_then(|context| context.frame_loop.as_mut())
        else {
            return;
        };
        if !visible {
            frame_loop.pause();
        } else if frame_loop.resume() {
            self.host.request_frame();
        }
    }

    /// Tears the backdrop down. Safe to call any number of times.
    pub fn unmount(&mut self) {
        self.liveness.kill();
        let Some(mut context) = self.context.take() else {
            return;
        };

        context.viewport = None;
        let frames = context
            .frame_loop
            .take()
            .map_or(0, |frame_loop| frame_loop.frames());
        if let Some(surface) = context.surface.take() {
            surface.release();
        }
        self.host.detach();
        info!(frames, "backdrop unmounted");
    }
}

impl<H: Host> Drop for Backdrop<H> {
    fn drop(&mut self) {
        self.unmount();
    }
}
