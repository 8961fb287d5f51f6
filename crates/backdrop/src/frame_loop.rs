use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::runtime::BoxedTimeSource;
use crate::surface::{DrawError, RenderSurface};
use crate::uniforms::Uniforms;

/// Shared "still mounted" flag.
///
/// Cleared by the lifecycle manager before anything is released; every
/// callback checks it first and bails out once it is gone.
#[derive(Debug, Clone)]
pub struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.get()
    }

    pub(crate) fn kill(&self) {
        self.0.set(false);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One frame reached the surface.
    Drawn,
    /// The backdrop was torn down before the callback ran.
    Cancelled,
    /// The host is hidden; nothing drawn until it is visible again.
    Paused,
    /// The frame was dropped but the next one should succeed.
    Retry,
    /// The surface is unusable; the backdrop renders nothing from now on.
    Degraded,
}

impl TickOutcome {
    /// Whether the host should schedule another frame callback.
    pub fn reschedule(self) -> bool {
        matches!(self, Self::Drawn | Self::Retry)
    }
}

#[derive(Debug)]
struct FrameStats {
    frames: u64,
    window_frames: u32,
    window_start: Instant,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            frames: 0,
            window_frames: 0,
            window_start: Instant::now(),
        }
    }

    fn record(&mut self, time: f32) {
        self.frames = self.frames.saturating_add(1);
        self.window_frames = self.window_frames.saturating_add(1);

        let elapsed = self.window_start.elapsed();
        if elapsed >= Duration::from_secs(1) {
            let fps = self.window_frames as f32 / elapsed.as_secs_f32();
            debug!(
                fps = fps.round(),
                frames = self.frames,
                time,
                "render stats"
            );
            self.window_frames = 0;
            self.window_start = Instant::now();
        }
    }
}

/// Drives one draw per host frame callback.
pub struct RenderLoop {
    clock: BoxedTimeSource,
    liveness: Liveness,
    paused: bool,
    stats: FrameStats,
}

impl RenderLoop {
    pub fn new(mut clock: BoxedTimeSource, liveness: Liveness) -> Self {
        clock.reset();
        Self {
            clock,
            liveness,
            paused: false,
            stats: FrameStats::new(),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        if !self.paused {
            trace!("render loop paused");
        }
        self.paused = true;
    }

    /// Returns `true` when the loop was paused and needs a new frame callback.
    pub fn resume(&mut self) -> bool {
        let was_paused = self.paused;
        self.paused = false;
        if was_paused {
            trace!("render loop resumed");
        }
        was_paused
    }

    /// Frames presented since the loop started.
    pub fn frames(&self) -> u64 {
        self.stats.frames
    }

    /// Advances the time uniform and issues exactly one draw.
    pub(crate) fn tick<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        uniforms: &mut Uniforms,
    ) -> TickOutcome {
        if !self.liveness.is_alive() {
            trace!("frame callback after teardown; ignoring");
            return TickOutcome::Cancelled;
        }
        if self.paused {
            return TickOutcome::Paused;
        }

        let sample = self.clock.sample();
        uniforms.time.advance(sample.seconds);
        self.draw(surface, uniforms)
    }

    /// Draws the current uniforms again without advancing time.
    ///
    /// A paused loop draws nothing; resuming requests a fresh frame anyway.
    pub(crate) fn redraw<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        uniforms: &Uniforms,
    ) -> TickOutcome {
        if !self.liveness.is_alive() {
            return TickOutcome::Cancelled;
        }
        if self.paused {
            trace!("redraw skipped while paused");
            return TickOutcome::Paused;
        }
        self.draw(surface, uniforms)
    }

    fn draw<S: RenderSurface>(&mut self, surface: &mut S, uniforms: &Uniforms) -> TickOutcome {
        match surface.draw(&uniforms.frame()) {
            Ok(()) => {
                self.stats.record(uniforms.time.seconds());
                TickOutcome::Drawn
            }
            Err(DrawError::Lost) => {
                surface.recover();
                TickOutcome::Retry
            }
            Err(DrawError::Timeout) => {
                trace!("surface timeout; retrying next frame");
                TickOutcome::Retry
            }
            Err(DrawError::OutOfMemory) => {
                warn!("surface out of memory; backdrop disabled");
                TickOutcome::Degraded
            }
            Err(DrawError::Other(message)) => {
                warn!(error = %message, "surface error; retrying next frame");
                TickOutcome::Retry
            }
        }
    }
}
