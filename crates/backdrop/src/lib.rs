//! Beat-synchronised glitch backdrop.
//!
//! A single fullscreen effect: scrolling vertical colour bands that tear
//! horizontally and swell on every beat of an internal clock. The crate glues
//! the pixel program, a `wgpu` surface, a per-frame render loop and a resize
//! adapter together behind one RAII handle:
//!
//! ```text
//!   Host (window / mock)
//!          │ mount
//!          ▼
//!   Backdrop ──▶ RenderLoop ──▶ RenderSurface::draw ──▶ GLSL pixel program
//!          │          ▲ TimeUniform
//!          └─▶ ViewportAdapter ──▶ RenderSurface::resize ─▶ ResolutionUniform
//! ```
//!
//! [`Backdrop`] owns every resource tied to the host for exactly as long as it
//! is mounted. Unmounting (or dropping it) clears the shared liveness flag
//! first, so frame and resize callbacks that were already queued by the host
//! become no-ops before anything is released.
//!
//! The same pixel program exists as a CPU reference in [`kernel`], which backs
//! the still-frame exporter and the tests.

pub mod beat;
mod compile;
pub mod config;
pub mod export;
pub mod frame_loop;
mod gpu;
pub mod kernel;
pub mod lifecycle;
#[cfg(test)]
mod mock;
pub mod runtime;
pub mod surface;
pub mod types;
pub mod uniforms;
pub mod viewport;
pub mod window;

pub use beat::{BeatClock, BEAT_SPEED};
pub use compile::fragment_source;
pub use config::{ConfigError, HostConfig};
pub use export::{export_still, render_still, ExportError};
pub use frame_loop::{Liveness, RenderLoop, TickOutcome};
pub use gpu::GpuSurface;
pub use lifecycle::{Backdrop, BackdropStatus};
pub use runtime::{BoxedTimeSource, ManualTimeSource, SystemTimeSource, TimeSample, TimeSource};
pub use surface::{DrawError, Host, RenderSurface};
pub use types::{parse_antialias, Antialiasing, BackdropOptions, GpuPowerPreference, SurfaceAlpha};
pub use uniforms::{FrameUniforms, ResolutionUniform, TimeUniform, Uniforms};
pub use viewport::{SizeSource, Viewport, ViewportAdapter};
pub use window::{run, WindowHost, WindowSettings};
pub use winit::dpi;
