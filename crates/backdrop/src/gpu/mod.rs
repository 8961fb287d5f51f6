//! GPU half of the backdrop.
//!
//! - `context` owns the wgpu instance, device and swapchain and negotiates
//!   MSAA, alpha mode and present mode.
//! - `pipeline` compiles the GLSL pixel program into a single render pipeline.
//! - `surface` wires both into [`GpuSurface`], the window-backed
//!   [`crate::RenderSurface`].

mod context;
mod pipeline;
mod surface;

pub use surface::GpuSurface;
