//! Seams between the backdrop and whatever hosts it.
//!
//! [`Host`] is the element the backdrop is mounted into (a window on the
//! desktop, a mock in tests). [`RenderSurface`] is the drawable the host hands
//! back on attach; the lifecycle manager owns it until unmount.

use thiserror::Error;
use winit::dpi::PhysicalSize;

use crate::types::BackdropOptions;
use crate::uniforms::FrameUniforms;
use crate::viewport::Viewport;

/// Reasons a single draw did not reach the screen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    /// The swapchain must be reconfigured before the next frame.
    #[error("surface lost or outdated")]
    Lost,
    #[error("timed out acquiring the next frame")]
    Timeout,
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("draw failed: {0}")]
    Other(String),
}

impl From<wgpu::SurfaceError> for DrawError {
    fn from(value: wgpu::SurfaceError) -> Self {
        match value {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => Self::Lost,
            wgpu::SurfaceError::Timeout => Self::Timeout,
            wgpu::SurfaceError::OutOfMemory => Self::OutOfMemory,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A drawable that evaluates the pixel program over its whole area.
pub trait RenderSurface {
    /// Current backing store size in device pixels.
    fn size(&self) -> PhysicalSize<u32>;

    /// Reallocates the backing store and returns the size actually applied,
    /// which may be clamped by the device.
    fn resize(&mut self, size: PhysicalSize<u32>) -> PhysicalSize<u32>;

    /// Draws one frame with the given uniforms.
    fn draw(&mut self, uniforms: &FrameUniforms) -> Result<(), DrawError>;

    /// Rebuilds the swapchain after [`DrawError::Lost`].
    fn recover(&mut self);

    /// Destroys every GPU object owned by the surface.
    fn release(self)
    where
        Self: Sized;
}

/// The element a backdrop is mounted into.
pub trait Host {
    type Surface: RenderSurface;

    /// Current logical size and scale factor.
    fn viewport(&self) -> Viewport;

    /// Lets pointer input reach whatever sits beneath the drawable.
    fn set_passthrough(&mut self, enabled: bool);

    /// Creates the drawable and compiles the pixel program.
    fn attach(
        &mut self,
        size: PhysicalSize<u32>,
        options: &BackdropOptions,
    ) -> anyhow::Result<Self::Surface>;

    /// Removes the drawable from view after its resources are released.
    ///
    /// A later [`Host::attach`] must make it visible again.
    fn detach(&mut self);

    /// Asks the host for another frame callback.
    fn request_frame(&self);
}
