use bytemuck::{Pod, Zeroable};
use winit::dpi::PhysicalSize;

/// Seconds since the render loop started.
///
/// Only the render loop writes it, once per tick, and it never runs
/// backwards: a sample older than the current value is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeUniform(f32);

impl TimeUniform {
    pub fn seconds(&self) -> f32 {
        self.0
    }

    pub(crate) fn advance(&mut self, seconds: f32) -> f32 {
        if seconds > self.0 {
            self.0 = seconds;
        }
        self.0
    }
}

/// Drawable size in device pixels, as applied by the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionUniform {
    width: u32,
    height: u32,
}

impl ResolutionUniform {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.width, self.height)
    }

    pub(crate) fn set(&mut self, size: PhysicalSize<u32>) -> bool {
        let changed = self.width != size.width || self.height != size.height;
        self.width = size.width;
        self.height = size.height;
        changed
    }
}

/// The two values the pixel program reads.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Uniforms {
    pub(crate) time: TimeUniform,
    pub(crate) resolution: ResolutionUniform,
}

impl Uniforms {
    pub fn new(size: PhysicalSize<u32>) -> Self {
        let mut uniforms = Self::default();
        uniforms.resolution.set(size);
        uniforms
    }

    pub fn time(&self) -> TimeUniform {
        self.time
    }

    pub fn resolution(&self) -> ResolutionUniform {
        self.resolution
    }

    /// Packs the current values for upload.
    pub fn frame(&self) -> FrameUniforms {
        FrameUniforms::new(
            self.resolution.width as f32,
            self.resolution.height as f32,
            self.time.seconds(),
        )
    }
}

/// GPU mirror of [`Uniforms`], laid out for the `ubo` block in the fragment shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub _padding: f32,
}

impl FrameUniforms {
    pub fn new(width: f32, height: f32, time: f32) -> Self {
        Self {
            resolution: [width, height],
            time,
            _padding: 0.0,
        }
    }
}
