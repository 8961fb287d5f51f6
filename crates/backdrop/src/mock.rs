//! Headless host and surface that record what the backdrop asks of them.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::{bail, Result};
use winit::dpi::{LogicalSize, PhysicalSize};

use crate::surface::{DrawError, Host, RenderSurface};
use crate::types::BackdropOptions;
use crate::uniforms::FrameUniforms;
use crate::viewport::Viewport;

/// Counters shared between a mock host, its surfaces and the test body.
#[derive(Debug, Default)]
pub(crate) struct MockStats {
    draws: Cell<u32>,
    frames: RefCell<Vec<FrameUniforms>>,
    resizes: RefCell<Vec<PhysicalSize<u32>>>,
    recoveries: Cell<u32>,
    attaches: Cell<u32>,
    detaches: Cell<u32>,
    live_surfaces: Cell<i32>,
    frame_requests: Cell<u32>,
    passthrough: Cell<Option<bool>>,
    visible: Cell<Option<bool>>,
    live_at_detach: Cell<Option<i32>>,
    failures: RefCell<VecDeque<DrawError>>,
}

impl MockStats {
    /// Draw calls issued, failed ones included.
    pub fn draws(&self) -> u32 {
        self.draws.get()
    }

    /// Uniforms of every frame that was drawn successfully.
    pub fn frames(&self) -> Vec<FrameUniforms> {
        self.frames.borrow().clone()
    }

    pub fn last_frame(&self) -> Option<FrameUniforms> {
        self.frames.borrow().last().copied()
    }

    pub fn resizes(&self) -> Vec<PhysicalSize<u32>> {
        self.resizes.borrow().clone()
    }

    pub fn recoveries(&self) -> u32 {
        self.recoveries.get()
    }

    pub fn attaches(&self) -> u32 {
        self.attaches.get()
    }

    pub fn detaches(&self) -> u32 {
        self.detaches.get()
    }

    /// Surfaces attached but not yet released.
    pub fn live_surfaces(&self) -> i32 {
        self.live_surfaces.get()
    }

    pub fn frame_requests(&self) -> u32 {
        self.frame_requests.get()
    }

    pub fn passthrough(&self) -> Option<bool> {
        self.passthrough.get()
    }

    /// Whether the drawable is on screen; `None` before the first attach.
    pub fn visible(&self) -> Option<bool> {
        self.visible.get()
    }

    /// Live surface count observed by the most recent detach.
    pub fn live_at_detach(&self) -> Option<i32> {
        self.live_at_detach.get()
    }

    /// Queues an error for the next draw call of any surface sharing these stats.
    pub fn fail_next_draw(&self, error: DrawError) {
        self.failures.borrow_mut().push_back(error);
    }
}

pub(crate) struct MockSurface {
    size: PhysicalSize<u32>,
    max_dimension: u32,
    stats: Rc<MockStats>,
}

impl MockSurface {
    /// A surface not owned by any host, for render loop tests.
    pub fn detached(size: PhysicalSize<u32>) -> Self {
        Self {
            size,
            max_dimension: u32::MAX,
            stats: Rc::new(MockStats::default()),
        }
    }

    pub fn stats(&self) -> &MockStats {
        &self.stats
    }

    pub fn fail_next(&mut self, error: DrawError) {
        self.stats.fail_next_draw(error);
    }
}

impl RenderSurface for MockSurface {
    fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn resize(&mut self, size: PhysicalSize<u32>) -> PhysicalSize<u32> {
        self.size = PhysicalSize::new(
            size.width.clamp(1, self.max_dimension),
            size.height.clamp(1, self.max_dimension),
        );
        self.stats.resizes.borrow_mut().push(self.size);
        self.size
    }

    fn draw(&mut self, uniforms: &FrameUniforms) -> Result<(), DrawError> {
        self.stats.draws.set(self.stats.draws.get() + 1);
        let failure = self.stats.failures.borrow_mut().pop_front();
        if let Some(error) = failure {
            return Err(error);
        }
        self.stats.frames.borrow_mut().push(*uniforms);
        Ok(())
    }

    fn recover(&mut self) {
        self.stats.recoveries.set(self.stats.recoveries.get() + 1);
    }

    fn release(self) {
        self.stats
            .live_surfaces
            .set(self.stats.live_surfaces.get() - 1);
    }
}

/// Stand-in for a window: a viewport that tests can change at will.
#[derive(Clone)]
pub(crate) struct MockHost {
    stats: Rc<MockStats>,
    viewport: Rc<Cell<Viewport>>,
    max_dimension: u32,
    gpu_available: bool,
}

impl MockHost {
    pub fn new(width: f64, height: f64, scale_factor: f64) -> Self {
        Self {
            stats: Rc::new(MockStats::default()),
            viewport: Rc::new(Cell::new(Viewport::new(
                LogicalSize::new(width, height),
                scale_factor,
            ))),
            max_dimension: u32::MAX,
            gpu_available: true,
        }
    }

    /// A host whose attach always fails, as if no adapter were present.
    pub fn without_gpu(mut self) -> Self {
        self.gpu_available = false;
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn stats(&self) -> Rc<MockStats> {
        Rc::clone(&self.stats)
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.viewport.set(viewport);
    }
}

impl Host for MockHost {
    type Surface = MockSurface;

    fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    fn set_passthrough(&mut self, enabled: bool) {
        self.stats.passthrough.set(Some(enabled));
    }

    fn attach(
        &mut self,
        size: PhysicalSize<u32>,
        _options: &BackdropOptions,
    ) -> Result<MockSurface> {
        self.stats.visible.set(Some(true));
        if !self.gpu_available {
            bail!("no GPU adapter available");
        }
        self.stats.attaches.set(self.stats.attaches.get() + 1);
        self.stats
            .live_surfaces
            .set(self.stats.live_surfaces.get() + 1);
        Ok(MockSurface {
            size: PhysicalSize::new(
                size.width.clamp(1, self.max_dimension),
                size.height.clamp(1, self.max_dimension),
            ),
            max_dimension: self.max_dimension,
            stats: Rc::clone(&self.stats),
        })
    }

    fn detach(&mut self) {
        self.stats.detaches.set(self.stats.detaches.get() + 1);
        self.stats
            .live_at_detach
            .set(Some(self.stats.live_surfaces.get()));
        self.stats.visible.set(Some(false));
    }

    fn request_frame(&self) {
        self.stats
            .frame_requests
            .set(self.stats.frame_requests.get() + 1);
    }
}
