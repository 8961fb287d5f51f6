use tracing::trace;
use winit::dpi::{LogicalSize, PhysicalSize};

use crate::frame_loop::Liveness;
use crate::surface::RenderSurface;
use crate::uniforms::ResolutionUniform;

/// Logical size of the host plus the device pixel ratio it is shown at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub logical: LogicalSize<f64>,
    pub scale_factor: f64,
}

impl Viewport {
    pub fn new(logical: LogicalSize<f64>, scale_factor: f64) -> Self {
        Self {
            logical,
            scale_factor,
        }
    }

    pub fn from_physical(physical: PhysicalSize<u32>, scale_factor: f64) -> Self {
        let scale_factor = sanitize_scale(scale_factor);
        Self {
            logical: physical.to_logical(scale_factor),
            scale_factor,
        }
    }

    /// Drawable size in whole device pixels.
    pub fn physical(&self) -> PhysicalSize<u32> {
        self.logical.to_physical(sanitize_scale(self.scale_factor))
    }

    pub fn with_scale_factor(self, scale_factor: f64) -> Self {
        Self {
            scale_factor,
            ..self
        }
    }
}

fn sanitize_scale(scale_factor: f64) -> f64 {
    if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    }
}

/// Where a size signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSource {
    /// The host window itself was resized.
    Window,
    /// The element's layout or scale factor changed without a window resize.
    Layout,
}

/// Keeps the surface backing store and resolution uniform in step with the host.
///
/// Signals from either [`SizeSource`] only record the latest viewport; the
/// work happens once per batch in [`ViewportAdapter::settle`].
#[derive(Debug)]
pub struct ViewportAdapter {
    liveness: Liveness,
    pixel_ratio: Option<f64>,
    pending: Option<(SizeSource, Viewport)>,
    coalesced: u32,
}

impl ViewportAdapter {
    pub fn new(liveness: Liveness, pixel_ratio: Option<f64>) -> Self {
        Self {
            liveness,
            pixel_ratio: pixel_ratio.filter(|ratio| ratio.is_finite() && *ratio > 0.0),
            pending: None,
            coalesced: 0,
        }
    }

    /// Backing store size for a viewport, honouring the pixel ratio override.
    pub fn drawable_size(&self, viewport: &Viewport) -> PhysicalSize<u32> {
        match self.pixel_ratio {
            Some(ratio) => viewport.with_scale_factor(ratio).physical(),
            None => viewport.physical(),
        }
    }

    /// Records a size signal; returns `false` if it was dropped.
    pub fn observe(&mut self, source: SizeSource, viewport: Viewport) -> bool {
        if !self.liveness.is_alive() {
            trace!(?source, "size signal after teardown; ignoring");
            return false;
        }
        let size = self.drawable_size(&viewport);
        if size.width == 0 || size.height == 0 {
            trace!(?source, "zero-area viewport; ignoring");
            return false;
        }
        if self.pending.replace((source, viewport)).is_some() {
            self.coalesced = self.coalesced.saturating_add(1);
        }
        true
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Applies the latest recorded viewport.
    ///
    /// Returns the size the surface actually took when anything changed; the
    /// caller owes the host an immediate redraw in that case.
    pub(crate) fn settle<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        resolution: &mut ResolutionUniform,
    ) -> Option<PhysicalSize<u32>> {
        let (source, viewport) = self.pending.take()?;
        let coalesced = std::mem::take(&mut self.coalesced);
        if !self.liveness.is_alive() {
            return None;
        }

        let target = self.drawable_size(&viewport);
        if target == surface.size() && target == resolution.size() {
            trace!(?source, coalesced, "viewport unchanged");
            return None;
        }

        let applied = surface.resize(target);
        resolution.set(applied);
        trace!(
            ?source,
            coalesced,
            width = applied.width,
            height = applied.height,
            "viewport settled"
        );
        Some(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSurface;

    fn viewport(width: f64, height: f64, scale: f64) -> Viewport {
        Viewport::new(LogicalSize::new(width, height), scale)
    }

    #[test]
    fn physical_size_includes_the_scale_factor() {
        assert_eq!(
            viewport(800.0, 600.0, 2.0).physical(),
            PhysicalSize::new(1600, 1200)
        );
        assert_eq!(
            viewport(100.5, 10.0, 1.0).physical(),
            PhysicalSize::new(101, 10)
        );
        let round_trip = Viewport::from_physical(PhysicalSize::new(1920, 1080), 1.5);
        assert_eq!(round_trip.physical(), PhysicalSize::new(1920, 1080));
    }

    #[test]
    fn pixel_ratio_override_replaces_the_host_scale() {
        let adapter = ViewportAdapter::new(Liveness::new(), Some(1.0));
        assert_eq!(
            adapter.drawable_size(&viewport(800.0, 600.0, 2.0)),
            PhysicalSize::new(800, 600)
        );
        let ignored = ViewportAdapter::new(Liveness::new(), Some(0.0));
        assert_eq!(
            ignored.drawable_size(&viewport(800.0, 600.0, 2.0)),
            PhysicalSize::new(1600, 1200)
        );
    }

    #[test]
    fn storm_of_signals_settles_once_at_the_latest_size() {
        let mut adapter = ViewportAdapter::new(Liveness::new(), None);
        let mut surface = MockSurface::detached(PhysicalSize::new(800, 600));
        let mut resolution = ResolutionUniform::default();
        resolution.set(surface.size());

        for step in 1..=50 {
            let width = 800.0 + step as f64;
            let source = if step % 2 == 0 {
                SizeSource::Window
            } else {
                SizeSource::Layout
            };
            assert!(adapter.observe(source, viewport(width, 600.0, 1.0)));
        }

        let applied = adapter.settle(&mut surface, &mut resolution);
        assert_eq!(applied, Some(PhysicalSize::new(850, 600)));
        assert_eq!(surface.stats().resizes(), vec![PhysicalSize::new(850, 600)]);
        assert_eq!(resolution.size(), PhysicalSize::new(850, 600));
        assert!(!adapter.has_pending());
    }

    #[test]
    fn settling_the_same_size_twice_is_a_no_op() {
        let mut adapter = ViewportAdapter::new(Liveness::new(), None);
        let mut surface = MockSurface::detached(PhysicalSize::new(800, 600));
        let mut resolution = ResolutionUniform::default();
        resolution.set(surface.size());

        adapter.observe(SizeSource::Window, viewport(800.0, 600.0, 1.0));
        assert_eq!(adapter.settle(&mut surface, &mut resolution), None);

        adapter.observe(SizeSource::Window, viewport(1024.0, 768.0, 1.0));
        assert!(adapter.settle(&mut surface, &mut resolution).is_some());
        adapter.observe(SizeSource::Layout, viewport(1024.0, 768.0, 1.0));
        assert_eq!(adapter.settle(&mut surface, &mut resolution), None);
        assert_eq!(surface.stats().resizes().len(), 1);
    }

    #[test]
    fn zero_area_and_post_teardown_signals_are_dropped() {
        let liveness = Liveness::new();
        let mut adapter = ViewportAdapter::new(liveness.clone(), None);
        assert!(!adapter.observe(SizeSource::Window, viewport(0.0, 600.0, 1.0)));
        assert!(!adapter.has_pending());

        assert!(adapter.observe(SizeSource::Window, viewport(640.0, 480.0, 1.0)));
        liveness.kill();
        assert!(!adapter.observe(SizeSource::Layout, viewport(320.0, 240.0, 1.0)));

        let mut surface = MockSurface::detached(PhysicalSize::new(800, 600));
        let mut resolution = ResolutionUniform::default();
        assert_eq!(adapter.settle(&mut surface, &mut resolution), None);
        assert!(surface.stats().resizes().is_empty());
    }

    #[test]
    fn resolution_records_the_size_the_surface_applied() {
        let mut adapter = ViewportAdapter::new(Liveness::new(), None);
        let mut surface = MockSurface::detached(PhysicalSize::new(800, 600));
        let mut resolution = ResolutionUniform::default();

        adapter.observe(SizeSource::Window, viewport(3000.0, 2000.0, 4.0));
        let applied = adapter.settle(&mut surface, &mut resolution);
        assert_eq!(applied, Some(surface.size()));
        assert_eq!(resolution.size(), surface.size());
    }
}
