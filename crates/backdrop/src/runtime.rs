use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Snapshot of the clock handed to the render loop each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in seconds.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource {
    /// Restarts the clock at zero.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource>;

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.origin.elapsed().as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Externally stepped clock; clones share the same timestamp.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    seconds: Rc<Cell<f32>>,
    frame: u64,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f32) {
        self.seconds.set(seconds);
    }

    pub fn advance(&self, seconds: f32) {
        self.seconds.set(self.seconds.get() + seconds);
    }
}

impl TimeSource for ManualTimeSource {
    fn reset(&mut self) {
        self.seconds.set(0.0);
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.seconds.get(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_time_counts_frames() {
        let mut source = SystemTimeSource::new();
        let first = source.sample();
        let second = source.sample();
        assert_eq!(first.frame_index, 0);
        assert_eq!(second.frame_index, 1);
        assert!(second.seconds >= first.seconds);

        source.reset();
        assert_eq!(source.sample().frame_index, 0);
    }

    #[test]
    fn manual_clones_share_the_clock() {
        let handle = ManualTimeSource::new();
        let mut source: BoxedTimeSource = Box::new(handle.clone());
        handle.set(1.0);
        assert_eq!(source.sample().seconds, 1.0);
        handle.advance(0.5);
        assert_eq!(source.sample(), TimeSample::new(1.5, 1));
    }
}
