use std::time::{Duration, Instant};

/// Snapshot of the time state supplied to the `iTime` uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in seconds.
    pub seconds: f32,
    /// The same instant in milliseconds; this is what `iTime` carries.
    pub millis: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            millis: seconds * 1000.0,
            frame_index,
        }
    }

    pub fn from_elapsed(elapsed: Duration, frame_index: u64) -> Self {
        Self {
            seconds: elapsed.as_secs_f32(),
            millis: (elapsed.as_nanos() as f64 / 1_000_000.0) as f32,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state. Called when a frame driver starts.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

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
        let sample = TimeSample::from_elapsed(self.origin.elapsed(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports the same timestamp while still counting
/// frames.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f32,
    frame: u64,
}

impl FixedTimeSource {
    pub fn new(time: f32) -> Self {
        Self { time, frame: 0 }
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.time, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Deterministic clock advancing by `step` per sample, starting at zero.
/// Headless checks use it so reported times do not depend on machine speed.
#[derive(Debug, Clone, Copy)]
pub struct SteppedTimeSource {
    step: Duration,
    frame: u64,
}

impl SteppedTimeSource {
    pub fn new(step: Duration) -> Self {
        Self { step, frame: 0 }
    }

    /// One 60 Hz refresh per sample.
    pub fn sixty_hertz() -> Self {
        Self::new(Duration::from_micros(16_667))
    }
}

impl TimeSource for SteppedTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let steps = u32::try_from(self.frame).unwrap_or(u32::MAX);
        let elapsed = self.step.checked_mul(steps).unwrap_or(Duration::MAX);
        let sample = TimeSample::from_elapsed(elapsed, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_source_counts_frames_at_constant_time() {
        let mut source = FixedTimeSource::new(2.5);
        assert_eq!(source.sample(), TimeSample::new(2.5, 0));
        assert_eq!(source.sample(), TimeSample::new(2.5, 1));
        source.reset();
        assert_eq!(source.sample().frame_index, 0);
    }

    #[test]
    fn stepped_source_advances_per_sample() {
        let mut source = SteppedTimeSource::new(Duration::from_millis(500));
        assert_eq!(source.sample(), TimeSample::new(0.0, 0));
        assert_eq!(source.sample(), TimeSample::new(0.5, 1));
        assert_eq!(source.sample(), TimeSample::new(1.0, 2));
        source.reset();
        assert_eq!(source.sample(), TimeSample::new(0.0, 0));
    }

    #[test]
    fn samples_carry_milliseconds() {
        let mut source = SteppedTimeSource::new(Duration::from_millis(50));
        source.sample();
        let sample = source.sample();
        assert_eq!(sample.millis, 50.0);
        assert_eq!(sample.seconds, 0.05);
        assert_eq!(TimeSample::new(1.5, 0).millis, 1500.0);
    }

    #[test]
    fn system_source_is_monotonic() {
        let mut source = SystemTimeSource::new();
        let first = source.sample();
        let second = source.sample();
        assert!(second.seconds >= first.seconds);
        assert_eq!(second.frame_index, first.frame_index + 1);
    }
}
