use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::gl::GlContext;
use crate::runtime::{BoxedTimeSource, TimeSample};
use crate::types::TIME_UNIFORM;

/// Cloneable stop switch for a [`FrameDriver`]. Safe to use from any thread.
#[derive(Debug, Clone)]
pub struct FrameHandle {
    running: Arc<AtomicBool>,
}

impl FrameHandle {
    fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Stops the driver; every later tick reports [`FrameStatus::Stopped`].
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            tracing::debug!("frame driver stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameStatus {
    Drawn(TimeSample),
    Stopped,
}

/// Per-refresh pump: writes `iTime` (milliseconds since start) and draws the
/// single point.
pub struct FrameDriver<G: GlContext> {
    time_location: Option<G::UniformLocation>,
    time_source: BoxedTimeSource,
    handle: FrameHandle,
    frames_drawn: u64,
}

impl<G: GlContext> FrameDriver<G> {
    /// Resets `time_source` so `iTime` counts from this call.
    pub fn start(gl: &G, program: G::Program, mut time_source: BoxedTimeSource) -> Self {
        time_source.reset();
        let time_location = gl.uniform_location(program, TIME_UNIFORM);
        if time_location.is_none() {
            tracing::debug!("program has no active iTime uniform");
        }
        Self {
            time_location,
            time_source,
            handle: FrameHandle::new(),
            frames_drawn: 0,
        }
    }

    pub fn tick(&mut self, gl: &G) -> FrameStatus {
        if !self.handle.is_running() {
            return FrameStatus::Stopped;
        }
        let sample = self.time_source.sample();
        gl.uniform_1_f32(self.time_location.as_ref(), sample.millis);
        gl.draw_points(0, 1);
        self.frames_drawn += 1;
        FrameStatus::Drawn(sample)
    }

    pub fn handle(&self) -> FrameHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::gl::{GlCall, HeadlessContext};
    use crate::preprocess::{IncludeDepth, IncludeMap};
    use crate::program::{build_program, ProgramSources};
    use crate::runtime::{FixedTimeSource, SteppedTimeSource};
    use crate::types::{CanvasInfo, GlApiVersion};

    fn program(gl: &HeadlessContext, fragment: &str) -> u32 {
        let program = build_program(
            gl,
            &ProgramSources {
                vertex: "void main() {}",
                fragment,
            },
            CanvasInfo::new(8, 8),
            &IncludeMap::new(),
            IncludeDepth::SinglePass,
        )
        .unwrap();
        gl.clear_calls();
        program
    }

    #[test]
    fn tick_writes_time_then_draws_one_point() {
        let gl = HeadlessContext::new(GlApiVersion::Gles2);
        let program = program(&gl, "uniform float iTime;\nvoid main() {}");
        let mut driver = FrameDriver::start(&gl, program, Box::new(FixedTimeSource::new(1.5)));

        assert_eq!(driver.tick(&gl), FrameStatus::Drawn(TimeSample::new(1.5, 0)));
        assert_eq!(
            gl.calls(),
            vec![
                GlCall::Uniform1f {
                    name: "iTime".into(),
                    x: 1500.0
                },
                GlCall::DrawPoints { first: 0, count: 1 },
            ]
        );
        assert_eq!(driver.frames_drawn(), 1);
    }

    fn time_uniforms(gl: &HeadlessContext) -> Vec<f32> {
        gl.calls()
            .into_iter()
            .filter_map(|call| match call {
                GlCall::Uniform1f { x, .. } => Some(x),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn time_is_reported_in_milliseconds() {
        let gl = HeadlessContext::new(GlApiVersion::Gles2);
        let program = program(&gl, "uniform float iTime;\nvoid main() {}");
        let mut driver = FrameDriver::start(
            &gl,
            program,
            Box::new(SteppedTimeSource::new(Duration::from_millis(50))),
        );
        driver.tick(&gl);
        driver.tick(&gl);
        assert_eq!(time_uniforms(&gl), vec![0.0, 50.0]);
    }

    #[test]
    fn time_accumulates_across_ticks() {
        let gl = HeadlessContext::new(GlApiVersion::Gles2);
        let program = program(&gl, "uniform float iTime;\nvoid main() {}");
        let mut driver = FrameDriver::start(
            &gl,
            program,
            Box::new(SteppedTimeSource::new(Duration::from_millis(250))),
        );
        for _ in 0..5 {
            driver.tick(&gl);
        }
        assert_eq!(time_uniforms(&gl).last(), Some(&1000.0));
    }

    #[test]
    fn draws_without_time_uniform() {
        let gl = HeadlessContext::new(GlApiVersion::Gles2);
        let program = program(&gl, "void main() {}");
        let mut driver = FrameDriver::start(&gl, program, Box::new(FixedTimeSource::new(0.0)));
        driver.tick(&gl);
        assert_eq!(gl.calls(), vec![GlCall::DrawPoints { first: 0, count: 1 }]);
    }

    #[test]
    fn stopped_driver_stays_stopped() {
        let gl = HeadlessContext::new(GlApiVersion::Gles2);
        let program = program(&gl, "uniform float iTime;\nvoid main() {}");
        let mut driver = FrameDriver::start(&gl, program, Box::new(FixedTimeSource::new(0.0)));
        let handle = driver.handle();

        std::thread::spawn(move || handle.stop()).join().unwrap();
        assert!(!driver.is_running());
        assert_eq!(driver.tick(&gl), FrameStatus::Stopped);
        assert_eq!(driver.tick(&gl), FrameStatus::Stopped);
        assert!(gl.calls().is_empty());
        assert_eq!(driver.frames_drawn(), 0);
    }
}
