//! Frame clocks
//!
//! The scheduler does no timing of its own. Each tick it is handed a delta in
//! seconds, either directly through `TaskScheduler::tick` or pulled from a
//! [`FrameClock`] by `TaskScheduler::tick_with`.

use std::time::Instant;

/// Source of per-frame delta time, owned by the host render loop
pub trait FrameClock {
    /// Seconds elapsed since the previous call
    fn delta(&mut self) -> f64;
}

/// A clock that advances by the same step every frame
///
/// Useful for deterministic simulation and tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedClock {
    step: f64,
}

impl FixedClock {
    pub fn new(step: f64) -> Self {
        Self { step }
    }

    /// A fixed clock running at the given frame rate
    pub fn from_fps(fps: u32) -> Self {
        Self::new(1.0 / fps.max(1) as f64)
    }

    pub fn step(&self) -> f64 {
        self.step
    }
}

impl FrameClock for FixedClock {
    fn delta(&mut self) -> f64 {
        self.step
    }
}

/// Wall-clock frame timing
///
/// The first delta is measured from construction (or the last `reset`).
#[derive(Clone, Copy, Debug)]
pub struct InstantClock {
    last_frame: Instant,
}

impl InstantClock {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
        }
    }

    /// Restart measurement from now, e.g. after the host was paused
    pub fn reset(&mut self) {
        self.last_frame = Instant::now();
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for InstantClock {
    fn delta(&mut self) -> f64 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f64();
        self.last_frame = now;
        dt
    }
}
