//! Frame timing

use std::time::{Duration, Instant};

/// High-precision per-frame timer.
///
/// `tick` is called once at the top of each frame and returns the wall time
/// elapsed since the previous tick, which feeds the fixed-timestep
/// accumulator.
pub struct Timer {
    last_frame: Instant,
    delta: Duration,
    total: Duration,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer.
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            total: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Advance the timer by one frame, returning the elapsed wall time.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        self.delta = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.total += self.delta;
        self.frame_count += 1;
        self.delta
    }

    /// Time elapsed between the two most recent ticks.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Total time accumulated across all ticks.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Number of ticks so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average frames per second since creation.
    pub fn average_fps(&self) -> f32 {
        let secs = self.total.as_secs_f32();
        if secs > 0.0 {
            self.frame_count as f32 / secs
        } else {
            0.0
        }
    }
}
