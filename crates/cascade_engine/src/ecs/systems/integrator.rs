//! Fixed-timestep integrator
//!
//! Wall time is accumulated each frame and consumed in fixed-size simulation
//! ticks; the remainder becomes the interpolation alpha the renderer uses to
//! blend between the last two simulation states. The accumulator is clamped
//! to one second so a long stall (debugger, suspend) cannot trigger an
//! unbounded catch-up burst.

use std::any::Any;
use std::time::Duration;

use log::debug;

use crate::ecs::components::{PlayerCamera, Position};
use crate::ecs::system::System;
use crate::engine::{Engine, EngineError};

/// Accumulator cap in seconds.
const MAX_ACCUMULATED: f32 = 1.0;

/// Fixed-timestep simulation driver.
pub struct Integrator {
    timestep: f32,
    accumulator: f32,
}

impl Integrator {
    /// Create an integrator with the given timestep in seconds.
    pub fn new(timestep: f32) -> Self {
        Self {
            timestep,
            accumulator: 0.0,
        }
    }

    /// Fixed timestep in seconds.
    pub fn timestep(&self) -> f32 {
        self.timestep
    }

    /// Interpolation factor in `[0, 1)`: how far the unconsumed remainder
    /// reaches into the next simulation tick.
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.timestep
    }

    /// Consume `dt` of wall time, returning how many fixed ticks elapsed.
    ///
    /// The accumulator is clamped to [`MAX_ACCUMULATED`] before consumption.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        self.accumulator = (self.accumulator + dt.as_secs_f32()).min(MAX_ACCUMULATED);
        let mut ticks = 0;
        while self.accumulator >= self.timestep {
            self.accumulator -= self.timestep;
            ticks += 1;
        }
        ticks
    }
}

impl System for Integrator {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn update(&mut self, engine: &mut Engine, dt: Duration) -> Result<(), EngineError> {
        let ticks = self.advance(dt);
        if ticks == 0 {
            return Ok(());
        }
        if ticks > 1 {
            debug!("integrator catching up: {ticks} ticks");
        }
        for _ in 0..ticks {
            for (_, position) in engine.registry_mut().iter_mut::<Position>() {
                position.0.integrate(self.timestep);
            }
            for (_, camera) in engine.registry_mut().iter_mut::<PlayerCamera>() {
                camera.distance.integrate(self.timestep);
            }
        }
        engine.notify_simulation_ticked(ticks, self.timestep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_advance_counts_whole_ticks() {
        let mut integrator = Integrator::new(0.25);
        assert_eq!(integrator.advance(Duration::from_secs_f32(0.6)), 2);
        assert_relative_eq!(integrator.alpha(), 0.4, epsilon = 1e-5);
    }

    #[test]
    fn test_remainder_carries_between_frames() {
        let mut integrator = Integrator::new(0.25);
        assert_eq!(integrator.advance(Duration::from_secs_f32(0.2)), 0);
        assert_eq!(integrator.advance(Duration::from_secs_f32(0.2)), 1);
        assert_relative_eq!(integrator.alpha(), 0.6, epsilon = 1e-5);
    }

    #[test]
    fn test_split_delivery_matches_single_delivery() {
        let mut split = Integrator::new(0.25);
        let mut whole = Integrator::new(0.25);
        let split_ticks = split.advance(Duration::from_secs_f32(0.3))
            + split.advance(Duration::from_secs_f32(0.3));
        let whole_ticks = whole.advance(Duration::from_secs_f32(0.6));
        assert_eq!(split_ticks, whole_ticks);
        assert_relative_eq!(split.alpha(), whole.alpha(), epsilon = 1e-5);
    }

    #[test]
    fn test_accumulator_is_clamped_to_one_second() {
        let mut integrator = Integrator::new(0.25);
        assert_eq!(integrator.advance(Duration::from_secs(30)), 4);
        assert_relative_eq!(integrator.alpha(), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_zero_delta_produces_no_ticks() {
        let mut integrator = Integrator::new(0.25);
        assert_eq!(integrator.advance(Duration::ZERO), 0);
        assert_relative_eq!(integrator.alpha(), 0.0);
    }
}
