//! Integrable quantities
//!
//! An [`Integrable`] is a 3D quantity advanced by the fixed-timestep
//! integrator. It keeps the previous and current values so the renderer can
//! interpolate between simulation states, and an ordered chain of derivatives
//! (velocity, acceleration, ...) that feed into each other on every tick.

use crate::foundation::math::Point3;

/// A 3D quantity with a derivative chain and one tick of history.
#[derive(Debug, Clone, PartialEq)]
pub struct Integrable {
    previous: Point3,
    value: Point3,
    derivatives: Vec<Point3>,
}

impl Integrable {
    /// Create an integrable at `value` with no derivatives.
    pub fn new(value: Point3) -> Self {
        Self {
            previous: value,
            value,
            derivatives: Vec::new(),
        }
    }

    /// Create an integrable with a derivative chain.
    ///
    /// `derivatives[0]` is the first derivative of the value (velocity),
    /// `derivatives[1]` the second (acceleration), and so on.
    pub fn with_derivatives(value: Point3, derivatives: Vec<Point3>) -> Self {
        Self {
            previous: value,
            value,
            derivatives,
        }
    }

    /// Current value, as of the most recent simulation tick.
    pub fn value(&self) -> Point3 {
        self.value
    }

    /// Value as of the tick before the most recent one.
    pub fn previous(&self) -> Point3 {
        self.previous
    }

    /// First derivative, if one exists.
    pub fn derivative(&self, order: usize) -> Option<Point3> {
        self.derivatives.get(order).copied()
    }

    /// Mutable access to a derivative, if one exists.
    pub fn derivative_mut(&mut self, order: usize) -> Option<&mut Point3> {
        self.derivatives.get_mut(order)
    }

    /// Teleport to `value`, discarding history so no interpolation sweep
    /// occurs across the jump.
    pub fn set(&mut self, value: Point3) {
        self.previous = value;
        self.value = value;
    }

    /// Advance one simulation tick of `dt` seconds.
    ///
    /// Each derivative is integrated into the one below it, highest first,
    /// then the first derivative into the value. The pre-tick value is
    /// retained for interpolation.
    pub fn integrate(&mut self, dt: f32) {
        for i in (1..self.derivatives.len()).rev() {
            let higher = self.derivatives[i];
            self.derivatives[i - 1] += higher * dt;
        }
        self.previous = self.value;
        if let Some(first) = self.derivatives.first() {
            self.value += *first * dt;
        }
    }

    /// Interpolate between the previous and current values.
    ///
    /// `alpha` is the blend factor in `[0, 1)` produced by the integrator;
    /// `0.0` yields the previous value and `1.0` the current one.
    pub fn temporal(&self, alpha: f32) -> Point3 {
        self.previous.lerp(&self.value, alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_integrate_applies_velocity() {
        let mut p = Integrable::with_derivatives(
            Point3::new(0.0, 0.0, 0.0),
            vec![Point3::new(2.0, 0.0, 0.0)],
        );
        p.integrate(0.5);
        assert_relative_eq!(p.value().x, 1.0);
        assert_relative_eq!(p.previous().x, 0.0);
    }

    #[test]
    fn test_acceleration_feeds_velocity() {
        let mut p = Integrable::with_derivatives(
            Point3::zeros(),
            vec![Point3::zeros(), Point3::new(0.0, -10.0, 0.0)],
        );
        p.integrate(0.1);
        assert_relative_eq!(p.derivative(0).unwrap().y, -1.0);
        assert_relative_eq!(p.value().y, -0.1);
    }

    #[test]
    fn test_temporal_blends_previous_and_current() {
        let mut p = Integrable::with_derivatives(
            Point3::new(0.0, 0.0, 0.0),
            vec![Point3::new(10.0, 0.0, 0.0)],
        );
        p.integrate(1.0);
        assert_relative_eq!(p.temporal(0.0).x, 0.0);
        assert_relative_eq!(p.temporal(0.5).x, 5.0);
        assert_relative_eq!(p.temporal(1.0).x, 10.0);
    }

    #[test]
    fn test_set_discards_history() {
        let mut p = Integrable::with_derivatives(
            Point3::zeros(),
            vec![Point3::new(1.0, 0.0, 0.0)],
        );
        p.integrate(1.0);
        p.set(Point3::new(100.0, 0.0, 0.0));
        assert_relative_eq!(p.temporal(0.5).x, 100.0);
    }
}
