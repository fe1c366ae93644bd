//! Position tracking for the step scheduler.
//!
//! Step counts are the source of truth and only change when a step is emitted or
//! the position is explicitly redefined.

use crate::config::units::{Millimeters, Steps, StepsPerUnit};
use crate::motion::{Axis, NUM_AXIS};

/// Absolute step position of every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisPositions {
    steps: [i32; NUM_AXIS],
    steps_per_unit: [StepsPerUnit; NUM_AXIS],
}

impl Default for AxisPositions {
    fn default() -> Self {
        Self::new([StepsPerUnit::default(); NUM_AXIS])
    }
}

impl AxisPositions {
    /// All axes at the origin.
    #[inline]
    pub fn new(steps_per_unit: [StepsPerUnit; NUM_AXIS]) -> Self {
        Self {
            steps: [0; NUM_AXIS],
            steps_per_unit,
        }
    }

    /// Position of one axis in steps.
    #[inline]
    pub fn steps(&self, axis: Axis) -> Steps {
        Steps(self.steps[axis.index()])
    }

    /// Position of one axis in units.
    #[inline]
    pub fn units(&self, axis: Axis) -> Millimeters {
        self.steps(axis).to_mm(self.steps_per_unit[axis.index()])
    }

    /// Raw step counts.
    #[inline]
    pub fn as_array(&self) -> &[i32; NUM_AXIS] {
        &self.steps
    }

    /// Redefine all positions.
    #[inline]
    pub fn set_all(&mut self, steps: [i32; NUM_AXIS]) {
        self.steps = steps;
    }

    /// Redefine one axis.
    #[inline]
    pub fn set(&mut self, axis: Axis, steps: Steps) {
        self.steps[axis.index()] = steps.0;
    }

    /// Record an emitted step.
    #[inline]
    pub fn step(&mut self, axis: Axis, direction: i32) {
        let s = &mut self.steps[axis.index()];
        *s = s.wrapping_add(direction);
    }

    /// Steps per unit of one axis.
    #[inline]
    pub fn steps_per_unit(&self, axis: Axis) -> StepsPerUnit {
        self.steps_per_unit[axis.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_tracking() {
        let mut pos = AxisPositions::new([
            StepsPerUnit(80.0),
            StepsPerUnit(80.0),
            StepsPerUnit(400.0),
            StepsPerUnit(500.0),
        ]);

        for _ in 0..160 {
            pos.step(Axis::X, 1);
        }
        pos.step(Axis::Z, -1);

        assert_eq!(pos.steps(Axis::X), Steps(160));
        assert!((pos.units(Axis::X).value() - 2.0).abs() < 1e-6);
        assert!((pos.units(Axis::Z).value() + 0.0025).abs() < 1e-6);
    }

    #[test]
    fn test_redefine() {
        let mut pos = AxisPositions::default();
        pos.set_all([1, 2, 3, 4]);
        pos.set(Axis::E, Steps(0));
        assert_eq!(pos.as_array(), &[1, 2, 3, 0]);
    }
}
