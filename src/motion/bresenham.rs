//! Multi-axis Bresenham step distribution.

use super::block::{Axis, MotionBlock, NUM_AXIS};

/// Per-axis error accumulators for the block being executed.
///
/// Each step event adds the axis step count; when the accumulator turns positive the
/// axis steps and gives back `step_event_count`. Over a whole block every axis fires
/// exactly `steps[axis]` times, spread as evenly as integer arithmetic allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisCounters {
    counters: [i32; NUM_AXIS],
}

impl AxisCounters {
    /// Seed all accumulators to `-(step_event_count / 2)` for centered stepping.
    pub fn seed(block: &MotionBlock) -> Self {
        let start = -((block.step_event_count >> 1) as i32);
        Self {
            counters: [start; NUM_AXIS],
        }
    }

    /// Advance one axis by one step event; true when it must step.
    #[inline]
    pub fn tick(&mut self, axis: Axis, block: &MotionBlock) -> bool {
        let counter = &mut self.counters[axis.index()];
        *counter += block.steps[axis.index()] as i32;
        if *counter > 0 {
            *counter -= block.step_event_count as i32;
            true
        } else {
            false
        }
    }

    /// Raw accumulator value.
    #[inline]
    pub fn counter(&self, axis: Axis) -> i32 {
        self.counters[axis.index()]
    }
}
