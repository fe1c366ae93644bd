//! Stepper module for galvo-motion.
//!
//! The interrupt-driven block executor, its endstop monitor, and the step outputs.

mod builder;
mod endstop;
mod output;
mod position;
mod scheduler;
mod shared;
#[cfg(test)]
pub(crate) mod testing;

pub use builder::StepperBuilder;
pub use endstop::{
    Endstop, EndstopCheck, EndstopHits, EndstopMonitor, EndstopReport, EndstopSource,
    NoEndstops, PinEndstops,
};
pub use output::{Motor, PinStepSink, StepSink, MOTOR_SLOTS};
pub use position::AxisPositions;
pub use scheduler::{Stepper, StepperStats};
pub use shared::Shared;
