//! Motion module for galvo-motion.
//!
//! Blocks, the planner handoff queue, step timing, velocity profiles, Bresenham
//! step distribution, and linear advance.

mod advance;
mod block;
mod bresenham;
mod profile;
mod queue;
pub mod timer;

pub use advance::{AdvanceSteps, AdvanceTask, LinearAdvance};
pub use block::{AdvanceParams, Axis, DirectionBits, MotionBlock, EXTRUDERS, NUM_AXIS};
pub use bresenham::AxisCounters;
pub use profile::{MotionPhase, TrapezoidProfile};
pub use queue::{BlockConsumer, BlockProducer, BlockQueue, BlockSource};
pub use timer::{StepInterval, StepTimer, TimerTicks};
