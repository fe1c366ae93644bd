//! # galvo-motion
//!
//! Interrupt-driven stepper execution with galvo-scanner correction, on embedded-hal 1.0.
//!
//! ## Features
//!
//! - **Block executor**: trapezoidal step timing, Bresenham step distribution across
//!   X/Y/Z/E, quick stop, and babystepping, all driven from one timer tick
//! - **Endstops**: debounced per-axis checks with homing, dual-Z locks, and a probe
//! - **Linear advance**: extruder pressure compensation drained by a faster task
//! - **Galvo correction**: precomputed mirror-geometry grid with integer bilinear
//!   interpolation in front of a two-channel SPI DAC
//! - **no_std compatible**: no allocation anywhere in the step path
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use galvo_motion::{BlockQueue, MotionBlock, NoEndstops, Shared, Stepper};
//!
//! let config = galvo_motion::load_config("machine.toml")?;
//!
//! let mut queue: BlockQueue<16> = BlockQueue::new();
//! let (mut planner, consumer) = queue.split();
//!
//! let stepper = Shared::new(
//!     Stepper::builder()
//!         .from_config(&config)
//!         .queue(consumer)
//!         .sink(step_sink)
//!         .endstops(NoEndstops)
//!         .build()?,
//! );
//!
//! planner.push(MotionBlock::new([400, 200, 0, 0], 10_000))?;
//!
//! // timer interrupt
//! let next = stepper.lock(|s| s.on_timer());
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `defmt`: Enables defmt formatting for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

// Core modules
pub mod config;
pub mod error;
pub mod galvo;
pub mod motion;
pub mod stepper;

// Re-exports for ergonomic API
pub use config::{validate_config, CalibrationConfig, SystemConfig};
pub use error::{Error, Result};
pub use galvo::{CalibrationGrid, GalvoPositionMapper, GalvoSink, GalvoStepSink, SpiDac};
pub use motion::{
    AdvanceSteps, AdvanceTask, Axis, BlockProducer, BlockQueue, BlockSource, MotionBlock,
    MotionPhase,
};
pub use stepper::{
    EndstopSource, Motor, NoEndstops, PinEndstops, PinStepSink, Shared, StepSink, Stepper,
    StepperBuilder,
};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Millimeters, Steps, StepsPerUnit};
