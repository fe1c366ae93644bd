//! Galvo module for galvo-motion.
//!
//! Calibration grid construction, bilinear correction, and the DAC output path for
//! a two-mirror scanner.

mod dac;
mod grid;
mod interpolate;
mod mapper;

pub use dac::SpiDac;
pub use grid::{AxisGeometry, CalibrationGrid, GalvoAxis, GalvoGeometry, Offset};
pub use interpolate::INTERP_SHIFT;
pub use mapper::{GalvoPositionMapper, GalvoSink, GalvoStepSink};
