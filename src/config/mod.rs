//! Configuration module for galvo-motion.
//!
//! Provides types for loading and validating scheduler, axis, endstop, and galvo
//! configuration from TOML files (with `std` feature) or pre-parsed data.

mod axis;
mod endstop;
mod galvo;
mod stepper;
mod system;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use axis::{AxesConfig, AxisConfig};
pub use endstop::{EndstopConfig, EndstopSwitch};
pub use galvo::{CalibrationConfig, DAC_CENTER};
pub use stepper::{AdvanceConfig, StepperConfig};
pub use system::SystemConfig;
pub use validation::{validate_calibration, validate_config};

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Millimeters, Steps, StepsPerUnit};
