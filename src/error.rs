//! Error types for galvo-motion.
//!
//! The timer-interrupt path never returns these: it clamps, counts, and carries on.
//! They surface from configuration, block submission, calibration, and the
//! foreground output operations.

use core::fmt;

use crate::stepper::{Endstop, Motor};

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all galvo-motion operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Malformed motion block rejected at submission
    Block(BlockError),
    /// Scheduler refused a foreground request
    Stepper(StepperError),
    /// Calibration grid could not be built
    Calibration(CalibrationError),
    /// Step, direction, or DAC output failed
    Output(OutputError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// A required builder component was not supplied
    MissingComponent(&'static str),
    /// Steps per unit must be finite and > 0
    InvalidStepsPerUnit {
        /// Axis letter
        axis: char,
        /// Configured value
        value: f32,
    },
    /// Step frequency ceiling outside the supported range
    InvalidStepFrequency(u32),
    /// Extruder count outside 1..=4
    InvalidExtruderCount(u8),
    /// Advance pulses per tick must be > 0
    InvalidAdvanceRate(u8),
    /// Same endstop listed twice
    DuplicateEndstop(Endstop),
    /// Second Z switch listed without dual Z enabled
    DualEndstopWithoutDualZ(Endstop),
    /// Field size must be finite and > 0
    InvalidFieldSize(f32),
    /// Mirror distance must be finite and > 0
    InvalidMirrorDistance(f32),
    /// Mirror separation must be finite and >= 0
    InvalidMirrorSeparation(f32),
    /// Axis scale must lie in (0, 1]
    InvalidAxisScale(f32),
    /// Center plus tilt must fall strictly inside the DAC range
    InvalidAxisCenter(i32),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Motion block errors.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockError {
    /// Block carries no step events
    Empty,
    /// Step event count does not fit the signed Bresenham accumulators
    TooManySteps(u32),
    /// `step_event_count` must equal the largest per-axis step count
    EventCountMismatch {
        /// Declared step event count
        step_event_count: u32,
        /// Largest per-axis step count
        max_steps: u32,
    },
    /// Phase thresholds out of order
    PhaseOrder {
        /// End of the acceleration phase
        accelerate_until: u32,
        /// Start of the deceleration phase
        decelerate_after: u32,
        /// Total step events
        step_event_count: u32,
    },
    /// Entry or exit rate above the cruise rate
    RateOrder {
        /// Entry rate
        initial_rate: u32,
        /// Cruise rate
        nominal_rate: u32,
        /// Exit rate
        final_rate: u32,
    },
    /// Extruder index out of range
    InvalidExtruder(u8),
    /// Planner queue has no free slot
    QueueFull,
}

/// Scheduler errors for foreground requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperError {
    /// Motion is in progress or queued
    Busy,
}

/// Calibration grid errors.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Grid needs at least two points per axis
    GridTooSmall(usize),
    /// Usable DAC span is smaller than one unit per grid cell
    DegenerateAxis {
        /// Axis index (0 = X, 1 = Y)
        axis: u8,
        /// Usable half span in DAC units
        half_span: i32,
    },
}

/// Output errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    /// GPIO pin operation failed
    Pin,
    /// SPI transfer failed
    Spi,
    /// No output is assigned to this motor
    Unassigned(Motor),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Block(e) => write!(f, "Block error: {}", e),
            Error::Stepper(e) => write!(f, "Stepper error: {}", e),
            Error::Calibration(e) => write!(f, "Calibration error: {}", e),
            Error::Output(e) => write!(f, "Output error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::MissingComponent(name) => write!(f, "{} is required", name),
            ConfigError::InvalidStepsPerUnit { axis, value } => {
                write!(f, "Invalid steps per unit for {}: {}. Must be > 0", axis, value)
            }
            ConfigError::InvalidStepFrequency(v) => {
                write!(f, "Invalid max step frequency: {}", v)
            }
            ConfigError::InvalidExtruderCount(v) => {
                write!(f, "Invalid extruder count: {}. Must be 1-4", v)
            }
            ConfigError::InvalidAdvanceRate(v) => {
                write!(f, "Invalid advance pulses per tick: {}. Must be > 0", v)
            }
            ConfigError::DuplicateEndstop(e) => write!(f, "Duplicate endstop: {:?}", e),
            ConfigError::DualEndstopWithoutDualZ(e) => {
                write!(f, "Endstop {:?} requires dual_z = true", e)
            }
            ConfigError::InvalidFieldSize(v) => write!(f, "Invalid field size: {}. Must be > 0", v),
            ConfigError::InvalidMirrorDistance(v) => {
                write!(f, "Invalid mirror distance: {}. Must be > 0", v)
            }
            ConfigError::InvalidMirrorSeparation(v) => {
                write!(f, "Invalid mirror separation: {}. Must be >= 0", v)
            }
            ConfigError::InvalidAxisScale(v) => {
                write!(f, "Invalid axis scale: {}. Must be in (0, 1]", v)
            }
            ConfigError::InvalidAxisCenter(v) => {
                write!(f, "Axis center {} lies outside the DAC range", v)
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockError::Empty => write!(f, "Block has no step events"),
            BlockError::TooManySteps(n) => {
                write!(f, "step_event_count {} exceeds {}", n, i32::MAX)
            }
            BlockError::EventCountMismatch {
                step_event_count,
                max_steps,
            } => write!(
                f,
                "step_event_count {} does not match largest axis step count {}",
                step_event_count, max_steps
            ),
            BlockError::PhaseOrder {
                accelerate_until,
                decelerate_after,
                step_event_count,
            } => write!(
                f,
                "Phase thresholds out of order: {} <= {} <= {} violated",
                accelerate_until, decelerate_after, step_event_count
            ),
            BlockError::RateOrder {
                initial_rate,
                nominal_rate,
                final_rate,
            } => write!(
                f,
                "Entry {} or exit {} rate exceeds nominal rate {}",
                initial_rate, final_rate, nominal_rate
            ),
            BlockError::InvalidExtruder(e) => write!(f, "Extruder {} out of range", e),
            BlockError::QueueFull => write!(f, "Block queue is full"),
        }
    }
}

impl fmt::Display for StepperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepperError::Busy => write!(f, "Stepper is busy"),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::GridTooSmall(points) => {
                write!(f, "Calibration grid of {} points is too small", points)
            }
            CalibrationError::DegenerateAxis { axis, half_span } => {
                write!(f, "Axis {} half span {} too small for grid", axis, half_span)
            }
        }
    }
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::Pin => write!(f, "GPIO pin operation failed"),
            OutputError::Spi => write!(f, "SPI transfer failed"),
            OutputError::Unassigned(motor) => write!(f, "No output assigned to {:?}", motor),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<BlockError> for Error {
    fn from(e: BlockError) -> Self {
        Error::Block(e)
    }
}

impl From<StepperError> for Error {
    fn from(e: StepperError) -> Self {
        Error::Stepper(e)
    }
}

impl From<CalibrationError> for Error {
    fn from(e: CalibrationError) -> Self {
        Error::Calibration(e)
    }
}

impl From<OutputError> for Error {
    fn from(e: OutputError) -> Self {
        Error::Output(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for BlockError {}

#[cfg(feature = "std")]
impl std::error::Error for StepperError {}

#[cfg(feature = "std")]
impl std::error::Error for CalibrationError {}

#[cfg(feature = "std")]
impl std::error::Error for OutputError {}
