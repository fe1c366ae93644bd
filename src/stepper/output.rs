//! Step and direction outputs.

use embedded_hal::digital::OutputPin;

use crate::config::{AxesConfig, AxisConfig};
use crate::error::OutputError;
use crate::motion::{Axis, EXTRUDERS};

/// A physical motor output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Motor {
    /// X motor (or first galvo mirror).
    X,
    /// Y motor (or second galvo mirror).
    Y,
    /// Z motor.
    Z,
    /// Second Z motor in a dual-Z build.
    Z2,
    /// Extruder motor by index.
    Extruder(u8),
}

/// Number of addressable motor slots.
pub const MOTOR_SLOTS: usize = 4 + EXTRUDERS;

impl Motor {
    /// Logical axis this motor moves.
    #[inline]
    pub const fn axis(self) -> Axis {
        match self {
            Motor::X => Axis::X,
            Motor::Y => Axis::Y,
            Motor::Z | Motor::Z2 => Axis::Z,
            Motor::Extruder(_) => Axis::E,
        }
    }

    /// Slot index, below [`MOTOR_SLOTS`] for valid extruder numbers.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Motor::X => 0,
            Motor::Y => 1,
            Motor::Z => 2,
            Motor::Z2 => 3,
            Motor::Extruder(e) => 4 + e as usize,
        }
    }
}

/// Receiver of step events.
///
/// `reverse` is true when the axis moves toward negative; pin polarity is the sink's
/// business.
pub trait StepSink {
    /// Latch the direction of a motor.
    fn set_direction(&mut self, motor: Motor, reverse: bool) -> Result<(), OutputError>;

    /// Emit one step pulse.
    fn pulse(&mut self, motor: Motor) -> Result<(), OutputError>;
}

impl<T: StepSink + ?Sized> StepSink for &mut T {
    fn set_direction(&mut self, motor: Motor, reverse: bool) -> Result<(), OutputError> {
        (**self).set_direction(motor, reverse)
    }

    fn pulse(&mut self, motor: Motor) -> Result<(), OutputError> {
        (**self).pulse(motor)
    }
}

struct MotorPins<STEP, DIR> {
    step: STEP,
    dir: DIR,
    invert_step: bool,
    invert_dir: bool,
}

/// STEP/DIR pin pairs driven through embedded-hal.
///
/// All STEP pins share one type and all DIR pins another; use the HAL's type-erased
/// pins when wiring several motors.
pub struct PinStepSink<STEP, DIR>
where
    STEP: OutputPin,
    DIR: OutputPin,
{
    motors: [Option<MotorPins<STEP, DIR>>; MOTOR_SLOTS],
}

impl<STEP, DIR> Default for PinStepSink<STEP, DIR>
where
    STEP: OutputPin,
    DIR: OutputPin,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<STEP, DIR> PinStepSink<STEP, DIR>
where
    STEP: OutputPin,
    DIR: OutputPin,
{
    /// Sink with no motors attached.
    pub fn new() -> Self {
        Self {
            motors: core::array::from_fn(|_| None),
        }
    }

    /// Attach a motor with explicit pin polarity.
    pub fn motor(mut self, motor: Motor, step: STEP, dir: DIR, config: &AxisConfig) -> Self {
        if let Some(slot) = self.motors.get_mut(motor.index()) {
            *slot = Some(MotorPins {
                step,
                dir,
                invert_step: config.invert_step,
                invert_dir: config.invert_dir,
            });
        }
        self
    }

    /// Attach a motor using its axis' polarity from the configuration.
    pub fn motor_from_config(self, motor: Motor, step: STEP, dir: DIR, axes: &AxesConfig) -> Self {
        let config = *axes.axis(motor.axis());
        self.motor(motor, step, dir, &config)
    }

    /// True when a motor has pins attached.
    pub fn has_motor(&self, motor: Motor) -> bool {
        matches!(self.motors.get(motor.index()), Some(Some(_)))
    }

    fn pins(&mut self, motor: Motor) -> Result<&mut MotorPins<STEP, DIR>, OutputError> {
        self.motors
            .get_mut(motor.index())
            .and_then(Option::as_mut)
            .ok_or(OutputError::Unassigned(motor))
    }
}

fn write<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), OutputError> {
    if high {
        pin.set_high().map_err(|_| OutputError::Pin)
    } else {
        pin.set_low().map_err(|_| OutputError::Pin)
    }
}

impl<STEP, DIR> StepSink for PinStepSink<STEP, DIR>
where
    STEP: OutputPin,
    DIR: OutputPin,
{
    fn set_direction(&mut self, motor: Motor, reverse: bool) -> Result<(), OutputError> {
        let pins = self.pins(motor)?;
        write(&mut pins.dir, reverse != pins.invert_dir)
    }

    fn pulse(&mut self, motor: Motor) -> Result<(), OutputError> {
        let pins = self.pins(motor)?;
        write(&mut pins.step, !pins.invert_step)?;
        write(&mut pins.step, pins.invert_step)
    }
}
