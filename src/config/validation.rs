//! Configuration validation.

use crate::error::{ConfigError, Error, Result};
use crate::motion::timer::MAX_SUPPORTED_STEP_FREQUENCY;
use crate::motion::EXTRUDERS;
use crate::stepper::Endstop;

use super::{AxesConfig, CalibrationConfig, EndstopConfig, StepperConfig, SystemConfig};

/// Lowest accepted step rate ceiling.
const MIN_STEP_FREQUENCY: u32 = 1_000;

/// Validate a system configuration.
///
/// Checks:
/// - Step rate ceiling and extruder count are in range
/// - Every axis has a positive steps-per-unit factor
/// - Endstops are listed once, second Z switches only with dual Z
/// - Galvo geometry is physically meaningful and centered inside the DAC range
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    validate_stepper(&config.stepper)?;
    validate_axes(&config.axes)?;
    validate_endstops(&config.endstops)?;

    if let Some(ref galvo) = config.galvo {
        validate_calibration(galvo)?;
    }

    if let Some(ref advance) = config.advance {
        if advance.pulses_per_tick == 0 {
            return Err(Error::Config(ConfigError::InvalidAdvanceRate(0)));
        }
    }

    Ok(())
}

fn validate_stepper(config: &StepperConfig) -> Result<()> {
    if !(MIN_STEP_FREQUENCY..=MAX_SUPPORTED_STEP_FREQUENCY).contains(&config.max_step_frequency) {
        return Err(Error::Config(ConfigError::InvalidStepFrequency(
            config.max_step_frequency,
        )));
    }

    if config.extruders == 0 || usize::from(config.extruders) > EXTRUDERS {
        return Err(Error::Config(ConfigError::InvalidExtruderCount(
            config.extruders,
        )));
    }

    Ok(())
}

fn validate_axes(axes: &AxesConfig) -> Result<()> {
    let named = [('X', &axes.x), ('Y', &axes.y), ('Z', &axes.z), ('E', &axes.e)];
    for (axis, config) in named {
        if !config.steps_per_unit.is_valid() {
            return Err(Error::Config(ConfigError::InvalidStepsPerUnit {
                axis,
                value: config.steps_per_unit.0,
            }));
        }
    }
    Ok(())
}

fn validate_endstops(config: &EndstopConfig) -> Result<()> {
    for (i, switch) in config.switches.iter().enumerate() {
        if config.switches[..i].iter().any(|s| s.endstop == switch.endstop) {
            return Err(Error::Config(ConfigError::DuplicateEndstop(switch.endstop)));
        }

        if !config.dual_z && matches!(switch.endstop, Endstop::Z2Min | Endstop::Z2Max) {
            return Err(Error::Config(ConfigError::DualEndstopWithoutDualZ(
                switch.endstop,
            )));
        }
    }
    Ok(())
}

/// Validate galvo geometry on its own, for runtime recalibration.
pub fn validate_calibration(config: &CalibrationConfig) -> Result<()> {
    let field = config.field_size.value();
    if !field.is_finite() || field <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidFieldSize(field)));
    }

    let distance = config.mirror_distance.value();
    if !distance.is_finite() || distance <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidMirrorDistance(distance)));
    }

    let separation = config.mirror_separation.value();
    if !separation.is_finite() || separation < 0.0 {
        return Err(Error::Config(ConfigError::InvalidMirrorSeparation(separation)));
    }

    for axis in 0..2 {
        let scale = config.axis_scale[axis];
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(Error::Config(ConfigError::InvalidAxisScale(scale)));
        }

        let center = config.center(axis);
        if center <= 0 || center >= i32::from(config.dac_max) {
            return Err(Error::Config(ConfigError::InvalidAxisCenter(center)));
        }
    }

    Ok(())
}
