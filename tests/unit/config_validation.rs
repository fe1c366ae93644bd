//! Unit tests for configuration validation.

use galvo_motion::config::{validate_config, SystemConfig};
use galvo_motion::error::{ConfigError, Error};
use galvo_motion::stepper::Endstop;

const AXES: &str = r#"
[axes.x]
steps_per_unit = 80.0
[axes.y]
steps_per_unit = 80.0
[axes.z]
steps_per_unit = 400.0
[axes.e]
steps_per_unit = 95.0
"#;

fn parse(extra: &str) -> SystemConfig {
    toml::from_str(&format!("{AXES}{extra}")).expect("Failed to parse TOML")
}

/// Test validation of a valid configuration.
#[test]
fn test_valid_config_passes_validation() {
    assert!(validate_config(&parse("")).is_ok());
}

/// Test step frequency bounds.
#[test]
fn test_step_frequency_out_of_range() {
    let config = parse("[stepper]\nmax_step_frequency = 500000\n");
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidStepFrequency(500_000)))
    ));
}

/// Test extruder count bounds.
#[test]
fn test_too_many_extruders() {
    let config = parse("[stepper]\nextruders = 9\n");
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidExtruderCount(9)))
    ));
}

/// Test non-positive steps per unit.
#[test]
fn test_zero_steps_per_unit() {
    let mut config = parse("");
    config.axes.y.steps_per_unit.0 = 0.0;
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidStepsPerUnit { axis: 'Y', .. }))
    ));
}

/// Test a switch listed twice.
#[test]
fn test_duplicate_endstop() {
    let config = parse(
        r#"
[[endstops.switches]]
endstop = "x_min"

[[endstops.switches]]
endstop = "x_min"
inverting = true
"#,
    );
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::DuplicateEndstop(Endstop::XMin)))
    ));
}

/// Test second Z switches without dual Z.
#[test]
fn test_z2_switch_requires_dual_z() {
    let config = parse(
        r#"
[[endstops.switches]]
endstop = "z2_min"
"#,
    );
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::DualEndstopWithoutDualZ(Endstop::Z2Min)))
    ));
}

/// Test galvo geometry checks.
#[test]
fn test_invalid_galvo_geometry() {
    let config = parse(
        r#"
[galvo]
field_size_mm = 100.0
mirror_distance_mm = -5.0
"#,
    );
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidMirrorDistance(_)))
    ));

    let config = parse(
        r#"
[galvo]
field_size_mm = 100.0
mirror_distance_mm = 200.0
axis_scale = [1.5, 1.0]
"#,
    );
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidAxisScale(_)))
    ));
}

/// Test a tilt that pushes the center off the DAC.
#[test]
fn test_center_outside_dac() {
    let config = parse(
        r#"
[galvo]
field_size_mm = 100.0
mirror_distance_mm = 200.0
axis_tilt = [40000, 0]
"#,
    );
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidAxisCenter(_)))
    ));
}

/// Test an advance rate of zero.
#[test]
fn test_zero_advance_rate() {
    let config = parse("[advance]\npulses_per_tick = 0\n");
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidAdvanceRate(0)))
    ));
}
