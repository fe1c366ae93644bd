//! Unit tests for TOML configuration parsing.

use galvo_motion::config::{load_config, parse_config, Millimeters, StepsPerUnit, SystemConfig};
use galvo_motion::error::{ConfigError, Error};
use galvo_motion::stepper::Endstop;

const MACHINE: &str = r#"
[stepper]
max_step_frequency = 60000
extruders = 2

[axes.x]
steps_per_unit = 655.35
[axes.y]
steps_per_unit = 655.35
[axes.z]
steps_per_unit = 400.0
invert_dir = true
[axes.e]
steps_per_unit = 95.0
invert_step = true

[endstops]
dual_z = true

[[endstops.switches]]
endstop = "z_min"

[[endstops.switches]]
endstop = "z2_min"
inverting = true

[[endstops.switches]]
endstop = "z_probe"

[galvo]
field_size_mm = 100.0
mirror_distance_mm = 200.0
mirror_separation_mm = 10.0
axis_scale = [0.9, 0.9]
axis_tilt = [120, -40]

[advance]
pulses_per_tick = 2
"#;

/// Test parsing a full machine description.
#[test]
fn test_parse_machine_config() {
    let config: SystemConfig = toml::from_str(MACHINE).expect("Failed to parse TOML");

    assert_eq!(config.stepper.max_step_frequency, 60_000);
    assert_eq!(config.stepper.extruders, 2);
    assert_eq!(config.axes.x.steps_per_unit, StepsPerUnit(655.35));
    assert!(config.axes.z.invert_dir);
    assert!(config.axes.e.invert_step);
    assert_eq!(config.advance.unwrap().pulses_per_tick, 2);
}

/// Test endstop wiring and polarity.
#[test]
fn test_parse_endstop_switches() {
    let config = parse_config(MACHINE).expect("Config should be valid");

    assert!(config.endstops.dual_z);
    assert!(config.endstops.check_on_start);
    assert_eq!(config.endstops.switches.len(), 3);
    assert!(config.endstops.switch(Endstop::Z2Min).unwrap().inverting);
    assert!(!config.endstops.switch(Endstop::ZMin).unwrap().inverting);
    assert!(config.endstops.is_fitted(Endstop::ZProbe));
    assert!(!config.endstops.is_fitted(Endstop::XMax));
}

/// Test galvo geometry fields and their defaults.
#[test]
fn test_parse_galvo_section() {
    let config = parse_config(MACHINE).expect("Config should be valid");
    let galvo = config.galvo.expect("galvo section");

    assert_eq!(galvo.field_size, Millimeters(100.0));
    assert_eq!(galvo.mirror_separation, Millimeters(10.0));
    assert_eq!(galvo.axis_scale, [0.9, 0.9]);
    assert_eq!(galvo.center(0), 0x8000 + 120);
    assert_eq!(galvo.center(1), 0x8000 - 40);
    assert_eq!(galvo.dac_max, u16::MAX);
}

/// Test that axes are required.
#[test]
fn test_missing_axes_is_parse_error() {
    let result = parse_config("[stepper]\nextruders = 1\n");
    assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
}

/// Test loading from a file on disk.
#[test]
fn test_load_config_from_file() {
    let path = std::env::temp_dir().join("galvo_motion_load_config.toml");
    std::fs::write(&path, MACHINE).expect("write temp config");

    let config = load_config(&path).expect("Config should load");
    assert!(config.has_galvo());
    assert!(config.has_advance());

    std::fs::remove_file(&path).ok();
}

/// Test a missing file reports an I/O error.
#[test]
fn test_load_config_missing_file() {
    let result = load_config("/nonexistent/galvo-motion.toml");
    assert!(matches!(result, Err(Error::Config(ConfigError::IoError(_)))));
}
