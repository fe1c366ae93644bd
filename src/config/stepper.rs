//! Step scheduler and linear advance configuration.

use serde::Deserialize;

use crate::motion::timer::DEFAULT_MAX_STEP_FREQUENCY;

/// Step scheduler settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct StepperConfig {
    /// Step rate ceiling in steps/second.
    #[serde(default = "default_max_step_frequency")]
    pub max_step_frequency: u32,

    /// Number of extruder motors wired (1-4).
    #[serde(default = "default_extruders")]
    pub extruders: u8,
}

fn default_max_step_frequency() -> u32 {
    DEFAULT_MAX_STEP_FREQUENCY
}

fn default_extruders() -> u8 {
    1
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            max_step_frequency: default_max_step_frequency(),
            extruders: default_extruders(),
        }
    }
}

/// Linear advance settings. Presence of the section enables the compensator.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AdvanceConfig {
    /// Pending extruder pulses drained per extruder on each high-frequency tick.
    #[serde(default = "default_pulses_per_tick")]
    pub pulses_per_tick: u8,
}

fn default_pulses_per_tick() -> u8 {
    4
}

impl Default for AdvanceConfig {
    fn default() -> Self {
        Self {
            pulses_per_tick: default_pulses_per_tick(),
        }
    }
}
