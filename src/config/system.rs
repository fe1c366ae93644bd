//! System configuration - root configuration structure.

use serde::Deserialize;

use super::axis::AxesConfig;
use super::endstop::EndstopConfig;
use super::galvo::CalibrationConfig;
use super::stepper::{AdvanceConfig, StepperConfig};

/// Root configuration structure from TOML.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SystemConfig {
    /// Step scheduler settings.
    #[serde(default)]
    pub stepper: StepperConfig,

    /// Per-axis step output settings.
    pub axes: AxesConfig,

    /// Endstop wiring.
    #[serde(default)]
    pub endstops: EndstopConfig,

    /// Galvo output stage, if fitted.
    #[serde(default)]
    pub galvo: Option<CalibrationConfig>,

    /// Linear advance, if enabled.
    #[serde(default)]
    pub advance: Option<AdvanceConfig>,
}

impl SystemConfig {
    /// True when X/Y are driven through a galvo scanner.
    pub fn has_galvo(&self) -> bool {
        self.galvo.is_some()
    }

    /// True when extruder steps go through the linear advance compensator.
    pub fn has_advance(&self) -> bool {
        self.advance.is_some()
    }
}
