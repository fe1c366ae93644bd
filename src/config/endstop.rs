//! Endstop wiring configuration.

use heapless::Vec;
use serde::Deserialize;

use crate::stepper::Endstop;

/// One fitted endstop switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EndstopSwitch {
    /// Which endstop this switch is.
    pub endstop: Endstop,

    /// Switch reads low when triggered.
    #[serde(default)]
    pub inverting: bool,
}

/// Endstop section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EndstopConfig {
    /// Endstop checking is active from power-up.
    #[serde(default = "default_check_on_start")]
    pub check_on_start: bool,

    /// Z is driven by two motors, each with its own switch.
    #[serde(default)]
    pub dual_z: bool,

    /// Fitted switches. Endstops not listed read as never triggered.
    #[serde(default)]
    pub switches: Vec<EndstopSwitch, 9>,
}

fn default_check_on_start() -> bool {
    true
}

impl Default for EndstopConfig {
    fn default() -> Self {
        Self {
            check_on_start: default_check_on_start(),
            dual_z: false,
            switches: Vec::new(),
        }
    }
}

impl EndstopConfig {
    /// Look up a fitted switch.
    pub fn switch(&self, endstop: Endstop) -> Option<&EndstopSwitch> {
        self.switches.iter().find(|s| s.endstop == endstop)
    }

    /// True when the switch is listed.
    pub fn is_fitted(&self, endstop: Endstop) -> bool {
        self.switch(endstop).is_some()
    }
}
