//! Per-axis configuration from TOML.

use serde::Deserialize;

use crate::motion::Axis;

use super::units::StepsPerUnit;

/// Step/direction output configuration for one logical axis.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AxisConfig {
    /// Steps per axis unit (mm, or DAC unit for galvo axes).
    pub steps_per_unit: StepsPerUnit,

    /// STEP pin is active low.
    #[serde(default)]
    pub invert_step: bool,

    /// Invert DIR pin logic.
    #[serde(default)]
    pub invert_dir: bool,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            steps_per_unit: StepsPerUnit::default(),
            invert_step: false,
            invert_dir: false,
        }
    }
}

/// The four logical axes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct AxesConfig {
    /// X axis (first galvo mirror when the galvo output is fitted).
    pub x: AxisConfig,
    /// Y axis (second galvo mirror when the galvo output is fitted).
    pub y: AxisConfig,
    /// Z axis, shared by both Z motors in a dual-Z build.
    pub z: AxisConfig,
    /// Extruder axis, shared by all extruders.
    pub e: AxisConfig,
}

impl AxesConfig {
    /// Configuration for one axis.
    pub fn axis(&self, axis: Axis) -> &AxisConfig {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
            Axis::E => &self.e,
        }
    }

    /// Steps per unit for all axes, indexed by [`Axis::index`].
    pub fn steps_per_unit(&self) -> [StepsPerUnit; 4] {
        [
            self.x.steps_per_unit,
            self.y.steps_per_unit,
            self.z.steps_per_unit,
            self.e.steps_per_unit,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_lookup() {
        let mut axes = AxesConfig::default();
        axes.z.steps_per_unit = StepsPerUnit(400.0);
        axes.e.invert_dir = true;

        assert_eq!(axes.axis(Axis::Z).steps_per_unit, StepsPerUnit(400.0));
        assert!(axes.axis(Axis::E).invert_dir);
        assert_eq!(axes.steps_per_unit()[2], StepsPerUnit(400.0));
    }
}
