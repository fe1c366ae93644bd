//! Galvo calibration parameters.

use serde::Deserialize;

use super::units::Millimeters;

/// Nominal DAC midpoint.
pub const DAC_CENTER: u16 = 0x8000;

/// Geometry of a two-mirror scanner and the DAC range it is driven over.
///
/// Mirror X deflects first, mirror Y second; `mirror_distance` is measured from the
/// Y mirror to the work plane.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CalibrationConfig {
    /// Width of the square working field.
    #[serde(rename = "field_size_mm")]
    pub field_size: Millimeters,

    /// Distance from the second mirror to the work plane.
    #[serde(rename = "mirror_distance_mm")]
    pub mirror_distance: Millimeters,

    /// Distance between the two mirrors.
    #[serde(default, rename = "mirror_separation_mm")]
    pub mirror_separation: Millimeters,

    /// Fraction of the half DAC range used on each axis, in (0, 1].
    #[serde(default = "default_axis_scale")]
    pub axis_scale: [f32; 2],

    /// DAC value of the optical center on each axis.
    #[serde(default = "default_axis_center")]
    pub axis_center: [u16; 2],

    /// Mechanical tilt correction added to the center, in DAC units.
    #[serde(default)]
    pub axis_tilt: [i32; 2],

    /// Largest value the DAC accepts.
    #[serde(default = "default_dac_max")]
    pub dac_max: u16,
}

fn default_axis_scale() -> [f32; 2] {
    [1.0, 1.0]
}

fn default_axis_center() -> [u16; 2] {
    [DAC_CENTER, DAC_CENTER]
}

fn default_dac_max() -> u16 {
    u16::MAX
}

impl CalibrationConfig {
    /// Configuration with default DAC range, centering, and scaling.
    pub fn new(field_size: Millimeters, mirror_distance: Millimeters) -> Self {
        Self {
            field_size,
            mirror_distance,
            mirror_separation: Millimeters::default(),
            axis_scale: default_axis_scale(),
            axis_center: default_axis_center(),
            axis_tilt: [0, 0],
            dac_max: default_dac_max(),
        }
    }

    /// Effective center (center plus tilt) of an axis.
    #[inline]
    pub fn center(&self, axis: usize) -> i32 {
        i32::from(self.axis_center[axis]) + self.axis_tilt[axis]
    }
}
