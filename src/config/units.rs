//! Unit types for physical quantities.
//!
//! Keeps millimetres, step counts, and the conversion factor between them apart at
//! compile time.

use serde::Deserialize;

/// Linear distance in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct Millimeters(pub f32);

impl Millimeters {
    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }
}

/// Conversion factor from one axis unit (mm, or DAC unit for galvo axes) to steps.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Deserialize)]
#[serde(transparent)]
pub struct StepsPerUnit(pub f32);

impl StepsPerUnit {
    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }

    /// True for a finite, positive factor.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }
}

impl Default for StepsPerUnit {
    fn default() -> Self {
        Self(1.0)
    }
}

/// Axis position in steps (absolute from origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Steps(pub i32);

impl Steps {
    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Convert to millimetres.
    #[inline]
    pub fn to_mm(self, steps_per_unit: StepsPerUnit) -> Millimeters {
        Millimeters(self.0 as f32 / steps_per_unit.0)
    }
}
