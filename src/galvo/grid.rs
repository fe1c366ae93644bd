//! Calibration grid for two-mirror projection.
//!
//! A galvo pair turns DAC values into mirror angles, and angles land on the work
//! plane through a tangent, so equal DAC steps are not equal distances. The grid
//! stores, per node, the offset that moves a nominal DAC coordinate to the one
//! producing the intended spot.

use libm::{atan, atan2, sqrt};

use crate::config::units::Millimeters;
use crate::config::{validate_calibration, CalibrationConfig};
use crate::error::{CalibrationError, Result};

/// Galvo mirror axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GalvoAxis {
    /// First mirror.
    X = 0,
    /// Second mirror.
    Y = 1,
}

/// DAC range actually used by one axis.
///
/// `size` is an exact multiple of `cell`, so node positions never drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisGeometry {
    /// Optical center.
    pub center: i32,
    /// Lowest node.
    pub min: i32,
    /// Highest node.
    pub max: i32,
    /// `max - min`.
    pub size: i32,
    /// Distance between nodes.
    pub cell: i32,
}

impl AxisGeometry {
    fn new(
        axis: GalvoAxis,
        config: &CalibrationConfig,
        steps: usize,
    ) -> core::result::Result<Self, CalibrationError> {
        let index = axis as usize;
        let center = config.center(index);
        let scaled = (f64::from(center) * f64::from(config.axis_scale[index])) as i32;
        let half_span = scaled.min(center).min(i32::from(config.dac_max) - center);

        let steps = steps as i32;
        let cell = 2 * half_span / steps;
        if cell <= 0 {
            return Err(CalibrationError::DegenerateAxis {
                axis: index as u8,
                half_span,
            });
        }

        let size = cell * steps;
        let min = center - size / 2;
        Ok(Self {
            center,
            min,
            max: min + size,
            size,
            cell,
        })
    }

    /// DAC position of node `index`.
    #[inline]
    pub fn node(&self, index: usize) -> i32 {
        let position = self.min + index as i32 * self.cell;
        if position > self.max {
            self.min
        } else {
            position
        }
    }
}

/// Scanner geometry in DAC units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalvoGeometry {
    /// First mirror range.
    pub x: AxisGeometry,
    /// Second mirror range.
    pub y: AxisGeometry,
    /// Width of the working field.
    pub field_size: Millimeters,
    /// Largest DAC value.
    pub dac_max: u16,
}

impl GalvoGeometry {
    /// Derive the DAC ranges for a grid with `steps` cells per axis.
    pub fn from_config(
        config: &CalibrationConfig,
        steps: usize,
    ) -> core::result::Result<Self, CalibrationError> {
        Ok(Self {
            x: AxisGeometry::new(GalvoAxis::X, config, steps)?,
            y: AxisGeometry::new(GalvoAxis::Y, config, steps)?,
            field_size: config.field_size,
            dac_max: config.dac_max,
        })
    }

    /// Range of one axis.
    #[inline]
    pub fn axis(&self, axis: GalvoAxis) -> &AxisGeometry {
        match axis {
            GalvoAxis::X => &self.x,
            GalvoAxis::Y => &self.y,
        }
    }

    /// DAC units per millimetre on the work plane.
    pub fn units_per_mm(&self, axis: GalvoAxis) -> f32 {
        self.axis(axis).size as f32 / self.field_size.value()
    }

    /// Nominal DAC coordinate for a field position measured from the field edge.
    pub fn absolute_position(&self, axis: GalvoAxis, position: Millimeters) -> i32 {
        let geometry = self.axis(axis);
        let offset = f64::from(geometry.size) * f64::from(position.value())
            / f64::from(self.field_size.value());
        geometry.min + offset as i32
    }
}

/// Correction offset at one node, in DAC units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Offset {
    /// X correction.
    pub x: i32,
    /// Y correction.
    pub y: i32,
}

/// `POINTS × POINTS` offset grid, indexed `[x][y]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationGrid<const POINTS: usize> {
    geometry: GalvoGeometry,
    offsets: [[Offset; POINTS]; POINTS],
}

impl<const POINTS: usize> CalibrationGrid<POINTS> {
    /// Cells per axis.
    pub const STEPS: usize = POINTS.saturating_sub(1);

    /// Compute the grid. Pure: equal configurations give equal grids.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for impossible geometry, or a calibration
    /// error when the grid is too small or the DAC span too narrow.
    pub fn build(config: &CalibrationConfig) -> Result<Self> {
        validate_calibration(config)?;
        if POINTS < 2 {
            return Err(CalibrationError::GridTooSmall(POINTS).into());
        }

        let geometry = GalvoGeometry::from_config(config, Self::STEPS)?;
        let x = geometry.x;
        let y = geometry.y;

        let field = f64::from(config.field_size.value());
        let distance = f64::from(config.mirror_distance.value());

        // mirror-to-plane distance and mirror separation, in DAC units
        let z_x = distance * f64::from(x.size) / field;
        let z_y = distance * f64::from(y.size) / field;
        let e = f64::from(config.mirror_separation.value()) * f64::from(x.size) / field;

        // DAC units per radian of deflection
        let theta_max = atan((field / 2.0) / distance);
        let t_x = f64::from(x.size) / 2.0 / theta_max;
        let t_y = f64::from(y.size) / 2.0 / theta_max;

        let cx = f64::from(x.center);
        let cy = f64::from(y.center);

        let mut offsets = [[Offset::default(); POINTS]; POINTS];
        for (i, column) in offsets.iter_mut().enumerate() {
            let px = f64::from(x.node(i));
            for (j, offset) in column.iter_mut().enumerate() {
                let py = f64::from(y.node(j));

                // second mirror first: its angle lengthens the first mirror's throw
                let dy = atan2(py - cy, z_y) * t_y;
                let dx = atan2(px - cx, sqrt(dy * dy + z_x * z_x) + e) * t_x;

                *offset = Offset {
                    x: (dx - (px - cx)) as i32,
                    y: (dy - (py - cy)) as i32,
                };
            }
        }

        log::info!(
            "calibration grid {}x{} built: x {}..{} y {}..{}",
            POINTS,
            POINTS,
            x.min,
            x.max,
            y.min,
            y.max
        );

        Ok(Self { geometry, offsets })
    }

    /// Geometry the grid was built for.
    #[inline]
    pub fn geometry(&self) -> &GalvoGeometry {
        &self.geometry
    }

    /// Offset at node `(i, j)`.
    #[inline]
    pub fn offset(&self, i: usize, j: usize) -> Offset {
        self.offsets[i][j]
    }

    /// DAC position of node `(i, j)`.
    #[inline]
    pub fn node(&self, i: usize, j: usize) -> (i32, i32) {
        (self.geometry.x.node(i), self.geometry.y.node(j))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, Error};

    fn config() -> CalibrationConfig {
        let mut config = CalibrationConfig::new(Millimeters(100.0), Millimeters(200.0));
        config.mirror_separation = Millimeters(10.0);
        config
    }

    #[test]
    fn test_geometry_is_centered() {
        let geometry = GalvoGeometry::from_config(&config(), 4).unwrap();
        assert_eq!(geometry.x.center, 0x8000);
        assert_eq!(geometry.x.cell, 16383);
        assert_eq!(geometry.x.size, 4 * 16383);
        assert_eq!(geometry.x.node(2), 0x8000);
        assert_eq!(geometry.x.max - geometry.x.center, geometry.x.center - geometry.x.min);
    }

    #[test]
    fn test_scale_and_tilt() {
        let mut config = config();
        config.axis_scale = [0.5, 1.0];
        config.axis_tilt = [0, -1000];
        let geometry = GalvoGeometry::from_config(&config, 4).unwrap();

        assert_eq!(geometry.x.cell, 8192);
        assert_eq!(geometry.x.min, 0x8000 - 16384);
        assert_eq!(geometry.y.center, 0x8000 - 1000);
        assert_eq!(geometry.y.node(2), 0x8000 - 1000);
        assert!(geometry.y.min >= 0 && geometry.y.max <= 65535);
    }

    #[test]
    fn test_center_node_has_no_offset() {
        let grid = CalibrationGrid::<5>::build(&config()).unwrap();
        assert_eq!(grid.offset(2, 2), Offset { x: 0, y: 0 });
    }

    #[test]
    fn test_offsets_are_symmetric() {
        let grid = CalibrationGrid::<5>::build(&config()).unwrap();
        for i in 0..5 {
            for j in 0..5 {
                let o = grid.offset(i, j);
                assert_eq!(o.x, -grid.offset(4 - i, j).x, "x mirror at ({}, {})", i, j);
                assert_eq!(o.y, -grid.offset(i, 4 - j).y, "y mirror at ({}, {})", i, j);
                assert_eq!(o.x, grid.offset(i, 4 - j).x, "x even in y at ({}, {})", i, j);
            }
        }
        // the interior nodes need a real correction
        assert!(grid.offset(3, 2).x != 0 || grid.offset(2, 3).y != 0);
    }

    #[test]
    fn test_build_is_idempotent() {
        let a = CalibrationGrid::<9>::build(&config()).unwrap();
        let b = CalibrationGrid::<9>::build(&config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_grid_too_small() {
        assert_eq!(
            CalibrationGrid::<1>::build(&config()),
            Err(Error::Calibration(CalibrationError::GridTooSmall(1)))
        );
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let mut config = config();
        config.mirror_distance = Millimeters(0.0);
        assert!(matches!(
            CalibrationGrid::<5>::build(&config),
            Err(Error::Config(ConfigError::InvalidMirrorDistance(_)))
        ));
    }

    #[test]
    fn test_absolute_position() {
        let geometry = GalvoGeometry::from_config(&config(), 4).unwrap();
        assert_eq!(geometry.absolute_position(GalvoAxis::X, Millimeters(0.0)), geometry.x.min);
        assert_eq!(geometry.absolute_position(GalvoAxis::X, Millimeters(50.0)), 0x8000);
        assert_eq!(geometry.absolute_position(GalvoAxis::Y, Millimeters(100.0)), geometry.y.max);
        assert!((geometry.units_per_mm(GalvoAxis::X) - 655.32).abs() < 1e-3);
    }
}
