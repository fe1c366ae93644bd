//! Integer bilinear interpolation over the calibration grid.

use super::grid::{AxisGeometry, CalibrationGrid, Offset};

/// Right shift applied to in-cell fractions before the weights are formed.
///
/// Keeps `(cell >> shift)²` inside `i32` for a full 16-bit DAC span.
pub const INTERP_SHIFT: u32 = 4;

/// Position of a coordinate inside the grid along one axis.
#[derive(Debug, Clone, Copy)]
struct CellPosition {
    index: usize,
    fraction: i32,
    span: i32,
}

impl CellPosition {
    fn locate(geometry: &AxisGeometry, steps: usize, coord: i32) -> Self {
        let coord = coord.clamp(geometry.min, geometry.max);
        let relative = coord - geometry.min;
        let index = ((relative / geometry.cell) as usize).min(steps - 1);

        let mut shift = INTERP_SHIFT;
        while shift > 0 && geometry.cell >> shift == 0 {
            shift -= 1;
        }

        Self {
            index,
            fraction: (relative - index as i32 * geometry.cell) >> shift,
            span: geometry.cell >> shift,
        }
    }
}

impl<const POINTS: usize> CalibrationGrid<POINTS> {
    /// Offset at an arbitrary DAC coordinate.
    ///
    /// Coordinates outside the field use the nearest edge cell. At a node the result
    /// is that node's stored offset.
    pub fn interpolate(&self, x: i32, y: i32) -> Offset {
        let steps = Self::STEPS;
        let geometry = self.geometry();
        let cx = CellPosition::locate(&geometry.x, steps, x);
        let cy = CellPosition::locate(&geometry.y, steps, y);

        let (i, j) = (cx.index, cy.index);
        let corners = [
            (self.offset(i, j), (cx.span - cx.fraction) * (cy.span - cy.fraction)),
            (self.offset(i + 1, j), cx.fraction * (cy.span - cy.fraction)),
            (self.offset(i, j + 1), (cx.span - cx.fraction) * cy.fraction),
            (self.offset(i + 1, j + 1), cx.fraction * cy.fraction),
        ];

        let mut sum_x = 0i64;
        let mut sum_y = 0i64;
        for (offset, weight) in corners {
            sum_x += i64::from(offset.x) * i64::from(weight);
            sum_y += i64::from(offset.y) * i64::from(weight);
        }

        let area = i64::from(cx.span) * i64::from(cy.span);
        Offset {
            x: (sum_x / area) as i32,
            y: (sum_y / area) as i32,
        }
    }

    /// Corrected coordinate: nominal plus interpolated offset.
    #[inline]
    pub fn correct(&self, x: i32, y: i32) -> (i32, i32) {
        let offset = self.interpolate(x, y);
        (x + offset.x, y + offset.y)
    }
}
