//! Corrected coordinates to DAC writes.

use crate::config::units::Millimeters;
use crate::config::CalibrationConfig;
use crate::error::{self, OutputError};
use crate::stepper::{Motor, StepSink};

use super::grid::{CalibrationGrid, GalvoAxis};

/// Two-channel DAC driving the mirrors.
pub trait GalvoSink {
    /// Write one axis. Nothing moves until a write with `commit` set.
    fn set_axis_value(&mut self, axis: GalvoAxis, value: u16, commit: bool)
        -> Result<(), OutputError>;
}

impl<T: GalvoSink + ?Sized> GalvoSink for &mut T {
    fn set_axis_value(
        &mut self,
        axis: GalvoAxis,
        value: u16,
        commit: bool,
    ) -> Result<(), OutputError> {
        (**self).set_axis_value(axis, value, commit)
    }
}

/// Applies grid correction and writes the result to a [`GalvoSink`].
pub struct GalvoPositionMapper<G: GalvoSink, const POINTS: usize> {
    grid: CalibrationGrid<POINTS>,
    sink: G,
}

impl<G: GalvoSink, const POINTS: usize> GalvoPositionMapper<G, POINTS> {
    /// Create a mapper around an existing grid.
    pub fn new(grid: CalibrationGrid<POINTS>, sink: G) -> Self {
        Self { grid, sink }
    }

    /// Build the grid from `config` and wrap `sink`.
    pub fn from_config(config: &CalibrationConfig, sink: G) -> error::Result<Self> {
        Ok(Self::new(CalibrationGrid::build(config)?, sink))
    }

    /// DAC values for a nominal coordinate, without writing them.
    pub fn dac_values(&self, x: i32, y: i32) -> (u16, u16) {
        let (cx, cy) = self.grid.correct(x, y);
        let max = i32::from(self.grid.geometry().dac_max);
        (cx.clamp(0, max) as u16, cy.clamp(0, max) as u16)
    }

    /// Correct `(x, y)` and move the mirrors there. Returns the values written.
    pub fn output(&mut self, x: i32, y: i32) -> Result<(u16, u16), OutputError> {
        let (vx, vy) = self.dac_values(x, y);
        self.sink.set_axis_value(GalvoAxis::X, vx, false)?;
        self.sink.set_axis_value(GalvoAxis::Y, vy, true)?;
        Ok((vx, vy))
    }

    /// Replace the grid. The old grid stays if the new configuration is rejected.
    pub fn recalibrate(&mut self, config: &CalibrationConfig) -> error::Result<()> {
        self.grid = CalibrationGrid::build(config)?;
        Ok(())
    }

    /// Nominal DAC coordinate of a field position.
    #[inline]
    pub fn absolute_position(&self, axis: GalvoAxis, position: Millimeters) -> i32 {
        self.grid.geometry().absolute_position(axis, position)
    }

    /// Current grid.
    #[inline]
    pub fn grid(&self) -> &CalibrationGrid<POINTS> {
        &self.grid
    }

    /// DAC sink.
    #[inline]
    pub fn sink(&self) -> &G {
        &self.sink
    }

    /// Mutable DAC sink.
    #[inline]
    pub fn sink_mut(&mut self) -> &mut G {
        &mut self.sink
    }
}

/// [`StepSink`] for a galvo machine.
///
/// X and Y pulses move a world position one DAC unit in the latched direction and
/// send it through the mapper. Z and extruder motors go to `inner`.
pub struct GalvoStepSink<G: GalvoSink, S: StepSink, const POINTS: usize> {
    mapper: GalvoPositionMapper<G, POINTS>,
    inner: S,
    world: [i32; 2],
    reverse: [bool; 2],
}

impl<G: GalvoSink, S: StepSink, const POINTS: usize> GalvoStepSink<G, S, POINTS> {
    /// Start at the optical center.
    pub fn new(mapper: GalvoPositionMapper<G, POINTS>, inner: S) -> Self {
        let geometry = mapper.grid().geometry();
        let world = [geometry.x.center, geometry.y.center];
        Self {
            mapper,
            inner,
            world,
            reverse: [false; 2],
        }
    }

    /// Jump to a nominal DAC coordinate.
    pub fn set_world_position(&mut self, x: i32, y: i32) -> Result<(), OutputError> {
        self.world = [x, y];
        self.mapper.output(x, y).map(|_| ())
    }

    /// Jump to a field position measured from the field edge.
    pub fn move_to(&mut self, x: Millimeters, y: Millimeters) -> Result<(), OutputError> {
        let wx = self.mapper.absolute_position(GalvoAxis::X, x);
        let wy = self.mapper.absolute_position(GalvoAxis::Y, y);
        self.set_world_position(wx, wy)
    }

    /// Nominal DAC coordinate last commanded.
    #[inline]
    pub fn world_position(&self) -> (i32, i32) {
        (self.world[0], self.world[1])
    }

    /// Replace the grid and re-output the current position through it.
    pub fn recalibrate(&mut self, config: &CalibrationConfig) -> error::Result<()> {
        self.mapper.recalibrate(config)?;
        self.mapper.output(self.world[0], self.world[1])?;
        Ok(())
    }

    /// Correction stage.
    #[inline]
    pub fn mapper(&self) -> &GalvoPositionMapper<G, POINTS> {
        &self.mapper
    }

    /// Mutable correction stage.
    #[inline]
    pub fn mapper_mut(&mut self) -> &mut GalvoPositionMapper<G, POINTS> {
        &mut self.mapper
    }

    /// Sink for the non-galvo motors.
    #[inline]
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<G: GalvoSink, S: StepSink, const POINTS: usize> StepSink for GalvoStepSink<G, S, POINTS> {
    fn set_direction(&mut self, motor: Motor, reverse: bool) -> Result<(), OutputError> {
        match motor {
            Motor::X => self.reverse[0] = reverse,
            Motor::Y => self.reverse[1] = reverse,
            other => return self.inner.set_direction(other, reverse),
        }
        Ok(())
    }

    fn pulse(&mut self, motor: Motor) -> Result<(), OutputError> {
        let axis = match motor {
            Motor::X => 0,
            Motor::Y => 1,
            other => return self.inner.pulse(other),
        };
        self.world[axis] += if self.reverse[axis] { -1 } else { 1 };
        self.mapper.output(self.world[0], self.world[1]).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stepper::testing::RecordingSink;

    #[derive(Debug, Default)]
    struct RecordingGalvo {
        writes: heapless::Vec<(GalvoAxis, u16, bool), 64>,
        fail: bool,
    }

    impl GalvoSink for RecordingGalvo {
        fn set_axis_value(
            &mut self,
            axis: GalvoAxis,
            value: u16,
            commit: bool,
        ) -> Result<(), OutputError> {
            if self.fail {
                return Err(OutputError::Spi);
            }
            self.writes.push((axis, value, commit)).map_err(|_| OutputError::Spi)
        }
    }

    fn config() -> CalibrationConfig {
        CalibrationConfig::new(Millimeters(100.0), Millimeters(150.0))
    }

    fn mapper() -> GalvoPositionMapper<RecordingGalvo, 5> {
        GalvoPositionMapper::from_config(&config(), RecordingGalvo::default()).unwrap()
    }

    #[test]
    fn test_output_writes_x_then_commits_y() {
        let mut mapper = mapper();
        let values = mapper.output(0x8000, 0x8000).unwrap();

        assert_eq!(values, (0x8000, 0x8000));
        assert_eq!(
            mapper.sink().writes.as_slice(),
            &[(GalvoAxis::X, 0x8000, false), (GalvoAxis::Y, 0x8000, true)]
        );
    }

    #[test]
    fn test_output_applies_correction() {
        let mut mapper = mapper();
        let (x, y) = mapper.grid().node(3, 2);
        let offset = mapper.grid().offset(3, 2);
        let values = mapper.output(x, y).unwrap();
        assert_eq!(values, ((x + offset.x) as u16, (y + offset.y) as u16));
    }

    #[test]
    fn test_output_clamps_to_dac_range() {
        let mut config = config();
        config.dac_max = 0x0FFF;
        config.axis_center = [0x0800, 0x0800];
        let mut mapper: GalvoPositionMapper<_, 5> =
            GalvoPositionMapper::from_config(&config, RecordingGalvo::default()).unwrap();

        assert_eq!(mapper.output(-100_000, 100_000).unwrap().0, 0);
        let (_, y) = mapper.dac_values(0x0800, 1_000_000);
        assert!(y <= 0x0FFF);
        assert_eq!(mapper.dac_values(0x0800, i32::MAX - 0x1000).1, 0x0FFF);
    }

    #[test]
    fn test_failed_recalibration_keeps_grid() {
        let mut mapper = mapper();
        let before = mapper.grid().clone();
        let mut bad = config();
        bad.field_size = Millimeters(-1.0);

        assert!(mapper.recalibrate(&bad).is_err());
        assert_eq!(mapper.grid(), &before);
    }

    #[test]
    fn test_step_sink_moves_world_position() {
        let mut sink = GalvoStepSink::new(mapper(), RecordingSink::default());
        assert_eq!(sink.world_position(), (0x8000, 0x8000));

        sink.set_direction(Motor::X, false).unwrap();
        sink.set_direction(Motor::Y, true).unwrap();
        for _ in 0..3 {
            sink.pulse(Motor::X).unwrap();
            sink.pulse(Motor::Y).unwrap();
        }

        assert_eq!(sink.world_position(), (0x8003, 0x8000 - 3));
        assert_eq!(sink.mapper().sink().writes.len(), 12);
        assert_eq!(sink.inner().direction_writes(), 0);
    }

    #[test]
    fn test_step_sink_passes_through_other_motors() {
        let mut sink = GalvoStepSink::new(mapper(), RecordingSink::default());
        sink.set_direction(Motor::Z, true).unwrap();
        sink.pulse(Motor::Z).unwrap();
        sink.pulse(Motor::Extruder(0)).unwrap();

        assert_eq!(sink.inner().net(Motor::Z), -1);
        assert_eq!(sink.inner().pulses(Motor::Extruder(0)), 1);
        assert!(sink.mapper().sink().writes.is_empty());
    }

    #[test]
    fn test_step_sink_reports_dac_failure() {
        let mut sink = GalvoStepSink::new(mapper(), RecordingSink::default());
        sink.mapper_mut().sink_mut().fail = true;
        assert_eq!(sink.pulse(Motor::X), Err(OutputError::Spi));
    }

    #[test]
    fn test_move_to_field_edge() {
        let mut sink = GalvoStepSink::new(mapper(), RecordingSink::default());
        sink.move_to(Millimeters(0.0), Millimeters(50.0)).unwrap();
        let geometry = *sink.mapper().grid().geometry();
        assert_eq!(sink.world_position(), (geometry.x.min, 0x8000));
    }
}
