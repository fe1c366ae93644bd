//! Builder pattern for Stepper.

use crate::config::units::StepsPerUnit;
use crate::config::{EndstopConfig, SystemConfig};
use crate::error::{ConfigError, Error, Result};
use crate::motion::timer::{StepTimer, DEFAULT_MAX_STEP_FREQUENCY};
use crate::motion::{AdvanceSteps, BlockSource, LinearAdvance, NUM_AXIS};

use super::endstop::{EndstopMonitor, EndstopSource};
use super::output::StepSink;
use super::position::AxisPositions;
use super::scheduler::Stepper;

/// Builder for creating Stepper instances.
pub struct StepperBuilder<'a, Q, S, E>
where
    Q: BlockSource,
    S: StepSink,
    E: EndstopSource,
{
    queue: Option<Q>,
    sink: Option<S>,
    endstops: Option<E>,
    advance_steps: Option<&'a AdvanceSteps>,
    advance_required: bool,
    endstop_config: EndstopConfig,
    max_step_frequency: u32,
    steps_per_unit: [StepsPerUnit; NUM_AXIS],
}

impl<'a, Q, S, E> Default for StepperBuilder<'a, Q, S, E>
where
    Q: BlockSource,
    S: StepSink,
    E: EndstopSource,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, Q, S, E> StepperBuilder<'a, Q, S, E>
where
    Q: BlockSource,
    S: StepSink,
    E: EndstopSource,
{
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            queue: None,
            sink: None,
            endstops: None,
            advance_steps: None,
            advance_required: false,
            endstop_config: EndstopConfig::default(),
            max_step_frequency: DEFAULT_MAX_STEP_FREQUENCY,
            steps_per_unit: [StepsPerUnit::default(); NUM_AXIS],
        }
    }

    /// Set the planner queue consumer.
    pub fn queue(mut self, queue: Q) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Set the step output.
    pub fn sink(mut self, sink: S) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the endstop inputs.
    pub fn endstops(mut self, endstops: E) -> Self {
        self.endstops = Some(endstops);
        self
    }

    /// Route extruder steps through linear advance, accumulating into `steps`.
    pub fn advance_steps(mut self, steps: &'a AdvanceSteps) -> Self {
        self.advance_steps = Some(steps);
        self
    }

    /// Set endstop behaviour.
    pub fn endstop_config(mut self, config: &EndstopConfig) -> Self {
        self.endstop_config = config.clone();
        self
    }

    /// Set the step rate ceiling.
    pub fn max_step_frequency(mut self, frequency: u32) -> Self {
        self.max_step_frequency = frequency;
        self
    }

    /// Set steps per unit for position reporting.
    pub fn steps_per_unit(mut self, steps_per_unit: [StepsPerUnit; NUM_AXIS]) -> Self {
        self.steps_per_unit = steps_per_unit;
        self
    }

    /// Configure from a SystemConfig.
    ///
    /// When the configuration enables linear advance, [`advance_steps`](Self::advance_steps)
    /// must also be supplied before building.
    pub fn from_config(mut self, config: &SystemConfig) -> Self {
        self.endstop_config = config.endstops.clone();
        self.max_step_frequency = config.stepper.max_step_frequency;
        self.steps_per_unit = config.axes.steps_per_unit();
        self.advance_required = config.has_advance();
        self
    }

    /// Build the Stepper.
    ///
    /// # Errors
    ///
    /// Returns an error if required components are missing.
    pub fn build(self) -> Result<Stepper<'a, Q, S, E>> {
        let queue = self
            .queue
            .ok_or(Error::Config(ConfigError::MissingComponent("queue")))?;
        let sink = self
            .sink
            .ok_or(Error::Config(ConfigError::MissingComponent("sink")))?;
        let endstops = self
            .endstops
            .ok_or(Error::Config(ConfigError::MissingComponent("endstops")))?;

        if self.advance_required && self.advance_steps.is_none() {
            return Err(Error::Config(ConfigError::MissingComponent("advance_steps")));
        }

        let monitor = EndstopMonitor::new(endstops, &self.endstop_config);
        let advance = self.advance_steps.map(LinearAdvance::new);

        Ok(Stepper::new(
            queue,
            sink,
            monitor,
            StepTimer::new(self.max_step_frequency),
            advance,
            self.endstop_config.dual_z,
            AxisPositions::new(self.steps_per_unit),
        ))
    }
}
