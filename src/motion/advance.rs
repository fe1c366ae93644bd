//! Linear advance for extruders.
//!
//! The step scheduler does not pulse extruders directly when advance is enabled.
//! Instead it accounts every extruder step, plus the change in pressure advance, in
//! a per-extruder pending count. A separate, faster interrupt drains those counts a
//! few pulses at a time.

use core::cell::Cell;

use critical_section::Mutex;

use crate::config::SystemConfig;
use crate::error::{ConfigError, Error, Result};
use crate::stepper::{Motor, StepSink};

use super::block::{MotionBlock, EXTRUDERS};

/// Pending extruder steps shared between the step scheduler and [`AdvanceTask`].
pub struct AdvanceSteps {
    pending: Mutex<Cell<[i32; EXTRUDERS]>>,
}

impl Default for AdvanceSteps {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvanceSteps {
    /// No pending steps.
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new([0; EXTRUDERS])),
        }
    }

    /// Add signed steps to an extruder's pending count.
    pub fn add(&self, extruder: usize, delta: i32) {
        if delta == 0 || extruder >= EXTRUDERS {
            return;
        }
        critical_section::with(|cs| {
            let cell = self.pending.borrow(cs);
            let mut pending = cell.get();
            pending[extruder] += delta;
            cell.set(pending);
        });
    }

    /// Pending steps for one extruder.
    pub fn pending(&self, extruder: usize) -> i32 {
        critical_section::with(|cs| {
            self.pending
                .borrow(cs)
                .get()
                .get(extruder)
                .copied()
                .unwrap_or(0)
        })
    }

    /// Take one pending step; `Some(true)` for a forward step.
    pub fn take_one(&self, extruder: usize) -> Option<bool> {
        critical_section::with(|cs| {
            let cell = self.pending.borrow(cs);
            let mut pending = cell.get();
            let count = pending.get_mut(extruder)?;
            let forward = match (*count).cmp(&0) {
                core::cmp::Ordering::Greater => true,
                core::cmp::Ordering::Less => false,
                core::cmp::Ordering::Equal => return None,
            };
            *count += if forward { -1 } else { 1 };
            cell.set(pending);
            Some(forward)
        })
    }

    /// Discard all pending steps.
    pub fn clear(&self) {
        critical_section::with(|cs| self.pending.borrow(cs).set([0; EXTRUDERS]));
    }
}

/// Scheduler-side advance integrator, in 1/256 extruder steps.
pub struct LinearAdvance<'a> {
    steps: &'a AdvanceSteps,
    advance: i32,
    old_advance: i32,
    max_advance: i32,
    final_advance: i32,
    advance_rate: i32,
    extruder: usize,
}

impl<'a> LinearAdvance<'a> {
    /// Integrator feeding `steps`.
    pub fn new(steps: &'a AdvanceSteps) -> Self {
        Self {
            steps,
            advance: 0,
            old_advance: 0,
            max_advance: 0,
            final_advance: 0,
            advance_rate: 0,
            extruder: 0,
        }
    }

    /// Latch a new block's advance parameters and apply its entry advance.
    pub fn start_block(&mut self, block: &MotionBlock) {
        self.extruder = usize::from(block.active_extruder);
        self.advance = block.advance.initial;
        self.max_advance = block.advance.max;
        self.final_advance = block.advance.final_advance;
        self.advance_rate = block.advance.rate;
        self.publish();
    }

    /// Account one Bresenham extruder step.
    #[inline]
    pub fn extruder_step(&self, direction: i32) {
        self.steps.add(self.extruder, direction);
    }

    /// Grow advance during acceleration, capped at the block's peak.
    pub fn accelerate(&mut self, step_loops: u8) {
        self.advance = self
            .advance
            .saturating_add(self.advance_rate.saturating_mul(i32::from(step_loops)))
            .min(self.max_advance);
        self.publish();
    }

    /// Shrink advance during deceleration, floored at the exit advance.
    pub fn decelerate(&mut self, step_loops: u8) {
        self.advance = self
            .advance
            .saturating_sub(self.advance_rate.saturating_mul(i32::from(step_loops)))
            .max(self.final_advance);
        self.publish();
    }

    /// Current advance in 1/256 steps.
    #[inline]
    pub fn advance(&self) -> i32 {
        self.advance
    }

    fn publish(&mut self) {
        let whole = self.advance >> 8;
        self.steps.add(self.extruder, whole - self.old_advance);
        self.old_advance = whole;
    }
}

/// High-frequency extruder pulse task.
pub struct AdvanceTask<'a, S: StepSink> {
    steps: &'a AdvanceSteps,
    sink: S,
    extruders: usize,
    pulses_per_tick: u8,
    errors: u32,
}

impl<'a, S: StepSink> AdvanceTask<'a, S> {
    /// Task draining `extruders` extruders through `sink`.
    pub fn new(steps: &'a AdvanceSteps, sink: S, extruders: usize, pulses_per_tick: u8) -> Self {
        Self {
            steps,
            sink,
            extruders: extruders.min(EXTRUDERS),
            pulses_per_tick,
            errors: 0,
        }
    }

    /// Task sized from the `[stepper]` and `[advance]` sections.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingComponent` when linear advance is not configured.
    pub fn from_config(steps: &'a AdvanceSteps, sink: S, config: &SystemConfig) -> Result<Self> {
        let advance = config
            .advance
            .ok_or(Error::Config(ConfigError::MissingComponent("advance")))?;
        Ok(Self::new(
            steps,
            sink,
            usize::from(config.stepper.extruders),
            advance.pulses_per_tick,
        ))
    }

    /// Emit up to `pulses_per_tick` pulses per extruder. Returns pulses emitted.
    pub fn tick(&mut self) -> u32 {
        let mut emitted = 0;
        for _ in 0..self.pulses_per_tick {
            for extruder in 0..self.extruders {
                let Some(forward) = self.steps.take_one(extruder) else {
                    continue;
                };
                let motor = Motor::Extruder(extruder as u8);
                let result = self
                    .sink
                    .set_direction(motor, !forward)
                    .and_then(|_| self.sink.pulse(motor));
                match result {
                    Ok(()) => emitted += 1,
                    Err(e) => {
                        self.errors = self.errors.saturating_add(1);
                        log::warn!("advance pulse failed: {}", e);
                    }
                }
            }
        }
        emitted
    }

    /// Output failures seen so far.
    pub fn errors(&self) -> u32 {
        self.errors
    }

    /// The wrapped sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdvanceConfig;
    use crate::motion::AdvanceParams;
    use crate::stepper::testing::RecordingSink;

    fn block_with_advance() -> MotionBlock {
        MotionBlock::new([100, 0, 0, 40], 1000)
            .with_extruder(1)
            .with_advance(AdvanceParams {
                initial: 512,
                max: 2048,
                final_advance: 256,
                rate: 300,
            })
    }

    #[test]
    fn test_start_block_pushes_entry_advance() {
        let steps = AdvanceSteps::new();
        let mut advance = LinearAdvance::new(&steps);
        advance.start_block(&block_with_advance());

        assert_eq!(steps.pending(1), 2);
        assert_eq!(steps.pending(0), 0);
    }

    #[test]
    fn test_accelerate_caps_and_decelerate_floors() {
        let steps = AdvanceSteps::new();
        let mut advance = LinearAdvance::new(&steps);
        advance.start_block(&block_with_advance());

        for _ in 0..10 {
            advance.accelerate(1);
        }
        assert_eq!(advance.advance(), 2048);
        assert_eq!(steps.pending(1), 8);

        for _ in 0..10 {
            advance.decelerate(2);
        }
        assert_eq!(advance.advance(), 256);
        assert_eq!(steps.pending(1), 1);
    }

    #[test]
    fn test_extruder_steps_accumulate() {
        let steps = AdvanceSteps::new();
        let mut advance = LinearAdvance::new(&steps);
        advance.start_block(&MotionBlock::new([0, 0, 0, 5], 1000));
        advance.extruder_step(1);
        advance.extruder_step(1);
        advance.extruder_step(-1);
        assert_eq!(steps.pending(0), 1);
    }

    #[test]
    fn test_extreme_rate_saturates() {
        let steps = AdvanceSteps::new();
        let mut advance = LinearAdvance::new(&steps);
        let block = MotionBlock::new([0, 0, 0, 5], 1000).with_advance(AdvanceParams {
            initial: 0,
            max: i32::MAX,
            final_advance: i32::MIN,
            rate: i32::MAX,
        });
        advance.start_block(&block);

        advance.accelerate(4);
        assert_eq!(advance.advance(), i32::MAX);
        advance.decelerate(4);
        assert_eq!(advance.advance(), 0);
        advance.decelerate(4);
        advance.decelerate(4);
        assert_eq!(advance.advance(), i32::MIN);
    }

    #[test]
    fn test_task_from_config() {
        let steps = AdvanceSteps::new();
        for extruder in 0..3 {
            steps.add(extruder, 3);
        }
        let mut config = SystemConfig::default();
        config.stepper.extruders = 2;
        config.advance = Some(AdvanceConfig { pulses_per_tick: 1 });

        let mut task = AdvanceTask::from_config(&steps, RecordingSink::default(), &config).unwrap();
        assert_eq!(task.tick(), 2);
        assert_eq!(steps.pending(0), 2);
        assert_eq!(steps.pending(1), 2);
        assert_eq!(steps.pending(2), 3);

        config.advance = None;
        assert!(matches!(
            AdvanceTask::from_config(&steps, RecordingSink::default(), &config),
            Err(Error::Config(ConfigError::MissingComponent("advance")))
        ));
    }

    #[test]
    fn test_task_drains_toward_zero() {
        let steps = AdvanceSteps::new();
        steps.add(0, 6);
        steps.add(2, -3);

        let mut task = AdvanceTask::new(&steps, RecordingSink::default(), 3, 4);
        assert_eq!(task.tick(), 7);
        assert_eq!(steps.pending(0), 2);
        assert_eq!(steps.pending(2), 0);

        assert_eq!(task.tick(), 2);
        assert_eq!(steps.pending(0), 0);
        assert_eq!(task.tick(), 0);

        let sink = task.sink();
        assert_eq!(sink.pulses(Motor::Extruder(0)), 6);
        assert_eq!(sink.pulses(Motor::Extruder(2)), 3);
        assert_eq!(sink.direction(Motor::Extruder(2)), Some(true));
        assert_eq!(task.errors(), 0);
    }
}
