//! The step timer interrupt.
//!
//! [`Stepper::on_timer`] is called from the step timer interrupt and returns the
//! number of ticks until it wants to run again. Foreground code reaches the same
//! instance through [`Shared`](super::Shared), which masks the interrupt for the
//! duration of the access.

use crate::config::units::{Millimeters, Steps};
use crate::error::{OutputError, Result, StepperError};
use crate::motion::timer::{
    StepTimer, TimerTicks, FLUSH_INTERVAL, IDLE_INTERVAL, QUICK_STOP_FLUSH_TICKS,
};
use crate::motion::{
    Axis, AxisCounters, BlockSource, DirectionBits, LinearAdvance, MotionBlock, MotionPhase,
    TrapezoidProfile, NUM_AXIS,
};

use super::builder::StepperBuilder;
use super::endstop::{EndstopCheck, EndstopMonitor, EndstopReport, EndstopSource};
use super::output::{Motor, StepSink};
use super::position::AxisPositions;

/// Counters for conditions the interrupt absorbs instead of reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepperStats {
    /// Intervals clamped to the minimum the interrupt can sustain.
    pub rate_clamps: u32,
    /// Step or direction writes that failed.
    pub sink_errors: u32,
    /// Blocks executed to completion or truncated by an endstop.
    pub blocks_completed: u32,
}

/// Motors driven by one axis.
fn axis_motors(axis: Axis, extruder: u8, dual_z: bool) -> impl Iterator<Item = Motor> {
    let (first, second) = match axis {
        Axis::X => (Motor::X, None),
        Axis::Y => (Motor::Y, None),
        Axis::Z => (Motor::Z, dual_z.then_some(Motor::Z2)),
        Axis::E => (Motor::Extruder(extruder), None),
    };
    core::iter::once(first).chain(second)
}

/// The block being executed.
#[derive(Debug, Clone, Copy)]
struct Execution {
    block: MotionBlock,
    counters: AxisCounters,
    profile: TrapezoidProfile,
    step_events_completed: u32,
}

/// Interrupt-driven block executor.
pub struct Stepper<'a, Q, S, E>
where
    Q: BlockSource,
    S: StepSink,
    E: EndstopSource,
{
    queue: Q,
    sink: S,
    endstops: EndstopMonitor<E>,
    timer: StepTimer,
    advance: Option<LinearAdvance<'a>>,
    dual_z: bool,
    current: Option<Execution>,
    position: AxisPositions,
    applied_directions: Option<(DirectionBits, u8)>,
    cleaning_buffer_counter: u16,
    stats: StepperStats,
}

impl<'a, Q, S, E> Stepper<'a, Q, S, E>
where
    Q: BlockSource,
    S: StepSink,
    E: EndstopSource,
{
    /// Start building a stepper.
    pub fn builder() -> StepperBuilder<'a, Q, S, E> {
        StepperBuilder::new()
    }

    pub(crate) fn new(
        queue: Q,
        sink: S,
        endstops: EndstopMonitor<E>,
        timer: StepTimer,
        advance: Option<LinearAdvance<'a>>,
        dual_z: bool,
        position: AxisPositions,
    ) -> Self {
        Self {
            queue,
            sink,
            endstops,
            timer,
            advance,
            dual_z,
            current: None,
            position,
            applied_directions: None,
            cleaning_buffer_counter: 0,
            stats: StepperStats::default(),
        }
    }

    /// Step timer interrupt body. Returns ticks until the next invocation.
    pub fn on_timer(&mut self) -> TimerTicks {
        if self.cleaning_buffer_counter > 0 {
            self.cleaning_buffer_counter -= 1;
            self.current = None;
            if self.queue.depth() > 0 {
                self.queue.release();
            }
            return FLUSH_INTERVAL;
        }

        let mut exec = match self.current.take() {
            Some(exec) => exec,
            None => match self.load_block() {
                Some(exec) => exec,
                None => return IDLE_INTERVAL,
            },
        };
        let block = exec.block;

        let mut check = EndstopCheck::default();
        if self.endstops.is_enabled() {
            check = self.endstops.update(&block, self.position.as_array());
            if check.truncate {
                exec.step_events_completed = block.step_event_count;
            }
        }

        for _ in 0..exec.profile.step_loops() {
            if exec.step_events_completed >= block.step_event_count {
                break;
            }
            for axis in Axis::ALL {
                if exec.counters.tick(axis, &block) {
                    self.step(axis, &block, &check);
                }
            }
            exec.step_events_completed += 1;
        }

        let interval = exec
            .profile
            .update(&block, exec.step_events_completed, &self.timer);
        if interval.clamped {
            self.record_clamp(interval.ticks);
        }

        if let Some(advance) = self.advance.as_mut() {
            match exec.profile.phase() {
                MotionPhase::Accelerating => advance.accelerate(interval.loops),
                MotionPhase::Decelerating => advance.decelerate(interval.loops),
                MotionPhase::Cruising => {}
            }
        }

        if exec.step_events_completed >= block.step_event_count {
            self.queue.release();
            self.stats.blocks_completed = self.stats.blocks_completed.saturating_add(1);
            log::debug!("block done after {} events", exec.step_events_completed);
        } else {
            self.current = Some(exec);
        }

        interval.ticks
    }

    fn load_block(&mut self) -> Option<Execution> {
        let mut block = self.queue.fetch()?;
        block.busy = true;

        self.apply_directions(block.direction_bits, block.active_extruder);
        if let Some(advance) = self.advance.as_mut() {
            advance.start_block(&block);
        }

        log::debug!(
            "block start: {} events, rates {}/{}/{}",
            block.step_event_count,
            block.initial_rate,
            block.nominal_rate,
            block.final_rate
        );

        let profile = TrapezoidProfile::start(&block, &self.timer);
        // cruise reuses the cached interval; count its clamp once per block
        if profile.nominal().clamped {
            self.record_clamp(profile.nominal().ticks);
        }

        Some(Execution {
            block,
            counters: AxisCounters::seed(&block),
            profile,
            step_events_completed: 0,
        })
    }

    fn apply_directions(&mut self, bits: DirectionBits, extruder: u8) {
        if self.applied_directions == Some((bits, extruder)) {
            return;
        }
        let mut failed = false;
        for axis in Axis::ALL {
            // the advance task owns extruder direction
            if axis == Axis::E && self.advance.is_some() {
                continue;
            }
            for motor in axis_motors(axis, extruder, self.dual_z) {
                if let Err(e) = self.sink.set_direction(motor, bits.is_negative(axis)) {
                    self.record_error(e);
                    failed = true;
                }
            }
        }
        // retry on the next block unless every pin took the new level
        self.applied_directions = if failed { None } else { Some((bits, extruder)) };
    }

    fn step(&mut self, axis: Axis, block: &MotionBlock, check: &EndstopCheck) {
        let direction = block.direction_bits.sign(axis);
        self.position.step(axis, direction);

        match axis {
            Axis::X => self.emit(Motor::X),
            Axis::Y => self.emit(Motor::Y),
            Axis::Z => {
                if !check.hold_z {
                    self.emit(Motor::Z);
                }
                if self.dual_z && !check.hold_z2 {
                    self.emit(Motor::Z2);
                }
            }
            Axis::E => match self.advance.as_ref() {
                Some(advance) => advance.extruder_step(direction),
                None => self.emit(Motor::Extruder(block.active_extruder)),
            },
        }
    }

    #[inline]
    fn emit(&mut self, motor: Motor) {
        if let Err(e) = self.sink.pulse(motor) {
            self.record_error(e);
        }
    }

    fn record_clamp(&mut self, ticks: TimerTicks) {
        self.stats.rate_clamps = self.stats.rate_clamps.saturating_add(1);
        log::warn!("step interval clamped to {} ticks", ticks);
    }

    fn record_error(&mut self, error: OutputError) {
        self.stats.sink_errors = self.stats.sink_errors.saturating_add(1);
        log::warn!("step output failed: {}", error);
    }

    /// Abort all motion: drop the current and queued blocks, then discard anything
    /// the planner pushes for the next [`QUICK_STOP_FLUSH_TICKS`] interrupts.
    ///
    /// Steps already emitted stand; the position keeps counting them.
    pub fn quick_stop(&mut self) {
        self.cleaning_buffer_counter = QUICK_STOP_FLUSH_TICKS;
        self.queue.clear();
        self.current = None;
        log::info!("quick stop at {:?}", self.position.as_array());
    }

    /// A quick stop flush is in progress.
    pub fn is_flushing(&self) -> bool {
        self.cleaning_buffer_counter > 0
    }

    /// A block is executing or waiting.
    pub fn is_busy(&self) -> bool {
        self.current.is_some() || self.queue.depth() > 0
    }

    /// Block being executed.
    pub fn current_block(&self) -> Option<&MotionBlock> {
        self.current.as_ref().map(|exec| &exec.block)
    }

    /// Step events done in the current block.
    pub fn step_events_completed(&self) -> Option<u32> {
        self.current.as_ref().map(|exec| exec.step_events_completed)
    }

    /// Position of one axis in steps.
    pub fn position(&self, axis: Axis) -> Steps {
        self.position.steps(axis)
    }

    /// Position of one axis in units.
    pub fn position_units(&self, axis: Axis) -> Millimeters {
        self.position.units(axis)
    }

    /// All positions.
    pub fn positions(&self) -> &AxisPositions {
        &self.position
    }

    /// Redefine the position of every axis.
    pub fn set_position(&mut self, steps: [i32; NUM_AXIS]) {
        self.position.set_all(steps);
    }

    /// Redefine the extruder position.
    pub fn set_e_position(&mut self, steps: i32) {
        self.position.set(Axis::E, Steps(steps));
    }

    /// Return and clear the latched endstop report.
    pub fn check_hit(&mut self) -> Option<EndstopReport> {
        let report = self.endstops.take_report();
        if let Some(ref r) = report {
            log::info!("endstops hit: {:#06b} at {:?}", r.hits.bits(), r.trigsteps);
        }
        report
    }

    /// Forget an endstop hit that was expected (homing).
    pub fn endstops_hit_on_purpose(&mut self) {
        self.endstops.clear_hits();
    }

    /// Turn endstop checking on or off.
    pub fn enable_endstops(&mut self, enabled: bool) {
        self.endstops.enable(enabled);
    }

    /// Turn the Z probe on or off.
    pub fn enable_z_probe(&mut self, enabled: bool) {
        self.endstops.enable_probe(enabled);
    }

    /// Switch dual-Z endstop handling into homing mode.
    pub fn set_homing(&mut self, homing: bool) {
        self.endstops.set_homing(homing);
    }

    /// Hold the first Z motor while homing.
    pub fn lock_z_motor(&mut self, locked: bool) {
        self.endstops.lock_z(locked);
    }

    /// Hold the second Z motor while homing.
    pub fn lock_z2_motor(&mut self, locked: bool) {
        self.endstops.lock_z2(locked);
    }

    /// Emit one out-of-band step on X, Y, or Z without touching the tracked position.
    ///
    /// The direction output is restored afterwards. Extruder requests are ignored.
    ///
    /// # Errors
    ///
    /// Returns the output error of the first failing write.
    pub fn babystep(&mut self, axis: Axis, forward: bool) -> Result<()> {
        if axis == Axis::E {
            return Ok(());
        }
        let latched = self
            .applied_directions
            .map(|(bits, _)| bits.is_negative(axis))
            .unwrap_or(false);

        for motor in axis_motors(axis, 0, self.dual_z) {
            self.sink.set_direction(motor, !forward)?;
            self.sink.pulse(motor)?;
            self.sink.set_direction(motor, latched)?;
        }
        Ok(())
    }

    /// Run `f` on the step output while no motion is pending.
    ///
    /// # Errors
    ///
    /// Returns `StepperError::Busy` when a block is executing or queued.
    pub fn with_idle_output<R>(&mut self, f: impl FnOnce(&mut S) -> R) -> Result<R> {
        if self.is_busy() {
            return Err(StepperError::Busy.into());
        }
        Ok(f(&mut self.sink))
    }

    /// Output counters.
    pub fn stats(&self) -> StepperStats {
        self.stats
    }

    /// The step output.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The block source.
    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// The block source, for feeding when the stepper owns it.
    pub fn queue_mut(&mut self) -> &mut Q {
        &mut self.queue
    }
}
