//! Trapezoidal step rate generation.
//!
//! Each block is executed as an accelerate / cruise / decelerate sequence over its
//! step events. Velocity is integrated in fixed point against elapsed timer ticks,
//! so the hot path is multiply-and-shift only.

use super::block::MotionBlock;
use super::timer::{StepInterval, StepTimer};

/// Current phase of block execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionPhase {
    /// Ramping up from the entry rate.
    Accelerating,
    /// Holding the nominal rate.
    Cruising,
    /// Ramping down toward the exit rate.
    Decelerating,
}

/// Per-block velocity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapezoidProfile {
    /// Rate reached by the acceleration phase; the deceleration ramp starts here.
    acc_step_rate: u32,
    /// Ticks elapsed in the acceleration phase.
    acceleration_time: u32,
    /// Ticks elapsed in the deceleration phase.
    deceleration_time: u32,
    /// Cruise interval, computed once per block.
    nominal: StepInterval,
    /// Interval and step loops currently in effect.
    current: StepInterval,
    phase: MotionPhase,
}

/// `(a × b) >> 24`, the fixed-point velocity product.
#[inline]
fn mul_shr24(a: u32, b: u32) -> u32 {
    ((u64::from(a) * u64::from(b)) >> 24) as u32
}

impl TrapezoidProfile {
    /// Reset for a freshly loaded block.
    pub fn start(block: &MotionBlock, timer: &StepTimer) -> Self {
        let nominal = timer.calc(block.nominal_rate);
        let initial = timer.calc(block.initial_rate);
        Self {
            acc_step_rate: block.initial_rate,
            acceleration_time: u32::from(initial.ticks),
            deceleration_time: 0,
            nominal,
            current: initial,
            phase: MotionPhase::Accelerating,
        }
    }

    /// Step events to emit per interrupt.
    #[inline]
    pub fn step_loops(&self) -> u8 {
        self.current.loops
    }

    /// Interval currently in effect.
    #[inline]
    pub fn interval(&self) -> StepInterval {
        self.current
    }

    /// Phase selected by the last [`update`](Self::update).
    #[inline]
    pub fn phase(&self) -> MotionPhase {
        self.phase
    }

    /// Rate reached during acceleration.
    #[inline]
    pub fn acc_step_rate(&self) -> u32 {
        self.acc_step_rate
    }

    /// Cruise interval.
    #[inline]
    pub fn nominal(&self) -> StepInterval {
        self.nominal
    }

    /// Select the phase for `step_events_completed` and compute the next interval.
    ///
    /// `clamped` is only set on intervals computed by this call. The cached cruise
    /// interval comes back unflagged; its clamp is visible once through
    /// [`nominal`](Self::nominal).
    pub fn update(
        &mut self,
        block: &MotionBlock,
        step_events_completed: u32,
        timer: &StepTimer,
    ) -> StepInterval {
        if step_events_completed <= block.accelerate_until {
            let rate = mul_shr24(self.acceleration_time, block.acceleration_rate)
                .saturating_add(block.initial_rate);
            self.acc_step_rate = rate.min(block.nominal_rate);

            self.current = timer.calc(self.acc_step_rate);
            self.acceleration_time = self
                .acceleration_time
                .saturating_add(u32::from(self.current.ticks));
            self.phase = MotionPhase::Accelerating;
        } else if step_events_completed > block.decelerate_after {
            let lost = mul_shr24(self.deceleration_time, block.acceleration_rate);
            let rate = if lost > self.acc_step_rate {
                block.final_rate
            } else {
                (self.acc_step_rate - lost).max(block.final_rate)
            };

            self.current = timer.calc(rate);
            self.deceleration_time = self
                .deceleration_time
                .saturating_add(u32::from(self.current.ticks));
            self.phase = MotionPhase::Decelerating;
        } else {
            self.current = self.nominal;
            self.phase = MotionPhase::Cruising;
            return StepInterval {
                clamped: false,
                ..self.nominal
            };
        }

        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::timer::STEP_TIMER_FREQ;

    fn trapezoid() -> MotionBlock {
        MotionBlock::new([4000, 0, 0, 0], 8000)
            .with_rates(500, 8000, 400)
            .with_phases(1000, 3000, 60_000)
    }

    fn rate_of(interval: StepInterval) -> u32 {
        STEP_TIMER_FREQ / u32::from(interval.ticks) * u32::from(interval.loops)
    }

    #[test]
    fn test_start_uses_initial_rate() {
        let block = trapezoid();
        let timer = StepTimer::default();
        let profile = TrapezoidProfile::start(&block, &timer);

        assert_eq!(profile.acc_step_rate(), 500);
        assert_eq!(profile.interval(), timer.calc(500));
        assert_eq!(profile.nominal(), timer.calc(8000));
    }

    #[test]
    fn test_phases_follow_thresholds() {
        let block = trapezoid();
        let timer = StepTimer::default();
        let mut profile = TrapezoidProfile::start(&block, &timer);

        profile.update(&block, 1, &timer);
        assert_eq!(profile.phase(), MotionPhase::Accelerating);
        profile.update(&block, 1000, &timer);
        assert_eq!(profile.phase(), MotionPhase::Accelerating);
        profile.update(&block, 1001, &timer);
        assert_eq!(profile.phase(), MotionPhase::Cruising);
        assert_eq!(profile.interval(), profile.nominal());
        profile.update(&block, 3001, &timer);
        assert_eq!(profile.phase(), MotionPhase::Decelerating);
    }

    #[test]
    fn test_rates_monotonic_and_bounded() {
        let block = trapezoid();
        let timer = StepTimer::default();
        let mut profile = TrapezoidProfile::start(&block, &timer);

        let mut last_accel = 0;
        for completed in 1..=block.accelerate_until {
            profile.update(&block, completed, &timer);
            assert!(profile.acc_step_rate() >= last_accel);
            assert!(profile.acc_step_rate() <= block.nominal_rate);
            last_accel = profile.acc_step_rate();
        }
        assert_eq!(last_accel, block.nominal_rate);

        let mut last_ticks = 0;
        for completed in block.decelerate_after + 1..=block.step_event_count {
            let interval = profile.update(&block, completed, &timer);
            assert!(interval.ticks >= last_ticks);
            assert!(interval.ticks <= timer.calc(block.final_rate).ticks);
            last_ticks = interval.ticks;
        }
        assert!(rate_of(profile.interval()) <= 420);
    }

    #[test]
    fn test_cruise_interval_not_flagged_as_clamped() {
        let block = MotionBlock::new([400, 0, 0, 0], 160_000);
        let timer = StepTimer::new(160_000);
        let mut profile = TrapezoidProfile::start(&block, &timer);
        assert!(profile.nominal().clamped);

        for completed in [4, 200, 396] {
            let interval = profile.update(&block, completed, &timer);
            assert_eq!(profile.phase(), MotionPhase::Cruising);
            assert!(!interval.clamped);
            assert_eq!(interval.ticks, profile.nominal().ticks);
            assert_eq!(interval.loops, 4);
        }
    }

    #[test]
    fn test_deceleration_floor_when_overshooting() {
        let block = MotionBlock::new([100, 0, 0, 0], 1000)
            .with_rates(1000, 1000, 200)
            .with_phases(0, 0, 1_000_000);
        let timer = StepTimer::default();
        let mut profile = TrapezoidProfile::start(&block, &timer);

        for completed in 1..=100 {
            profile.update(&block, completed, &timer);
        }
        assert_eq!(profile.interval(), timer.calc(200));
    }
}
