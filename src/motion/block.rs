//! Motion blocks as handed over by the planner.

use crate::error::BlockError;

use super::timer::STEP_TIMER_FREQ;

/// Number of logical axes.
pub const NUM_AXIS: usize = 4;

/// Maximum number of extruders a block can address.
pub const EXTRUDERS: usize = 4;

/// Logical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// X axis.
    X = 0,
    /// Y axis.
    Y = 1,
    /// Z axis.
    Z = 2,
    /// Extruder axis.
    E = 3,
}

impl Axis {
    /// All axes in stepping order.
    pub const ALL: [Axis; NUM_AXIS] = [Axis::X, Axis::Y, Axis::Z, Axis::E];

    /// Array index of this axis.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Axis for an array index.
    #[inline]
    pub const fn from_index(index: usize) -> Option<Axis> {
        match index {
            0 => Some(Axis::X),
            1 => Some(Axis::Y),
            2 => Some(Axis::Z),
            3 => Some(Axis::E),
            _ => None,
        }
    }
}

/// Per-axis direction flags. A set bit means the axis moves toward negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DirectionBits(u8);

impl DirectionBits {
    /// All axes positive.
    pub const POSITIVE: Self = Self(0);

    /// Build from raw bits (bit n = axis with index n).
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0f)
    }

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Return a copy with the direction of `axis` replaced.
    #[inline]
    pub const fn with(self, axis: Axis, negative: bool) -> Self {
        let mask = 1 << axis.index();
        if negative {
            Self(self.0 | mask)
        } else {
            Self(self.0 & !mask)
        }
    }

    /// Axis moves toward negative.
    #[inline]
    pub const fn is_negative(self, axis: Axis) -> bool {
        self.0 & (1 << axis.index()) != 0
    }

    /// Position increment per emitted step: -1 or +1.
    #[inline]
    pub const fn sign(self, axis: Axis) -> i32 {
        if self.is_negative(axis) {
            -1
        } else {
            1
        }
    }
}

/// Linear advance parameters carried by a block, in 1/256 extruder steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdvanceParams {
    /// Advance at block entry.
    pub initial: i32,
    /// Peak advance, reached at the end of acceleration.
    pub max: i32,
    /// Advance at block exit.
    pub final_advance: i32,
    /// Advance change per step event during acceleration and deceleration.
    pub rate: i32,
}

/// One planner-issued motion segment.
///
/// The scheduler works on a copy; the queue slot stays occupied until the block is
/// released, so the planner never overwrites a block being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionBlock {
    /// Step count per axis, indexed by [`Axis::index`].
    pub steps: [u32; NUM_AXIS],
    /// Direction of each axis.
    pub direction_bits: DirectionBits,
    /// Largest per-axis step count; the Bresenham master count.
    pub step_event_count: u32,
    /// Entry rate in steps/s.
    pub initial_rate: u32,
    /// Cruise rate in steps/s.
    pub nominal_rate: u32,
    /// Exit rate in steps/s.
    pub final_rate: u32,
    /// Acceleration lasts while `step_events_completed <= accelerate_until`.
    pub accelerate_until: u32,
    /// Deceleration starts once `step_events_completed > decelerate_after`.
    pub decelerate_after: u32,
    /// Acceleration in fixed point: steps/s² × 2^24 / step timer frequency.
    pub acceleration_rate: u32,
    /// Extruder that receives the E steps.
    pub active_extruder: u8,
    /// Linear advance parameters.
    pub advance: AdvanceParams,
    /// Set by the scheduler once execution has started.
    pub busy: bool,
}

impl MotionBlock {
    /// Block moving each axis by a signed step count, cruising at `rate` throughout.
    ///
    /// Refine the profile with [`with_rates`](Self::with_rates) and
    /// [`with_phases`](Self::with_phases).
    pub fn new(steps: [i32; NUM_AXIS], rate: u32) -> Self {
        let mut direction_bits = DirectionBits::POSITIVE;
        let mut magnitudes = [0u32; NUM_AXIS];
        for axis in Axis::ALL {
            let s = steps[axis.index()];
            magnitudes[axis.index()] = s.unsigned_abs();
            direction_bits = direction_bits.with(axis, s < 0);
        }
        let step_event_count = magnitudes.iter().copied().max().unwrap_or(0);

        Self {
            steps: magnitudes,
            direction_bits,
            step_event_count,
            initial_rate: rate,
            nominal_rate: rate,
            final_rate: rate,
            accelerate_until: 0,
            decelerate_after: step_event_count,
            acceleration_rate: 0,
            active_extruder: 0,
            advance: AdvanceParams::default(),
            busy: false,
        }
    }

    /// Set entry, cruise, and exit rates.
    pub fn with_rates(mut self, initial: u32, nominal: u32, final_rate: u32) -> Self {
        self.initial_rate = initial;
        self.nominal_rate = nominal;
        self.final_rate = final_rate;
        self
    }

    /// Set phase thresholds and the acceleration in steps/s².
    pub fn with_phases(
        mut self,
        accelerate_until: u32,
        decelerate_after: u32,
        acceleration_steps_per_s2: u32,
    ) -> Self {
        self.accelerate_until = accelerate_until;
        self.decelerate_after = decelerate_after;
        self.acceleration_rate = Self::acceleration_rate_for(acceleration_steps_per_s2);
        self
    }

    /// Select the extruder receiving E steps.
    pub fn with_extruder(mut self, extruder: u8) -> Self {
        self.active_extruder = extruder;
        self
    }

    /// Attach linear advance parameters.
    pub fn with_advance(mut self, advance: AdvanceParams) -> Self {
        self.advance = advance;
        self
    }

    /// Fixed-point acceleration rate for a physical acceleration.
    ///
    /// `(acceleration_time × acceleration_rate) >> 24` then yields the velocity gained
    /// after `acceleration_time` step-timer ticks.
    #[inline]
    pub fn acceleration_rate_for(steps_per_s2: u32) -> u32 {
        ((u64::from(steps_per_s2) << 24) / u64::from(STEP_TIMER_FREQ)) as u32
    }

    /// Steps for one axis.
    #[inline]
    pub fn steps(&self, axis: Axis) -> u32 {
        self.steps[axis.index()]
    }

    /// Check the structural invariants the scheduler relies on.
    pub fn validate(&self) -> Result<(), BlockError> {
        if self.step_event_count == 0 {
            return Err(BlockError::Empty);
        }

        if self.step_event_count > i32::MAX as u32 {
            return Err(BlockError::TooManySteps(self.step_event_count));
        }

        let max_steps = self.steps.iter().copied().max().unwrap_or(0);
        if self.step_event_count != max_steps {
            return Err(BlockError::EventCountMismatch {
                step_event_count: self.step_event_count,
                max_steps,
            });
        }

        if self.accelerate_until > self.decelerate_after
            || self.decelerate_after > self.step_event_count
        {
            return Err(BlockError::PhaseOrder {
                accelerate_until: self.accelerate_until,
                decelerate_after: self.decelerate_after,
                step_event_count: self.step_event_count,
            });
        }

        if self.initial_rate > self.nominal_rate || self.final_rate > self.nominal_rate {
            return Err(BlockError::RateOrder {
                initial_rate: self.initial_rate,
                nominal_rate: self.nominal_rate,
                final_rate: self.final_rate,
            });
        }

        if usize::from(self.active_extruder) >= EXTRUDERS {
            return Err(BlockError::InvalidExtruder(self.active_extruder));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_directions_and_event_count() {
        let block = MotionBlock::new([100, -50, 0, -3], 1000);
        assert_eq!(block.steps, [100, 50, 0, 3]);
        assert_eq!(block.step_event_count, 100);
        assert!(!block.direction_bits.is_negative(Axis::X));
        assert!(block.direction_bits.is_negative(Axis::Y));
        assert!(block.direction_bits.is_negative(Axis::E));
        assert_eq!(block.direction_bits.sign(Axis::Y), -1);
        assert!(block.validate().is_ok());
    }

    #[test]
    fn test_acceleration_rate_fixed_point() {
        // 1000 steps/s² over a 2 MHz timer: 1000 * 2^24 / 2e6 = 8388.608
        assert_eq!(MotionBlock::acceleration_rate_for(1000), 8388);
        // one second worth of ticks recovers the acceleration
        let rate = MotionBlock::acceleration_rate_for(4000);
        let gained = (u64::from(STEP_TIMER_FREQ) * u64::from(rate)) >> 24;
        assert!((3999..=4000).contains(&gained));
    }

    #[test]
    fn test_validate_rejects_bad_blocks() {
        let empty = MotionBlock::new([0, 0, 0, 0], 1000);
        assert_eq!(empty.validate(), Err(BlockError::Empty));

        let mut mismatched = MotionBlock::new([10, 0, 0, 0], 1000);
        mismatched.step_event_count = 12;
        assert!(matches!(
            mismatched.validate(),
            Err(BlockError::EventCountMismatch { .. })
        ));

        let phases = MotionBlock::new([10, 0, 0, 0], 1000).with_phases(8, 4, 1000);
        assert!(matches!(phases.validate(), Err(BlockError::PhaseOrder { .. })));

        let rates = MotionBlock::new([10, 0, 0, 0], 1000).with_rates(2000, 1000, 100);
        assert!(matches!(rates.validate(), Err(BlockError::RateOrder { .. })));

        let extruder = MotionBlock::new([0, 0, 0, 10], 1000).with_extruder(4);
        assert_eq!(extruder.validate(), Err(BlockError::InvalidExtruder(4)));
    }

    #[test]
    fn test_validate_rejects_counts_beyond_accumulator_range() {
        let huge = MotionBlock::new([i32::MIN, 1, 0, 0], 1000);
        assert_eq!(huge.step_event_count, 1 << 31);
        assert_eq!(huge.validate(), Err(BlockError::TooManySteps(1 << 31)));

        let largest = MotionBlock::new([i32::MAX, 0, 0, 0], 1000);
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn test_direction_bits_with() {
        let bits = DirectionBits::POSITIVE.with(Axis::Z, true);
        assert_eq!(bits.bits(), 0b0100);
        assert_eq!(bits.with(Axis::Z, false), DirectionBits::POSITIVE);
        assert_eq!(DirectionBits::from_bits(0xff).bits(), 0x0f);
    }
}
