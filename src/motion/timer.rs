//! Step rate to timer interval conversion.
//!
//! Division is too slow for the step interrupt, so intervals come from two
//! piecewise-linear lookup tables generated at compile time: a coarse one stepping
//! 256 steps/s per entry for rates of 2048 steps/s and up, and a fine one stepping
//! 8 steps/s per entry below that.

/// Step timer tick frequency in Hz.
pub const STEP_TIMER_FREQ: u32 = 2_000_000;

/// Timer ticks between interrupts.
pub type TimerTicks = u16;

/// Lowest representable step rate; slower rates are raised to it.
pub const MIN_STEP_RATE: u32 = 32;

/// Shortest interval the interrupt can sustain. Shorter intervals are clamped.
pub const MIN_TIMER_INTERVAL: TimerTicks = 100;

/// Interval while no block is loaded (1 kHz).
pub const IDLE_INTERVAL: TimerTicks = 2000;

/// Interval while a quick stop flushes the queue.
pub const FLUSH_INTERVAL: TimerTicks = 200;

/// Interrupts spent discarding blocks after a quick stop.
pub const QUICK_STOP_FLUSH_TICKS: u16 = 5000;

/// Default step rate ceiling in steps/s.
pub const DEFAULT_MAX_STEP_FREQUENCY: u32 = 40_000;

/// Highest step rate ceiling the tables cover with quadruple stepping.
pub const MAX_SUPPORTED_STEP_FREQUENCY: u32 = 160_000;

/// Rates at or above this use the coarse table.
const FAST_TABLE_THRESHOLD: u32 = 2048;

const DOUBLE_STEP_RATE: u32 = 10_000;
const QUAD_STEP_RATE: u32 = 20_000;

const TABLE_LEN: usize = 256;

/// `[interval, interval - next interval]` per entry.
type SpeedTable = [[u16; 2]; TABLE_LEN];

const fn interval_for(rate: u32) -> u16 {
    let ticks = STEP_TIMER_FREQ / rate;
    if ticks > u16::MAX as u32 {
        u16::MAX
    } else {
        ticks as u16
    }
}

const fn build_table(stride: u32) -> SpeedTable {
    let mut table = [[0u16; 2]; TABLE_LEN];
    let mut i = 0;
    while i < TABLE_LEN {
        table[i][0] = interval_for(i as u32 * stride + MIN_STEP_RATE);
        i += 1;
    }
    i = 0;
    while i < TABLE_LEN - 1 {
        table[i][1] = table[i][0] - table[i + 1][0];
        i += 1;
    }
    table[TABLE_LEN - 1][1] = table[TABLE_LEN - 2][1];
    table
}

static SPEED_TABLE_FAST: SpeedTable = build_table(256);
static SPEED_TABLE_SLOW: SpeedTable = build_table(8);

/// Result of a rate conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepInterval {
    /// Ticks until the next interrupt.
    pub ticks: TimerTicks,
    /// Step events to emit per interrupt (1, 2 or 4).
    pub loops: u8,
    /// The computed interval was below [`MIN_TIMER_INTERVAL`] and got clamped.
    pub clamped: bool,
}

/// Rate to interval converter for a fixed step rate ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTimer {
    max_step_frequency: u32,
}

impl Default for StepTimer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEP_FREQUENCY)
    }
}

impl StepTimer {
    /// Create a converter clamping rates to `max_step_frequency`.
    pub const fn new(max_step_frequency: u32) -> Self {
        let max = if max_step_frequency > MAX_SUPPORTED_STEP_FREQUENCY {
            MAX_SUPPORTED_STEP_FREQUENCY
        } else {
            max_step_frequency
        };
        Self {
            max_step_frequency: max,
        }
    }

    /// Step rate ceiling.
    #[inline]
    pub const fn max_step_frequency(&self) -> u32 {
        self.max_step_frequency
    }

    /// Interval and steps per interrupt realizing `step_rate` steps/s.
    pub fn calc(&self, step_rate: u32) -> StepInterval {
        let mut rate = step_rate.min(self.max_step_frequency);

        let loops = if rate > QUAD_STEP_RATE {
            rate >>= 2;
            4
        } else if rate > DOUBLE_STEP_RATE {
            rate >>= 1;
            2
        } else {
            1
        };

        let rate = rate.max(MIN_STEP_RATE) - MIN_STEP_RATE;

        let ticks = if rate >= FAST_TABLE_THRESHOLD {
            let [base, gain] = SPEED_TABLE_FAST[(rate >> 8) as usize];
            base - ((u32::from(gain) * (rate & 0xff)) >> 8) as u16
        } else {
            let [base, gain] = SPEED_TABLE_SLOW[(rate >> 3) as usize];
            base - ((u32::from(gain) * (rate & 0x07)) >> 3) as u16
        };

        if ticks < MIN_TIMER_INTERVAL {
            StepInterval {
                ticks: MIN_TIMER_INTERVAL,
                loops,
                clamped: true,
            }
        } else {
            StepInterval {
                ticks,
                loops,
                clamped: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_heads() {
        assert_eq!(SPEED_TABLE_FAST[0], [62500, 55556]);
        assert_eq!(SPEED_TABLE_SLOW[0], [62500, 12500]);
        assert_eq!(SPEED_TABLE_FAST[255][1], SPEED_TABLE_FAST[254][1]);
    }

    #[test]
    fn test_step_loop_thresholds() {
        let timer = StepTimer::default();
        assert_eq!(timer.calc(10_000).loops, 1);
        assert_eq!(timer.calc(10_001).loops, 2);
        assert_eq!(timer.calc(20_000).loops, 2);
        assert_eq!(timer.calc(20_001).loops, 4);
    }

    #[test]
    fn test_interval_close_to_division() {
        let timer = StepTimer::default();
        for rate in [100u32, 500, 1000, 2500, 5000, 9000] {
            let exact = STEP_TIMER_FREQ / rate;
            let ticks = u32::from(timer.calc(rate).ticks);
            let error = exact.abs_diff(ticks);
            assert!(error * 50 <= exact, "rate {}: {} vs {}", rate, ticks, exact);
        }
    }

    #[test]
    fn test_rate_ceiling() {
        let timer = StepTimer::new(40_000);
        assert_eq!(timer.calc(1_000_000), timer.calc(40_000));
        assert_eq!(timer.calc(40_000).ticks, timer.calc(40_000 + 1).ticks);
    }

    #[test]
    fn test_slow_rates_floor() {
        let timer = StepTimer::default();
        assert_eq!(timer.calc(0).ticks, 62500);
        assert_eq!(timer.calc(MIN_STEP_RATE).ticks, 62500);
    }

    #[test]
    fn test_clamp_below_min_interval() {
        let timer = StepTimer::new(MAX_SUPPORTED_STEP_FREQUENCY);
        let interval = timer.calc(MAX_SUPPORTED_STEP_FREQUENCY);
        assert!(interval.clamped);
        assert_eq!(interval.ticks, MIN_TIMER_INTERVAL);
        assert!(!StepTimer::default().calc(40_000).clamped);
    }

    #[test]
    fn test_monotonic_within_loop_band() {
        let timer = StepTimer::default();
        let mut last = u16::MAX;
        for rate in 32..=10_000 {
            let ticks = timer.calc(rate).ticks;
            assert!(ticks <= last, "interval rose at rate {}", rate);
            last = ticks;
        }
    }
}
