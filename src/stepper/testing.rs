//! Test doubles for scheduler outputs.

use crate::error::OutputError;

use super::output::{Motor, StepSink, MOTOR_SLOTS};

/// Counts pulses and remembers the last direction per motor.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pulses: [u32; MOTOR_SLOTS],
    directions: [Option<bool>; MOTOR_SLOTS],
    direction_writes: u32,
    net: [i32; MOTOR_SLOTS],
    fail: bool,
}

impl RecordingSink {
    pub fn pulses(&self, motor: Motor) -> u32 {
        self.pulses[motor.index()]
    }

    /// Last `reverse` flag written.
    pub fn direction(&self, motor: Motor) -> Option<bool> {
        self.directions[motor.index()]
    }

    pub fn direction_writes(&self) -> u32 {
        self.direction_writes
    }

    /// Pulses signed by the direction latched at the time.
    pub fn net(&self, motor: Motor) -> i32 {
        self.net[motor.index()]
    }

    pub fn set_failing(&mut self, fail: bool) {
        self.fail = fail;
    }
}

impl StepSink for RecordingSink {
    fn set_direction(&mut self, motor: Motor, reverse: bool) -> Result<(), OutputError> {
        if self.fail {
            return Err(OutputError::Pin);
        }
        self.directions[motor.index()] = Some(reverse);
        self.direction_writes += 1;
        Ok(())
    }

    fn pulse(&mut self, motor: Motor) -> Result<(), OutputError> {
        if self.fail {
            return Err(OutputError::Pin);
        }
        let i = motor.index();
        self.pulses[i] += 1;
        self.net[i] += if self.directions[i] == Some(true) { -1 } else { 1 };
        Ok(())
    }
}
