use std::time::Duration;

use crate::api::{StateNumbering, POSITION_MAX};
use crate::{Error, Result};

/// Timing and wire options for the shutter controller. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    step: Duration,
    settle_delay: Duration,
    numbering: StateNumbering,
}

impl Config {
    /// `travel_time` is the time the motor needs for a full 0 to 100 run.
    pub fn new(
        travel_time: Duration,
        settle_delay: Duration,
        numbering: StateNumbering,
    ) -> Result<Self> {
        let step = travel_time / POSITION_MAX as u32;
        if step.is_zero() {
            return Err(Error::ConfigError(format!(
                "travel time {:?} is too short for {} steps",
                travel_time, POSITION_MAX
            )));
        }

        Ok(Config {
            step,
            settle_delay,
            numbering,
        })
    }

    /// Time per 1% position step.
    pub fn step_duration(&self) -> Duration {
        self.step
    }

    /// Pause after a stop before the target position is republished.
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn numbering(&self) -> StateNumbering {
        self.numbering
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            step: Duration::from_millis(200),
            settle_delay: Duration::from_millis(500),
            numbering: StateNumbering::Hap,
        }
    }
}
