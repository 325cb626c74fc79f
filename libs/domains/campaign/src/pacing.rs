//! Randomized pause between sends.

use crate::error::{CampaignError, CampaignResult};
use rand::Rng;
use std::time::Duration;

/// Uniform delay range applied after each successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendPacing {
    min: Duration,
    max: Duration,
}

impl SendPacing {
    pub fn new(min: Duration, max: Duration) -> CampaignResult<Self> {
        if min > max {
            return Err(CampaignError::Config(format!(
                "send delay minimum ({}s) exceeds maximum ({}s)",
                min.as_secs_f64(),
                max.as_secs_f64()
            )));
        }
        Ok(Self { min, max })
    }

    /// No pause at all.
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

impl Default for SendPacing {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(5),
            max: Duration::from_secs(15),
        }
    }
}
