//! Bounded backoff for polling asynchronous assistant runs

use rand::Rng;
use std::time::Duration;

/// How long and how often to poll a run before giving up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
    /// Hard ceiling on the total wait, measured from run creation
    pub max_wait: Duration,
    /// Fraction of each delay (in percent) that is randomized
    pub jitter_percent: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            multiplier: 2,
            max_wait: Duration::from_secs(120),
            jitter_percent: 10,
        }
    }
}

impl PollPolicy {
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Delay before poll number `attempt` (0-based), without jitter
    ///
    /// Exponential from `initial_delay`, capped at `max_delay`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(attempt);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Delay before poll number `attempt`, with jitter applied
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter_percent == 0 {
            return base;
        }
        let spread = base * self.jitter_percent / 100;
        let offset = rand::thread_rng().gen_range(Duration::ZERO..=spread * 2);
        (base + offset).saturating_sub(spread)
    }
}
