//! Drift-correcting tick schedule
//!
//! Ticks are laid out on a fixed grid `origin + n * period`; the wait before
//! each tick is computed from the grid, never chained from the previous wake.

use std::time::{Duration, Instant};

use chrono::{TimeDelta, Utc};
use contracts::Timestamp;

/// Fixed-origin schedule of sampling ticks
#[derive(Debug, Clone)]
pub struct TickSchedule {
    period: Duration,
    period_wall: TimeDelta,
    scheduled: Instant,
    scheduled_wall: Timestamp,
}

impl TickSchedule {
    /// Start a schedule whose first tick is now
    pub fn start_now(period: Duration) -> Self {
        Self::starting_at(period, Instant::now(), Utc::now())
    }

    /// Start a schedule at an explicit origin
    pub fn starting_at(period: Duration, origin: Instant, origin_wall: Timestamp) -> Self {
        Self {
            period,
            period_wall: TimeDelta::from_std(period).unwrap_or(TimeDelta::zero()),
            scheduled: origin,
            scheduled_wall: origin_wall,
        }
    }

    /// Sampling period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Monotonic instant of the current tick
    pub fn scheduled_instant(&self) -> Instant {
        self.scheduled
    }

    /// Wall-clock time of the current tick
    pub fn timestamp(&self) -> Timestamp {
        self.scheduled_wall
    }

    /// Move to the next tick and return how long to wait for it
    ///
    /// # Errors
    /// Returns the overrun when `now` is already at or past the next tick,
    /// i.e. producing the current tick took a whole period or more.
    ///
    /// A next tick beyond the monotonic clock's range is never reached: the
    /// schedule stays put and the full period is returned as the wait.
    pub fn advance(&mut self, now: Instant) -> Result<Duration, Duration> {
        let Some(next) = self.scheduled.checked_add(self.period) else {
            return Ok(self.period);
        };
        self.scheduled = next;
        self.scheduled_wall = self
            .scheduled_wall
            .checked_add_signed(self.period_wall)
            .unwrap_or(self.scheduled_wall);

        match self.scheduled.checked_duration_since(now) {
            Some(wait) if !wait.is_zero() => Ok(wait),
            _ => Err(now.saturating_duration_since(self.scheduled)),
        }
    }
}
