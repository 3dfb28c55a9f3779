//! Reading - one sample produced by a sensor tick

use chrono::{DateTime, Utc};

/// Wall-clock timestamp attached to every reading
pub type Timestamp = DateTime<Utc>;

/// A single `(timestamp, value)` sample
///
/// The timestamp is the scheduled time of the tick that produced it, not the
/// time the value production finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Scheduled tick time
    pub timestamp: Timestamp,

    /// Sampled value
    pub value: f64,
}

impl Reading {
    /// Create a new reading
    pub fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }
}
