//! Trigger predicate

use contracts::ThresholdDirection;

/// Strict comparison against a fixed level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub level: f64,
    pub direction: ThresholdDirection,
}

impl Threshold {
    pub fn above(level: f64) -> Self {
        Self {
            level,
            direction: ThresholdDirection::Above,
        }
    }

    pub fn below(level: f64) -> Self {
        Self {
            level,
            direction: ThresholdDirection::Below,
        }
    }

    /// Whether `value` should trigger the action
    pub fn is_met(&self, value: f64) -> bool {
        match self.direction {
            ThresholdDirection::Above => value > self.level,
            ThresholdDirection::Below => value < self.level,
        }
    }
}
