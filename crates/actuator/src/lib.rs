//! # Actuator
//!
//! Reactive control of a physical output.
//!
//! `PlantControl` is both a sensor and a sink: its sink half watches one
//! parameter and switches the output on for a fixed duration when a
//! threshold is crossed; its sensor half reports how many seconds of output
//! were applied since the last reading.
//!
//! Responsibilities:
//! - Threshold predicate (above / below)
//! - Single-flight debounce with automatic shutoff
//! - Output pins (in-memory, sysfs GPIO)

mod error;
mod output;
mod plant;
mod threshold;
mod timer;

pub use error::{ActuatorError, Result};
pub use output::{MemoryPin, OutputPin, SysfsGpioPin, SYSFS_GPIO_ROOT};
pub use plant::{AppliedOutput, PlantControl, PlantSensor, PlantSettings, PlantSink};
pub use threshold::Threshold;
pub use timer::ShutoffTimer;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
